//! Application state types
//!
//! `AppState` is the snapshot the render thread draws. It wraps the
//! [`Session`] together with purely presentational state (focus, selection,
//! modals, status line).

use std::time::Instant;

use crate::api::{SessionDetails, SortSession};
use crate::config::ThemeVariant;
use crate::constants::STATUS_TTL_SECS;
use crate::flags::Flag;
use crate::input::KeybindingEntry;
use crate::session::{RevertRequest, Session};

/// Which dashboard pane receives navigation keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Flags,
    Sessions,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Self::Flags => Self::Sessions,
            Self::Sessions => Self::Flags,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditField {
    #[default]
    Name,
    Description,
}

impl EditField {
    pub fn next(self) -> Self {
        match self {
            Self::Name => Self::Description,
            Self::Description => Self::Name,
        }
    }
}

/// In-progress edit of one flag's name and description
#[derive(Debug, Clone)]
pub struct FlagEditor {
    pub flag_id: String,
    pub field: EditField,
    pub name: String,
    pub description: String,
}

impl FlagEditor {
    pub fn new(flag: &Flag) -> Self {
        Self {
            flag_id: flag.id.clone(),
            field: EditField::Name,
            name: flag.name.clone(),
            description: flag.description.clone(),
        }
    }

    fn current_mut(&mut self) -> &mut String {
        match self.field {
            EditField::Name => &mut self.name,
            EditField::Description => &mut self.description,
        }
    }

    pub fn push(&mut self, c: char) {
        self.current_mut().push(c);
    }

    pub fn backspace(&mut self) {
        self.current_mut().pop();
    }

    /// Apply the edit to `flag`; `None` when the name would be blank
    pub fn apply_to(&self, flag: &Flag) -> Option<Flag> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Flag {
            name: name.to_string(),
            description: self.description.trim().to_string(),
            ..flag.clone()
        })
    }
}

/// Loading state of the session details popup
#[derive(Debug, Clone)]
pub enum DetailsView {
    Loading,
    Loaded(SessionDetails),
    Failed(String),
}

/// Modal overlay state - only one can be active at a time
#[derive(Debug, Clone, Default)]
pub enum ModalState {
    #[default]
    None,
    Alert {
        title: String,
        message: String,
    },
    ConfirmRevert(RevertRequest),
    EditFlag(FlagEditor),
    SessionDetails {
        session: SortSession,
        view: DetailsView,
    },
    Help {
        keybindings: Vec<KeybindingEntry>,
    },
}

impl ModalState {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, Self::Alert { .. })
    }

    /// Popups whose content may exceed the screen
    pub fn is_scrollable(&self) -> bool {
        matches!(self, Self::SessionDetails { .. } | Self::Help { .. })
    }

    pub fn alert(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Alert {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn editor_mut(&mut self) -> Option<&mut FlagEditor> {
        match self {
            Self::EditFlag(editor) => Some(editor),
            _ => None,
        }
    }
}

/// Busy indicator and transient status line
#[derive(Debug, Clone, Default)]
pub struct StatusState {
    /// A connection check or login is in flight
    pub loading: bool,
    pub message: Option<String>,
    pub message_time: Option<Instant>,
    pub error: Option<String>,
    pub error_time: Option<Instant>,
}

impl StatusState {
    pub fn set_message(&mut self, msg: impl ToString) {
        self.message = Some(msg.to_string());
        self.message_time = Some(Instant::now());
    }

    pub fn set_error(&mut self, error: impl ToString) {
        self.error = Some(error.to_string());
        self.error_time = Some(Instant::now());
    }

    /// Clear messages older than the TTL. Returns true if anything changed.
    pub fn clear_expired(&mut self) -> bool {
        let expired =
            |t: Option<Instant>| t.is_some_and(|t| t.elapsed().as_secs() >= STATUS_TTL_SECS);
        let mut changed = false;
        if expired(self.message_time) {
            self.message = None;
            self.message_time = None;
            changed = true;
        }
        if expired(self.error_time) {
            self.error = None;
            self.error_time = None;
            changed = true;
        }
        changed
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub session: Session,
    pub focus: Focus,
    pub flag_selected: usize,
    pub session_selected: usize,
    /// Recent sorts reported by the backend
    pub remote_history: Vec<SortSession>,
    pub modal: ModalState,
    /// First visible line of a scrollable popup
    pub popup_scroll: usize,
    pub theme: ThemeVariant,
    pub status: StatusState,
    /// Browser login started, waiting for the redirect
    pub login_pending: bool,
}

impl AppState {
    pub fn new(session: Session, theme: ThemeVariant) -> Self {
        Self {
            session,
            focus: Focus::default(),
            flag_selected: 0,
            session_selected: 0,
            remote_history: Vec::new(),
            modal: ModalState::None,
            popup_scroll: 0,
            theme,
            status: StatusState::default(),
            login_pending: false,
        }
    }

    pub fn selected_flag(&self) -> Option<&Flag> {
        self.session.flags.flags().get(self.flag_selected)
    }

    pub fn selected_session(&self) -> Option<&SortSession> {
        self.remote_history.get(self.session_selected)
    }

    fn focused_len(&self) -> usize {
        match self.focus {
            Focus::Flags => self.session.flags.len(),
            Focus::Sessions => self.remote_history.len(),
        }
    }

    fn focused_index_mut(&mut self) -> &mut usize {
        match self.focus {
            Focus::Flags => &mut self.flag_selected,
            Focus::Sessions => &mut self.session_selected,
        }
    }

    pub fn move_down(&mut self) {
        if self.modal.is_scrollable() {
            self.popup_scroll += 1;
            return;
        }
        let len = self.focused_len();
        let idx = self.focused_index_mut();
        if *idx + 1 < len {
            *idx += 1;
        }
    }

    pub fn move_up(&mut self) {
        if self.modal.is_scrollable() {
            self.popup_scroll = self.popup_scroll.saturating_sub(1);
            return;
        }
        let idx = self.focused_index_mut();
        *idx = idx.saturating_sub(1);
    }

    /// Keep selections inside their lists after the lists were replaced
    pub fn clamp_selection(&mut self) {
        self.flag_selected = self
            .flag_selected
            .min(self.session.flags.len().saturating_sub(1));
        self.session_selected = self
            .session_selected
            .min(self.remote_history.len().saturating_sub(1));
    }

    /// Open a modal with its scroll position reset
    pub fn open_modal(&mut self, modal: ModalState) {
        self.modal = modal;
        self.popup_scroll = 0;
    }

    pub fn show_alert(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.open_modal(ModalState::alert(title, message));
    }

    pub fn set_status(&mut self, msg: impl ToString) {
        self.status.set_message(msg);
    }

    pub fn set_error(&mut self, error: impl ToString) {
        self.status.set_error(error);
    }

    pub fn clear_status_if_expired(&mut self) -> bool {
        self.status.clear_expired()
    }

    /// Drop everything that belonged to the previous connection. The session
    /// itself is reset by its own flows.
    pub fn clear_connected_views(&mut self) {
        self.remote_history.clear();
        self.modal = match std::mem::take(&mut self.modal) {
            // an alert explaining the disconnect stays up
            alert @ ModalState::Alert { .. } => alert,
            _ => ModalState::None,
        };
        self.clamp_selection();
    }
}
