//! Action handlers and background event reducers

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::state::{DetailsView, FlagEditor, Focus, ModalState};
use super::{App, AppEvent, CheckReason};
use crate::api::{ApiError, Backend, RevertResponse, SessionDetails, SortSession};
use crate::constants::LOGIN_TIMEOUT_SECS;
use crate::flags::FlagEdit;
use crate::input::Action;
use crate::session::{
    ConnectionProbe, FlagSource, Followup, GateOutcome, LoginResult, RedirectListener,
    RevertFailure, RevertOutcome, complete_login, probe_connection, send_revert, spawn_sort,
};

impl<B: Backend> App<B> {
    pub(crate) async fn handle_action(&mut self, action: Action) {
        match action {
            Action::Up => self.state.move_up(),
            Action::Down => self.state.move_down(),
            Action::FocusNext => self.state.focus = self.state.focus.next(),
            Action::Toggle => self.toggle_selected_flag(),
            Action::Edit => self.open_editor(),
            Action::Open => match self.state.focus {
                Focus::Flags => self.toggle_selected_flag(),
                Focus::Sessions => self.open_session_details(),
            },
            Action::Sort => self.start_sort(),
            Action::Revert => self.request_revert(),
            Action::Confirm => self.confirm_modal(),
            Action::NextField => {
                if let Some(editor) = self.state.modal.editor_mut() {
                    editor.field = editor.field.next();
                }
            }
            Action::Back => self.close_modal(),
            Action::Connect => self.start_login().await,
            Action::Disconnect => self.disconnect(),
            Action::Refresh => {
                self.state.set_status("Refreshing...");
                self.check_connection(CheckReason::Refresh);
            }
            Action::ToggleTheme => {
                self.state.theme = self.state.theme.toggled();
                crate::ui::theme::set_theme(self.state.theme);
            }
            Action::Help => {
                self.state.open_modal(ModalState::Help {
                    keybindings: self.bindings.all_bindings(),
                });
            }
            // Quit is handled by the event loop
            Action::Quit => {}
        }
    }

    pub(crate) fn handle_char(&mut self, c: char) {
        if let Some(editor) = self.state.modal.editor_mut() {
            editor.push(c);
        }
    }

    pub(crate) fn handle_backspace(&mut self) {
        if let Some(editor) = self.state.modal.editor_mut() {
            editor.backspace();
        }
    }

    // === Flags ===

    fn toggle_selected_flag(&mut self) {
        let Some(id) = self.state.selected_flag().map(|f| f.id.clone()) else {
            return;
        };
        let edit = self.state.session.toggle_flag(&id);
        self.after_flag_change(edit);
    }

    fn open_editor(&mut self) {
        if self.state.focus != Focus::Flags {
            return;
        }
        if let Some(flag) = self.state.selected_flag() {
            let editor = ModalState::EditFlag(FlagEditor::new(flag));
            self.state.open_modal(editor);
        }
    }

    fn save_editor(&mut self) {
        let ModalState::EditFlag(editor) = &self.state.modal else {
            return;
        };
        let Some(current) = self.state.session.flags.get(&editor.flag_id) else {
            self.state.modal = ModalState::None;
            return;
        };
        let Some(updated) = editor.apply_to(current) else {
            self.state.set_error("Flag name cannot be empty");
            return;
        };

        self.state.modal = ModalState::None;
        let edit = self.state.session.update_flag(updated);
        self.after_flag_change(edit);
    }

    /// Push a flag mutation to the backend (debounced) when connected
    fn after_flag_change(&mut self, edit: FlagEdit) {
        if !edit.is_mutation() {
            return;
        }
        if let Some(email) = self.state.session.sync_target() {
            self.flag_sync
                .schedule(email, self.state.session.flags.flags());
        }
    }

    // === Sorting ===

    fn start_sort(&mut self) {
        let request = match self.state.session.begin_sort() {
            Ok(request) => request,
            Err(e) => {
                self.state.show_alert("Email sorting", e.to_string());
                return;
            }
        };

        tracing::info!("Starting sort with {} active flags", request.active_flags.len());
        self.stop_sort();
        let (tx, rx) = tokio::sync::mpsc::channel(32);
        let task = spawn_sort(
            Arc::clone(&self.backend),
            request,
            self.config.polling.timing(),
            tx,
        );
        self.sort = Some((task, rx));
    }

    /// Drain poller events into the session. Returns true if any arrived.
    pub(crate) fn process_sort_events(&mut self) -> bool {
        let mut events = Vec::new();
        let mut finished = false;
        if let Some((_, rx)) = self.sort.as_mut() {
            loop {
                match rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(tokio::sync::mpsc::error::TryRecvError::Empty) => break,
                    Err(tokio::sync::mpsc::error::TryRecvError::Disconnected) => {
                        finished = true;
                        break;
                    }
                }
            }
        }
        if finished {
            self.sort = None;
        }

        let had_events = !events.is_empty();
        for event in events {
            tracing::debug!("Sort event: {:?}", event);
            if let Some(followup) = self.state.session.apply_sort_event(event, Instant::now()) {
                self.handle_followup(followup);
            }
        }
        had_events
    }

    fn handle_followup(&mut self, followup: Followup) {
        match followup {
            Followup::Alert(message) => self.state.show_alert("Email sorting", message),
            Followup::Reconnect(message) => {
                self.state.show_alert("Reconnect needed", message);
                self.check_connection(CheckReason::Reconnect);
            }
            Followup::RefreshHistory => self.load_history(),
        }
    }

    // === Revert ===

    fn request_revert(&mut self) {
        match self.state.session.prepare_revert() {
            Ok(request) => self.state.open_modal(ModalState::ConfirmRevert(request)),
            Err(e) => self.state.show_alert("Revert sorting", e.to_string()),
        }
    }

    fn confirm_modal(&mut self) {
        match std::mem::take(&mut self.state.modal) {
            ModalState::ConfirmRevert(request) => {
                tracing::info!("Revert confirmed for {}", request.email());
                let confirmed = request.confirm();
                let backend = Arc::clone(&self.backend);
                self.state.set_status("Reverting last sorting session...");
                self.spawn_request(async move {
                    AppEvent::Reverted(send_revert(backend.as_ref(), confirmed).await)
                });
            }
            modal @ ModalState::EditFlag(_) => {
                self.state.modal = modal;
                self.save_editor();
            }
            other => self.state.modal = other,
        }
    }

    fn close_modal(&mut self) {
        if self.state.modal.is_alert() {
            self.state.session.acknowledge_lost_connection();
        }
        self.state.modal = ModalState::None;
    }

    fn handle_reverted(&mut self, result: Result<RevertResponse, RevertFailure>) {
        let outcome = self.state.session.apply_revert(result);
        if let RevertOutcome::Reverted { .. } = outcome {
            self.after_flag_change(FlagEdit::Toggled);
            self.load_history();
        }
        let title = match &outcome {
            RevertOutcome::Reverted { .. } => "Revert complete",
            RevertOutcome::Failed(RevertFailure::NothingToRevert) => "Nothing to revert",
            RevertOutcome::Failed(_) => "Revert failed",
        };
        match outcome.followup() {
            Followup::Alert(message) => self.state.show_alert(title, message),
            followup => self.handle_followup(followup),
        }
    }

    // === Connection ===

    pub(crate) fn check_connection(&mut self, reason: CheckReason) {
        self.state.status.loading = true;
        let backend = Arc::clone(&self.backend);
        let defaults = self.state.session.defaults().to_vec();
        self.spawn_request(async move {
            let probe = probe_connection(backend.as_ref(), &defaults).await;
            AppEvent::Checked { probe, reason }
        });
    }

    fn apply_check(&mut self, probe: ConnectionProbe, reason: CheckReason) {
        self.state.status.loading = false;
        let outcome = self.state.session.apply_probe(probe);
        tracing::info!("Connection check ({:?}): {:?}", reason, outcome);

        match outcome {
            GateOutcome::Connected {
                email,
                source,
                resync,
            } => {
                self.state.set_status(format!("Connected as {}", email));
                if resync {
                    tracing::info!("Backend flags for {} are stale, saving local copy", email);
                    self.flag_sync.schedule(&email, self.state.session.flags.flags());
                }
                match source {
                    FlagSource::Fallback => {
                        self.state
                            .set_error("Could not load your flags; showing defaults");
                    }
                    FlagSource::Seeded => self.state.set_status(format!(
                        "Connected as {}. Default flags created.",
                        email
                    )),
                    FlagSource::Remote => {}
                }
                // A 401 from the history endpoint itself may have led here
                if reason != CheckReason::Reconnect {
                    self.load_history();
                }
            }
            GateOutcome::Disconnected => {
                self.flag_sync.discard();
                self.stop_sort();
                self.state.clear_connected_views();
                if reason != CheckReason::Startup {
                    self.state.set_status("Not connected. Press c to connect Gmail.");
                }
            }
            GateOutcome::Unreachable(error) => {
                self.flag_sync.discard();
                self.stop_sort();
                self.state.clear_connected_views();
                self.state.set_error(format!("Backend unreachable: {}", error));
            }
        }
        self.state.clamp_selection();
    }

    async fn start_login(&mut self) {
        if let Some(email) = self.state.session.connection.email() {
            let message = format!("Already connected as {}", email);
            self.state.set_status(message);
            return;
        }
        if self.state.login_pending {
            self.state.set_status("Waiting for the browser login to finish...");
            return;
        }

        let listener = match RedirectListener::bind(self.config.backend.redirect_port).await {
            Ok(listener) => listener,
            Err(e) => {
                self.state.show_alert("Connect Gmail", format!("{:#}", e));
                return;
            }
        };

        if let Ok(port) = listener.port() {
            tracing::info!("Waiting for login redirect on port {}", port);
        }
        let url = self.backend.login_url();
        if let Err(e) = open::that(&url) {
            tracing::warn!("Failed to open browser: {}", e);
            self.state.set_status(format!("Open {} in your browser", url));
        } else {
            self.state.set_status("Complete the login in your browser...");
        }
        self.state.login_pending = true;

        let backend = Arc::clone(&self.backend);
        let settle = self.config.sync.auth_settle();
        let defaults = self.state.session.defaults().to_vec();
        self.spawn_request(async move {
            let result = match listener.wait(Duration::from_secs(LOGIN_TIMEOUT_SECS)).await {
                Ok(redirect) => {
                    Ok(complete_login(backend.as_ref(), redirect, settle, &defaults).await)
                }
                Err(e) => Err(format!("{:#}", e)),
            };
            AppEvent::Login(result)
        });
    }

    fn handle_login(&mut self, result: Result<LoginResult, String>) {
        self.state.login_pending = false;
        match result {
            Ok(LoginResult::Checked(probe)) => self.apply_check(probe, CheckReason::Refresh),
            Ok(LoginResult::Rejected(message)) => {
                self.state.show_alert("Connection failed", message);
            }
            Err(message) => self.state.show_alert("Connection failed", message),
        }
    }

    fn disconnect(&mut self) {
        if !self.state.session.connection.is_connected {
            self.state.set_status("Not connected");
            return;
        }
        // Edits still in the debounce window are not sent for a logged-out user
        self.flag_sync.discard();
        let backend = Arc::clone(&self.backend);
        self.spawn_request(async move { AppEvent::LoggedOut(backend.logout().await) });
    }

    fn handle_logged_out(&mut self, result: Result<(), ApiError>) {
        if let Err(e) = &result {
            tracing::warn!("Logout failed: {}", e);
            self.state.set_error(format!("Logout failed: {}", e));
        } else {
            self.state.set_status("Disconnected");
        }
        // Local state is dropped either way
        self.flag_sync.discard();
        self.stop_sort();
        self.state.session.reset();
        self.state.clear_connected_views();
    }

    // === Remote history ===

    fn load_history(&mut self) {
        let Some(email) = self.state.session.connection.email().map(String::from) else {
            return;
        };
        let backend = Arc::clone(&self.backend);
        self.spawn_request(async move {
            AppEvent::HistoryLoaded(backend.sort_history(&email).await)
        });
    }

    fn handle_history(&mut self, result: Result<Vec<SortSession>, ApiError>) {
        match result {
            Ok(history) => {
                // A stale response must not repopulate a disconnected view
                if self.state.session.connection.is_connected {
                    self.state.remote_history = history;
                    self.state.clamp_selection();
                }
            }
            Err(e) if e.is_unauthorized() => {
                tracing::warn!("Sorting history rejected: {}", e);
                self.handle_followup(Followup::connection_expired());
            }
            Err(e) => {
                tracing::warn!("Failed to load sorting history: {}", e);
                self.state.set_error("Could not load sorting history");
            }
        }
    }

    fn open_session_details(&mut self) {
        let Some(session) = self.state.selected_session().cloned() else {
            return;
        };
        let session_id = session.session_id.clone();
        self.state.open_modal(ModalState::SessionDetails {
            session,
            view: DetailsView::Loading,
        });
        let backend = Arc::clone(&self.backend);
        self.spawn_request(async move {
            let result = backend.session_details(&session_id).await;
            AppEvent::DetailsLoaded { session_id, result }
        });
    }

    fn handle_details(&mut self, session_id: &str, result: Result<SessionDetails, ApiError>) {
        if let Err(e) = &result
            && e.is_unauthorized()
        {
            tracing::warn!("Session details rejected: {}", e);
            self.handle_followup(Followup::connection_expired());
            return;
        }
        // Ignore responses for a popup that was closed or replaced
        let ModalState::SessionDetails { session, view } = &mut self.state.modal else {
            return;
        };
        if session.session_id != session_id {
            return;
        }
        *view = match result {
            Ok(details) => DetailsView::Loaded(details),
            Err(e) => {
                tracing::warn!("Failed to load session details: {}", e);
                DetailsView::Failed(e.detail().unwrap_or("Request failed").to_string())
            }
        };
    }

    /// Drain background request results. Returns true if any arrived.
    pub(crate) fn process_app_events(&mut self) -> bool {
        let mut had_events = false;
        while let Ok(event) = self.event_rx.try_recv() {
            had_events = true;
            match event {
                AppEvent::Checked { probe, reason } => self.apply_check(probe, reason),
                AppEvent::Login(result) => self.handle_login(result),
                AppEvent::HistoryLoaded(result) => self.handle_history(result),
                AppEvent::DetailsLoaded { session_id, result } => {
                    self.handle_details(&session_id, result)
                }
                AppEvent::Reverted(result) => self.handle_reverted(result),
                AppEvent::LoggedOut(result) => self.handle_logged_out(result),
            }
        }
        had_events
    }
}
