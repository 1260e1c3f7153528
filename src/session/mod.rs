//! Session state and the flows that drive it
//!
//! [`Session`] owns everything the user sees change: flags, the activity log,
//! the mailbox connection and the sort phase. It has no UI or I/O of its own;
//! the flows in the submodules talk to the backend and feed results back in
//! through explicit methods, so every transition can be exercised in tests.

mod gate;
mod poller;
mod redirect;
mod revert;

pub use gate::{
    ConnectionProbe, FlagSource, GateOutcome, LoginResult, check_connection, complete_login,
    probe_connection,
};
pub use poller::{
    PollExit, PollTiming, PollTracker, RetryDecision, SortEvent, SortOutcome, SortTask,
    StartFailure, run_sort, spawn_sort,
};
pub use redirect::{AuthRedirect, RedirectListener};
pub use revert::{
    ConfirmedRevert, RevertFailure, RevertOutcome, RevertRequest, execute_revert, send_revert,
};

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::api::SortStatus;
use crate::flags::{Flag, FlagEdit, FlagStore};
use crate::history::{HistoryAction, HistoryLog};

/// Name recorded in the activity log for sort runs
pub const SORT_HISTORY_NAME: &str = "Email Sorting";

/// Local checks that fail before any request is sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select at least one flag type before sorting.")]
    NoActiveFlags,
    #[error("Please connect your Gmail account first.")]
    NotConnected,
    #[error("Email sorting is already in progress.")]
    AlreadyRunning,
}

/// Whether the remote mailbox is linked, and as whom
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub is_connected: bool,
    pub user_email: Option<String>,
}

impl ConnectionState {
    pub fn connected(email: impl Into<String>) -> Self {
        Self {
            is_connected: true,
            user_email: Some(email.into()),
        }
    }

    /// Email of the linked account, only while connected
    pub fn email(&self) -> Option<&str> {
        if self.is_connected {
            self.user_email.as_deref()
        } else {
            None
        }
    }
}

/// Progress snapshot shown while a sort runs. Rebuilt on every poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortingProgress {
    pub total_emails: Option<u64>,
    pub processed_emails: Option<u64>,
    pub progress_percentage: Option<f64>,
    pub current_phase: Option<String>,
}

impl SortingProgress {
    pub const PHASE_LABELS: &'static str = "Setting up labels";
    pub const PHASE_CATEGORIZING: &'static str = "Categorizing emails";

    pub fn from_status(status: &SortStatus) -> Self {
        let phase = if status.total_emails == Some(0) {
            Self::PHASE_LABELS
        } else {
            Self::PHASE_CATEGORIZING
        };
        Self {
            total_emails: status.total_emails,
            processed_emails: status.processed_emails,
            progress_percentage: status
                .progress_percentage
                .filter(|p| p.is_finite())
                .map(|p| p.clamp(0.0, 100.0)),
            current_phase: Some(phase.to_string()),
        }
    }

    /// Fraction in [0, 1] for progress bars
    pub fn ratio(&self) -> f64 {
        self.progress_percentage.unwrap_or(0.0) / 100.0
    }
}

/// Where the sort state machine currently is
#[derive(Debug, Clone, Default)]
pub enum SortPhase {
    #[default]
    Idle,
    /// Start request in flight
    Starting,
    Polling(SortingProgress),
    /// Banner shown until `shown_at + display window`
    Completed { message: String, shown_at: Instant },
    Failed { message: String, shown_at: Instant },
    /// Polling gave up; the job may still have finished on the server
    LostConnection,
}

impl SortPhase {
    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Starting | Self::Polling(_))
    }

    pub fn banner(&self) -> Option<(&str, bool)> {
        match self {
            Self::Completed { message, .. } => Some((message, true)),
            Self::Failed { message, .. } => Some((message, false)),
            _ => None,
        }
    }
}

/// Work the caller must do after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Followup {
    /// Show a blocking message
    Alert(String),
    /// Tell the user to reconnect and re-run the connection check once
    Reconnect(String),
    /// Remote sorting history changed
    RefreshHistory,
}

impl Followup {
    /// Reconnect prompt for a 401 from any endpoint outside a sort run
    pub fn connection_expired() -> Self {
        Self::Reconnect(
            "Your Gmail connection has expired. Please reconnect your account.".to_string(),
        )
    }
}

/// Everything needed to start one sort run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortRequest {
    pub email: String,
    pub active_flags: Vec<String>,
}

/// The client-side session: flags, activity log, connection and sort phase
#[derive(Debug, Clone)]
pub struct Session {
    pub flags: FlagStore,
    pub history: HistoryLog,
    pub connection: ConnectionState,
    pub sort: SortPhase,
    defaults: Vec<Flag>,
}

impl Session {
    pub fn new(defaults: Vec<Flag>) -> Self {
        Self {
            flags: FlagStore::new(defaults.clone()),
            history: HistoryLog::default(),
            connection: ConnectionState::default(),
            sort: SortPhase::Idle,
            defaults,
        }
    }

    pub fn defaults(&self) -> &[Flag] {
        &self.defaults
    }

    /// Back to a disconnected session: default flags, empty log, no sort
    pub fn reset(&mut self) {
        tracing::info!("Resetting session state");
        self.flags.replace_all(self.defaults.clone());
        self.history.clear();
        self.connection = ConnectionState::default();
        self.sort = SortPhase::Idle;
    }

    pub fn is_processing(&self) -> bool {
        self.sort.is_processing()
    }

    /// Email to sync flag changes to, when connected
    pub fn sync_target(&self) -> Option<&str> {
        self.connection.email()
    }

    /// Apply an edit to one flag; content edits are logged, toggles are not
    pub fn update_flag(&mut self, flag: Flag) -> FlagEdit {
        let name = flag.name.clone();
        let edit = self.flags.update(flag);
        if edit == FlagEdit::Edited {
            self.history.record(
                HistoryAction::Edited,
                &name,
                format!("Updated {} flag settings", name),
            );
        }
        edit
    }

    pub fn toggle_flag(&mut self, id: &str) -> FlagEdit {
        self.flags.toggle(id)
    }

    /// Validate and enter `Starting`
    pub fn begin_sort(&mut self) -> Result<SortRequest, ValidationError> {
        if self.is_processing() {
            return Err(ValidationError::AlreadyRunning);
        }
        let active_flags = self.flags.active_names();
        if active_flags.is_empty() {
            return Err(ValidationError::NoActiveFlags);
        }
        let email = self
            .connection
            .email()
            .ok_or(ValidationError::NotConnected)?
            .to_string();

        self.sort = SortPhase::Starting;
        Ok(SortRequest {
            email,
            active_flags,
        })
    }

    /// Fold one poller event into the session
    pub fn apply_sort_event(&mut self, event: SortEvent, now: Instant) -> Option<Followup> {
        match event {
            SortEvent::Started => {
                if self.is_processing() {
                    self.sort = SortPhase::Polling(SortingProgress::default());
                }
                None
            }
            SortEvent::Progress(progress) => {
                if self.is_processing() {
                    self.sort = SortPhase::Polling(progress);
                }
                None
            }
            SortEvent::Retrying { attempt, error } => {
                tracing::debug!("Status check failed (attempt {}): {}", attempt, error);
                None
            }
            SortEvent::Finished(outcome) => {
                let message = outcome.message();
                self.history
                    .record(HistoryAction::Created, SORT_HISTORY_NAME, &message);
                self.sort = if outcome.is_success() {
                    SortPhase::Completed {
                        message,
                        shown_at: now,
                    }
                } else {
                    SortPhase::Failed {
                        message,
                        shown_at: now,
                    }
                };
                Some(Followup::RefreshHistory)
            }
            SortEvent::StartRejected(failure) => {
                self.sort = SortPhase::Idle;
                Some(failure.followup())
            }
            SortEvent::Unauthorized => {
                self.sort = SortPhase::Idle;
                Some(Followup::Reconnect(
                    "Your Gmail connection expired while sorting. Please reconnect your account."
                        .to_string(),
                ))
            }
            SortEvent::LostConnection => {
                self.sort = SortPhase::LostConnection;
                Some(Followup::Alert(
                    "Lost connection to the server while sorting. The sort may still have \
                     completed; check your sorting history for results."
                        .to_string(),
                ))
            }
        }
    }

    /// Drop the completion banner once its display window has passed.
    /// Returns true if the phase changed.
    pub fn expire_banner(&mut self, now: Instant, display: Duration) -> bool {
        match &self.sort {
            SortPhase::Completed { shown_at, .. } | SortPhase::Failed { shown_at, .. }
                if now.duration_since(*shown_at) >= display =>
            {
                self.sort = SortPhase::Idle;
                true
            }
            _ => false,
        }
    }

    /// Leave the lost-connection state once the user has seen the alert
    pub fn acknowledge_lost_connection(&mut self) {
        if matches!(self.sort, SortPhase::LostConnection) {
            self.sort = SortPhase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::builtin_flags;

    fn connected_session() -> Session {
        let mut session = Session::new(builtin_flags());
        session.connection = ConnectionState::connected("me@example.com");
        session
    }

    #[test]
    fn test_toggle_never_logs_but_edit_logs_once() {
        let mut session = connected_session();

        session.toggle_flag("1");
        session.toggle_flag("1");
        let mut flag = session.flags.get("2").cloned().unwrap();
        flag.is_active = true;
        session.update_flag(flag.clone());
        assert!(session.history.is_empty());

        flag.name = "Very Important".to_string();
        session.update_flag(flag.clone());
        assert_eq!(session.history.len(), 1);
        let entry = &session.history.entries()[0];
        assert_eq!(entry.action, HistoryAction::Edited);
        assert_eq!(entry.flag_name, "Very Important");
        assert_eq!(entry.details, "Updated Very Important flag settings");

        flag.description = "VIPs".to_string();
        session.update_flag(flag);
        assert_eq!(session.history.len(), 2);
    }

    #[test]
    fn test_begin_sort_requires_active_flag() {
        let mut session = connected_session();
        assert_eq!(session.begin_sort(), Err(ValidationError::NoActiveFlags));
        assert!(matches!(session.sort, SortPhase::Idle));
    }

    #[test]
    fn test_begin_sort_requires_connection() {
        let mut session = Session::new(builtin_flags());
        session.toggle_flag("1");
        assert_eq!(session.begin_sort(), Err(ValidationError::NotConnected));
        assert!(!session.is_processing());
    }

    #[test]
    fn test_begin_sort_carries_active_names() {
        let mut session = connected_session();
        session.toggle_flag("1");
        session.toggle_flag("4");

        let request = session.begin_sort().unwrap();
        assert_eq!(request.email, "me@example.com");
        assert_eq!(request.active_flags, vec!["Urgent", "Archive"]);
        assert!(session.is_processing());
        assert_eq!(session.begin_sort(), Err(ValidationError::AlreadyRunning));
    }

    #[test]
    fn test_completed_message_and_single_history_entry() {
        let mut session = connected_session();
        session.toggle_flag("1");
        session.begin_sort().unwrap();
        let now = Instant::now();

        session.apply_sort_event(SortEvent::Started, now);
        let followup = session.apply_sort_event(
            SortEvent::Finished(SortOutcome::Completed {
                processed: 7,
                total: 10,
            }),
            now,
        );

        assert_eq!(followup, Some(Followup::RefreshHistory));
        assert_eq!(
            session.sort.banner(),
            Some(("Successfully sorted 7/10 emails into categories!", true))
        );
        assert_eq!(session.history.count(HistoryAction::Created), 1);
        assert_eq!(session.history.entries()[0].flag_name, SORT_HISTORY_NAME);
        assert!(!session.is_processing());
    }

    #[test]
    fn test_failed_sort_is_recorded() {
        let mut session = connected_session();
        session.toggle_flag("1");
        session.begin_sort().unwrap();

        session.apply_sort_event(
            SortEvent::Finished(SortOutcome::Failed {
                error: Some("No active flags found".to_string()),
            }),
            Instant::now(),
        );

        assert_eq!(
            session.sort.banner(),
            Some(("Sorting failed: No active flags found", false))
        );
        assert_eq!(session.history.count(HistoryAction::Created), 1);
    }

    #[test]
    fn test_progress_updates_only_while_processing() {
        let mut session = connected_session();
        let progress = SortingProgress {
            total_emails: Some(10),
            ..Default::default()
        };
        session.apply_sort_event(SortEvent::Progress(progress.clone()), Instant::now());
        assert!(matches!(session.sort, SortPhase::Idle));

        session.toggle_flag("1");
        session.begin_sort().unwrap();
        session.apply_sort_event(SortEvent::Progress(progress.clone()), Instant::now());
        assert!(matches!(&session.sort, SortPhase::Polling(p) if *p == progress));
    }

    #[test]
    fn test_unauthorized_asks_for_reconnect() {
        let mut session = connected_session();
        session.toggle_flag("1");
        session.begin_sort().unwrap();

        let followup = session.apply_sort_event(SortEvent::Unauthorized, Instant::now());
        assert!(matches!(followup, Some(Followup::Reconnect(_))));
        assert!(!session.is_processing());
    }

    #[test]
    fn test_lost_connection_clears_processing() {
        let mut session = connected_session();
        session.toggle_flag("1");
        session.begin_sort().unwrap();

        let followup = session.apply_sort_event(SortEvent::LostConnection, Instant::now());
        assert!(matches!(followup, Some(Followup::Alert(ref m)) if m.contains("check your sorting history")));
        assert!(!session.is_processing());
        assert!(session.history.is_empty());

        session.acknowledge_lost_connection();
        assert!(matches!(session.sort, SortPhase::Idle));
    }

    #[test]
    fn test_banner_expires_after_display_window() {
        let mut session = connected_session();
        let shown_at = Instant::now();
        session.sort = SortPhase::Completed {
            message: "done".to_string(),
            shown_at,
        };
        let window = Duration::from_millis(4000);

        assert!(!session.expire_banner(shown_at + Duration::from_millis(3999), window));
        assert!(session.expire_banner(shown_at + window, window));
        assert!(matches!(session.sort, SortPhase::Idle));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut session = connected_session();
        session.toggle_flag("2");
        let mut flag = session.flags.get("3").cloned().unwrap();
        flag.name = "Later".to_string();
        session.update_flag(flag);
        session.toggle_flag("1");
        session.begin_sort().unwrap();

        session.reset();

        assert_eq!(session.flags.flags(), builtin_flags().as_slice());
        assert!(session.history.is_empty());
        assert!(!session.is_processing());
        assert_eq!(session.connection, ConnectionState::default());
    }

    #[test]
    fn test_progress_phase_labels() {
        let setup = SortingProgress::from_status(&SortStatus {
            is_processing: true,
            total_emails: Some(0),
            ..Default::default()
        });
        assert_eq!(
            setup.current_phase.as_deref(),
            Some(SortingProgress::PHASE_LABELS)
        );

        let working = SortingProgress::from_status(&SortStatus {
            is_processing: true,
            total_emails: Some(40),
            processed_emails: Some(10),
            progress_percentage: Some(140.0),
            last_session: None,
        });
        assert_eq!(
            working.current_phase.as_deref(),
            Some(SortingProgress::PHASE_CATEGORIZING)
        );
        assert_eq!(working.progress_percentage, Some(100.0));
    }
}
