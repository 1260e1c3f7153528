//! Connection gate: who is logged in, and which flags they have
//!
//! The network half ([`probe_connection`]) runs off the event loop and only
//! produces a [`ConnectionProbe`]; [`Session::apply_probe`] folds it in.

use std::time::Duration;

use super::{AuthRedirect, ConnectionState, Session};
use crate::api::{ApiError, Backend};
use crate::flags::Flag;

/// Where the flags installed on connect came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagSource {
    /// Loaded from the backend
    Remote,
    /// Backend had none; defaults installed and saved right away
    Seeded,
    /// Load failed; defaults installed locally, not saved
    Fallback,
}

/// Result of one auth status check plus flag load
#[derive(Debug, Clone)]
pub enum ConnectionProbe {
    Connected {
        email: String,
        flags: Vec<Flag>,
        source: FlagSource,
    },
    Disconnected,
    Unreachable(ApiError),
}

/// What the session looks like after a probe was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// `resync` is set when a re-check of the same account kept the local
    /// flags and the backend's copy differs from them
    Connected {
        email: String,
        source: FlagSource,
        resync: bool,
    },
    Disconnected,
    Unreachable(String),
}

/// Query `/auth/status` once and, when connected, load that user's flags
pub async fn probe_connection<B: Backend>(backend: &B, defaults: &[Flag]) -> ConnectionProbe {
    let status = match backend.auth_status().await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!("Auth status check failed: {}", e);
            return ConnectionProbe::Unreachable(e);
        }
    };

    let email = match status.email {
        Some(email) if status.is_connected && !email.is_empty() => email,
        _ => {
            tracing::info!("Not connected to Gmail");
            return ConnectionProbe::Disconnected;
        }
    };

    let (flags, source) = match backend.load_flags(&email).await {
        Ok(flags) if !flags.is_empty() => {
            tracing::info!("Loaded {} flags for {}", flags.len(), email);
            (flags, FlagSource::Remote)
        }
        Ok(_) => {
            // First login: persist the defaults immediately, not debounced
            match backend.save_flags(&email, defaults).await {
                Ok(()) => tracing::info!("Saved default flags for new user {}", email),
                Err(e) => tracing::warn!("Failed to save default flags for {}: {}", email, e),
            }
            (defaults.to_vec(), FlagSource::Seeded)
        }
        Err(e) => {
            tracing::warn!("Failed to load flags for {}, using defaults: {}", email, e);
            (defaults.to_vec(), FlagSource::Fallback)
        }
    };

    ConnectionProbe::Connected {
        email,
        flags,
        source,
    }
}

impl Session {
    /// Install the result of a connection probe. Anything but a confirmed
    /// connection resets the session.
    pub fn apply_probe(&mut self, probe: ConnectionProbe) -> GateOutcome {
        match probe {
            ConnectionProbe::Connected {
                email,
                flags,
                source,
            } => {
                // Same account: local edits may still be waiting for their
                // debounced save, so the local list stays authoritative
                let resync = if self.connection.email() == Some(email.as_str()) {
                    source != FlagSource::Fallback && self.flags.flags() != flags.as_slice()
                } else {
                    self.history.clear();
                    self.flags.replace_all(flags);
                    false
                };
                self.connection = ConnectionState::connected(email.clone());
                GateOutcome::Connected {
                    email,
                    source,
                    resync,
                }
            }
            ConnectionProbe::Disconnected => {
                self.reset();
                GateOutcome::Disconnected
            }
            ConnectionProbe::Unreachable(e) => {
                self.reset();
                GateOutcome::Unreachable(e.to_string())
            }
        }
    }
}

/// Probe the backend and apply the result in one step
pub async fn check_connection<B: Backend>(backend: &B, session: &mut Session) -> GateOutcome {
    let probe = probe_connection(backend, session.defaults()).await;
    session.apply_probe(probe)
}

/// What the login redirect led to
#[derive(Debug, Clone)]
pub enum LoginResult {
    /// Redirect reported success; the connection was re-checked
    Checked(ConnectionProbe),
    /// Redirect carried an error message
    Rejected(String),
}

/// Act on the backend's login redirect. On success the backend needs a moment
/// to persist the new credentials before the status check sees them.
pub async fn complete_login<B: Backend>(
    backend: &B,
    redirect: AuthRedirect,
    settle: Duration,
    defaults: &[Flag],
) -> LoginResult {
    match redirect {
        AuthRedirect::Error(message) => {
            tracing::warn!("Login redirect reported an error: {}", message);
            LoginResult::Rejected(message)
        }
        AuthRedirect::Unrecognized => {
            LoginResult::Rejected("Unexpected response from the login page".to_string())
        }
        AuthRedirect::Success => {
            tokio::time::sleep(settle).await;
            LoginResult::Checked(probe_connection(backend, defaults).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthStatus;
    use crate::api::fake::FakeBackend;
    use crate::flags::builtin_flags;
    use crate::history::HistoryAction;
    use std::sync::atomic::Ordering;

    fn remote_flags() -> Vec<Flag> {
        vec![Flag::new("a", "Receipts", "Purchases", "#10b981")]
    }

    #[tokio::test]
    async fn test_connected_loads_remote_flags() {
        let backend = FakeBackend::connected("me@example.com");
        *backend.flags.lock().unwrap() = Ok(remote_flags());
        let mut session = Session::new(builtin_flags());

        let outcome = check_connection(&backend, &mut session).await;

        assert_eq!(
            outcome,
            GateOutcome::Connected {
                email: "me@example.com".to_string(),
                source: FlagSource::Remote,
                resync: false,
            }
        );
        assert_eq!(session.flags.flags(), remote_flags().as_slice());
        assert_eq!(session.connection.email(), Some("me@example.com"));
        assert!(backend.saves().is_empty());
    }

    #[tokio::test]
    async fn test_empty_remote_list_writes_defaults_through() {
        let backend = FakeBackend::connected("new@example.com");
        let mut session = Session::new(builtin_flags());

        let outcome = check_connection(&backend, &mut session).await;

        assert!(matches!(
            outcome,
            GateOutcome::Connected {
                source: FlagSource::Seeded,
                ..
            }
        ));
        let saves = backend.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].0, "new@example.com");
        assert_eq!(saves[0].1, builtin_flags());
        assert_eq!(session.flags.flags(), builtin_flags().as_slice());
    }

    #[tokio::test]
    async fn test_load_failure_installs_defaults_without_saving() {
        let backend = FakeBackend::connected("me@example.com");
        *backend.flags.lock().unwrap() = Err(ApiError::status(500, "db down"));
        let mut session = Session::new(builtin_flags());

        let outcome = check_connection(&backend, &mut session).await;

        assert!(matches!(
            outcome,
            GateOutcome::Connected {
                source: FlagSource::Fallback,
                ..
            }
        ));
        assert!(backend.saves().is_empty());
        assert!(session.connection.is_connected);
    }

    #[tokio::test]
    async fn test_recheck_of_same_account_keeps_local_flags() {
        let backend = FakeBackend::connected("me@example.com");
        *backend.flags.lock().unwrap() = Ok(remote_flags());
        let mut session = Session::new(builtin_flags());
        check_connection(&backend, &mut session).await;
        session.toggle_flag("a");
        session
            .history
            .record(HistoryAction::Edited, "Receipts", "Updated Receipts flag settings");

        let outcome = check_connection(&backend, &mut session).await;

        assert!(matches!(
            outcome,
            GateOutcome::Connected { resync: true, .. }
        ));
        assert!(session.flags.get("a").is_some_and(|f| f.is_active));
        assert_eq!(session.history.len(), 1);

        // nothing to push once both sides agree
        *backend.flags.lock().unwrap() = Ok(session.flags.flags().to_vec());
        let outcome = check_connection(&backend, &mut session).await;
        assert!(matches!(
            outcome,
            GateOutcome::Connected { resync: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_switching_account_replaces_flags_and_history() {
        let backend = FakeBackend::connected("me@example.com");
        let mut session = Session::new(builtin_flags());
        check_connection(&backend, &mut session).await;
        session.toggle_flag("1");
        session
            .history
            .record(HistoryAction::Edited, "Urgent", "Updated Urgent flag settings");

        backend.set_auth(Ok(AuthStatus {
            is_connected: true,
            email: Some("other@example.com".to_string()),
        }));
        *backend.flags.lock().unwrap() = Ok(remote_flags());
        let outcome = check_connection(&backend, &mut session).await;

        assert!(matches!(
            outcome,
            GateOutcome::Connected { resync: false, .. }
        ));
        assert_eq!(session.flags.flags(), remote_flags().as_slice());
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_resets_session() {
        let backend = FakeBackend::connected("me@example.com");
        *backend.flags.lock().unwrap() = Ok(remote_flags());
        let mut session = Session::new(builtin_flags());
        check_connection(&backend, &mut session).await;
        session.toggle_flag("a");
        session
            .history
            .record(HistoryAction::Edited, "Receipts", "Updated Receipts flag settings");

        backend.set_auth(Ok(AuthStatus::default()));
        let outcome = check_connection(&backend, &mut session).await;

        assert_eq!(outcome, GateOutcome::Disconnected);
        assert_eq!(session.flags.flags(), builtin_flags().as_slice());
        assert!(session.history.is_empty());
        assert!(!session.connection.is_connected);
        assert_eq!(session.connection.user_email, None);
    }

    #[tokio::test]
    async fn test_network_failure_resets_like_disconnect() {
        let backend = FakeBackend::connected("me@example.com");
        let mut session = Session::new(builtin_flags());
        check_connection(&backend, &mut session).await;

        backend.set_auth(Err(ApiError::Network("connection refused".into())));
        let outcome = check_connection(&backend, &mut session).await;

        assert!(matches!(outcome, GateOutcome::Unreachable(_)));
        assert!(!session.connection.is_connected);
        assert_eq!(backend.auth_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connected_without_email_counts_as_disconnected() {
        let backend = FakeBackend::default();
        backend.set_auth(Ok(AuthStatus {
            is_connected: true,
            email: None,
        }));
        let mut session = Session::new(builtin_flags());

        assert_eq!(
            check_connection(&backend, &mut session).await,
            GateOutcome::Disconnected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_success_waits_then_rechecks_once() {
        let backend = FakeBackend::connected("me@example.com");
        let began = tokio::time::Instant::now();

        let result = complete_login(
            &backend,
            AuthRedirect::Success,
            Duration::from_millis(1000),
            &builtin_flags(),
        )
        .await;

        assert!(began.elapsed() >= Duration::from_millis(1000));
        assert_eq!(backend.auth_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            LoginResult::Checked(ConnectionProbe::Connected { .. })
        ));
    }

    #[tokio::test]
    async fn test_login_error_makes_no_request() {
        let backend = FakeBackend::default();

        let result = complete_login(
            &backend,
            AuthRedirect::Error("access_denied".to_string()),
            Duration::from_millis(1000),
            &builtin_flags(),
        )
        .await;

        assert!(matches!(result, LoginResult::Rejected(ref m) if m == "access_denied"));
        assert_eq!(backend.auth_calls.load(Ordering::SeqCst), 0);
    }
}
