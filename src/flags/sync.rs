//! Debounced background save of the flag list
//!
//! Every edit replaces the pending snapshot and restarts the timer, so at most
//! one save is pending per burst of edits and the last write wins. Saves are
//! best effort: failures are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::Flag;
use crate::api::Backend;

/// Commands accepted by the sync actor
#[derive(Debug)]
enum SyncCommand {
    Save { email: String, flags: Vec<Flag> },
    /// Drop the pending save, if any
    Discard,
}

/// Handle for scheduling flag saves
pub struct FlagSyncHandle {
    cmd_tx: mpsc::Sender<SyncCommand>,
    cancel: CancellationToken,
}

impl FlagSyncHandle {
    /// Schedule a save of `flags`, replacing any save still pending
    pub fn schedule(&self, email: &str, flags: &[Flag]) {
        let cmd = SyncCommand::Save {
            email: email.to_string(),
            flags: flags.to_vec(),
        };
        if let Err(e) = self.cmd_tx.try_send(cmd) {
            tracing::warn!("Flag sync: could not schedule save: {}", e);
        }
    }

    /// Forget a save that has not been sent yet
    pub fn discard(&self) {
        if let Err(e) = self.cmd_tx.try_send(SyncCommand::Discard) {
            tracing::warn!("Flag sync: could not discard pending save: {}", e);
        }
    }

    /// Stop the actor; a pending save is discarded
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for FlagSyncHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawn the flag sync actor task
pub fn spawn_flag_sync<B: Backend>(backend: Arc<B>, debounce: Duration) -> FlagSyncHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();

    tokio::spawn(flag_sync_loop(backend, debounce, cmd_rx, cancel.clone()));

    FlagSyncHandle { cmd_tx, cancel }
}

async fn flag_sync_loop<B: Backend>(
    backend: Arc<B>,
    debounce: Duration,
    mut cmd_rx: mpsc::Receiver<SyncCommand>,
    cancel: CancellationToken,
) {
    let mut pending: Option<(String, Vec<Flag>)> = None;
    let mut deadline = Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            cmd = cmd_rx.recv() => match cmd {
                Some(SyncCommand::Save { email, flags }) => {
                    pending = Some((email, flags));
                    deadline = Instant::now() + debounce;
                }
                Some(SyncCommand::Discard) => {
                    if let Some((email, _)) = pending.take() {
                        tracing::debug!("Discarded pending flag save for {}", email);
                    }
                }
                None => break,
            },

            _ = tokio::time::sleep_until(deadline), if pending.is_some() => {
                let Some((email, flags)) = pending.take() else {
                    continue;
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = backend.save_flags(&email, &flags) => match result {
                        Ok(()) => tracing::debug!("Saved {} flags for {}", flags.len(), email),
                        Err(e) => tracing::warn!("Failed to save flags for {}: {}", email, e),
                    },
                }
            }
        }
    }

    if pending.is_some() {
        tracing::debug!("Flag sync stopped with an unsaved change");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::api::fake::FakeBackend;
    use crate::flags::builtin_flags;
    use tokio::time::sleep;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_saves_once_with_last_snapshot() {
        let backend = Arc::new(FakeBackend::connected("me@example.com"));
        let sync = spawn_flag_sync(Arc::clone(&backend), ms(1000));

        let mut flags = builtin_flags();
        sync.schedule("me@example.com", &flags);
        sleep(ms(500)).await;
        flags[0].is_active = true;
        sync.schedule("me@example.com", &flags);
        sleep(ms(500)).await;
        flags[1].is_active = true;
        sync.schedule("me@example.com", &flags);

        sleep(ms(999)).await;
        assert!(backend.saves().is_empty());

        sleep(ms(10)).await;
        let saves = backend.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].0, "me@example.com");
        assert_eq!(saves[0].1, flags);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_is_dropped_and_sync_continues() {
        let backend = Arc::new(FakeBackend::connected("me@example.com"));
        *backend.save_result.lock().unwrap() = Err(ApiError::status(500, "db down"));
        let sync = spawn_flag_sync(Arc::clone(&backend), ms(1000));

        sync.schedule("me@example.com", &builtin_flags());
        sleep(ms(1100)).await;
        sync.schedule("me@example.com", &builtin_flags());
        sleep(ms(1100)).await;

        assert_eq!(backend.saves().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_drops_pending_save_only() {
        let backend = Arc::new(FakeBackend::connected("me@example.com"));
        let sync = spawn_flag_sync(Arc::clone(&backend), ms(1000));

        sync.schedule("me@example.com", &builtin_flags());
        sleep(ms(100)).await;
        sync.discard();
        sleep(ms(2000)).await;
        assert!(backend.saves().is_empty());

        sync.schedule("other@example.com", &builtin_flags());
        sleep(ms(1100)).await;
        let saves = backend.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].0, "other@example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_pending_save() {
        let backend = Arc::new(FakeBackend::connected("me@example.com"));
        let sync = spawn_flag_sync(Arc::clone(&backend), ms(1000));

        sync.schedule("me@example.com", &builtin_flags());
        sleep(ms(100)).await;
        sync.shutdown();
        sleep(ms(2000)).await;

        assert!(backend.saves().is_empty());
    }
}
