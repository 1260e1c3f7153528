//! Application core - owns the session and coordinates background work
//!
//! The event loop is the only place the [`Session`](crate::session::Session)
//! is mutated. Network work runs in spawned tasks that report back over
//! channels: sort progress through the poller's [`SortEvent`]s, everything
//! else through [`AppEvent`]s.

mod actions;
mod event_loop;
pub mod render_thread;
pub mod state;

use anyhow::Result;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use render_thread::RenderThread;

use crate::api::{ApiError, Backend, RevertResponse, SessionDetails, SortSession};
use crate::config::Config;
use crate::flags::{FlagSyncHandle, spawn_flag_sync};
use crate::input::KeyBindings;
use crate::session::{ConnectionProbe, LoginResult, RevertFailure, Session, SortEvent, SortTask};
use state::AppState;

/// Why a connection check was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckReason {
    Startup,
    Refresh,
    /// The backend answered 401; the user was asked to reconnect
    Reconnect,
}

/// Results of background requests, delivered to the event loop
#[derive(Debug)]
pub enum AppEvent {
    Checked {
        probe: ConnectionProbe,
        reason: CheckReason,
    },
    Login(Result<LoginResult, String>),
    HistoryLoaded(Result<Vec<SortSession>, ApiError>),
    DetailsLoaded {
        session_id: String,
        result: Result<SessionDetails, ApiError>,
    },
    Reverted(Result<RevertResponse, RevertFailure>),
    LoggedOut(Result<(), ApiError>),
}

pub struct App<B: Backend> {
    pub(crate) config: Config,
    pub(crate) backend: Arc<B>,
    pub(crate) state: AppState,
    pub(crate) bindings: KeyBindings,
    pub(crate) flag_sync: FlagSyncHandle,
    /// Running sort poller and its event stream
    pub(crate) sort: Option<(SortTask, mpsc::Receiver<SortEvent>)>,
    pub(crate) event_tx: mpsc::Sender<AppEvent>,
    pub(crate) event_rx: mpsc::Receiver<AppEvent>,
    /// Cancels every one-shot background request on shutdown
    pub(crate) cancel: CancellationToken,
    /// Dirty flag: when true, UI needs re-render. Skips renders when nothing changed.
    pub(crate) dirty: bool,
}

impl<B: Backend> App<B> {
    pub fn new(config: Config, backend: Arc<B>) -> Self {
        let session = Session::new(config.flags.clone());
        let state = AppState::new(session, config.ui.theme);
        let flag_sync = spawn_flag_sync(Arc::clone(&backend), config.sync.save_debounce());
        let (event_tx, event_rx) = mpsc::channel(64);

        Self {
            config,
            backend,
            state,
            bindings: KeyBindings::new(),
            flag_sync,
            sort: None,
            event_tx,
            event_rx,
            cancel: CancellationToken::new(),
            dirty: true, // Start dirty for initial render
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Spawn background render thread (owns terminal setup/teardown)
        let render_thread = RenderThread::spawn()?;

        self.check_connection(CheckReason::Startup);

        let result = self.event_loop(&render_thread).await;

        render_thread.shutdown();
        self.shutdown().await;

        result
    }

    /// Stop every background task. Unsaved flag edits are discarded.
    pub(crate) async fn shutdown(&mut self) {
        self.flag_sync.shutdown();
        self.cancel.cancel();
        if let Some((task, _)) = self.sort.take() {
            task.cancel();
            let exit = task.join().await;
            tracing::debug!("Sort poller stopped: {:?}", exit);
        }
    }

    /// Run a request in the background and deliver its result as an event
    pub(crate) fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.event_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                event = request => {
                    if tx.send(event).await.is_err() {
                        tracing::debug!("App event receiver dropped");
                    }
                }
            }
        });
    }

    /// Drop the sort poller, if any; the task is cancelled with it
    pub(crate) fn stop_sort(&mut self) {
        if let Some((task, _)) = self.sort.take() {
            task.cancel();
        }
    }
}
