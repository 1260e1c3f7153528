//! Sort session poller
//!
//! Starts a sort on the backend and polls its status until it finishes. The
//! backend only offers a cheap status endpoint, so the client pulls: one
//! request at a time, the next tick scheduled only after the previous
//! response. Failed checks back off and are retried up to a fixed budget.
//!
//! The loop runs in its own task and reports through [`SortEvent`]s; it never
//! touches the session directly. Cancelling the task's token stops pending
//! timers and drops any request in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Followup, SortRequest, SortingProgress};
use crate::api::{ApiError, Backend, SessionStatus, SortSession};
use crate::constants::{MAX_POLL_RETRIES, POLL_INTERVAL_MS, POLL_RETRY_DELAY_MS};

/// Poll scheduling parameters
#[derive(Debug, Clone)]
pub struct PollTiming {
    /// Delay between successful checks
    pub interval: Duration,
    /// Delay after a failed check
    pub retry_delay: Duration,
    /// Consecutive failures that end polling
    pub max_retries: u32,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(POLL_INTERVAL_MS),
            retry_delay: Duration::from_millis(POLL_RETRY_DELAY_MS),
            max_retries: MAX_POLL_RETRIES,
        }
    }
}

/// What the poller reports back to the event loop
#[derive(Debug, Clone)]
pub enum SortEvent {
    /// Backend accepted the start request
    Started,
    Progress(SortingProgress),
    /// A status check failed and will be retried
    Retrying { attempt: u32, error: String },
    Finished(SortOutcome),
    StartRejected(StartFailure),
    /// 401 while polling
    Unauthorized,
    /// Retry budget exhausted
    LostConnection,
}

/// Final result of a sort, read from the backend's last session summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    Completed { processed: u64, total: u64 },
    Failed { error: Option<String> },
    /// Processing stopped but no usable session summary came back
    Unconfirmed,
}

impl SortOutcome {
    pub fn from_session(session: Option<&SortSession>) -> Self {
        match session {
            Some(s) if s.status == SessionStatus::Completed => Self::Completed {
                processed: s.processed_emails,
                total: s.total_emails,
            },
            Some(s) if s.status == SessionStatus::Failed => Self::Failed {
                error: s.error_message.clone().filter(|e| !e.is_empty()),
            },
            _ => Self::Unconfirmed,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    pub fn message(&self) -> String {
        match self {
            Self::Completed { processed, total } => format!(
                "Successfully sorted {}/{} emails into categories!",
                processed, total
            ),
            Self::Failed { error: Some(error) } => format!("Sorting failed: {}", error),
            Self::Failed { error: None } => "Sorting failed. Please try again.".to_string(),
            Self::Unconfirmed => {
                "Sorting finished. Check your sorting history for details.".to_string()
            }
        }
    }
}

/// Why the backend refused to start a sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartFailure {
    /// 401: the mailbox connection needs to be re-established
    Unauthorized,
    /// 400: bad input, shown verbatim
    InvalidRequest(String),
    /// 500: transient server problem
    Server,
    Other(String),
}

impl StartFailure {
    pub fn classify(error: &ApiError) -> Self {
        match error.status_code() {
            Some(401) => Self::Unauthorized,
            Some(400) => Self::InvalidRequest(error.detail().unwrap_or("bad request").to_string()),
            Some(500) => Self::Server,
            _ => Self::Other(error.detail().map_or_else(|| error.to_string(), String::from)),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized => {
                "Your Gmail connection has expired. Please reconnect your account.".to_string()
            }
            Self::InvalidRequest(detail) => format!(
                "Invalid sort configuration: {}. Please re-select your flags and try again.",
                detail
            ),
            Self::Server => "The server ran into a temporary problem. Please try again in a moment."
                .to_string(),
            Self::Other(detail) => format!("Failed to start email sorting: {}", detail),
        }
    }

    pub fn followup(&self) -> Followup {
        match self {
            Self::Unauthorized => Followup::Reconnect(self.message()),
            _ => Followup::Alert(self.message()),
        }
    }
}

/// Outcome of recording a failed status check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the retry delay; `attempt` counts consecutive failures
    Retry { attempt: u32 },
    GiveUp,
}

/// Consecutive-failure counter for the poll loop
#[derive(Debug, Clone)]
pub struct PollTracker {
    failures: u32,
    budget: u32,
}

impl PollTracker {
    pub fn new(budget: u32) -> Self {
        Self {
            failures: 0,
            budget: budget.max(1),
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
    }

    pub fn record_failure(&mut self) -> RetryDecision {
        self.failures += 1;
        if self.failures >= self.budget {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry {
                attempt: self.failures,
            }
        }
    }
}

/// How the poll loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    Rejected,
    Finished,
    Unauthorized,
    LostConnection,
    Cancelled,
}

/// Handle to a running sort task
pub struct SortTask {
    cancel: CancellationToken,
    handle: Option<JoinHandle<PollExit>>,
}

impl SortTask {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the task to end and report how it ended
    pub async fn join(mut self) -> PollExit {
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or(PollExit::Cancelled),
            None => PollExit::Cancelled,
        }
    }
}

impl Drop for SortTask {
    fn drop(&mut self) {
        // The poller never outlives its owner
        self.cancel.cancel();
    }
}

/// Spawn the start-and-poll loop for one sort run
pub fn spawn_sort<B: Backend>(
    backend: Arc<B>,
    request: SortRequest,
    timing: PollTiming,
    events: mpsc::Sender<SortEvent>,
) -> SortTask {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let handle = tokio::spawn(async move {
        let exit = run_sort(backend.as_ref(), &request, &timing, &events, &token).await;
        tracing::info!("Sort poller for {} ended: {:?}", request.email, exit);
        exit
    });

    SortTask {
        cancel,
        handle: Some(handle),
    }
}

/// Start a sort and poll it to completion
pub async fn run_sort<B: Backend>(
    backend: &B,
    request: &SortRequest,
    timing: &PollTiming,
    events: &mpsc::Sender<SortEvent>,
    cancel: &CancellationToken,
) -> PollExit {
    let started = tokio::select! {
        _ = cancel.cancelled() => return PollExit::Cancelled,
        result = backend.start_sort(&request.email, &request.active_flags) => result,
    };

    if let Err(e) = started {
        tracing::warn!("Failed to start sorting: {}", e);
        let failure = StartFailure::classify(&e);
        emit(events, SortEvent::StartRejected(failure)).await;
        return PollExit::Rejected;
    }

    tracing::info!(
        "Sorting started for {} with flags {:?}",
        request.email,
        request.active_flags
    );
    if !emit(events, SortEvent::Started).await {
        return PollExit::Cancelled;
    }

    let mut tracker = PollTracker::new(timing.max_retries);
    let mut delay = timing.interval;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return PollExit::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return PollExit::Cancelled,
            result = backend.sort_status(&request.email) => result,
        };

        let event = match result {
            Ok(status) => {
                tracker.record_success();
                if status.is_processing {
                    delay = timing.interval;
                    SortEvent::Progress(SortingProgress::from_status(&status))
                } else {
                    let outcome = SortOutcome::from_session(status.last_session.as_ref());
                    tracing::info!("Sorting finished: {:?}", outcome);
                    emit(events, SortEvent::Finished(outcome)).await;
                    return PollExit::Finished;
                }
            }
            Err(e) if e.is_unauthorized() => {
                tracing::warn!("Status check unauthorized, stopping poll");
                emit(events, SortEvent::Unauthorized).await;
                return PollExit::Unauthorized;
            }
            Err(e) => match tracker.record_failure() {
                RetryDecision::Retry { attempt } => {
                    tracing::warn!(
                        "Status check failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt,
                        timing.max_retries,
                        e,
                        timing.retry_delay
                    );
                    delay = timing.retry_delay;
                    SortEvent::Retrying {
                        attempt,
                        error: e.to_string(),
                    }
                }
                RetryDecision::GiveUp => {
                    tracing::error!(
                        "Status check failed {} times in a row, giving up: {}",
                        tracker.failures(),
                        e
                    );
                    emit(events, SortEvent::LostConnection).await;
                    return PollExit::LostConnection;
                }
            },
        };

        if !emit(events, event).await {
            return PollExit::Cancelled;
        }
    }
}

/// Send an event; false once the receiver is gone
async fn emit(events: &mpsc::Sender<SortEvent>, event: SortEvent) -> bool {
    if events.send(event).await.is_err() {
        tracing::warn!("Sort poller: event receiver dropped");
        return false;
    }
    true
}
