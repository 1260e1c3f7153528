//! Scripted in-memory backend for tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{
    ApiError, ApiResult, AuthStatus, Backend, RevertResponse, SessionDetails, SortSession,
    SortStatus,
};
use crate::flags::Flag;

pub struct FakeBackend {
    pub auth: Mutex<ApiResult<AuthStatus>>,
    pub flags: Mutex<ApiResult<Vec<Flag>>>,
    pub start: Mutex<ApiResult<()>>,
    pub statuses: Mutex<VecDeque<ApiResult<SortStatus>>>,
    pub revert: Mutex<ApiResult<RevertResponse>>,
    pub history: Mutex<ApiResult<Vec<SortSession>>>,
    pub details: Mutex<ApiResult<SessionDetails>>,
    pub save_result: Mutex<ApiResult<()>>,
    /// Simulated latency of a status request
    pub status_latency: Duration,

    pub saves: Mutex<Vec<(String, Vec<Flag>)>>,
    pub started: Mutex<Vec<Vec<String>>>,
    pub auth_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub revert_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            auth: Mutex::new(Ok(AuthStatus::default())),
            flags: Mutex::new(Ok(Vec::new())),
            start: Mutex::new(Ok(())),
            statuses: Mutex::new(VecDeque::new()),
            revert: Mutex::new(Ok(RevertResponse::default())),
            history: Mutex::new(Ok(Vec::new())),
            details: Mutex::new(Ok(SessionDetails::default())),
            save_result: Mutex::new(Ok(())),
            status_latency: Duration::from_millis(100),
            saves: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
            auth_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            revert_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl FakeBackend {
    pub fn connected(email: &str) -> Self {
        let fake = Self::default();
        *fake.auth.lock().unwrap() = Ok(AuthStatus {
            is_connected: true,
            email: Some(email.to_string()),
        });
        fake
    }

    pub fn with_statuses(self, statuses: Vec<ApiResult<SortStatus>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn set_auth(&self, auth: ApiResult<AuthStatus>) {
        *self.auth.lock().unwrap() = auth;
    }

    pub fn saves(&self) -> Vec<(String, Vec<Flag>)> {
        self.saves.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

/// Status response for a sort still in progress
pub fn processing(total: u64, processed: u64) -> ApiResult<SortStatus> {
    let pct = if total == 0 {
        0.0
    } else {
        processed as f64 * 100.0 / total as f64
    };
    Ok(SortStatus {
        is_processing: true,
        total_emails: Some(total),
        processed_emails: Some(processed),
        progress_percentage: Some(pct),
        last_session: None,
    })
}

/// Status response for a finished sort
pub fn finished(session: SortSession) -> ApiResult<SortStatus> {
    Ok(SortStatus {
        is_processing: false,
        total_emails: Some(session.total_emails),
        processed_emails: Some(session.processed_emails),
        progress_percentage: Some(100.0),
        last_session: Some(session),
    })
}

impl Backend for FakeBackend {
    fn login_url(&self) -> String {
        "http://backend.test/auth/login".to_string()
    }

    async fn auth_status(&self) -> ApiResult<AuthStatus> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        self.auth.lock().unwrap().clone()
    }

    async fn logout(&self) -> ApiResult<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_flags(&self, _email: &str) -> ApiResult<Vec<Flag>> {
        self.flags.lock().unwrap().clone()
    }

    async fn save_flags(&self, email: &str, flags: &[Flag]) -> ApiResult<()> {
        self.saves
            .lock()
            .unwrap()
            .push((email.to_string(), flags.to_vec()));
        self.save_result.lock().unwrap().clone()
    }

    async fn start_sort(&self, _email: &str, active_flags: &[String]) -> ApiResult<()> {
        self.started.lock().unwrap().push(active_flags.to_vec());
        self.start.lock().unwrap().clone()
    }

    async fn sort_status(&self, _email: &str) -> ApiResult<SortStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.status_latency).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ApiError::Network("no scripted status".into())))
    }

    async fn revert(&self, _email: &str) -> ApiResult<RevertResponse> {
        self.revert_calls.fetch_add(1, Ordering::SeqCst);
        self.revert.lock().unwrap().clone()
    }

    async fn sort_history(&self, _email: &str) -> ApiResult<Vec<SortSession>> {
        self.history.lock().unwrap().clone()
    }

    async fn session_details(&self, _session_id: &str) -> ApiResult<SessionDetails> {
        self.details.lock().unwrap().clone()
    }
}
