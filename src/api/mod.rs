//! Backend HTTP API
//!
//! Everything the client knows about the remote service goes through the
//! [`Backend`] trait. [`HttpBackend`] talks to the real server; tests use a
//! scripted fake.

mod client;
mod error;
#[cfg(test)]
pub mod fake;
pub mod types;

pub use client::HttpBackend;
pub use error::ApiError;
pub use types::{
    AuthStatus, ProcessingLogEntry, RevertResponse, SessionDetails, SessionStatus, SortSession,
    SortStatus,
};

use std::future::Future;

use crate::flags::Flag;

pub type ApiResult<T> = Result<T, ApiError>;

/// The remote email-flagging service.
///
/// Futures are `Send` so implementations can be driven from spawned tasks.
pub trait Backend: Send + Sync + 'static {
    /// Page the user opens in a browser to connect their mailbox
    fn login_url(&self) -> String;

    fn auth_status(&self) -> impl Future<Output = ApiResult<AuthStatus>> + Send;

    fn logout(&self) -> impl Future<Output = ApiResult<()>> + Send;

    fn load_flags(&self, email: &str) -> impl Future<Output = ApiResult<Vec<Flag>>> + Send;

    fn save_flags(&self, email: &str, flags: &[Flag])
    -> impl Future<Output = ApiResult<()>> + Send;

    fn start_sort(
        &self,
        email: &str,
        active_flags: &[String],
    ) -> impl Future<Output = ApiResult<()>> + Send;

    fn sort_status(&self, email: &str) -> impl Future<Output = ApiResult<SortStatus>> + Send;

    fn revert(&self, email: &str) -> impl Future<Output = ApiResult<RevertResponse>> + Send;

    fn sort_history(&self, email: &str)
    -> impl Future<Output = ApiResult<Vec<SortSession>>> + Send;

    fn session_details(
        &self,
        session_id: &str,
    ) -> impl Future<Output = ApiResult<SessionDetails>> + Send;
}
