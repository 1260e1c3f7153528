//! Revert of the most recent completed sort
//!
//! A revert removes labels from real mail, so it has to be confirmed:
//! [`Session::prepare_revert`] yields a [`RevertRequest`], and only its
//! [`confirm`](RevertRequest::confirm)ed form can be sent.

use super::{Followup, Session, ValidationError};
use crate::api::{ApiError, Backend, RevertResponse};
use crate::history::HistoryAction;

/// A revert the user has not confirmed yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertRequest {
    email: String,
}

impl RevertRequest {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn prompt(&self) -> String {
        format!(
            "Revert the last sorting session for {}? All labels it applied will be removed.",
            self.email
        )
    }

    pub fn confirm(self) -> ConfirmedRevert {
        ConfirmedRevert { email: self.email }
    }
}

/// A revert the user has confirmed; the only thing [`send_revert`] accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedRevert {
    email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertFailure {
    /// 404: no completed session exists
    NothingToRevert,
    Unauthorized,
    Other(String),
}

impl RevertFailure {
    pub fn classify(error: &ApiError) -> Self {
        let detail = error.detail().unwrap_or_default().to_lowercase();
        match error.status_code() {
            Some(404) if detail.contains("no completed sorting session") => Self::NothingToRevert,
            Some(401) => Self::Unauthorized,
            _ => Self::Other(error.detail().map_or_else(|| error.to_string(), String::from)),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::NothingToRevert => "There is no completed sorting session to revert.".to_string(),
            Self::Unauthorized => {
                "Your Gmail connection has expired. Please reconnect your account.".to_string()
            }
            Self::Other(detail) => format!("Failed to revert email sorting: {}", detail),
        }
    }

    pub fn followup(&self) -> Followup {
        match self {
            Self::Unauthorized => Followup::connection_expired(),
            _ => Followup::Alert(self.message()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertOutcome {
    Reverted { session_id: String, message: String },
    Failed(RevertFailure),
}

impl RevertOutcome {
    pub fn followup(&self) -> Followup {
        match self {
            Self::Reverted { message, .. } => Followup::Alert(message.clone()),
            Self::Failed(failure) => failure.followup(),
        }
    }
}

impl Session {
    /// Check that a revert may be offered to the user
    pub fn prepare_revert(&self) -> Result<RevertRequest, ValidationError> {
        if self.is_processing() {
            return Err(ValidationError::AlreadyRunning);
        }
        let email = self
            .connection
            .email()
            .ok_or(ValidationError::NotConnected)?;
        Ok(RevertRequest {
            email: email.to_string(),
        })
    }

    /// Fold the backend's answer into the session
    pub fn apply_revert(&mut self, result: Result<RevertResponse, RevertFailure>) -> RevertOutcome {
        match result {
            Ok(response) => {
                // The backend only reports the session; assume every flag it
                // used is now off
                self.flags.deactivate_all();
                self.history.record(
                    HistoryAction::Reverted,
                    "All Flags",
                    format!("Reverted labels from sorting session {}", response.session_id),
                );
                let message = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Successfully reverted the last sorting session.".to_string());
                RevertOutcome::Reverted {
                    session_id: response.session_id,
                    message,
                }
            }
            Err(failure) => RevertOutcome::Failed(failure),
        }
    }
}

/// Send a confirmed revert
pub async fn send_revert<B: Backend>(
    backend: &B,
    confirmed: ConfirmedRevert,
) -> Result<RevertResponse, RevertFailure> {
    tracing::info!("Reverting last sorting session for {}", confirmed.email);
    backend.revert(&confirmed.email).await.map_err(|e| {
        tracing::warn!("Revert failed: {}", e);
        RevertFailure::classify(&e)
    })
}

/// Send a confirmed revert and apply the result
pub async fn execute_revert<B: Backend>(
    backend: &B,
    session: &mut Session,
    confirmed: ConfirmedRevert,
) -> RevertOutcome {
    let result = send_revert(backend, confirmed).await;
    session.apply_revert(result)
}
