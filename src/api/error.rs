use thiserror::Error;

/// Failure of a single backend request
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Request never produced a response (connect error, timeout, ...)
    #[error("network error: {0}")]
    Network(String),
    /// Backend answered with a non-success status
    #[error("backend returned {status}: {detail}")]
    Status { status: u16, detail: String },
    /// Response body did not match the expected shape
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(status: u16, detail: impl Into<String>) -> Self {
        Self::Status {
            status,
            detail: detail.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Backend-provided detail text, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } if !detail.is_empty() => Some(detail),
            _ => None,
        }
    }

    /// 401: the mailbox connection must be re-established by the user
    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Extract the `detail` field of a FastAPI style error body, falling back to
/// the raw text.
pub(crate) fn error_detail(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        detail: Option<serde_json::Value>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Some(serde_json::Value::String(s)),
        }) => s,
        Ok(ErrorBody {
            detail: Some(other),
        }) => other.to_string(),
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_from_fastapi_body() {
        assert_eq!(
            error_detail(r#"{"detail":"Gmail connection invalid"}"#),
            "Gmail connection invalid"
        );
    }

    #[test]
    fn test_error_detail_falls_back_to_text() {
        assert_eq!(error_detail("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_detail(r#"{"message":"x"}"#), r#"{"message":"x"}"#);
    }

    #[test]
    fn test_classification() {
        assert!(ApiError::status(401, "").is_unauthorized());
        assert!(!ApiError::status(403, "").is_unauthorized());
        assert!(!ApiError::Network("refused".into()).is_unauthorized());
        assert_eq!(ApiError::status(400, "bad").detail(), Some("bad"));
        assert_eq!(ApiError::status(400, "").detail(), None);
    }
}
