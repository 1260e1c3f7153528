//! Request and response bodies of the backend HTTP API

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::flags::Flag;

/// `GET /auth/status`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthStatus {
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default)]
    pub email: Option<String>,
}

/// `GET /flags/load/{email}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlagsResponse {
    #[serde(default)]
    pub flags: Vec<Flag>,
}

/// `POST /flags/save`
#[derive(Debug, Serialize)]
pub struct SaveFlagsRequest<'a> {
    pub email: &'a str,
    pub flags: &'a [Flag],
}

/// `POST /sorting/start`
#[derive(Debug, Serialize)]
pub struct StartSortRequest<'a> {
    pub email: &'a str,
    pub active_flags: &'a [String],
}

/// `GET /sorting/status/{email}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SortStatus {
    #[serde(default)]
    pub is_processing: bool,
    #[serde(default)]
    pub total_emails: Option<u64>,
    #[serde(default)]
    pub processed_emails: Option<u64>,
    #[serde(default)]
    pub progress_percentage: Option<f64>,
    #[serde(default)]
    pub last_session: Option<SortSession>,
}

/// Lifecycle status of a remote sort session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// One execution of a sort, as recorded by the backend
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SortSession {
    pub session_id: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default, deserialize_with = "nullable_count")]
    pub total_emails: u64,
    #[serde(default, deserialize_with = "nullable_count")]
    pub processed_emails: u64,
    #[serde(default, deserialize_with = "flag_names")]
    pub flags_used: Vec<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl SortSession {
    /// Wall-clock duration in whole seconds, `None` while still running
    pub fn duration_secs(&self) -> Option<i64> {
        let start = parse_timestamp(self.start_time.as_deref()?)?;
        let end = parse_timestamp(self.end_time.as_deref()?)?;
        Some((end - start).num_seconds())
    }

    /// Human readable duration as shown in the details popup
    pub fn duration_label(&self) -> String {
        match self.duration_secs() {
            Some(secs) => format!("{}s", secs),
            None => "Running...".to_string(),
        }
    }
}

/// `POST /sorting/revert/{email}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevertResponse {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /sorting/history/{email}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<SortSession>,
}

/// `GET /sorting/session/{id}/details`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionDetails {
    #[serde(default, alias = "details")]
    pub processing_log: Vec<ProcessingLogEntry>,
}

/// What the backend did with one email during a session
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessingLogEntry {
    #[serde(default)]
    pub email_subject: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assigned_label: Option<String>,
    #[serde(default)]
    pub error_details: Option<String>,
}

impl ProcessingLogEntry {
    pub fn subject(&self) -> &str {
        match self.email_subject.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => "No Subject",
        }
    }

    pub fn label(&self) -> &str {
        self.assigned_label.as_deref().unwrap_or("Unassigned")
    }
}

/// Parse the timestamps the backend emits (RFC 3339 from Postgres,
/// `YYYY-MM-DD HH:MM:SS[.f]` from SQLite).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn nullable_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// `flags_used` is a JSON array, a JSON-encoded array stored as text, or null
fn flag_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::List(names)) => names,
        Some(Raw::Text(text)) => serde_json::from_str(&text).unwrap_or_else(|_| {
            text.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        }),
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_with_last_session() {
        let json = r#"{
            "is_processing": false,
            "total_emails": 10,
            "processed_emails": 7,
            "progress_percentage": 70.0,
            "last_session": {
                "session_id": "abc",
                "start_time": "2025-06-01 10:00:00",
                "end_time": "2025-06-01 10:00:42",
                "status": "completed",
                "total_emails": 10,
                "processed_emails": 7,
                "flags_used": ["Urgent", "Archive"],
                "error_message": null
            }
        }"#;
        let status: SortStatus = serde_json::from_str(json).unwrap();
        assert!(!status.is_processing);
        let session = status.last_session.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.flags_used, vec!["Urgent", "Archive"]);
        assert_eq!(session.duration_secs(), Some(42));
    }

    #[test]
    fn test_session_tolerates_backend_quirks() {
        let json = r#"{
            "session_id": "s1",
            "start_time": "2025-06-01T10:00:00Z",
            "status": "reverting",
            "total_emails": null,
            "processed_emails": 3,
            "flags_used": "[\"Urgent\"]"
        }"#;
        let session: SortSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.status, SessionStatus::Unknown);
        assert_eq!(session.total_emails, 0);
        assert_eq!(session.flags_used, vec!["Urgent"]);
        assert_eq!(session.duration_label(), "Running...");
    }

    #[test]
    fn test_session_details_accepts_details_key() {
        let json = r#"{"details": [{"email_subject": "", "status": "skipped"}]}"#;
        let details: SessionDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.processing_log.len(), 1);
        assert_eq!(details.processing_log[0].subject(), "No Subject");
        assert_eq!(details.processing_log[0].label(), "Unassigned");
    }

    #[test]
    fn test_start_request_shape() {
        let names = vec!["Urgent".to_string()];
        let body = serde_json::to_value(StartSortRequest {
            email: "me@example.com",
            active_flags: &names,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"email": "me@example.com", "active_flags": ["Urgent"]})
        );
    }
}
