//! In-memory activity log, most recent entry first

use chrono::{DateTime, Local};

/// What kind of user-visible event an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Created,
    Edited,
    Reverted,
}

impl HistoryAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Edited => "edited",
            Self::Reverted => "reverted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Millisecond timestamp, unique within a log
    pub id: String,
    pub timestamp: DateTime<Local>,
    pub action: HistoryAction,
    pub flag_name: String,
    pub details: String,
}

/// Append-to-front event list. Not persisted; cleared on session reset.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
    last_id: i64,
}

impl HistoryLog {
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record an event happening now
    pub fn record(
        &mut self,
        action: HistoryAction,
        flag_name: impl Into<String>,
        details: impl Into<String>,
    ) -> &HistoryEntry {
        let timestamp = Local::now();
        // Two events in the same millisecond still get distinct ids
        let id = timestamp.timestamp_millis().max(self.last_id + 1);
        self.last_id = id;

        self.entries.insert(
            0,
            HistoryEntry {
                id: id.to_string(),
                timestamp,
                action,
                flag_name: flag_name.into(),
                details: details.into(),
            },
        );
        &self.entries[0]
    }

    #[cfg(test)]
    pub fn count(&self, action: HistoryAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_recent_first() {
        let mut log = HistoryLog::default();
        log.record(HistoryAction::Edited, "Urgent", "first");
        log.record(HistoryAction::Created, "Email Sorting", "second");

        let details: Vec<_> = log.entries().iter().map(|e| e.details.as_str()).collect();
        assert_eq!(details, vec!["second", "first"]);
        assert!(log.entries()[0].timestamp >= log.entries()[1].timestamp);
    }

    #[test]
    fn test_ids_unique_and_increasing() {
        let mut log = HistoryLog::default();
        for _ in 0..50 {
            log.record(HistoryAction::Edited, "x", "y");
        }
        let ids: Vec<i64> = log
            .entries()
            .iter()
            .map(|e| e.id.parse().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_clear_and_count() {
        let mut log = HistoryLog::default();
        log.record(HistoryAction::Reverted, "All Flags", "");
        log.record(HistoryAction::Created, "Email Sorting", "");
        log.record(HistoryAction::Created, "Email Sorting", "");
        assert_eq!(log.count(HistoryAction::Created), 2);
        log.clear();
        assert!(log.is_empty());
    }
}
