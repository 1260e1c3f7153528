//! User-defined flags (named email categories) and their synchronization
//!
//! - `store`: the ordered in-memory flag list
//! - `sync`: debounced, best-effort save of the list to the backend

mod store;
mod sync;

pub use store::{FlagEdit, FlagStore};
pub use sync::{FlagSyncHandle, spawn_flag_sync};

use serde::{Deserialize, Serialize};

/// A named category the backend sorts emails into.
///
/// Field names on the wire follow the backend's JSON (`isActive`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Display hint, `#rrggbb`
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub is_active: bool,
}

impl Flag {
    pub fn new(id: &str, name: &str, description: &str, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            color: color.to_string(),
            is_active: false,
        }
    }

    /// True when name or description differ (activation is ignored)
    pub fn content_differs(&self, other: &Flag) -> bool {
        self.name != other.name || self.description != other.description
    }
}

fn default_color() -> String {
    "#000000".to_string()
}

/// Built-in flag set used when the config does not define one.
pub fn builtin_flags() -> Vec<Flag> {
    vec![
        Flag::new("1", "Urgent", "High priority emails", "#ef4444"),
        Flag::new("2", "Important", "Important business emails", "#f59e0b"),
        Flag::new("3", "Follow-up", "Emails requiring follow-up", "#3b82f6"),
        Flag::new("4", "Archive", "Emails to archive", "#6b7280"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wire_format_uses_camel_case() {
        let flag = Flag {
            is_active: true,
            ..Flag::new("urgent", "Urgent", "High priority", "#ef4444")
        };
        let json = serde_json::to_value(&flag).unwrap();
        assert_eq!(json["isActive"], true);
        assert_eq!(json["name"], "Urgent");
        assert!(json.get("is_active").is_none());
    }

    #[test]
    fn test_flag_missing_optional_fields() {
        let flag: Flag = serde_json::from_str(r#"{"id":"x","name":"X"}"#).unwrap();
        assert_eq!(flag.description, "");
        assert_eq!(flag.color, "#000000");
        assert!(!flag.is_active);
    }

    #[test]
    fn test_content_differs_ignores_activation() {
        let a = Flag::new("1", "Urgent", "High priority emails", "#ef4444");
        let mut b = a.clone();
        b.is_active = true;
        assert!(!a.content_differs(&b));
        b.description = "Fires".to_string();
        assert!(a.content_differs(&b));
    }
}
