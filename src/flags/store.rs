//! Ordered in-memory flag list

use super::Flag;

/// Result of applying an update to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagEdit {
    /// Name or description changed (activation may also have changed)
    Edited,
    /// Only `is_active` changed
    Toggled,
    /// Only the display color changed
    Restyled,
    /// Identical to the stored flag
    Unchanged,
    /// No flag with that id exists; the store was not touched
    Unknown,
}

impl FlagEdit {
    /// Whether the store content changed and needs to be synced
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Edited | Self::Toggled | Self::Restyled)
    }
}

/// Flag list owned by the session. Length and order never change through
/// `update`/`toggle`; only `replace_all` swaps the whole list.
#[derive(Debug, Clone, Default)]
pub struct FlagStore {
    flags: Vec<Flag>,
}

impl FlagStore {
    pub fn new(flags: Vec<Flag>) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Flag> {
        self.flags.iter().find(|f| f.id == id)
    }

    /// Replace the flag with the same id in place.
    pub fn update(&mut self, updated: Flag) -> FlagEdit {
        let Some(slot) = self.flags.iter_mut().find(|f| f.id == updated.id) else {
            return FlagEdit::Unknown;
        };

        let edit = if slot.content_differs(&updated) {
            FlagEdit::Edited
        } else if slot.is_active != updated.is_active {
            FlagEdit::Toggled
        } else if slot.color != updated.color {
            FlagEdit::Restyled
        } else {
            FlagEdit::Unchanged
        };

        *slot = updated;
        edit
    }

    /// Flip `is_active` for one flag
    pub fn toggle(&mut self, id: &str) -> FlagEdit {
        match self.get(id).cloned() {
            Some(mut flag) => {
                flag.is_active = !flag.is_active;
                self.update(flag)
            }
            None => FlagEdit::Unknown,
        }
    }

    pub fn deactivate_all(&mut self) {
        for flag in &mut self.flags {
            flag.is_active = false;
        }
    }

    pub fn replace_all(&mut self, flags: Vec<Flag>) {
        self.flags = flags;
    }

    pub fn active(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter().filter(|f| f.is_active)
    }

    /// Names of the active flags, in list order
    pub fn active_names(&self) -> Vec<String> {
        self.active().map(|f| f.name.clone()).collect()
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::builtin_flags;

    fn ids(store: &FlagStore) -> Vec<String> {
        store.flags().iter().map(|f| f.id.clone()).collect()
    }

    #[test]
    fn test_edits_preserve_length_and_order() {
        let mut store = FlagStore::new(builtin_flags());
        let before = ids(&store);

        store.toggle("3");
        let mut renamed = store.get("1").cloned().unwrap();
        renamed.name = "Critical".to_string();
        store.update(renamed);
        let mut described = store.get("4").cloned().unwrap();
        described.description = "Old stuff".to_string();
        described.is_active = true;
        store.update(described);
        store.toggle("3");

        assert_eq!(store.len(), 4);
        assert_eq!(ids(&store), before);
        assert_eq!(store.get("1").unwrap().name, "Critical");
    }

    #[test]
    fn test_update_classifies_change() {
        let mut store = FlagStore::new(builtin_flags());

        let mut flag = store.get("2").cloned().unwrap();
        flag.is_active = true;
        assert_eq!(store.update(flag.clone()), FlagEdit::Toggled);
        assert_eq!(store.update(flag.clone()), FlagEdit::Unchanged);

        flag.name = "VIP".to_string();
        assert_eq!(store.update(flag), FlagEdit::Edited);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut store = FlagStore::new(builtin_flags());
        let stray = Flag::new("99", "Ghost", "", "#000000");
        assert_eq!(store.update(stray), FlagEdit::Unknown);
        assert_eq!(store.len(), 4);
        assert!(store.get("99").is_none());
    }

    #[test]
    fn test_active_names_and_deactivate_all() {
        let mut store = FlagStore::new(builtin_flags());
        store.toggle("1");
        store.toggle("3");
        assert_eq!(store.active_names(), vec!["Urgent", "Follow-up"]);

        store.deactivate_all();
        assert_eq!(store.active_count(), 0);
        assert_eq!(store.len(), 4);
    }
}
