use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Navigation
    Up,
    Down,
    FocusNext,

    // Flags
    Toggle,
    Edit,

    // Sorting
    Sort,
    Revert,

    // Connection
    Connect,
    Disconnect,
    Refresh,

    // Modals
    Open,
    Confirm,
    NextField,
    Back,

    ToggleTheme,
    Help,
    Quit,
}

pub struct KeyBindings {
    bindings: HashMap<KeyEvent, Action>,
}

/// A displayable keybinding entry
#[derive(Debug, Clone)]
pub struct KeybindingEntry {
    pub key: String,
    pub description: String,
    pub category: &'static str,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self {
            bindings: Self::default_bindings(),
        }
    }

    pub fn get(&self, event: &KeyEvent) -> Option<Action> {
        self.bindings.get(event).copied()
    }

    /// All keybindings as displayable entries grouped by category
    pub fn all_bindings(&self) -> Vec<KeybindingEntry> {
        let mut entries: Vec<_> = self
            .bindings
            .iter()
            .map(|(event, action)| KeybindingEntry {
                key: format_key_event(event),
                description: action_description(action).to_string(),
                category: action_category(action),
            })
            .collect();

        entries.sort_by(|a, b| {
            category_order(a.category)
                .cmp(&category_order(b.category))
                .then_with(|| a.description.cmp(&b.description))
                .then_with(|| a.key.cmp(&b.key))
        });
        entries
    }

    fn default_bindings() -> HashMap<KeyEvent, Action> {
        let mut map = HashMap::new();

        // Navigation (vim keys and arrows both work)
        map.insert(key('j'), Action::Down);
        map.insert(key('k'), Action::Up);
        map.insert(key_code(KeyCode::Down), Action::Down);
        map.insert(key_code(KeyCode::Up), Action::Up);
        map.insert(key_code(KeyCode::Tab), Action::FocusNext);

        // Flags
        map.insert(key(' '), Action::Toggle);
        map.insert(key('e'), Action::Edit);

        // Sorting
        map.insert(key('s'), Action::Sort);
        map.insert(shift_key('R'), Action::Revert);

        // Connection
        map.insert(key('c'), Action::Connect);
        map.insert(shift_key('D'), Action::Disconnect);
        map.insert(key('r'), Action::Refresh);
        map.insert(ctrl_key('r'), Action::Refresh);

        map.insert(key_code(KeyCode::Enter), Action::Open);
        map.insert(key_code(KeyCode::Esc), Action::Back);
        map.insert(key('t'), Action::ToggleTheme);
        map.insert(key('?'), Action::Help);
        map.insert(key('q'), Action::Quit);
        map.insert(ctrl_key('c'), Action::Quit);

        map
    }
}

fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
}

fn shift_key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::SHIFT)
}

fn ctrl_key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

fn key_code(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

/// Format a KeyEvent for display
fn format_key_event(event: &KeyEvent) -> String {
    let mut parts = Vec::new();

    if event.modifiers.contains(KeyModifiers::CONTROL) {
        parts.push("Ctrl+");
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        parts.push("Alt+");
    }

    let key_str = match event.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        _ => format!("{:?}", event.code),
    };

    format!("{}{}", parts.join(""), key_str)
}

fn action_description(action: &Action) -> &'static str {
    match action {
        Action::Up => "Move up",
        Action::Down => "Move down",
        Action::FocusNext => "Switch pane",
        Action::Toggle => "Toggle flag on/off",
        Action::Edit => "Edit flag name and description",
        Action::Sort => "Sort emails with active flags",
        Action::Revert => "Revert last sorting session",
        Action::Connect => "Connect Gmail account",
        Action::Disconnect => "Disconnect Gmail account",
        Action::Refresh => "Refresh connection and history",
        Action::Open => "Toggle flag / open session details",
        Action::Confirm => "Confirm",
        Action::NextField => "Next field",
        Action::Back => "Close / cancel",
        Action::ToggleTheme => "Toggle light/dark theme",
        Action::Help => "Toggle help",
        Action::Quit => "Quit",
    }
}

fn action_category(action: &Action) -> &'static str {
    match action {
        Action::Up | Action::Down | Action::FocusNext => "Navigation",
        Action::Toggle | Action::Edit | Action::Open => "Flags",
        Action::Sort | Action::Revert => "Sorting",
        Action::Connect | Action::Disconnect | Action::Refresh => "Account",
        Action::Confirm | Action::NextField | Action::Back => "Dialogs",
        Action::ToggleTheme | Action::Help | Action::Quit => "General",
    }
}

fn category_order(category: &str) -> u8 {
    match category {
        "Navigation" => 0,
        "Flags" => 1,
        "Sorting" => 2,
        "Account" => 3,
        "Dialogs" => 4,
        "General" => 5,
        _ => 99,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let bindings = KeyBindings::new();

        assert_eq!(bindings.get(&key('j')), Some(Action::Down));
        assert_eq!(bindings.get(&key_code(KeyCode::Up)), Some(Action::Up));
        assert_eq!(bindings.get(&key(' ')), Some(Action::Toggle));
        assert_eq!(bindings.get(&key('s')), Some(Action::Sort));
        assert_eq!(bindings.get(&shift_key('R')), Some(Action::Revert));
        assert_eq!(bindings.get(&key('q')), Some(Action::Quit));
        assert_eq!(bindings.get(&key('x')), None);
    }

    #[test]
    fn test_all_bindings_grouped() {
        let entries = KeyBindings::new().all_bindings();
        assert_eq!(entries.first().map(|e| e.category), Some("Navigation"));
        assert_eq!(entries.last().map(|e| e.category), Some("General"));
        assert!(entries.iter().any(|e| e.key == "Space"));
    }
}
