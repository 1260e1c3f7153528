use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};

use super::keybindings::{Action, KeyBindings};
use crate::app::state::{AppState, ModalState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
    Continue,
    Quit,
    Action(Action),
    Char(char),
    Backspace,
}

pub fn handle_input(event: Event, state: &AppState, bindings: &KeyBindings) -> InputResult {
    match event {
        Event::Key(key_event) if key_event.kind != KeyEventKind::Release => {
            handle_key(key_event, state, bindings)
        }
        _ => InputResult::Continue,
    }
}

fn handle_key(key: KeyEvent, state: &AppState, bindings: &KeyBindings) -> InputResult {
    match &state.modal {
        ModalState::EditFlag(_) => return handle_editor_input(key),
        ModalState::ConfirmRevert(_) => return handle_confirm_input(key),
        ModalState::Alert { .. } => return handle_dismiss_input(key),
        ModalState::SessionDetails { .. } | ModalState::Help { .. } => {
            return handle_viewer_input(key, bindings);
        }
        ModalState::None => {}
    }

    match bindings.get(&key) {
        Some(Action::Quit) => InputResult::Quit,
        Some(action) => InputResult::Action(action),
        None => InputResult::Continue,
    }
}

fn handle_editor_input(key: KeyEvent) -> InputResult {
    match key.code {
        KeyCode::Enter => InputResult::Action(Action::Confirm),
        KeyCode::Esc => InputResult::Action(Action::Back),
        KeyCode::Tab | KeyCode::BackTab => InputResult::Action(Action::NextField),
        KeyCode::Backspace => InputResult::Backspace,
        KeyCode::Char(c) => InputResult::Char(c),
        _ => InputResult::Continue,
    }
}

fn handle_confirm_input(key: KeyEvent) -> InputResult {
    // Only an explicit yes confirms
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => InputResult::Action(Action::Confirm),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
            InputResult::Action(Action::Back)
        }
        _ => InputResult::Continue,
    }
}

fn handle_dismiss_input(key: KeyEvent) -> InputResult {
    match key.code {
        KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') | KeyCode::Char('q') => {
            InputResult::Action(Action::Back)
        }
        _ => InputResult::Continue,
    }
}

fn handle_viewer_input(key: KeyEvent, bindings: &KeyBindings) -> InputResult {
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('?') => {
            return InputResult::Action(Action::Back);
        }
        _ => {}
    }
    match bindings.get(&key) {
        Some(action @ (Action::Up | Action::Down)) => InputResult::Action(action),
        _ => InputResult::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThemeVariant;
    use crate::flags::builtin_flags;
    use crate::session::{ConnectionState, Session};
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn state() -> AppState {
        AppState::new(Session::new(builtin_flags()), ThemeVariant::Light)
    }

    #[test]
    fn test_dashboard_keys_map_to_actions() {
        let bindings = KeyBindings::new();
        let state = state();
        assert_eq!(
            handle_input(press(KeyCode::Char(' ')), &state, &bindings),
            InputResult::Action(Action::Toggle)
        );
        assert_eq!(
            handle_input(press(KeyCode::Char('q')), &state, &bindings),
            InputResult::Quit
        );
    }

    #[test]
    fn test_editor_captures_text() {
        let bindings = KeyBindings::new();
        let mut state = state();
        let flag = state.session.flags.flags()[0].clone();
        state.modal = ModalState::EditFlag(crate::app::state::FlagEditor::new(&flag));

        // 'q' is text here, not quit
        assert_eq!(
            handle_input(press(KeyCode::Char('q')), &state, &bindings),
            InputResult::Char('q')
        );
        assert_eq!(
            handle_input(press(KeyCode::Enter), &state, &bindings),
            InputResult::Action(Action::Confirm)
        );
    }

    #[test]
    fn test_revert_needs_explicit_yes() {
        let bindings = KeyBindings::new();
        let mut state = state();
        state.session.connection = ConnectionState::connected("me@example.com");
        state.modal = ModalState::ConfirmRevert(state.session.prepare_revert().unwrap());

        assert_eq!(
            handle_input(press(KeyCode::Enter), &state, &bindings),
            InputResult::Continue
        );
        assert_eq!(
            handle_input(press(KeyCode::Char('y')), &state, &bindings),
            InputResult::Action(Action::Confirm)
        );
        assert_eq!(
            handle_input(press(KeyCode::Esc), &state, &bindings),
            InputResult::Action(Action::Back)
        );
    }
}
