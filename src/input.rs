//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    /// Break the block under the cursor (or confirm in menus).
    Select,
    ToggleGuide,
    Tutorial,
    Restart,
    Pause,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, Enter) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Left | KeyCode::Char('h') => Action::Left,
        KeyCode::Right | KeyCode::Char('l') => Action::Right,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Select,
        KeyCode::Char('g') => Action::ToggleGuide,
        KeyCode::Char('t') | KeyCode::Char('?') => Action::Tutorial,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Restart,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_vim_and_arrows_agree() {
        assert_eq!(key_to_action(key(KeyCode::Char('h'), KeyModifiers::NONE)), Action::Left);
        assert_eq!(key_to_action(key(KeyCode::Left, KeyModifiers::NONE)), Action::Left);
        assert_eq!(key_to_action(key(KeyCode::Char('k'), KeyModifiers::NONE)), Action::Up);
    }

    #[test]
    fn test_select_and_quit() {
        assert_eq!(key_to_action(key(KeyCode::Enter, KeyModifiers::NONE)), Action::Select);
        assert_eq!(key_to_action(key(KeyCode::Char(' '), KeyModifiers::NONE)), Action::Select);
        assert_eq!(key_to_action(key(KeyCode::Esc, KeyModifiers::NONE)), Action::Quit);
    }

    #[test]
    fn test_modified_keys_ignored() {
        assert_eq!(key_to_action(key(KeyCode::Char('q'), KeyModifiers::CONTROL)), Action::None);
        assert_eq!(key_to_action(key(KeyCode::Char('R'), KeyModifiers::SHIFT)), Action::Restart);
    }
}
