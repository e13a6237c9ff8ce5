//! Input dispatch layer for Elm Architecture (TEA) pattern.
//!
//! Maps key events to messages based on the current view. Nothing here
//! mutates the model.

use super::app::{App, ViewState};
use super::forms::EditField;
use super::Message;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Map a key event to a message for the current view.
pub fn dispatch(app: &App, key: KeyEvent) -> Message {
    if is_ctrl(key, 'c') {
        return Message::Quit;
    }

    match &app.view {
        ViewState::Loading => dispatch_loading(key),
        ViewState::List => dispatch_list(key),
        ViewState::Detail { .. } => dispatch_detail(key),
        ViewState::StatePicker { .. }
        | ViewState::SprintPicker { .. }
        | ViewState::BatchEditMenu { .. } => dispatch_menu(key),
        ViewState::MoveChildrenConfirm { .. } => dispatch_move_confirm(key),
        ViewState::DeleteConfirm(_) => dispatch_delete_confirm(key),
        ViewState::Filter(_) | ViewState::Find(_) | ViewState::Create(_) => {
            dispatch_single_line(key)
        }
        ViewState::Edit(form) => dispatch_edit(form.focus, key),
        ViewState::Help => dispatch_help(key),
        ViewState::Error(_) => dispatch_error(key),
    }
}

fn is_ctrl(key: KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(c)
}

// ─────────────────────────────────────────────────────────────────────────────
// View-specific dispatch functions
// ─────────────────────────────────────────────────────────────────────────────

fn dispatch_loading(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Char('q') => Message::Quit,
        _ => Message::None,
    }
}

/// Handle keys in the main list.
fn dispatch_list(key: KeyEvent) -> Message {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('d') => Message::PageDown,
            KeyCode::Char('u') => Message::PageUp,
            _ => Message::None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Message::Quit,
        KeyCode::Char('?') => Message::OpenHelp,
        KeyCode::Char('o') => Message::OpenInBrowser,
        KeyCode::Char('r') => Message::Reload,
        KeyCode::Char('R') => Message::ReloadSprints,

        KeyCode::Char('j') | KeyCode::Down => Message::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Message::MoveUp,
        KeyCode::PageDown => Message::PageDown,
        KeyCode::PageUp => Message::PageUp,
        KeyCode::Char('g') | KeyCode::Home => Message::GotoTop,
        KeyCode::Char('G') | KeyCode::End => Message::GotoBottom,
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => Message::Activate,

        KeyCode::Tab => Message::NextTab,
        KeyCode::BackTab => Message::PrevTab,
        KeyCode::Char(c @ '1'..='3') => Message::SelectTab(c as usize - '1' as usize),
        KeyCode::Char('b') => Message::ToggleMode,

        KeyCode::Char(' ') => Message::ToggleSelection,
        KeyCode::Esc => Message::ClearSelectionOrFilter,
        KeyCode::Char('i') => Message::BeginCreate { after: false },
        KeyCode::Char('a') => Message::BeginCreate { after: true },
        KeyCode::Char('d') => Message::OpenDeleteConfirm,
        KeyCode::Char('e') => Message::OpenEditMenu,
        KeyCode::Char('s') => Message::OpenStatePicker,
        KeyCode::Char('m') => Message::OpenSprintPicker,
        KeyCode::Char('/') => Message::OpenFilter,
        KeyCode::Char('f') => Message::OpenFind,
        _ => Message::None,
    }
}

/// Handle keys in the detail view.
fn dispatch_detail(key: KeyEvent) -> Message {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('d') => Message::ScrollDetail(10),
            KeyCode::Char('u') => Message::ScrollDetail(-10),
            _ => Message::None,
        };
    }

    match key.code {
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Esc => Message::Close,
        KeyCode::Char('q') => Message::Quit,
        KeyCode::Char('?') => Message::OpenHelp,
        KeyCode::Char('r') => Message::Reload,
        KeyCode::Char('s') => Message::OpenStatePicker,
        KeyCode::Char('e') => Message::OpenEdit,
        KeyCode::Char('m') => Message::OpenSprintPicker,
        KeyCode::Char('o') => Message::OpenInBrowser,
        KeyCode::Char('j') | KeyCode::Down => Message::ScrollDetail(1),
        KeyCode::Char('k') | KeyCode::Up => Message::ScrollDetail(-1),
        _ => Message::None,
    }
}

/// Handle keys in the state picker, sprint picker and batch edit menu.
fn dispatch_menu(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Esc => Message::Close,
        KeyCode::Char('j') | KeyCode::Down => Message::MenuDown,
        KeyCode::Char('k') | KeyCode::Up => Message::MenuUp,
        KeyCode::Enter => Message::MenuConfirm,
        _ => Message::None,
    }
}

fn dispatch_move_confirm(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Char('y') => Message::MoveChildren(true),
        KeyCode::Char('n') => Message::MoveChildren(false),
        KeyCode::Esc => Message::Close,
        _ => Message::None,
    }
}

fn dispatch_delete_confirm(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Char('y') => Message::ConfirmDelete,
        KeyCode::Char('n') | KeyCode::Esc => Message::Close,
        _ => Message::None,
    }
}

/// Filter, find and the inline create row.
fn dispatch_single_line(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Esc => Message::Close,
        KeyCode::Enter => Message::SubmitForm,
        KeyCode::Backspace => Message::InputBackspace,
        KeyCode::Left => Message::InputLeft,
        KeyCode::Right => Message::InputRight,
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Message::InputChar(c)
        }
        _ => Message::None,
    }
}

fn dispatch_edit(focus: EditField, key: KeyEvent) -> Message {
    if is_ctrl(key, 's') {
        return Message::SubmitForm;
    }
    match key.code {
        KeyCode::Esc => Message::Close,
        KeyCode::Tab | KeyCode::BackTab => Message::SwitchField,
        KeyCode::Enter if focus == EditField::Description => Message::InputNewline,
        KeyCode::Enter => Message::SwitchField,
        KeyCode::Backspace => Message::InputBackspace,
        KeyCode::Left => Message::InputLeft,
        KeyCode::Right => Message::InputRight,
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Message::InputChar(c)
        }
        _ => Message::None,
    }
}

fn dispatch_help(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => Message::Close,
        _ => Message::None,
    }
}

fn dispatch_error(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Esc => Message::Close,
        KeyCode::Char('q') => Message::Quit,
        _ => Message::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::forms::TextInput;
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::empty(),
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    fn key_event_ctrl(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    #[test]
    fn test_list_navigation() {
        assert_eq!(
            dispatch_list(key_event(KeyCode::Char('j'))),
            Message::MoveDown
        );
        assert_eq!(dispatch_list(key_event(KeyCode::Up)), Message::MoveUp);
        assert_eq!(dispatch_list(key_event(KeyCode::Home)), Message::GotoTop);
        assert_eq!(
            dispatch_list(key_event(KeyCode::Char('G'))),
            Message::GotoBottom
        );
        assert_eq!(dispatch_list(key_event(KeyCode::Enter)), Message::Activate);
    }

    #[test]
    fn test_list_page_navigation() {
        assert_eq!(
            dispatch_list(key_event_ctrl(KeyCode::Char('d'))),
            Message::PageDown
        );
        assert_eq!(
            dispatch_list(key_event_ctrl(KeyCode::Char('u'))),
            Message::PageUp
        );
        assert_eq!(dispatch_list(key_event(KeyCode::PageDown)), Message::PageDown);
        // ctrl+d is not delete
        assert_ne!(
            dispatch_list(key_event_ctrl(KeyCode::Char('d'))),
            Message::OpenDeleteConfirm
        );
    }

    #[test]
    fn test_list_tabs() {
        assert_eq!(
            dispatch_list(key_event(KeyCode::Char('1'))),
            Message::SelectTab(0)
        );
        assert_eq!(
            dispatch_list(key_event(KeyCode::Char('3'))),
            Message::SelectTab(2)
        );
        assert_eq!(dispatch_list(key_event(KeyCode::BackTab)), Message::PrevTab);
        assert_eq!(
            dispatch_list(key_event(KeyCode::Char('4'))),
            Message::None
        );
    }

    #[test]
    fn test_ctrl_c_quits_everywhere() {
        let mut app = App::new("t");
        for view in [
            ViewState::Loading,
            ViewState::List,
            ViewState::Help,
            ViewState::Find(TextInput::default()),
            ViewState::Error("boom".to_string()),
        ] {
            app.view = view;
            assert_eq!(
                dispatch(&app, key_event_ctrl(KeyCode::Char('c'))),
                Message::Quit
            );
        }
    }

    #[test]
    fn test_text_views_capture_letters() {
        let mut app = App::new("t");
        app.view = ViewState::Filter(TextInput::default());
        assert_eq!(
            dispatch(&app, key_event(KeyCode::Char('q'))),
            Message::InputChar('q')
        );
        assert_eq!(dispatch(&app, key_event(KeyCode::Esc)), Message::Close);
        assert_eq!(dispatch(&app, key_event(KeyCode::Enter)), Message::SubmitForm);
    }

    #[test]
    fn test_edit_enter_depends_on_focus() {
        assert_eq!(
            dispatch_edit(EditField::Title, key_event(KeyCode::Enter)),
            Message::SwitchField
        );
        assert_eq!(
            dispatch_edit(EditField::Description, key_event(KeyCode::Enter)),
            Message::InputNewline
        );
        assert_eq!(
            dispatch_edit(EditField::Title, key_event_ctrl(KeyCode::Char('s'))),
            Message::SubmitForm
        );
    }

    #[test]
    fn test_detail_global_keys() {
        assert_eq!(dispatch_detail(key_event(KeyCode::Char('?'))), Message::OpenHelp);
        assert_eq!(dispatch_detail(key_event(KeyCode::Char('r'))), Message::Reload);
        assert_eq!(dispatch_detail(key_event(KeyCode::Char('o'))), Message::OpenInBrowser);
        assert_eq!(dispatch_detail(key_event(KeyCode::Char('q'))), Message::Quit);
    }

    #[test]
    fn test_move_confirm() {
        assert_eq!(
            dispatch_move_confirm(key_event(KeyCode::Char('y'))),
            Message::MoveChildren(true)
        );
        assert_eq!(
            dispatch_move_confirm(key_event(KeyCode::Char('n'))),
            Message::MoveChildren(false)
        );
        assert_eq!(dispatch_move_confirm(key_event(KeyCode::Esc)), Message::Close);
    }
}
