//! Help text and per-view footer hints.

use super::app::ViewState;

/// Compact footer hints for a view, narrowed to fit `width`.
pub fn footer_hints(view: &ViewState, width: u16) -> &'static str {
    let wide = width >= 100;
    match view {
        ViewState::Loading => "  q: quit",
        ViewState::List if wide => {
            "  j/k: nav | enter: open | space: select | e: edit | m: sprint | i/a: new | d: delete | /: filter | f: find | tab: tabs | b: backlog | ?: help"
        }
        ViewState::List => "  j/k enter space e m i/a d / f tab b ?",
        ViewState::Detail { .. } => {
            "  j/k: scroll | s: state | e: edit | m: sprint | o: browser | r: reload | ?: help | esc: back"
        }
        ViewState::StatePicker { .. }
        | ViewState::SprintPicker { .. }
        | ViewState::BatchEditMenu { .. } => "  j/k: nav | enter: select | esc: cancel",
        ViewState::MoveChildrenConfirm { .. } => {
            "  y: move with children | n: parent only | esc: cancel"
        }
        ViewState::DeleteConfirm(_) => "  y: delete | n/esc: cancel",
        ViewState::Filter(_) => "  type to filter | enter: open | esc: clear",
        ViewState::Find(_) => "  enter: search assigned to me | esc: cancel",
        ViewState::Create(_) => "  enter: create | esc: cancel",
        ViewState::Edit(_) => "  tab: switch field | ctrl+s: save | esc: discard",
        ViewState::Help => "  esc: close",
        ViewState::Error(_) => "  esc: back | q: quit",
    }
}

/// Keyboard shortcuts for the help popup, grouped by category.
pub fn keyboard_shortcuts() -> Vec<&'static str> {
    vec![
        "",
        "  Navigation",
        "  ──────────",
        "  j/k, ↑/↓         Move up/down",
        "  ctrl+d/u, PgDn/Up Move 10 rows",
        "  g/Home, G/End    Go to top/bottom",
        "  →, l, Enter      Open detail (or load more)",
        "  Tab/Shift+Tab    Next/previous tab",
        "  1-3              Select tab",
        "  b                Toggle sprints/backlog",
        "",
        "  Selection",
        "  ─────────",
        "  Space            Toggle selection",
        "  Esc              Clear selection, then filter",
        "",
        "  Actions",
        "  ───────",
        "  e                Edit state (batch menu with selection)",
        "  s                Change state",
        "  m                Move to sprint",
        "  i / a            New item before / after subtree",
        "  d                Delete",
        "  /                Filter loaded items",
        "  f                Find items assigned to me",
        "  o                Open in browser",
        "  r                Reload tab",
        "  R                Reload sprints",
        "",
        "  q                Quit",
        "  ?                Toggle this help",
        "",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footer_narrows() {
        assert!(footer_hints(&ViewState::List, 120).contains("space: select"));
        assert!(!footer_hints(&ViewState::List, 60).contains("select"));
    }
}
