//! TUI rendering module.
//!
//! - `layout` - Layout calculations and text utilities
//! - `status` - State styling, header, tabs, status line and footer
//! - `table` - Work item tree rendering
//! - `modals` - Detail view and modal popups
//! - `menus` - State/sprint pickers and the batch edit menu

pub mod layout;
mod menus;
mod modals;
mod status;
mod table;

// Re-export the main draw function
pub use self::draw::draw;

mod draw {
    use super::layout::screen_chunks;
    use super::menus::{draw_batch_menu, draw_sprint_picker, draw_state_picker};
    use super::modals::{
        draw_delete_confirm, draw_detail, draw_edit_modal, draw_error, draw_move_confirm,
    };
    use super::status::{draw_footer, draw_header, draw_help_popup, draw_status_line, draw_tabs};
    use super::table::draw_list;
    use crate::tui::{App, ViewState};
    use ratatui::Frame;

    /// Main draw function - renders the entire TUI.
    pub fn draw(f: &mut Frame, app: &App) {
        let [header, tabs, body, status, footer] = screen_chunks(f.area());

        draw_header(f, app, header);
        draw_tabs(f, app, tabs);
        match app.background_view() {
            ViewState::Detail { id, scroll } => draw_detail(f, app, body, *id, *scroll),
            ViewState::Edit(form) => {
                draw_detail(f, app, body, form.id, 0);
            }
            _ => draw_list(f, app, body),
        }
        draw_status_line(f, app, status);
        draw_footer(f, app, footer);

        // Overlays
        match &app.view {
            ViewState::Help => draw_help_popup(f),
            ViewState::StatePicker {
                targets,
                work_item_type,
                states,
                cursor,
                ..
            } => draw_state_picker(f, app, targets, work_item_type, states, *cursor),
            ViewState::SprintPicker {
                targets, cursor, ..
            } => draw_sprint_picker(f, app, targets, *cursor),
            ViewState::BatchEditMenu { cursor } => draw_batch_menu(f, app, *cursor),
            ViewState::MoveChildrenConfirm {
                parent,
                tree,
                sprint_name,
                ..
            } => draw_move_confirm(f, app, *parent, tree, sprint_name),
            ViewState::DeleteConfirm(target) => draw_delete_confirm(f, target),
            ViewState::Edit(form) => draw_edit_modal(f, form),
            ViewState::Error(message) => draw_error(f, message),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::draw;
    use crate::data::{ListKey, SprintTab, WorkItem};
    use crate::tui::{App, ViewState};
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        let backend = TestBackend::new(120, 30);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal.draw(|f| draw(f, app)).expect("draw");
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn app_with_tree() -> App {
        let mut app = App::new("org / Proj");
        let items = vec![
            WorkItem {
                id: 1,
                title: "Parent story".to_string(),
                state: "Active".to_string(),
                work_item_type: "User Story".to_string(),
                ..Default::default()
            },
            WorkItem {
                id: 2,
                title: "Child task".to_string(),
                state: "New".to_string(),
                work_item_type: "Task".to_string(),
                parent_id: Some(1),
                ..Default::default()
            },
        ];
        let list = app.lists.get_mut(ListKey::Sprint(SprintTab::Current));
        list.begin_load();
        list.replace(items, 5);
        app.view = ViewState::List;
        app
    }

    #[test]
    fn test_list_renders_tree_and_load_more() {
        let screen = render(&app_with_tree());
        assert!(screen.contains("#1"));
        assert!(screen.contains("╰── Child task"));
        assert!(screen.contains("Load All (+3)"));
    }

    #[test]
    fn test_help_overlay() {
        let mut app = app_with_tree();
        app.view = ViewState::Help;
        assert!(render(&app).contains("Toggle selection"));
    }

    #[test]
    fn test_error_view() {
        let mut app = App::new("t");
        app.view = ViewState::Error("Could not load sprints: boom".to_string());
        assert!(render(&app).contains("Could not load sprints: boom"));
    }
}
