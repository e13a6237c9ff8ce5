//! Moving work items between sprints through the key-driven flow.

mod test_utils;

use crossterm::event::KeyCode;
use hippo::data::{ListKey, SprintTab, WorkItemId};
use hippo::tui::{Command, Message, ViewState};
use pretty_assertions::assert_eq;
use test_utils::{app_with, focus, item, items, moved_ids, press, press_char};

fn move_results(commands: &[Command], failing: &[WorkItemId]) -> Vec<Message> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::MoveToSprint { operation, id, .. } => Some(Message::SprintUpdated {
                operation: *operation,
                id: *id,
                result: if failing.contains(id) {
                    Err(format!("server returned 500: #{id}"))
                } else {
                    Ok(())
                },
            }),
            _ => None,
        })
        .collect()
}

/// Pick the next sprint in the picker opened by `e` then "Sprint".
fn pick_next_sprint(app: &mut hippo::tui::App) -> Vec<Command> {
    press_char(app, 'e');
    assert_eq!(app.view, ViewState::BatchEditMenu { cursor: 0 });
    press_char(app, 'j');
    press(app, KeyCode::Enter);
    assert!(matches!(app.view, ViewState::SprintPicker { cursor: 1, .. }));
    press_char(app, 'j');
    press(app, KeyCode::Enter)
}

#[test]
fn test_parent_move_skips_completed_descendants() {
    let mut app = app_with(
        vec![
            item(1, "Active", None),
            item(2, "Active", Some(1)),
            item(3, "Closed", Some(1)),
            item(4, "Active", Some(1)),
            item(5, "Closed", Some(4)),
        ],
        5,
    );
    focus(&mut app, 1);
    press_char(&mut app, ' ');

    assert!(pick_next_sprint(&mut app).is_empty());
    match &app.view {
        ViewState::MoveChildrenConfirm { parent, tree, .. } => {
            assert_eq!(*parent, 1);
            assert_eq!(tree.skipped, 2);
        }
        other => panic!("unexpected view: {other:?}"),
    }
    assert!(app.selection.is_empty());

    let commands = press_char(&mut app, 'y');
    assert_eq!(moved_ids(&commands), vec![1, 2, 4]);
    assert_eq!(app.view, ViewState::List);

    for msg in move_results(&commands, &[]) {
        assert!(app.update(msg).is_empty());
    }

    assert_eq!(
        app.status_log.iter().map(String::as_str).collect::<Vec<_>>(),
        vec![
            "Filtered 2 completed item(s) from move",
            "Move #1 with 2 open child item(s) to Sprint 3? (y/n/esc)",
            "Moving #1 with 2 child item(s) to Sprint 3 (2 completed skipped)",
            "Moved 3 item(s) to Sprint 3",
        ]
    );
    assert_eq!(app.current_list().map(|l| l.ids()), Some(vec![3, 5]));
    assert!(app.pending_moves.is_empty());
    assert_eq!(
        app.last_action.as_ref().map(|a| a.text.as_str()),
        Some("Moved 3 item(s) to Sprint 3")
    );
}

#[test]
fn test_batch_move_never_asks_about_children() {
    let mut tasks = items([10, 20]);
    tasks.push(item(11, "Active", Some(10)));
    let mut app = app_with(tasks, 3);
    focus(&mut app, 10);
    press_char(&mut app, ' ');
    focus(&mut app, 20);
    press_char(&mut app, ' ');
    assert_eq!(app.selection.len(), 2);

    let commands = pick_next_sprint(&mut app);
    assert_eq!(moved_ids(&commands), vec![10, 20]);
    assert!(commands.iter().all(|c| matches!(
        c,
        Command::MoveToSprint { iteration_path, .. } if iteration_path == "Proj\\Sprint 3"
    )));
    assert_eq!(app.view, ViewState::List);
    assert!(app.selection.is_empty());
    assert_eq!(app.status.as_deref(), Some("Moving 2 items to Sprint 3"));
}

#[test]
fn test_answering_no_moves_parent_alone() {
    let mut app = app_with(
        vec![item(1, "Active", None), item(2, "Active", Some(1))],
        2,
    );
    press_char(&mut app, 'm');
    press_char(&mut app, 'j');
    press(&mut app, KeyCode::Enter);
    assert!(matches!(app.view, ViewState::MoveChildrenConfirm { .. }));

    let commands = press_char(&mut app, 'n');
    assert_eq!(moved_ids(&commands), vec![1]);
    assert_eq!(
        app.status.as_deref(),
        Some("Moving #1 to Sprint 3 without children")
    );
}

#[test]
fn test_escape_cancels_move_prompt() {
    let mut app = app_with(
        vec![item(1, "Active", None), item(2, "Active", Some(1))],
        2,
    );
    press_char(&mut app, 'm');
    press(&mut app, KeyCode::Enter);
    assert!(matches!(app.view, ViewState::MoveChildrenConfirm { .. }));

    assert!(press(&mut app, KeyCode::Esc).is_empty());
    assert_eq!(app.view, ViewState::List);
    assert!(app.pending_moves.is_empty());
}

#[test]
fn test_partial_failure_is_tallied() {
    let mut app = app_with(items([1, 2, 3]), 3);
    for id in [1, 2, 3] {
        app.selection.insert(id);
    }
    let commands = press_char(&mut app, 'm');
    assert!(commands.is_empty());
    press_char(&mut app, 'k');
    let commands = press(&mut app, KeyCode::Enter);
    assert_eq!(moved_ids(&commands), vec![1, 2, 3]);

    for msg in move_results(&commands, &[2]) {
        app.update(msg);
    }
    assert_eq!(
        app.status.as_deref(),
        Some("Moved 2 of 3 item(s) to Sprint 1 (1 failed)")
    );
    assert!(app
        .status_log
        .iter()
        .any(|s| s == "Failed to move #2: server returned 500: #2"));
    assert_eq!(app.current_list().map(|l| l.ids()), Some(vec![2]));
}

#[test]
fn test_move_resets_target_tab_off_screen() {
    let mut app = app_with(items([1]), 1);
    let key = ListKey::Sprint(SprintTab::Next);
    app.switch_to(key);
    let generation = app.lists.get_mut(key).generation();
    app.update(Message::TasksLoaded {
        target: key,
        generation,
        append: false,
        sprint_path: "Proj\\Sprint 3".to_string(),
        result: Ok((vec![item(7, "Active", None)], 1)),
    });

    // Move #7 back into the current sprint while the next tab is shown
    let commands = press_char(&mut app, 'm');
    assert!(commands.is_empty());
    let commands = press(&mut app, KeyCode::Enter);
    assert_eq!(moved_ids(&commands), vec![7]);

    let mut follow_up = Vec::new();
    for msg in move_results(&commands, &[]) {
        follow_up.extend(app.update(msg));
    }
    // Current sprint is not on screen, so it is reset rather than reloaded
    assert!(follow_up.is_empty());
    assert!(app
        .lists
        .get(ListKey::Sprint(SprintTab::Current))
        .is_some_and(|l| !l.attempted()));
    assert!(app.current_list().is_some_and(|l| l.ids().is_empty()));
}
