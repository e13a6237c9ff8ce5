//! Detail view and modal popups (edit, confirmations, error).

use super::layout::{fit_lines_to_area, popup_rect};
use super::status::{input_line, state_config};
use crate::data::{category_of, MoveNode, MoveTree, WorkItem, WorkItemId};
use crate::tui::forms::{DeleteTarget, EditField, EditForm, TextInput};
use crate::tui::App;
use crate::util::html_to_text;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Full-body detail view of one work item.
pub fn draw_detail(f: &mut Frame, app: &App, area: Rect, id: WorkItemId, scroll: u16) {
    let block = Block::default()
        .title(format!(" #{id} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let Some(item) = app.find_item(id) else {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            "  Work item is no longer loaded",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let paragraph = Paragraph::new(detail_lines(app, item))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(paragraph, area);
}

fn detail_lines<'a>(app: &App, item: &'a WorkItem) -> Vec<Line<'a>> {
    let label = Style::default().fg(Color::DarkGray);
    let text = Style::default().fg(Color::White);
    let heading = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let config = state_config(category_of(&app.state_categories, &item.state));

    let field = |name: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {name:<12}"), label),
            Span::styled(value, text),
        ])
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("  {} ", item.work_item_type),
                Style::default().fg(Color::Blue),
            ),
            Span::styled(
                item.title.as_str(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("  {:<12}", "State"), label),
            Span::styled(format!("{} {}", config.icon, item.state), config.style),
        ]),
        field(
            "Assigned",
            item.assigned_to.clone().unwrap_or_else(|| "-".to_string()),
        ),
        field("Iteration", item.iteration_path.clone()),
        field("Area", item.area_path.clone()),
    ];
    if let Some(priority) = item.priority {
        lines.push(field("Priority", priority.to_string()));
    }
    if !item.tags.is_empty() {
        lines.push(field("Tags", item.tags.join(", ")));
    }
    if let Some(parent) = item.parent_id {
        lines.push(field("Parent", format!("#{parent}")));
    }
    if let Some(changed) = item.changed_date {
        lines.push(field("Changed", changed.format("%Y-%m-%d %H:%M").to_string()));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("  Description", heading)));
    let description = html_to_text(&item.description);
    if description.is_empty() {
        lines.push(Line::from(Span::styled("  No description", label)));
    } else {
        lines.extend(
            description
                .lines()
                .map(|l| Line::from(Span::styled(format!("  {l}"), text))),
        );
    }

    if !item.comments.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  Comments ({})", item.comments.len()),
            heading,
        )));
        for comment in &item.comments {
            let when = comment
                .created_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            lines.push(Line::from(vec![
                Span::styled(format!("  {} ", comment.author), Style::default().fg(Color::Green)),
                Span::styled(when, label),
            ]));
            lines.extend(
                html_to_text(&comment.text)
                    .lines()
                    .map(|l| Line::from(Span::styled(format!("    {l}"), text))),
            );
        }
    }
    lines
}

pub fn draw_edit_modal(f: &mut Frame, form: &EditForm) {
    let area = popup_rect(70, 70, 50, 14, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(format!(" Edit #{} ", form.id))
        .title_bottom(Line::from(" tab: field | ctrl+s: save | esc: discard ").centered())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let focus_style = |field: EditField| {
        if form.focus == field {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let mut lines = vec![
        Line::from(Span::styled(" Title", focus_style(EditField::Title))),
        field_line(&form.title, form.focus == EditField::Title),
        Line::from(""),
        Line::from(Span::styled(
            " Description",
            focus_style(EditField::Description),
        )),
    ];
    lines.extend(multiline(&form.description, form.focus == EditField::Description));
    if let Some(error) = &form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {error}"),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(fit_lines_to_area(lines, inner, 1));
    f.render_widget(paragraph, inner);
}

fn field_line(input: &TextInput, focused: bool) -> Line<'_> {
    if focused {
        input_line(" ", input)
    } else {
        Line::from(Span::styled(
            format!(" {}", input.value()),
            Style::default().fg(Color::White),
        ))
    }
}

/// Description lines with the cursor drawn on the line it sits in.
fn multiline(input: &TextInput, focused: bool) -> Vec<Line<'_>> {
    let style = Style::default().fg(Color::White);
    if !focused {
        return input
            .value()
            .split('\n')
            .map(|l| Line::from(Span::styled(format!(" {l}"), style)))
            .collect();
    }

    let (before, after) = input.split_at_cursor();
    let mut before_lines: Vec<&str> = before.split('\n').collect();
    let mut after_lines = after.split('\n');
    let cursor_head = before_lines.pop().unwrap_or("");
    let cursor_tail = after_lines.next().unwrap_or("");

    let mut lines: Vec<Line> = before_lines
        .into_iter()
        .map(|l| Line::from(Span::styled(format!(" {l}"), style)))
        .collect();
    lines.push(Line::from(vec![
        Span::styled(format!(" {cursor_head}"), style),
        Span::styled("▏", Style::default().fg(Color::Yellow)),
        Span::styled(cursor_tail, style),
    ]));
    lines.extend(after_lines.map(|l| Line::from(Span::styled(format!(" {l}"), style))));
    lines
}

pub fn draw_delete_confirm(f: &mut Frame, target: &DeleteTarget) {
    let area = popup_rect(50, 20, 40, 7, f.area());
    f.render_widget(Clear, area);

    let question = match target {
        DeleteTarget::Single { id, title } => format!("  Delete #{id} \"{title}\"?"),
        DeleteTarget::Batch(ids) => format!("  Delete {} selected items?", ids.len()),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(question, Style::default().fg(Color::White))),
        Line::from(""),
        Line::from(Span::styled(
            "  y: delete | n/esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    draw_popup(f, area, " Delete ", Color::Red, lines);
}

pub fn draw_move_confirm(
    f: &mut Frame,
    app: &App,
    parent: WorkItemId,
    tree: &MoveTree,
    sprint_name: &str,
) {
    let area = popup_rect(60, 50, 44, 10, f.area());
    f.render_widget(Clear, area);

    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "  Move #{parent} to {sprint_name} with {} open child item(s)?",
                tree.child_count()
            ),
            Style::default().fg(Color::White),
        )),
    ];
    if tree.skipped > 0 {
        lines.push(Line::from(Span::styled(
            format!("  {} completed item(s) stay behind", tree.skipped),
            dim,
        )));
    }
    lines.push(Line::from(""));
    if let Some(root) = &tree.root {
        push_move_node(app, root, 0, &mut lines);
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  y: parent and children | n: parent only | esc: cancel",
        dim,
    )));
    draw_popup(f, area, " Move to Sprint ", Color::Magenta, lines);
}

fn push_move_node(app: &App, node: &MoveNode, depth: usize, lines: &mut Vec<Line<'static>>) {
    let title = app
        .find_item(node.id)
        .map(|item| item.title.clone())
        .unwrap_or_default();
    lines.push(Line::from(vec![
        Span::raw(format!("  {}", "  ".repeat(depth))),
        Span::styled(format!("#{} ", node.id), Style::default().fg(Color::DarkGray)),
        Span::styled(title, Style::default().fg(Color::White)),
    ]));
    for child in &node.children {
        push_move_node(app, child, depth + 1, lines);
    }
}

pub fn draw_error(f: &mut Frame, message: &str) {
    let area = popup_rect(60, 30, 40, 7, f.area());
    f.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {message}"),
            Style::default().fg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  esc: back | q: quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

/// Bordered popup with its content fitted to the inner area.
pub(super) fn draw_popup(f: &mut Frame, area: Rect, title: &str, color: Color, lines: Vec<Line>) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    let inner = block.inner(area);
    let lines = fit_lines_to_area(lines, inner, 1);
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
