//! Work item tree rendering.

use super::layout::{
    compute_column_layout, display_width, pad_to_width, truncate_with_ellipsis, ColumnLayout,
    ASSIGNED_WIDTH, ID_WIDTH, SEP, STATE_WIDTH, TYPE_WIDTH,
};
use super::status::state_config;
use crate::data::{category_of, tree_prefix, TreeRow, WorkItem};
use crate::tui::forms::CreateForm;
use crate::tui::{App, ViewState};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Draw the current list as a tree, with the "Load More" row and the
/// inline create row when one is open.
pub fn draw_list(f: &mut Frame, app: &App, area: Rect) {
    let key = app.current_key();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", key.label()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(list) = app.current_list().filter(|l| l.attempted()) else {
        draw_placeholder(f, inner, "Not loaded yet");
        return;
    };
    let create = match &app.view {
        ViewState::Create(form) if form.list == key => Some(form),
        _ => None,
    };
    if list.row_count() == 0 && create.is_none() {
        let text = if list.is_loading() {
            "Loading..."
        } else if list.filter_active() {
            "No items match the filter"
        } else {
            "No work items"
        };
        draw_placeholder(f, inner, text);
        return;
    }

    let layout = compute_column_layout(inner.width);
    let height = inner.height as usize;
    let mut lines = Vec::with_capacity(height);

    let mut row = list.scroll_offset();
    while lines.len() < height && row <= list.row_count() {
        if let Some(form) = create.filter(|form| form.row == row) {
            lines.push(create_line(form, &layout));
            if lines.len() == height {
                break;
            }
        }
        if row == list.row_count() {
            break;
        }
        let is_cursor = row == list.cursor() && create.is_none();
        if let Some(label) = list.load_more_label().filter(|_| list.is_load_more_row(row)) {
            lines.push(load_more_line(label, list.is_loading(), is_cursor));
        } else if let (Some(tree_row), Some(item)) = (list.row_at(row), list.item_at(row)) {
            let selected = app.selection.contains(&item.id);
            lines.push(item_line(app, tree_row, item, &layout, selected, is_cursor));
        }
        row += 1;
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_placeholder(f: &mut Frame, area: Rect, text: &str) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(Color::DarkGray),
    )))
    .alignment(Alignment::Center);
    f.render_widget(paragraph, area);
}

fn item_line<'a>(
    app: &App,
    tree_row: &TreeRow,
    item: &'a WorkItem,
    layout: &ColumnLayout,
    selected: bool,
    is_cursor: bool,
) -> Line<'a> {
    let dim = Style::default().fg(Color::DarkGray);
    let config = state_config(category_of(&app.state_categories, &item.state));

    let mut spans = vec![
        Span::styled(
            if selected { "● " } else { "  " },
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(pad_to_width(&format!("#{}", item.id), ID_WIDTH), dim),
        Span::raw(SEP),
    ];
    if layout.show_type {
        spans.push(Span::styled(
            pad_to_width(&item.work_item_type, TYPE_WIDTH),
            Style::default().fg(Color::Blue),
        ));
        spans.push(Span::raw(SEP));
    }
    spans.push(Span::styled(
        pad_to_width(&format!("{} {}", config.icon, item.state), STATE_WIDTH),
        config.style,
    ));
    spans.push(Span::raw(SEP));
    if layout.show_assigned {
        spans.push(Span::styled(
            pad_to_width(item.assigned_to.as_deref().unwrap_or("-"), ASSIGNED_WIDTH),
            dim,
        ));
        spans.push(Span::raw(SEP));
    }

    let prefix = tree_prefix(tree_row);
    let title_room = layout
        .title_width
        .saturating_sub(display_width(&prefix));
    spans.push(Span::styled(prefix, dim));
    spans.push(Span::styled(
        truncate_with_ellipsis(&item.title, title_room),
        Style::default().fg(Color::White),
    ));

    let line = Line::from(spans);
    if is_cursor {
        line.style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        line
    }
}

fn load_more_line(label: String, loading: bool, is_cursor: bool) -> Line<'static> {
    let text = if loading {
        "  Loading more...".to_string()
    } else {
        format!("  {label}")
    };
    let line = Line::from(Span::styled(
        text,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::ITALIC),
    ));
    if is_cursor {
        line.style(Style::default().bg(Color::DarkGray))
    } else {
        line
    }
}

/// The inline title input, indented to its tree depth.
fn create_line<'a>(form: &'a CreateForm, layout: &ColumnLayout) -> Line<'a> {
    let indent = " ".repeat(2 + ID_WIDTH + 1 + STATE_WIDTH + 1)
        + &" ".repeat(if layout.show_type { TYPE_WIDTH + 1 } else { 0 })
        + &" ".repeat(if layout.show_assigned {
            ASSIGNED_WIDTH + 1
        } else {
            0
        });
    let branch = if form.depth == 0 {
        String::new()
    } else {
        format!("{}╰── ", "    ".repeat(form.depth - 1))
    };
    let (before, after) = form.input.split_at_cursor();
    let mut spans = vec![
        Span::raw(indent),
        Span::styled(branch, Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("New {}: ", form.work_item_type),
            Style::default().fg(Color::Green),
        ),
        Span::styled(before, Style::default().fg(Color::White)),
        Span::styled("▏", Style::default().fg(Color::Green)),
        Span::styled(after, Style::default().fg(Color::White)),
    ];
    if let Some(error) = &form.error {
        spans.push(Span::styled(
            format!("  {error}"),
            Style::default().fg(Color::Red),
        ));
    }
    Line::from(spans)
}

