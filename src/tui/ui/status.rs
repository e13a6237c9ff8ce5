//! State styling, header, tab bar, status line and footer.

use super::layout::{fit_lines_to_area, popup_rect, truncate_with_ellipsis};
use crate::data::{ListKey, StateCategory};
use crate::tui::help::{footer_hints, keyboard_shortcuts};
use crate::tui::forms::TextInput;
use crate::tui::{App, ViewState};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Icon and style for a state category.
pub struct StatusConfig {
    pub icon: &'static str,
    pub style: Style,
}

pub fn state_config(category: StateCategory) -> StatusConfig {
    match category {
        StateCategory::Proposed => StatusConfig {
            icon: "○",
            style: Style::default().fg(Color::Cyan),
        },
        StateCategory::InProgress => StatusConfig {
            icon: "◑",
            style: Style::default().fg(Color::Green),
        },
        StateCategory::Completed => StatusConfig {
            icon: "●",
            style: Style::default().fg(Color::Magenta),
        },
        StateCategory::Removed => StatusConfig {
            icon: "⊘",
            style: Style::default().fg(Color::DarkGray),
        },
    }
}

/// Draw the application header.
pub fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let prompt = match &app.view {
        ViewState::Filter(input) => Some(("Filter: ", input)),
        ViewState::Find(input) => Some(("Find (assigned to me): ", input)),
        _ => None,
    };

    let border_style = if prompt.is_some() {
        Style::default().fg(Color::Yellow)
    } else if app.is_busy() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if let Some((label, input)) = prompt {
        f.render_widget(Paragraph::new(input_line(label, input)), inner);
        return;
    }

    let mut spans = vec![
        Span::styled(
            "hippo ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.title.clone(), Style::default().fg(Color::DarkGray)),
    ];
    if let Some(sprint) = &app.sprints.current {
        spans.push(Span::styled(
            format!("  [{}]", sprint.name),
            Style::default().fg(Color::Green),
        ));
    }
    if app.is_busy() {
        spans.push(Span::styled(
            format!("  {} Loading...", app.spinner_char()),
            Style::default().fg(Color::Cyan),
        ));
    }

    f.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        inner,
    );
}

/// A labelled text input with a bar cursor.
pub fn input_line<'a>(label: &'a str, input: &'a TextInput) -> Line<'a> {
    let (before, after) = input.split_at_cursor();
    Line::from(vec![
        Span::styled(label, Style::default().fg(Color::Yellow)),
        Span::styled(
            before,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("▏", Style::default().fg(Color::Yellow)),
        Span::styled(
            after,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ])
}

/// Draw the tab bar for the current mode.
pub fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        format!(" {} ", app.mode.label()),
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::raw(" "));

    let tabs = ListKey::tabs(app.mode);
    for (i, key) in tabs.iter().enumerate() {
        let list = app.lists.get(*key);
        let is_active = *key == app.current_key();
        let is_loading = list.is_some_and(|l| l.is_loading());

        let mut label = format!(" {} {}", i + 1, key.label());
        if let ListKey::Sprint(tab) = key {
            match app.sprints.get(*tab) {
                Some(sprint) => label.push_str(&format!(" ({})", sprint.name)),
                None => label.push_str(" (none)"),
            }
        }
        if let Some(list) = list.filter(|l| l.attempted() && !l.is_loading()) {
            label.push_str(&format!(" {}/{}", list.loaded(), list.total_count()));
        }
        label.push(' ');

        let style = if is_active {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else if is_loading {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(label, style));
        if i + 1 < tabs.len() {
            spans.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
        }
    }

    spans.push(Span::styled(
        format!("   b: {}", app.mode.toggle().label()),
        Style::default().fg(Color::DarkGray),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Status message on the left, last action with its time on the right.
pub fn draw_status_line(f: &mut Frame, app: &App, area: Rect) {
    let width = area.width as usize;
    let mut spans = Vec::new();

    if app.is_busy() {
        spans.push(Span::styled(
            format!(" {} ", app.spinner_char()),
            Style::default().fg(Color::Cyan),
        ));
    } else {
        spans.push(Span::raw(" "));
    }

    if !app.selection.is_empty() {
        spans.push(Span::styled(
            format!("[{} selected] ", app.selection.len()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }
    if let Some(list) = app.current_list().filter(|l| l.filter_active()) {
        spans.push(Span::styled(
            format!("[filter: {}] ", list.filter_query()),
            Style::default().fg(Color::Yellow),
        ));
    }

    let action = app.last_action.as_ref().map(|action| {
        format!("{} {}", action.at.format("%H:%M:%S"), action.text)
    });
    let action_width = action.as_ref().map_or(0, |a| a.chars().count() + 2);

    if let Some(status) = &app.status {
        let style = if status.starts_with("Failed") || status.starts_with("Could not") {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::White)
        };
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let room = width.saturating_sub(used + action_width);
        spans.push(Span::styled(truncate_with_ellipsis(status, room), style));
    }

    let left = Paragraph::new(Line::from(spans));
    f.render_widget(left, area);

    if let Some(action) = action {
        let right = Paragraph::new(Line::from(Span::styled(
            format!("{action} "),
            Style::default().fg(Color::Green),
        )))
        .alignment(Alignment::Right);
        f.render_widget(right, area);
    }
}

pub fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints = footer_hints(&app.view, area.width);
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            hints,
            Style::default().fg(Color::DarkGray),
        ))),
        area,
    );
}

/// Generate the state legend for the help popup.
fn state_legend() -> Vec<Line<'static>> {
    [
        StateCategory::Proposed,
        StateCategory::InProgress,
        StateCategory::Completed,
        StateCategory::Removed,
    ]
    .into_iter()
    .map(|category| {
        let config = state_config(category);
        Line::from(vec![
            Span::styled(format!("  {}  ", config.icon), config.style),
            Span::raw(category.label()),
        ])
    })
    .collect()
}

/// Draw the help popup.
pub fn draw_help_popup(f: &mut Frame) {
    let area = popup_rect(65, 80, 44, 12, f.area());
    f.render_widget(Clear, area);

    let mut lines: Vec<Line> = keyboard_shortcuts().into_iter().map(Line::from).collect();
    lines.push(Line::from("  States"));
    lines.push(Line::from("  ──────"));
    lines.extend(state_legend());
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Esc: Close",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    let lines = fit_lines_to_area(lines, inner, 1);
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().fg(Color::White));

    f.render_widget(paragraph, area);
}
