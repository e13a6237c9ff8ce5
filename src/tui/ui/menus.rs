//! Menu rendering: state picker, sprint picker and batch edit menu.

use super::layout::popup_rect;
use super::modals::draw_popup;
use super::status::state_config;
use crate::data::{category_of, SprintTab};
use crate::tui::{App, BATCH_EDIT_OPTIONS};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Clear,
    Frame,
};

fn option_line(label: String, selected: bool, style: Style) -> Line<'static> {
    let marker = if selected { "▶" } else { " " };
    let text_style = if selected {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    };
    Line::from(vec![
        Span::styled(format!("  {marker} "), Style::default().fg(Color::Green)),
        Span::styled(label, text_style),
    ])
}

fn targets_label(targets: &[i64]) -> String {
    match targets {
        [id] => format!("#{id}"),
        _ => format!("{} items", targets.len()),
    }
}

pub fn draw_state_picker(
    f: &mut Frame,
    app: &App,
    targets: &[i64],
    work_item_type: &str,
    states: &[String],
    cursor: usize,
) {
    let area = popup_rect(40, 50, 34, 8, f.area());
    f.render_widget(Clear, area);

    let mut lines = vec![Line::from(Span::styled(
        format!("  {work_item_type} {}", targets_label(targets)),
        Style::default().fg(Color::DarkGray),
    ))];
    lines.push(Line::from(""));
    for (i, state) in states.iter().enumerate() {
        let config = state_config(category_of(&app.state_categories, state));
        lines.push(option_line(
            format!("{} {}", config.icon, state),
            i == cursor,
            config.style,
        ));
    }
    if states.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No states known for this type",
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  j/k: nav | enter: set | esc: cancel",
        Style::default().fg(Color::DarkGray),
    )));

    draw_popup(f, area, " Set State ", Color::Cyan, lines);
}

pub fn draw_sprint_picker(f: &mut Frame, app: &App, targets: &[i64], cursor: usize) {
    let area = popup_rect(50, 40, 40, 9, f.area());
    f.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(
            format!("  Move {}", targets_label(targets)),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];
    for (i, (tab, sprint)) in app.sprints.available().into_iter().enumerate() {
        let style = if tab == SprintTab::Current {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(option_line(
            format!("{:<9}{}", tab.label(), sprint.name),
            i == cursor,
            style,
        ));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  j/k: nav | enter: move | esc: cancel",
        Style::default().fg(Color::DarkGray),
    )));

    draw_popup(f, area, " Move to Sprint ", Color::Magenta, lines);
}

pub fn draw_batch_menu(f: &mut Frame, app: &App, cursor: usize) {
    let area = popup_rect(40, 30, 34, 8, f.area());
    f.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(
            format!("  {} selected", app.selection.len()),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
    ];
    for (i, option) in BATCH_EDIT_OPTIONS.iter().enumerate() {
        lines.push(option_line(
            option.to_string(),
            i == cursor,
            Style::default().fg(Color::White),
        ));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  j/k: nav | enter: select | esc: cancel",
        Style::default().fg(Color::DarkGray),
    )));

    draw_popup(f, area, " Batch Edit ", Color::Cyan, lines);
}
