//! Layout calculations and text width utilities.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Column widths of the work item list (title takes the rest).
pub const ID_WIDTH: usize = 7;
pub const TYPE_WIDTH: usize = 10;
pub const STATE_WIDTH: usize = 12;
pub const ASSIGNED_WIDTH: usize = 16;
/// Selection mark plus a space.
pub const MARK_WIDTH: usize = 2;
pub const SEP: &str = " ";

/// Columns shown at a given inner width. Assignee goes first when narrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub show_type: bool,
    pub show_assigned: bool,
    pub title_width: usize,
}

pub fn compute_column_layout(width: u16) -> ColumnLayout {
    let width = width as usize;
    let fixed = MARK_WIDTH + ID_WIDTH + STATE_WIDTH + 2 * SEP.len();
    let show_assigned = width >= fixed + TYPE_WIDTH + ASSIGNED_WIDTH + 40;
    let show_type = width >= fixed + TYPE_WIDTH + 30;
    let used = fixed
        + if show_type { TYPE_WIDTH + SEP.len() } else { 0 }
        + if show_assigned {
            ASSIGNED_WIDTH + SEP.len()
        } else {
            0
        };
    ColumnLayout {
        show_type,
        show_assigned,
        title_width: width.saturating_sub(used),
    }
}

/// Split the screen into header, tabs, body, status line and footer.
pub fn screen_chunks(area: Rect) -> [Rect; 5] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(1), // Tab bar
            Constraint::Min(0),    // List or detail
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Footer hints
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2], chunks[3], chunks[4]]
}

/// Calculate the display width of text (accounting for Unicode).
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Truncate text to a maximum display width.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > max_width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

/// Truncate with an ellipsis if `text` is wider than `max_width`.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if display_width(text) <= max_width {
        return text.to_string();
    }
    match max_width {
        0 => String::new(),
        1 => "…".to_string(),
        _ => format!("{}…", truncate_to_width(text, max_width - 1)),
    }
}

/// Left-aligned, padded or cut to exactly `width` columns.
pub fn pad_to_width(text: &str, width: usize) -> String {
    let mut out = truncate_with_ellipsis(text, width);
    let pad = width.saturating_sub(display_width(&out));
    out.push_str(&" ".repeat(pad));
    out
}

/// Fit a Line to a maximum width by truncating spans.
pub fn fit_line_to_width(line: Line<'_>, max_width: usize) -> Line<'_> {
    let Line {
        spans,
        alignment,
        style,
    } = line;
    let mut out = Vec::new();
    let mut used = 0usize;

    for span in spans {
        let span_width = display_width(span.content.as_ref());
        if used + span_width <= max_width {
            used += span_width;
            out.push(span);
            continue;
        }
        let truncated = truncate_to_width(span.content.as_ref(), max_width - used);
        if !truncated.is_empty() {
            out.push(Span::styled(truncated, span.style));
        }
        break;
    }

    Line {
        spans: out,
        alignment,
        style,
    }
}

/// Fit lines into `inner`, keeping the last `keep_bottom` lines visible and
/// marking the cut with an ellipsis row.
pub fn fit_lines_to_area(lines: Vec<Line<'_>>, inner: Rect, keep_bottom: usize) -> Vec<Line<'_>> {
    let width = inner.width as usize;
    let height = inner.height as usize;
    if height == 0 || width == 0 {
        return Vec::new();
    }

    let mut fitted: Vec<Line<'_>> = lines
        .into_iter()
        .map(|line| fit_line_to_width(line, width))
        .collect();
    if fitted.len() <= height {
        return fitted;
    }

    let keep_bottom = keep_bottom.min(height.saturating_sub(1));
    let top_take = height - keep_bottom - 1;
    let bottom = fitted.split_off(fitted.len() - keep_bottom);
    fitted.truncate(top_take);
    fitted.push(Line::from(Span::styled(
        "…",
        Style::default().fg(Color::DarkGray),
    )));
    fitted.extend(bottom);
    fitted
}

/// Calculate a centered popup rectangle within a container.
pub fn popup_rect(percent_x: u16, percent_y: u16, min_width: u16, min_height: u16, r: Rect) -> Rect {
    let max_width = r.width.saturating_sub(2).max(1);
    let max_height = r.height.saturating_sub(2).max(1);

    let width = (r.width.saturating_mul(percent_x) / 100)
        .max(min_width)
        .min(max_width);
    let height = (r.height.saturating_mul(percent_y) / 100)
        .max(min_height)
        .min(max_height);

    Rect {
        x: r.x + (r.width.saturating_sub(width)) / 2,
        y: r.y + (r.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_and_truncate() {
        assert_eq!(pad_to_width("abc", 5), "abc  ");
        assert_eq!(pad_to_width("abcdef", 4), "abc…");
        assert_eq!(truncate_with_ellipsis("日本語", 4), "日…");
    }

    #[test]
    fn test_narrow_layout_drops_columns() {
        let wide = compute_column_layout(160);
        assert!(wide.show_type && wide.show_assigned);
        let narrow = compute_column_layout(60);
        assert!(!narrow.show_assigned);
        assert!(narrow.title_width > 0);
    }

    #[test]
    fn test_fit_lines_keeps_bottom() {
        let lines: Vec<Line> = (0..10).map(|i| Line::from(format!("line {i}"))).collect();
        let area = Rect::new(0, 0, 20, 4);
        let fitted = fit_lines_to_area(lines, area, 1);
        assert_eq!(fitted.len(), 4);
        assert_eq!(fitted[2].spans[0].content, "…");
        assert_eq!(fitted[3].spans[0].content, "line 9");
    }

    #[test]
    fn test_popup_rect_is_centered() {
        let r = popup_rect(50, 50, 10, 5, Rect::new(0, 0, 100, 40));
        assert_eq!(r, Rect::new(25, 10, 50, 20));
    }
}
