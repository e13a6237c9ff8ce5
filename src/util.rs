//! Utility functions and helpers.

use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|h[1-6]|li|tr|pre|blockquote)>").expect("valid regex")
});
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<li[^>]*>").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("valid regex"));

/// Render a rich-text field (as stored by Azure DevOps) as plain text.
pub fn html_to_text(html: &str) -> String {
    let text = BLOCK_END.replace_all(html, "\n");
    let text = LIST_ITEM.replace_all(&text, "• ");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    let text: Vec<&str> = text.lines().map(str::trim_end).collect();
    BLANK_RUNS
        .replace_all(&text.join("\n"), "\n\n")
        .trim()
        .to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Store plain text in a rich-text field: escape markup, keep line breaks.
pub fn text_to_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "<br>")
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text() {
        let html = "<div>Rework the <b>checkout</b> flow.</div><ul><li>One page</li><li>Saved &amp; secure</li></ul>";
        assert_eq!(
            html_to_text(html),
            "Rework the checkout flow.\n• One page\n• Saved & secure"
        );
    }

    #[test]
    fn test_html_to_text_collapses_blank_lines() {
        assert_eq!(html_to_text("a<br><br><br><br>b"), "a\n\nb");
        assert_eq!(html_to_text("plain"), "plain");
        assert_eq!(html_to_text(""), "");
    }

    #[test]
    fn test_text_to_html_escapes() {
        assert_eq!(text_to_html("a < b\nc & d"), "a &lt; b<br>c &amp; d");
        assert_eq!(html_to_text(&text_to_html("one\ntwo")), "one\ntwo");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 6), "hello…");
    }
}
