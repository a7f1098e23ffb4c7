use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::config::Theme;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};

const SEPARATOR: &str = " • ";
const ELLIPSIS: &str = "...";

/// One-line status bar: the status message when there is one, otherwise as
/// many key hints as fit.
pub fn render_status_bar(
    f: &mut Frame,
    area: Rect,
    message: Option<&str>,
    key_hints: &[String],
    theme: &Theme,
) {
    let max_width = area.width as usize;
    let (content, style) = match message {
        Some(msg) => {
            let highlight_bg = parse_color(&theme.highlight_bg);
            (
                truncate(msg, max_width),
                Style::default()
                    .fg(get_contrast_text_color(highlight_bg))
                    .bg(highlight_bg)
                    .add_modifier(Modifier::BOLD),
            )
        }
        None => (
            fit_hints(key_hints, max_width),
            Style::default()
                .fg(parse_color(&theme.fg))
                .bg(parse_color(&theme.bg)),
        ),
    };

    f.render_widget(Paragraph::new(content).style(style), area);
}

fn truncate(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    let mut out: String = text
        .chars()
        .take(max_width.saturating_sub(ELLIPSIS.len()))
        .collect();
    out.push_str(ELLIPSIS);
    out
}

/// Join hints with a separator, stopping with an ellipsis at the first one
/// that would overflow.
pub fn fit_hints(hints: &[String], max_width: usize) -> String {
    let separator_len = SEPARATOR.chars().count();
    let mut text = String::new();
    let mut len = 0;

    for (i, hint) in hints.iter().enumerate() {
        let hint_len = hint.chars().count();
        let next_len = if i == 0 {
            hint_len
        } else {
            len + separator_len + hint_len
        };

        if next_len > max_width {
            if i == 0 {
                return truncate(hint, max_width);
            }
            if len + ELLIPSIS.len() <= max_width {
                text.push_str(ELLIPSIS);
            } else {
                text = truncate(&text, max_width);
            }
            return text;
        }

        if i > 0 {
            text.push_str(SEPARATOR);
        }
        text.push_str(hint);
        len = next_len;
    }
    text
}
