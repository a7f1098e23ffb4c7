use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::config::Theme;
use crate::tasks::MAX_REASON_CHARS;
use crate::tui::widgets::color::parse_color;

/// Single-line input for the postpone reason, drawn over the task list.
pub fn render_reason_prompt(f: &mut Frame, area: Rect, task_title: &str, reason: &str, theme: &Theme) {
    let vertical = Layout::vertical([Constraint::Length(7)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(70)]).flex(Flex::Center);
    let [popup] = vertical.areas(area);
    let [popup] = horizontal.areas(popup);

    let style = Style::default()
        .fg(parse_color(&theme.fg))
        .bg(parse_color(&theme.bg));
    let counter = format!(" {}/{} ", reason.chars().count(), MAX_REASON_CHARS);

    let lines = vec![
        Line::from(Span::styled(
            task_title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw("> "),
            Span::raw(reason.to_string()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
    ];

    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Postpone to tomorrow: reason")
                    .title_bottom(Line::from(counter).alignment(Alignment::Right))
                    .style(style),
            )
            .style(style)
            .wrap(Wrap { trim: false }),
        popup,
    );
}
