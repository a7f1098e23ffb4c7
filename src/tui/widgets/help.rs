use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::config::{KeyBindings, Theme};
use crate::utils::format_key_binding_for_display as key;

pub fn render_help(f: &mut Frame, area: Rect, bindings: &KeyBindings, theme: &Theme) {
    let style = Style::default()
        .fg(crate::tui::widgets::color::parse_color(&theme.fg))
        .bg(crate::tui::widgets::color::parse_color(&theme.bg));
    let popup = popup_area(area, 60, 70);

    f.render_widget(Clear, popup);
    let paragraph = Paragraph::new(build_help_text(bindings))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help - Key Bindings")
                .title_alignment(Alignment::Center)
                .style(style),
        )
        .style(style)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, popup);
}

/// Centered rect taking the given percentages of `area`.
pub fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

pub fn build_help_text(b: &KeyBindings) -> String {
    let mut text = String::new();

    text.push_str("Navigation:\n");
    text.push_str(&format!("  {} / {}: Switch tabs\n", key(&b.tab_left), key(&b.tab_right)));
    text.push_str(&format!(
        "  {} / {} / {}: Today / Reflection / Journeys\n",
        key(&b.tab_1),
        key(&b.tab_2),
        key(&b.tab_3)
    ));
    text.push_str(&format!(
        "  {} / {}: Move selection (scrolls on Reflection)\n",
        key(&b.list_up),
        key(&b.list_down)
    ));
    text.push('\n');

    text.push_str("Today:\n");
    text.push_str(&format!(
        "  {}: Complete / reopen task\n",
        key(&b.toggle_task_status)
    ));
    text.push_str(&format!(
        "  {}: Postpone to tomorrow (Enter to confirm, Esc to cancel)\n",
        key(&b.postpone)
    ));
    text.push('\n');

    text.push_str("Reflection:\n");
    text.push_str(&format!(
        "  {}: Generate blog post (cached posts are reused)\n",
        key(&b.generate_blog)
    ));
    text.push_str(&format!("  {}: Copy post to clipboard\n", key(&b.copy_post)));
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Reload from database\n", key(&b.refresh)));
    text.push_str(&format!("  {}: Show/hide help\n", key(&b.help)));
    text.push_str(&format!("  {}: Quit\n", key(&b.quit)));

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_reflects_configured_bindings() {
        let mut bindings = KeyBindings::default();
        bindings.postpone = "Ctrl+p".into();
        let text = build_help_text(&bindings);
        assert!(text.contains("Postpone to tomorrow"));
        assert!(text.contains(&key("Ctrl+p")));
        assert!(text.contains("F1: Show/hide help"));
    }

    #[test]
    fn popup_is_centered() {
        let popup = popup_area(Rect::new(0, 0, 100, 40), 60, 70);
        assert_eq!(popup, Rect::new(20, 6, 60, 28));
    }
}
