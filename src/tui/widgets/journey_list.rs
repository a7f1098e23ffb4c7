use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, StatefulWidget};
use ratatui::Frame;

use crate::config::Theme;
use crate::journey::JourneyStatistics;
use crate::labels::Labels;
use crate::models::Journey;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};

/// Text progress bar, `width` cells wide.
pub fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn render_journey_list(
    f: &mut Frame,
    area: Rect,
    journeys: &[(Journey, JourneyStatistics)],
    list_state: &mut ListState,
    labels: &Labels,
    theme: &Theme,
) {
    let bar_width = (area.width.saturating_sub(12) as usize).min(20);
    let highlight_bg = parse_color(&theme.highlight_bg);

    let rows: Vec<ListItem> = journeys
        .iter()
        .map(|(journey, stats)| {
            ListItem::new(vec![
                Line::from(format!(
                    "{} ({})",
                    journey.title,
                    labels.journey_status(journey.status)
                )),
                Line::from(format!(
                    "  {} {:>3.0}%",
                    progress_bar(stats.progress, bar_width),
                    stats.progress
                )),
            ])
        })
        .collect();

    let list = List::new(rows)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Journeys ({})", journeys.len())),
        )
        .style(Style::default().fg(parse_color(&theme.fg)))
        .highlight_style(
            Style::default()
                .fg(get_contrast_text_color(highlight_bg))
                .bg(highlight_bg),
        );

    StatefulWidget::render(list, area, f.buffer_mut(), list_state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_rounds_and_clamps() {
        assert_eq!(progress_bar(50.0, 4), "██░░");
        assert_eq!(progress_bar(0.0, 3), "░░░");
        assert_eq!(progress_bar(140.0, 2), "██");
    }
}
