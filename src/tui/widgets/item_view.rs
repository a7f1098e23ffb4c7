use ratatui::layout::{Constraint, Direction, Layout as RatLayout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
};
use ratatui::Frame;
use ratskin::RatSkin;
use std::cmp;
use termimad::minimad::Text as MinimadText;

use crate::config::Theme;
use crate::journey::JourneyStatistics;
use crate::labels::Labels;
use crate::models::{DailyReflection, Journey};
use crate::rollover::TodayItem;
use crate::tui::widgets::color::parse_color;

pub fn task_markdown(item: &TodayItem, labels: &Labels) -> String {
    let task = &item.task;
    let mut content = format!("**{}**\n\n", task.title);
    content.push_str(&format!(
        "**Category:** {}\n",
        labels.category(task.category)
    ));
    content.push_str(&format!(
        "**Status:** {}\n",
        if task.is_completed { "done" } else { labels.overdue(item.status) }
    ));
    content.push_str(&format!("**Created:** {}\n", task.created_date));
    if let Some(scheduled) = task.scheduled_date {
        content.push_str(&format!("**Scheduled:** {}\n", scheduled));
    }
    if item.days_overdue > 0 && !task.is_completed {
        content.push_str(&format!("**Days overdue:** {}\n", item.days_overdue));
    }
    match (task.estimated_minutes, task.actual_minutes) {
        (Some(est), Some(act)) => {
            content.push_str(&format!("**Time:** {act} min (estimated {est})\n"))
        }
        (Some(est), None) => content.push_str(&format!("**Estimated:** {est} min\n")),
        (None, Some(act)) => content.push_str(&format!("**Time:** {act} min\n")),
        (None, None) => {}
    }

    if let Some(description) = &task.description {
        content.push_str("\n**Description:**\n\n");
        content.push_str(description);
        content.push('\n');
    }
    if let Some(notes) = &task.notes {
        content.push_str("\n**Notes:**\n\n");
        content.push_str(notes);
        content.push('\n');
    }
    if let Some(reflection) = &task.completion_reflection {
        content.push_str("\n**Completion note:**\n\n");
        content.push_str(reflection);
        content.push('\n');
    }

    if !task.postpone_history.is_empty() {
        content.push_str(&format!("\n**Postponed {} times:**\n\n", task.postpone_count));
        for record in &task.postpone_history {
            content.push_str(&format!(
                "* {} -> {}: {}\n",
                record.from_date, record.to_date, record.reason
            ));
        }
    }
    content
}

pub fn reflection_markdown(reflection: &DailyReflection, labels: &Labels) -> String {
    let mut content = format!("# {}\n\n", reflection.reflection_date);
    content.push_str(&format!(
        "**Tasks:** {}/{} completed ({:.0}%)\n",
        reflection.completed_tasks, reflection.total_tasks, reflection.completion_rate
    ));
    if let Some(score) = reflection.satisfaction_score {
        content.push_str(&format!("**Satisfaction:** {score}/5\n"));
    }
    if let Some(energy) = reflection.energy_level {
        content.push_str(&format!("**Energy:** {energy}/5\n"));
    }
    content.push('\n');
    content.push_str(&reflection.reflection_text);
    content.push('\n');

    let snapshot = &reflection.snapshot;
    if !snapshot.completed.is_empty() {
        content.push_str("\n## Completed\n\n");
        for task in &snapshot.completed {
            content.push_str(&format!("* {} ({})\n", task.title, labels.category(task.category)));
        }
    }
    if !snapshot.incomplete.is_empty() {
        content.push_str("\n## Not finished\n\n");
        for task in &snapshot.incomplete {
            content.push_str(&format!("* {} ({})\n", task.title, labels.category(task.category)));
        }
    }

    if let Some(post) = &reflection.generated_content {
        content.push_str("\n---\n\n");
        if let Some(at) = reflection.generated_at {
            content.push_str(&format!("*Generated {}*\n\n", at.format("%Y-%m-%d %H:%M UTC")));
        }
        content.push_str(post);
        content.push('\n');
    }
    content
}

pub fn journey_markdown(journey: &Journey, stats: &JourneyStatistics, labels: &Labels) -> String {
    let mut content = format!("**{}**\n\n", journey.title);
    content.push_str(&format!(
        "**Status:** {}\n",
        labels.journey_status(journey.status)
    ));
    content.push_str(&format!(
        "**Period:** {} to {}\n",
        journey.start_date, journey.end_date
    ));
    content.push_str(&format!(
        "**Progress:** {:.0}% ({}/{} tasks, {} pending)\n",
        stats.progress, stats.completed_tasks, stats.total_tasks, stats.pending_tasks
    ));
    if stats.estimated_minutes > 0 || stats.actual_minutes > 0 {
        content.push_str(&format!(
            "**Time:** {} min spent of {} estimated\n",
            stats.actual_minutes, stats.estimated_minutes
        ));
    }
    if let Some(description) = &journey.description {
        content.push_str("\n");
        content.push_str(description);
        content.push('\n');
    }
    content
}

/// Render markdown through ratskin into ratatui lines.
fn markdown_lines(markdown: &str, width: u16) -> Vec<Line<'static>> {
    RatSkin::default()
        .parse(MinimadText::from(markdown), width)
        .into_iter()
        .map(|line| {
            let spans: Vec<Span> = line
                .spans
                .into_iter()
                .map(|span| Span::styled(span.content.to_string(), span.style))
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// Scrollable markdown pane with a scrollbar once the content overflows.
pub fn render_markdown_view(
    f: &mut Frame,
    area: Rect,
    title: &str,
    markdown: &str,
    theme: &Theme,
    scroll_offset: usize,
) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let horizontal = RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let content_area = horizontal[0];
    let scrollbar_area = horizontal[1];

    let viewport_height = area.height.saturating_sub(2) as usize;
    let lines = markdown_lines(markdown, content_area.width.saturating_sub(2));
    let total_lines = lines.len();

    let scroll_offset = cmp::min(scroll_offset, total_lines.saturating_sub(viewport_height));
    let end_line = cmp::min(scroll_offset + viewport_height, total_lines);
    let visible = Text::from(lines[scroll_offset..end_line].to_vec());

    // trim: false keeps nested list indentation
    let paragraph = Paragraph::new(visible)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .style(Style::default().fg(parse_color(&theme.fg)))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, content_area);

    if total_lines > viewport_height {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            content_area.y + 1,
            scrollbar_area.width,
            content_area.height.saturating_sub(2),
        );
        let mut state = ScrollbarState::new(total_lines)
            .viewport_content_length(viewport_height)
            .position(scroll_offset);
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut state);
    }
}

/// Bordered pane with a plain hint, for empty tabs.
pub fn render_placeholder(f: &mut Frame, area: Rect, title: &str, message: &str, theme: &Theme) {
    let paragraph = Paragraph::new(message.to_string())
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .style(Style::default().fg(parse_color(&theme.fg)))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{Category, PostponeRecord, Task};
    use crate::rollover::OverdueStatus;
    use crate::testing::date;
    use chrono::{TimeZone, Utc};

    #[test]
    fn task_detail_lists_postpone_history() {
        let clock = FixedClock::at_noon(date(2025, 3, 1));
        let mut task = Task::new("Renew passport", &clock);
        task.category = Category::Personal;
        task.postpone_count = 1;
        task.postpone_history.push(PostponeRecord {
            from_date: date(2025, 3, 1),
            to_date: date(2025, 3, 2),
            reason: "office closed".into(),
            postponed_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
        });
        let item = TodayItem {
            task,
            days_overdue: 2,
            status: OverdueStatus::Overdue,
        };

        let md = task_markdown(&item, &Labels::default());
        assert!(md.contains("**Category:** Personal"));
        assert!(md.contains("**Status:** overdue"));
        assert!(md.contains("**Days overdue:** 2"));
        assert!(md.contains("* 2025-03-01 -> 2025-03-02: office closed"));
    }
}
