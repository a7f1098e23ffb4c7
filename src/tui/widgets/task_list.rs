use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, List, ListItem, ListState, Scrollbar, ScrollbarOrientation, ScrollbarState,
    StatefulWidget,
};
use ratatui::Frame;

use crate::config::Theme;
use crate::labels::Labels;
use crate::rollover::{OverdueStatus, TodayItem};
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};

/// One row of the today list: check mark, title, and a lateness badge.
pub fn today_row(item: &TodayItem, max_width: usize) -> String {
    let task = &item.task;
    let mark = if task.is_completed { "✓" } else { "○" };
    let badge = match item.status {
        _ if task.is_completed => String::new(),
        OverdueStatus::Overdue => format!(" [+{}d]", item.days_overdue),
        OverdueStatus::Scheduled | OverdueStatus::Today => String::new(),
    };
    let postponed = if task.postpone_count > 0 {
        format!(" ↻{}", task.postpone_count)
    } else {
        String::new()
    };

    let row = format!("{} {}{}{}", mark, task.title, badge, postponed);
    if row.chars().count() > max_width {
        row.chars().take(max_width.saturating_sub(3)).collect::<String>() + "..."
    } else {
        row
    }
}

pub fn render_task_list(
    f: &mut Frame,
    area: Rect,
    items: &[TodayItem],
    list_state: &mut ListState,
    labels: &Labels,
    theme: &Theme,
) {
    let max_width = area.width.saturating_sub(4) as usize;
    let highlight_bg = parse_color(&theme.highlight_bg);
    let highlight_fg = if theme.highlight_fg.is_empty() {
        get_contrast_text_color(highlight_bg)
    } else {
        parse_color(&theme.highlight_fg)
    };
    let overdue = Style::default().fg(parse_color(&theme.overdue_fg));
    let done = Style::default()
        .fg(parse_color(&theme.done_fg))
        .add_modifier(Modifier::CROSSED_OUT);

    let rows: Vec<ListItem> = items
        .iter()
        .map(|item| {
            let style = if item.task.is_completed {
                done
            } else if item.status == OverdueStatus::Overdue {
                overdue
            } else {
                Style::default()
            };
            let category = Span::styled(
                format!("  {}", labels.category(item.task.category)),
                Style::default().add_modifier(Modifier::DIM),
            );
            ListItem::new(vec![
                Line::from(Span::styled(today_row(item, max_width), style)),
                Line::from(category),
            ])
        })
        .collect();

    let areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let list_area = areas[0];
    let scrollbar_area = areas[1];

    let done_count = items.iter().filter(|i| i.task.is_completed).count();
    let list = List::new(rows)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Today ({}/{})", done_count, items.len())),
        )
        .style(Style::default().fg(parse_color(&theme.fg)))
        .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg));

    StatefulWidget::render(list, list_area, f.buffer_mut(), list_state);

    // Each row takes two lines.
    let visible_items = (list_area.height.saturating_sub(2) / 2) as usize;
    if items.len() > visible_items && visible_items > 0 && scrollbar_area.width > 0 {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            list_area.y + 1,
            scrollbar_area.width,
            list_area.height.saturating_sub(2),
        );
        let selected = list_state.selected().unwrap_or(0);
        let position = selected.saturating_sub(visible_items - 1);
        let mut state = ScrollbarState::new(items.len())
            .viewport_content_length(visible_items)
            .position(position);
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut state);
    }
}
