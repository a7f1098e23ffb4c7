use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

use crate::config::Theme;
use crate::tui::app::{App, Mode, Tab};
use crate::tui::layout::Layout;
use crate::tui::widgets::{
    color::parse_color,
    help::render_help,
    item_view::{
        journey_markdown, reflection_markdown, render_markdown_view, render_placeholder,
        task_markdown,
    },
    journey_list::render_journey_list,
    reason_prompt::render_reason_prompt,
    status_bar::render_status_bar,
    tabs::render_tabs,
    task_list::render_task_list,
};
use crate::utils::format_key_binding_for_display as key;

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let theme = app.config.get_active_theme();
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("daybook")
        .title_alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(parse_color(&theme.fg))
                .bg(parse_color(&theme.bg)),
        );
    f.render_widget(outer_block, f.area());

    render_tabs(f, layout.tabs_area, app.ui.current_tab, &theme);
    render_summary_line(f, layout.summary_area, app, &theme);

    match app.ui.current_tab {
        Tab::Today => render_today(f, app, layout, &theme),
        Tab::Reflection => render_reflection(f, app, layout, &theme),
        Tab::Journeys => render_journeys(f, app, layout, &theme),
    }

    let hints = key_hints(app);
    render_status_bar(
        f,
        layout.status_area,
        app.status.message.as_deref(),
        &hints,
        &theme,
    );

    match app.ui.mode {
        Mode::Help => render_help(f, layout.inner_area, &app.config.key_bindings, &theme),
        Mode::PostponeReason => {
            let title = app
                .today
                .items
                .iter()
                .find(|item| item.task.id.is_some() && item.task.id == app.postpone.task_id)
                .map(|item| item.task.title.as_str())
                .unwrap_or_default();
            render_reason_prompt(f, layout.inner_area, title, &app.postpone.reason, &theme);
        }
        Mode::View => {}
    }
}

fn render_summary_line(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    match app.ui.current_tab {
        Tab::Today => {
            let summary = &app.today.summary;
            let label = format!(
                "{}  {}/{} done ({:.0}%)",
                app.today.date, summary.completed, summary.total, summary.completion_rate
            );
            let gauge = Gauge::default()
                .gauge_style(
                    Style::default()
                        .fg(parse_color(&theme.highlight_bg))
                        .bg(parse_color(&theme.bg)),
                )
                .ratio((summary.completion_rate / 100.0).clamp(0.0, 1.0))
                .label(label);
            f.render_widget(gauge, area);
        }
        Tab::Reflection => {
            let text = match &app.reflection {
                Some(r) if r.generated_content.is_some() => {
                    format!("{}  reflection written, post generated", r.reflection_date)
                }
                Some(r) => format!("{}  reflection written", r.reflection_date),
                None => format!("{}  no reflection yet", app.today.date),
            };
            f.render_widget(Paragraph::new(text), area);
        }
        Tab::Journeys => {
            let active = app
                .journeys
                .iter()
                .filter(|(j, _)| j.status == crate::models::JourneyStatus::Active)
                .count();
            f.render_widget(
                Paragraph::new(format!("{} journeys, {} active", app.journeys.len(), active)),
                area,
            );
        }
    }
}

fn render_today(f: &mut Frame, app: &mut App, layout: &Layout, theme: &Theme) {
    if app.today.items.is_empty() {
        render_placeholder(
            f,
            layout.content_area(),
            "Today",
            "Nothing to do today. Add a task with `daybook add <title>`.",
            theme,
        );
        return;
    }

    render_task_list(
        f,
        layout.list_area,
        &app.today.items,
        &mut app.ui.list_state,
        &app.labels,
        theme,
    );
    if let Some(item) = app.today.items.get(app.ui.selected_index) {
        render_markdown_view(
            f,
            layout.detail_area,
            "Task",
            &task_markdown(item, &app.labels),
            theme,
            app.ui.view_scroll,
        );
    }
}

fn render_reflection(f: &mut Frame, app: &App, layout: &Layout, theme: &Theme) {
    match &app.reflection {
        Some(reflection) => render_markdown_view(
            f,
            layout.content_area(),
            "Reflection",
            &reflection_markdown(reflection, &app.labels),
            theme,
            app.ui.view_scroll,
        ),
        None => render_placeholder(
            f,
            layout.content_area(),
            "Reflection",
            "No reflection for today yet. Write one with `daybook reflect <text>`.",
            theme,
        ),
    }
}

fn render_journeys(f: &mut Frame, app: &mut App, layout: &Layout, theme: &Theme) {
    if app.journeys.is_empty() {
        render_placeholder(
            f,
            layout.content_area(),
            "Journeys",
            "No journeys yet. Start one with `daybook journey add`.",
            theme,
        );
        return;
    }

    render_journey_list(
        f,
        layout.list_area,
        &app.journeys,
        &mut app.ui.list_state,
        &app.labels,
        theme,
    );
    if let Some((journey, stats)) = app.journeys.get(app.ui.selected_index) {
        render_markdown_view(
            f,
            layout.detail_area,
            "Journey",
            &journey_markdown(journey, stats, &app.labels),
            theme,
            app.ui.view_scroll,
        );
    }
}

fn key_hints(app: &App) -> Vec<String> {
    let b = &app.config.key_bindings;
    if app.ui.mode == Mode::PostponeReason {
        return vec!["Enter: Postpone".into(), "Esc: Cancel".into()];
    }

    let mut hints = vec![format!("{}: Help", key(&b.help))];
    match app.ui.current_tab {
        Tab::Today => {
            hints.push(format!("{}: Done", key(&b.toggle_task_status)));
            hints.push(format!("{}: Postpone", key(&b.postpone)));
        }
        Tab::Reflection => {
            hints.push(format!("{}: Generate post", key(&b.generate_blog)));
            hints.push(format!("{}: Copy post", key(&b.copy_post)));
        }
        Tab::Journeys => {}
    }
    hints.push(format!("{}/{}: Move", key(&b.list_down), key(&b.list_up)));
    hints.push(format!("{}: Refresh", key(&b.refresh)));
    hints.push(format!("{}: Quit", key(&b.quit)));
    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::database::Database;
    use crate::tasks::{self, NewTask};
    use crate::testing::date;
    use crate::Config;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal
            .draw(|f| {
                let layout = Layout::calculate(f.area());
                render(f, app, &layout);
            })
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn today_tab_shows_tasks_and_progress() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::at_noon(date(2025, 4, 1));
        tasks::create_task(&db, &clock, NewTask::titled("Water plants")).unwrap();
        let mut app = App::new(Config::default(), db, Box::new(clock)).unwrap();

        let text = screen(&mut app);
        assert!(text.contains("daybook"));
        assert!(text.contains("Water plants"));
        assert!(text.contains("0/1 done"));
    }

    #[test]
    fn empty_reflection_tab_explains_what_to_do() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::at_noon(date(2025, 4, 1));
        let mut app = App::new(Config::default(), db, Box::new(clock)).unwrap();
        app.switch_tab(Tab::Reflection);

        let text = screen(&mut app);
        assert!(text.contains("no reflection yet"));
    }

    #[test]
    fn reason_prompt_hints_replace_the_defaults() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::at_noon(date(2025, 4, 1));
        tasks::create_task(&db, &clock, NewTask::titled("Call mom")).unwrap();
        let mut app = App::new(Config::default(), db, Box::new(clock)).unwrap();
        app.begin_postpone();

        assert_eq!(key_hints(&app), vec!["Enter: Postpone", "Esc: Cancel"]);
        assert!(screen(&mut app).contains("Postpone to tomorrow"));
    }
}
