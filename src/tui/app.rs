use chrono::Duration;
use ratatui::widgets::ListState;
use std::time::Instant;

use crate::clock::Clock;
use crate::database::{Database, ReflectionStore};
use crate::error::DomainError;
use crate::generation::{self, BlogOptions, HttpGenerator};
use crate::journey::{self, JourneyStatistics};
use crate::labels::Labels;
use crate::models::{DailyReflection, Journey, Task};
use crate::tasks::{self, TodayView, MAX_REASON_CHARS};
use crate::tui::error::TuiError;
use crate::tui::events::Keymap;
use crate::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Today,
    Reflection,
    Journeys,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Today, Tab::Reflection, Tab::Journeys];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Today => "Today",
            Tab::Reflection => "Reflection",
            Tab::Journeys => "Journeys",
        }
    }

    pub fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn shifted(self, step: isize) -> Tab {
        let len = Tab::ALL.len() as isize;
        let next = (self.index() as isize + step).rem_euclid(len);
        Tab::ALL[next as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Help,
    /// Typing the reason for postponing the selected task to tomorrow.
    PostponeReason,
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub current_tab: Tab,
    pub mode: Mode,
    pub selected_index: usize,
    pub list_state: ListState,
    /// Scroll offset of the markdown pane.
    pub view_scroll: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct PostponeState {
    pub task_id: Option<i64>,
    pub reason: String,
}

pub struct App {
    pub config: Config,
    pub database: Database,
    pub clock: Box<dyn Clock>,
    pub labels: Labels,
    pub keys: Keymap,

    pub today: TodayView,
    pub reflection: Option<DailyReflection>,
    pub journeys: Vec<(Journey, JourneyStatistics)>,

    pub ui: UiState,
    pub status: StatusState,
    pub postpone: PostponeState,
}

impl App {
    pub fn new(config: Config, database: Database, clock: Box<dyn Clock>) -> Result<Self, TuiError> {
        let keys = Keymap::from_config(&config.key_bindings)?;
        let labels = config.labels();
        let today = tasks::today_view(&database, clock.as_ref())?;

        let mut app = Self {
            config,
            database,
            clock,
            labels,
            keys,
            today,
            reflection: None,
            journeys: Vec::new(),
            ui: UiState {
                current_tab: Tab::Today,
                mode: Mode::View,
                selected_index: 0,
                list_state: ListState::default(),
                view_scroll: 0,
            },
            status: StatusState::default(),
            postpone: PostponeState::default(),
        };
        app.load_data()?;
        Ok(app)
    }

    /// Reload everything shown on the board. The day may have changed since
    /// the last load, so the today view is always recomputed.
    pub fn load_data(&mut self) -> Result<(), DomainError> {
        let clock = self.clock.as_ref();
        self.today = tasks::today_view(&self.database, clock)?;
        self.reflection = self.database.find_by_date(self.today.date)?;
        self.journeys = journey::list_journeys(&self.database)?
            .into_iter()
            .filter_map(|j| {
                let id = j.id?;
                Some(journey::journey_statistics(&self.database, id).map(|stats| (j, stats)))
            })
            .collect::<Result<_, _>>()?;
        self.adjust_selected_index();
        Ok(())
    }

    fn list_len(&self) -> usize {
        match self.ui.current_tab {
            Tab::Today => self.today.items.len(),
            Tab::Journeys => self.journeys.len(),
            Tab::Reflection => 0,
        }
    }

    pub fn adjust_selected_index(&mut self) {
        let len = self.list_len();
        if self.ui.selected_index >= len {
            self.ui.selected_index = len.saturating_sub(1);
        }
        self.sync_list_state();
    }

    pub fn sync_list_state(&mut self) {
        let selected = (self.list_len() > 0).then_some(self.ui.selected_index);
        self.ui.list_state.select(selected);
    }

    pub fn move_selection_up(&mut self) {
        if self.ui.current_tab == Tab::Reflection {
            self.ui.view_scroll = self.ui.view_scroll.saturating_sub(1);
        } else if self.ui.selected_index > 0 {
            self.ui.selected_index -= 1;
            self.ui.view_scroll = 0;
            self.sync_list_state();
        }
    }

    pub fn move_selection_down(&mut self) {
        if self.ui.current_tab == Tab::Reflection {
            self.ui.view_scroll += 1;
        } else if self.ui.selected_index + 1 < self.list_len() {
            self.ui.selected_index += 1;
            self.ui.view_scroll = 0;
            self.sync_list_state();
        }
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        self.ui.current_tab = tab;
        self.ui.selected_index = 0;
        self.ui.view_scroll = 0;
        self.adjust_selected_index();
    }

    pub fn next_tab(&mut self) {
        self.switch_tab(self.ui.current_tab.shifted(1));
    }

    pub fn previous_tab(&mut self) {
        self.switch_tab(self.ui.current_tab.shifted(-1));
    }

    pub fn set_status_message(&mut self, message: impl Into<String>) {
        self.status.message = Some(message.into());
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status = StatusState::default();
    }

    /// Clear the status message after a few seconds.
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if self
            .status
            .message_time
            .is_some_and(|t| t.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS)
        {
            self.clear_status_message();
        }
    }

    pub fn toggle_help(&mut self) {
        self.ui.mode = match self.ui.mode {
            Mode::Help => Mode::View,
            _ => Mode::Help,
        };
    }

    pub fn selected_task(&self) -> Option<&Task> {
        if self.ui.current_tab != Tab::Today {
            return None;
        }
        self.today
            .items
            .get(self.ui.selected_index)
            .map(|item| &item.task)
    }

    pub fn selected_journey(&self) -> Option<&(Journey, JourneyStatistics)> {
        if self.ui.current_tab != Tab::Journeys {
            return None;
        }
        self.journeys.get(self.ui.selected_index)
    }

    /// Domain failures become status messages; only storage failures abort.
    fn report(&mut self, result: Result<String, DomainError>) -> Result<(), TuiError> {
        match result {
            Ok(message) => {
                self.set_status_message(message);
                Ok(())
            }
            Err(DomainError::Database(e)) => Err(TuiError::DatabaseError(e)),
            Err(e) => {
                self.set_status_message(e.to_string());
                Ok(())
            }
        }
    }

    pub fn toggle_selected_task(&mut self) -> Result<(), TuiError> {
        let Some(id) = self.selected_task().and_then(|t| t.id) else {
            return Ok(());
        };
        let result = tasks::toggle_complete(&self.database, self.clock.as_ref(), id, None, None)
            .map(|task| {
                if task.is_completed {
                    format!("Completed: {}", task.title)
                } else {
                    format!("Reopened: {}", task.title)
                }
            });
        self.report(result)?;
        self.load_data()?;
        Ok(())
    }

    pub fn begin_postpone(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        if task.is_completed {
            self.set_status_message("Completed tasks cannot be postponed");
            return;
        }
        self.postpone = PostponeState {
            task_id: task.id,
            reason: String::new(),
        };
        self.ui.mode = Mode::PostponeReason;
    }

    pub fn push_reason_char(&mut self, c: char) {
        if self.postpone.reason.chars().count() < MAX_REASON_CHARS {
            self.postpone.reason.push(c);
        }
    }

    pub fn pop_reason_char(&mut self) {
        self.postpone.reason.pop();
    }

    pub fn cancel_postpone(&mut self) {
        self.postpone = PostponeState::default();
        self.ui.mode = Mode::View;
    }

    /// Postpone to tomorrow with the typed reason. An invalid reason keeps
    /// the prompt open.
    pub fn submit_postpone(&mut self) -> Result<(), TuiError> {
        let Some(id) = self.postpone.task_id else {
            self.cancel_postpone();
            return Ok(());
        };
        let tomorrow = self.clock.today() + Duration::days(1);
        match tasks::reschedule(
            &self.database,
            self.clock.as_ref(),
            id,
            tomorrow,
            Some(&self.postpone.reason),
        ) {
            Ok(task) => {
                self.cancel_postpone();
                self.set_status_message(format!("Postponed to {}: {}", tomorrow, task.title));
                self.load_data()?;
            }
            Err(DomainError::Validation(message)) => self.set_status_message(message),
            Err(e) => {
                self.cancel_postpone();
                self.report(Err(e))?;
            }
        }
        Ok(())
    }

    /// Generate (or fetch the cached) post for today's reflection.
    pub fn generate_blog(&mut self) -> Result<(), TuiError> {
        let date = self.today.date;
        let options = BlogOptions {
            force: false,
            include_images: self.config.generation.include_images,
            extra_request: None,
        };
        let result = HttpGenerator::from_config(&self.config.generation)
            .map_err(DomainError::from)
            .and_then(|generator| {
                generation::generate_blog(
                    &self.database,
                    self.clock.as_ref(),
                    &generator,
                    &self.labels,
                    date,
                    &options,
                )
            })
            .map(|post| {
                if post.is_cached {
                    "Showing cached post".to_string()
                } else {
                    "Blog post generated".to_string()
                }
            });
        self.report(result)?;
        self.load_data()?;
        Ok(())
    }

    pub fn generated_post(&self) -> Option<&str> {
        self.reflection
            .as_ref()
            .and_then(|r| r.generated_content.as_deref())
    }

    pub fn copy_post_to_clipboard(&mut self) {
        let Some(post) = self.generated_post().map(str::to_string) else {
            self.set_status_message("No generated post to copy");
            return;
        };
        let copied = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(post));
        match copied {
            Ok(()) => self.set_status_message("Post copied to clipboard"),
            Err(e) => self.set_status_message(format!("Clipboard unavailable: {e}")),
        }
    }

    pub fn refresh(&mut self) -> Result<(), TuiError> {
        self.load_data()?;
        self.set_status_message("Refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::journey::NewJourney;
    use crate::tasks::NewTask;
    use crate::testing::date;

    fn app_with_tasks(titles: &[&str]) -> App {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::at_noon(date(2025, 5, 5));
        for title in titles {
            tasks::create_task(&db, &clock, NewTask::titled(*title)).unwrap();
        }
        App::new(Config::default(), db, Box::new(clock)).unwrap()
    }

    #[test]
    fn toggling_updates_the_live_summary() {
        let mut app = app_with_tasks(&["a", "b"]);
        app.move_selection_down();
        app.toggle_selected_task().unwrap();
        assert!(app.today.items[1].task.is_completed);
        assert_eq!(app.today.summary.completion_rate, 50.0);
        assert_eq!(app.status.message.as_deref(), Some("Completed: b"));
    }

    #[test]
    fn postponing_with_a_reason_hides_the_task_until_tomorrow() {
        let mut app = app_with_tasks(&["call bank"]);
        app.begin_postpone();
        assert_eq!(app.ui.mode, Mode::PostponeReason);

        app.submit_postpone().unwrap();
        assert_eq!(app.ui.mode, Mode::PostponeReason, "blank reason keeps the prompt open");

        for c in "closed today".chars() {
            app.push_reason_char(c);
        }
        app.submit_postpone().unwrap();
        assert_eq!(app.ui.mode, Mode::View);
        assert!(app.today.items.is_empty());

        let task = tasks::get_task(&app.database, 1).unwrap();
        assert_eq!(task.postpone_history[0].reason, "closed today");
        assert_eq!(task.scheduled_date, Some(date(2025, 5, 6)));
    }

    #[test]
    fn completed_tasks_are_not_offered_for_postponing() {
        let mut app = app_with_tasks(&["done"]);
        app.toggle_selected_task().unwrap();
        app.begin_postpone();
        assert_eq!(app.ui.mode, Mode::View);
        assert_eq!(
            app.status.message.as_deref(),
            Some("Completed tasks cannot be postponed")
        );
    }

    #[test]
    fn reason_input_is_capped() {
        let mut app = app_with_tasks(&["x"]);
        app.begin_postpone();
        for _ in 0..MAX_REASON_CHARS + 20 {
            app.push_reason_char('a');
        }
        assert_eq!(app.postpone.reason.chars().count(), MAX_REASON_CHARS);
    }

    #[test]
    fn tabs_wrap_and_reset_selection() {
        let mut app = app_with_tasks(&["a", "b"]);
        app.move_selection_down();
        app.previous_tab();
        assert_eq!(app.ui.current_tab, Tab::Journeys);
        assert_eq!(app.ui.list_state.selected(), None);
        app.next_tab();
        assert_eq!(app.ui.current_tab, Tab::Today);
        assert_eq!(app.ui.selected_index, 0);
    }

    #[test]
    fn journeys_tab_lists_statistics() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::at_noon(date(2025, 5, 5));
        let created = journey::create_journey(
            &db,
            &clock,
            NewJourney {
                title: "Marathon".into(),
                description: None,
                start_date: date(2025, 5, 1),
                end_date: date(2025, 10, 1),
                status: None,
            },
        )
        .unwrap();
        let mut task = NewTask::titled("10k run");
        task.journey_id = created.id;
        tasks::create_task(&db, &clock, task).unwrap();

        let mut app = App::new(Config::default(), db, Box::new(clock)).unwrap();
        app.switch_tab(Tab::Journeys);
        let (journey, stats) = app.selected_journey().unwrap();
        assert_eq!(journey.title, "Marathon");
        assert_eq!(stats.total_tasks, 1);
    }
}
