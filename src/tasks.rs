//! Task operations: creation, editing, completion, rescheduling and the
//! views built on the rollover rules.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::database::TaskStore;
use crate::error::DomainError;
use crate::models::{Category, PostponeRecord, Task};
use crate::rollover::{self, Day, TodayItem};
use crate::summary::{self, CategoryCount, DailySummary, WeeklySummary};

/// Longest accepted postpone reason, in characters.
pub const MAX_REASON_CHARS: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub category: Category,
    pub estimated_minutes: Option<i64>,
    pub journey_id: Option<i64>,
    /// Defaults to the creation day.
    pub scheduled_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial edit. `None` leaves a field alone; an empty string clears an
/// optional text field.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub category: Option<Category>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    pub journey_id: Option<i64>,
}

fn clean_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::validation("Task title must not be empty"));
    }
    Ok(title.to_string())
}

fn clean_optional(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

pub fn validate_reason(reason: &str) -> Result<String, DomainError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DomainError::validation("A postpone reason is required"));
    }
    if reason.chars().count() > MAX_REASON_CHARS {
        return Err(DomainError::validation(format!(
            "Postpone reason must be at most {MAX_REASON_CHARS} characters"
        )));
    }
    Ok(reason.to_string())
}

pub fn get_task(store: &(impl TaskStore + ?Sized), id: i64) -> Result<Task, DomainError> {
    store
        .find_by_id(id)?
        .ok_or_else(|| DomainError::not_found("Task", id))
}

/// A referenced journey must exist before a task may point at it.
fn ensure_journey(
    store: &(impl TaskStore + ?Sized),
    journey_id: Option<i64>,
) -> Result<(), DomainError> {
    match journey_id {
        Some(id) if !store.journey_exists(id)? => Err(DomainError::not_found("Journey", id)),
        _ => Ok(()),
    }
}

pub fn create_task(
    store: &(impl TaskStore + ?Sized),
    clock: &dyn Clock,
    new: NewTask,
) -> Result<Task, DomainError> {
    let mut task = Task::new(&clean_title(&new.title)?, clock);
    ensure_journey(store, new.journey_id)?;
    task.description = clean_optional(new.description);
    task.notes = clean_optional(new.notes);
    task.category = new.category;
    task.estimated_minutes = new.estimated_minutes;
    task.journey_id = new.journey_id;
    if let Some(date) = new.scheduled_date {
        task.scheduled_date = Some(date);
    }

    let id = store.save(&task)?;
    task.id = Some(id);
    info!(id, title = %task.title, "created task");
    Ok(task)
}

pub fn update_task(
    store: &(impl TaskStore + ?Sized),
    id: i64,
    patch: TaskPatch,
) -> Result<Task, DomainError> {
    let mut task = get_task(store, id)?;
    if let Some(title) = patch.title {
        task.title = clean_title(&title)?;
    }
    if patch.description.is_some() {
        task.description = clean_optional(patch.description);
    }
    if patch.notes.is_some() {
        task.notes = clean_optional(patch.notes);
    }
    if let Some(category) = patch.category {
        task.category = category;
    }
    if patch.estimated_minutes.is_some() {
        task.estimated_minutes = patch.estimated_minutes;
    }
    if patch.actual_minutes.is_some() {
        task.actual_minutes = patch.actual_minutes;
    }
    if patch.journey_id.is_some() {
        ensure_journey(store, patch.journey_id)?;
        task.journey_id = patch.journey_id;
    }

    store.save(&task)?;
    info!(id, "updated task");
    Ok(task)
}

/// Flip completion. Completing attaches the optional reflection and image
/// reference; undoing clears them along with the completion instant.
pub fn toggle_complete(
    store: &(impl TaskStore + ?Sized),
    clock: &dyn Clock,
    id: i64,
    reflection: Option<&str>,
    image: Option<&str>,
) -> Result<Task, DomainError> {
    let mut task = get_task(store, id)?;
    if task.is_completed {
        task.uncomplete();
    } else {
        task.complete(clock.now());
        task.completion_reflection = clean_optional(reflection.map(str::to_string));
        task.completion_image = clean_optional(image.map(str::to_string));
    }

    store.save(&task)?;
    info!(id, completed = task.is_completed, "toggled task");
    Ok(task)
}

/// Move an open task to `new_date`.
///
/// With a reason the move is recorded in the postpone history and only the
/// scheduled date changes. Without one, both the scheduled and the creation
/// date are set to `new_date` and nothing is recorded, so the task looks as
/// if it had been created on that day.
pub fn reschedule(
    store: &(impl TaskStore + ?Sized),
    clock: &dyn Clock,
    id: i64,
    new_date: NaiveDate,
    reason: Option<&str>,
) -> Result<Task, DomainError> {
    let mut task = get_task(store, id)?;
    if task.is_completed {
        return Err(DomainError::InvalidStateTransition(
            "Cannot postpone a completed task".to_string(),
        ));
    }

    match reason {
        Some(reason) => {
            let reason = validate_reason(reason)?;
            task.postpone_history.push(PostponeRecord {
                from_date: task.current_date(),
                to_date: new_date,
                reason,
                postponed_at: clock.now(),
            });
            task.postpone_count += 1;
            task.scheduled_date = Some(new_date);
        }
        None => {
            task.scheduled_date = Some(new_date);
            task.created_date = new_date;
        }
    }

    store.save(&task)?;
    info!(id, to = %new_date, with_reason = reason.is_some(), "rescheduled task");
    Ok(task)
}

pub fn delete_task(store: &(impl TaskStore + ?Sized), id: i64) -> Result<(), DomainError> {
    if !store.delete(id)? {
        return Err(DomainError::not_found("Task", id));
    }
    info!(id, "deleted task");
    Ok(())
}

/// The today list and its summary, both computed from one load of the
/// task collection.
#[derive(Debug, Clone, Serialize)]
pub struct TodayView {
    pub date: NaiveDate,
    pub items: Vec<TodayItem>,
    pub summary: DailySummary,
}

pub fn today_view(
    store: &(impl TaskStore + ?Sized),
    clock: &dyn Clock,
) -> Result<TodayView, DomainError> {
    let day = Day::today(clock);
    let tasks = store.all()?;
    let items = rollover::today_items(&tasks, &day);
    let summary = summary::aggregate(items.iter().map(|item| &item.task));
    debug!(date = %day.date, visible = items.len(), "computed today view");
    Ok(TodayView {
        date: day.date,
        items,
        summary,
    })
}

pub fn today_summary(
    store: &(impl TaskStore + ?Sized),
    clock: &dyn Clock,
) -> Result<DailySummary, DomainError> {
    let tasks = store.all()?;
    Ok(summary::live_summary(&tasks, &Day::today(clock)))
}

pub fn weekly_summary(
    store: &(impl TaskStore + ?Sized),
    clock: &dyn Clock,
) -> Result<WeeklySummary, DomainError> {
    let tasks = store.all()?;
    Ok(summary::weekly_summary(&tasks, clock.today()))
}

pub fn category_summary(
    store: &(impl TaskStore + ?Sized),
    clock: &dyn Clock,
) -> Result<Vec<CategoryCount>, DomainError> {
    let tasks = store.all()?;
    Ok(summary::category_summary(&tasks, clock.today()))
}

#[derive(Debug, Clone, Serialize)]
pub struct PostponeSummary {
    pub postpone_count: u32,
    pub original_date: NaiveDate,
    pub current_date: NaiveDate,
    pub total_days_postponed: i64,
    /// Up to three reasons, newest first.
    pub recent_reasons: Vec<String>,
    pub history: Vec<PostponeRecord>,
}

pub fn postpone_summary(
    store: &(impl TaskStore + ?Sized),
    id: i64,
) -> Result<PostponeSummary, DomainError> {
    let task = get_task(store, id)?;
    let current_date = task.current_date();
    Ok(PostponeSummary {
        postpone_count: task.postpone_count,
        original_date: task.created_date,
        current_date,
        total_days_postponed: (current_date - task.created_date).num_days(),
        recent_reasons: task
            .postpone_history
            .iter()
            .rev()
            .take(3)
            .map(|record| record.reason.clone())
            .collect(),
        history: task.postpone_history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::database::Database;
    use crate::testing::date;
    use chrono::Duration;

    fn setup(day: NaiveDate) -> (Database, FixedClock) {
        (Database::open_in_memory().unwrap(), FixedClock::at_noon(day))
    }

    fn visible_ids(db: &Database, clock: &FixedClock) -> Vec<i64> {
        today_view(db, clock)
            .unwrap()
            .items
            .iter()
            .filter_map(|item| item.task.id)
            .collect()
    }

    #[test]
    fn blank_title_is_rejected() {
        let (db, clock) = setup(date(2025, 1, 1));
        let err = create_task(&db, &clock, NewTask::titled("   ")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(db.all().unwrap().is_empty());
    }

    #[test]
    fn create_trims_and_defaults() {
        let (db, clock) = setup(date(2025, 1, 1));
        let mut new = NewTask::titled("  Read  ");
        new.description = Some("   ".into());
        let task = create_task(&db, &clock, new).unwrap();
        assert_eq!(task.title, "Read");
        assert_eq!(task.description, None);
        assert_eq!(task.category, Category::Other);
        assert_eq!(task.scheduled_date, Some(date(2025, 1, 1)));
    }

    #[test]
    fn carried_over_task_can_be_postponed_away_and_back() {
        let day1 = date(2025, 1, 1);
        let day2 = date(2025, 1, 2);
        let day4 = date(2025, 1, 4);
        let (db, mut clock) = setup(day1);
        let a = create_task(&db, &clock, NewTask::titled("A")).unwrap();
        let id = a.id.unwrap();

        clock.advance_to(day2);
        assert_eq!(visible_ids(&db, &clock), vec![id]);

        let moved = reschedule(&db, &clock, id, day4, Some("busy")).unwrap();
        assert_eq!(moved.postpone_count, 1);
        assert_eq!(moved.postpone_history.len(), 1);
        assert_eq!(moved.postpone_history[0].from_date, day1);
        assert_eq!(moved.postpone_history[0].to_date, day4);
        assert_eq!(moved.postpone_history[0].reason, "busy");
        assert_eq!(moved.created_date, day1);
        assert!(visible_ids(&db, &clock).is_empty());

        clock.advance_to(date(2025, 1, 3));
        assert!(visible_ids(&db, &clock).is_empty());

        clock.advance_to(day4);
        assert_eq!(visible_ids(&db, &clock), vec![id]);
    }

    #[test]
    fn postponing_to_tomorrow_hides_task_today() {
        let today = date(2025, 2, 10);
        let (db, clock) = setup(today);
        let task = create_task(&db, &clock, NewTask::titled("call")).unwrap();
        let id = task.id.unwrap();
        reschedule(&db, &clock, id, today + Duration::days(1), Some("no time")).unwrap();

        let view = today_view(&db, &clock).unwrap();
        assert!(view.items.is_empty());
        assert_eq!(view.summary.total, 0);
    }

    #[test]
    fn task_postponed_into_today_counts_as_pending() {
        let yesterday = date(2025, 2, 9);
        let today = date(2025, 2, 10);
        let (db, mut clock) = setup(yesterday);
        let task = create_task(&db, &clock, NewTask::titled("pay bill")).unwrap();
        let id = task.id.unwrap();
        reschedule(&db, &clock, id, date(2025, 2, 12), Some("waiting")).unwrap();

        clock.advance_to(today);
        reschedule(&db, &clock, id, today, Some("money arrived")).unwrap();
        let view = today_view(&db, &clock).unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.summary.pending, 1);
        assert_eq!(postpone_summary(&db, id).unwrap().recent_reasons, vec!["money arrived", "waiting"]);
    }

    #[test]
    fn toggling_twice_restores_pending_state() {
        let (db, clock) = setup(date(2025, 3, 3));
        let original = create_task(&db, &clock, NewTask::titled("swim")).unwrap();
        let id = original.id.unwrap();

        let done = toggle_complete(&db, &clock, id, Some("30 laps"), Some("pool.jpg")).unwrap();
        assert!(done.is_completed);
        assert_eq!(done.completed_at, Some(clock.now()));
        assert_eq!(done.completion_reflection.as_deref(), Some("30 laps"));

        let undone = toggle_complete(&db, &clock, id, None, None).unwrap();
        assert_eq!(undone, original);
        assert_eq!(get_task(&db, id).unwrap(), original);
    }

    #[test]
    fn completed_task_cannot_be_postponed() {
        let (db, clock) = setup(date(2025, 3, 3));
        let id = create_task(&db, &clock, NewTask::titled("x")).unwrap().id.unwrap();
        toggle_complete(&db, &clock, id, None, None).unwrap();

        for reason in [Some("later"), None] {
            let err = reschedule(&db, &clock, id, date(2025, 3, 4), reason).unwrap_err();
            assert!(matches!(err, DomainError::InvalidStateTransition(_)));
        }
    }

    #[test]
    fn invalid_reasons_are_rejected_before_writing() {
        let (db, clock) = setup(date(2025, 3, 3));
        let id = create_task(&db, &clock, NewTask::titled("x")).unwrap().id.unwrap();
        let too_long = "a".repeat(MAX_REASON_CHARS + 1);

        for reason in ["", "   ", too_long.as_str()] {
            let err = reschedule(&db, &clock, id, date(2025, 3, 5), Some(reason)).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
        let stored = get_task(&db, id).unwrap();
        assert_eq!(stored.postpone_count, 0);
        assert_eq!(stored.scheduled_date, Some(date(2025, 3, 3)));

        let exact = "가".repeat(MAX_REASON_CHARS);
        assert!(reschedule(&db, &clock, id, date(2025, 3, 5), Some(&exact)).is_ok());
    }

    #[test]
    fn reschedule_without_reason_moves_creation_date() {
        let (db, clock) = setup(date(2025, 3, 3));
        let id = create_task(&db, &clock, NewTask::titled("x")).unwrap().id.unwrap();
        let moved = reschedule(&db, &clock, id, date(2025, 3, 6), None).unwrap();
        assert_eq!(moved.created_date, date(2025, 3, 6));
        assert_eq!(moved.scheduled_date, Some(date(2025, 3, 6)));
        assert_eq!(moved.postpone_count, 0);
        assert!(moved.postpone_history.is_empty());

        let summary = postpone_summary(&db, id).unwrap();
        assert_eq!(summary.total_days_postponed, 0);
    }

    #[test]
    fn missing_task_is_not_found() {
        let (db, clock) = setup(date(2025, 3, 3));
        assert!(matches!(
            toggle_complete(&db, &clock, 9, None, None),
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(delete_task(&db, 9), Err(DomainError::NotFound { .. })));
        assert!(matches!(
            reschedule(&db, &clock, 9, date(2025, 3, 4), Some("x")),
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn unknown_journey_is_not_found_and_nothing_is_written() {
        let (db, clock) = setup(date(2025, 3, 3));
        let mut new = NewTask::titled("orphan");
        new.journey_id = Some(999);
        let err = create_task(&db, &clock, new).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { kind: "Journey", .. }));
        assert!(db.all().unwrap().is_empty());

        let task = create_task(&db, &clock, NewTask::titled("plain")).unwrap();
        let patch = TaskPatch {
            journey_id: Some(999),
            ..Default::default()
        };
        let err = update_task(&db, task.id.unwrap(), patch).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { kind: "Journey", .. }));
        assert_eq!(get_task(&db, task.id.unwrap()).unwrap().journey_id, None);
    }

    #[test]
    fn patch_clears_text_with_empty_string() {
        let (db, clock) = setup(date(2025, 3, 3));
        let mut new = NewTask::titled("x");
        new.notes = Some("keep receipts".into());
        let id = create_task(&db, &clock, new).unwrap().id.unwrap();

        let patched = update_task(
            &db,
            id,
            TaskPatch {
                notes: Some(String::new()),
                category: Some(Category::Work),
                actual_minutes: Some(25),
                ..TaskPatch::default()
            },
        )
        .unwrap();
        assert_eq!(patched.notes, None);
        assert_eq!(patched.category, Category::Work);
        assert_eq!(patched.actual_minutes, Some(25));
        assert_eq!(patched.title, "x");
    }
}
