//! Journeys: longer-running goals that group tasks and track how much of
//! them is done.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::clock::Clock;
use crate::database::Database;
use crate::error::DomainError;
use crate::models::{Journey, JourneyStatus, LegacyTodo, TodoPriority, TodoStatus};
use crate::summary::percentage;

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Completion percentage with one decimal; 0.0 when there is nothing to do.
pub fn progress(completed: u32, total: u32) -> f64 {
    percentage(completed, total)
}

pub fn status_for_progress(progress: f64) -> JourneyStatus {
    if progress >= 100.0 {
        JourneyStatus::Completed
    } else if progress > 0.0 {
        JourneyStatus::Active
    } else {
        JourneyStatus::Planning
    }
}

#[derive(Debug, Clone)]
pub struct NewJourney {
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<JourneyStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct JourneyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<JourneyStatus>,
    pub progress: Option<f64>,
}

fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

fn validate(db: &Database, journey: &Journey) -> Result<(), DomainError> {
    let title_len = journey.title.chars().count();
    if title_len == 0 || title_len > MAX_TITLE_CHARS {
        return Err(DomainError::validation(format!(
            "Journey title must be 1 to {MAX_TITLE_CHARS} characters"
        )));
    }
    if journey
        .description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS)
    {
        return Err(DomainError::validation(format!(
            "Journey description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    if journey.end_date < journey.start_date {
        return Err(DomainError::validation(
            "Journey end date must not be before its start date",
        ));
    }
    if !(0.0..=100.0).contains(&journey.progress) {
        return Err(DomainError::validation("Journey progress must be between 0 and 100"));
    }

    let key = title_key(&journey.title);
    let duplicate = db
        .get_all_journeys()?
        .into_iter()
        .any(|other| other.id != journey.id && title_key(&other.title) == key);
    if duplicate {
        return Err(DomainError::validation(format!(
            "A journey titled '{}' already exists",
            journey.title
        )));
    }
    Ok(())
}

pub fn get_journey(db: &Database, id: i64) -> Result<Journey, DomainError> {
    db.get_journey(id)?
        .ok_or_else(|| DomainError::not_found("Journey", id))
}

pub fn create_journey(
    db: &Database,
    clock: &dyn Clock,
    new: NewJourney,
) -> Result<Journey, DomainError> {
    let mut journey = Journey::new(&new.title, new.start_date, new.end_date, clock.now());
    journey.description = new
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if let Some(status) = new.status {
        journey.status = status;
    }
    validate(db, &journey)?;

    let id = db.insert_journey(&journey)?;
    journey.id = Some(id);
    info!(id, title = %journey.title, "created journey");
    Ok(journey)
}

pub fn update_journey(
    db: &Database,
    clock: &dyn Clock,
    id: i64,
    patch: JourneyPatch,
) -> Result<Journey, DomainError> {
    let mut journey = get_journey(db, id)?;
    if let Some(title) = patch.title {
        journey.title = title.trim().to_string();
    }
    if let Some(description) = patch.description {
        let description = description.trim();
        journey.description = (!description.is_empty()).then(|| description.to_string());
    }
    if let Some(start) = patch.start_date {
        journey.start_date = start;
    }
    if let Some(end) = patch.end_date {
        journey.end_date = end;
    }
    if let Some(status) = patch.status {
        journey.status = status;
    }
    if let Some(progress) = patch.progress {
        journey.progress = progress;
    }
    journey.updated_at = Some(clock.now());
    validate(db, &journey)?;

    db.update_journey(&journey)?;
    info!(id, "updated journey");
    Ok(journey)
}

pub fn list_journeys(db: &Database) -> Result<Vec<Journey>, DomainError> {
    Ok(db.get_all_journeys()?)
}

pub fn active_journeys(db: &Database) -> Result<Vec<Journey>, DomainError> {
    Ok(db.get_journeys_with_status(JourneyStatus::Active)?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyChoice {
    pub id: i64,
    pub title: String,
    pub status: JourneyStatus,
}

/// Journeys a new task can be attached to, newest first.
pub fn journeys_for_selection(db: &Database) -> Result<Vec<JourneyChoice>, DomainError> {
    Ok(db
        .get_all_journeys()?
        .into_iter()
        .filter_map(|j| {
            j.id.map(|id| JourneyChoice {
                id,
                title: j.title,
                status: j.status,
            })
        })
        .collect())
}

/// Delete a journey and its daily tasks. Refused while legacy todos still
/// point at it. Returns the number of tasks removed.
pub fn delete_journey(db: &Database, id: i64) -> Result<usize, DomainError> {
    get_journey(db, id)?;
    let legacy = db.count_legacy_todos(id)?;
    if legacy > 0 {
        return Err(DomainError::validation(format!(
            "Journey {id} still has {legacy} journey todo(s); remove them first"
        )));
    }
    let removed = db
        .delete_journey_cascade(id)?
        .ok_or_else(|| DomainError::not_found("Journey", id))?;
    info!(id, tasks = removed, "deleted journey");
    Ok(removed)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyStatistics {
    pub journey_id: i64,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub pending_tasks: u32,
    pub progress: f64,
    pub estimated_minutes: i64,
    /// Sum over completed tasks only.
    pub actual_minutes: i64,
    pub status: JourneyStatus,
}

/// Counts across both the daily tasks and the legacy todos of a journey.
pub fn journey_statistics(db: &Database, id: i64) -> Result<JourneyStatistics, DomainError> {
    let journey = get_journey(db, id)?;
    let tasks = db.get_tasks_for_journey(id)?;
    let legacy = db.get_legacy_todos_for_journey(id)?;

    // (is_completed, estimated, actual) from either collection
    let entries = tasks
        .iter()
        .map(|t| (t.is_completed, t.estimated_minutes, t.actual_minutes))
        .chain(
            legacy
                .iter()
                .map(|t| (t.is_completed, t.estimated_minutes, t.actual_minutes)),
        );

    let mut stats = JourneyStatistics {
        journey_id: id,
        total_tasks: 0,
        completed_tasks: 0,
        pending_tasks: 0,
        progress: 0.0,
        estimated_minutes: 0,
        actual_minutes: 0,
        status: journey.status,
    };
    for (done, estimated, actual) in entries {
        stats.total_tasks += 1;
        stats.estimated_minutes += estimated.unwrap_or(0);
        if done {
            stats.completed_tasks += 1;
            stats.actual_minutes += actual.unwrap_or(0);
        }
    }
    stats.pending_tasks = stats.total_tasks - stats.completed_tasks;
    stats.progress = progress(stats.completed_tasks, stats.total_tasks);
    Ok(stats)
}

pub fn compute_progress(db: &Database, id: i64) -> Result<f64, DomainError> {
    Ok(journey_statistics(db, id)?.progress)
}

/// Recompute and store progress, deriving the status from it.
pub fn refresh_journey_progress(
    db: &Database,
    clock: &dyn Clock,
    id: i64,
) -> Result<Journey, DomainError> {
    let mut journey = get_journey(db, id)?;
    journey.progress = compute_progress(db, id)?;
    journey.status = status_for_progress(journey.progress);
    journey.updated_at = Some(clock.now());
    db.update_journey(&journey)?;
    info!(id, progress = journey.progress, status = journey.status.key(), "refreshed journey");
    Ok(journey)
}

pub fn add_legacy_todo(
    db: &Database,
    clock: &dyn Clock,
    journey_id: i64,
    title: &str,
    priority: TodoPriority,
    status: TodoStatus,
) -> Result<LegacyTodo, DomainError> {
    get_journey(db, journey_id)?;
    if title.trim().is_empty() {
        return Err(DomainError::validation("Todo title must not be empty"));
    }
    let mut todo = LegacyTodo::new(title, journey_id, clock.now());
    todo.priority = priority;
    if status == TodoStatus::Completed {
        todo.complete(clock.now());
    } else {
        todo.status = status;
    }
    let id = db.insert_legacy_todo(&todo)?;
    todo.id = Some(id);
    info!(id, journey_id, "added journey todo");
    Ok(todo)
}

pub fn toggle_legacy_todo(
    db: &Database,
    clock: &dyn Clock,
    id: i64,
) -> Result<LegacyTodo, DomainError> {
    let mut todo = db
        .get_legacy_todo(id)?
        .ok_or_else(|| DomainError::not_found("Journey todo", id))?;
    if todo.is_completed {
        todo.uncomplete();
    } else {
        todo.complete(clock.now());
    }
    db.update_legacy_todo(&todo)?;
    info!(id, completed = todo.is_completed, "toggled journey todo");
    Ok(todo)
}

pub fn legacy_todos(db: &Database, journey_id: i64) -> Result<Vec<LegacyTodo>, DomainError> {
    get_journey(db, journey_id)?;
    Ok(db.get_legacy_todos_for_journey(journey_id)?)
}
