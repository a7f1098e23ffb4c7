//! End-of-day reflections and the task snapshot frozen into them.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::info;

use crate::clock::Clock;
use crate::database::{Database, ReflectionStore, TaskStore};
use crate::error::DomainError;
use crate::models::{DailyReflection, SnapshotCompleted, SnapshotPending, Task, TasksSnapshot};
use crate::rollover::{self, Day};
use crate::summary::{self, round1, DailySummary};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;
pub const DEFAULT_RECENT_LIMIT: u32 = 30;
pub const DEFAULT_STATS_DAYS: i64 = 30;

#[derive(Debug, Clone, Default)]
pub struct ReflectionInput {
    pub text: String,
    pub satisfaction_score: Option<u8>,
    pub energy_level: Option<u8>,
}

pub fn validate_score(name: &str, score: Option<u8>) -> Result<Option<u8>, DomainError> {
    match score {
        Some(value) if !(MIN_SCORE..=MAX_SCORE).contains(&value) => Err(DomainError::validation(
            format!("{name} must be between {MIN_SCORE} and {MAX_SCORE}, got {value}"),
        )),
        _ => Ok(score),
    }
}

/// Counts and task lists for `day`, selected with
/// [`rollover::counted_for_reflection`].
pub fn build_snapshot(tasks: &[Task], day: &Day) -> (DailySummary, TasksSnapshot) {
    let counted = rollover::reflection_tasks(tasks, day);
    let stats = summary::aggregate(counted.iter().copied());
    let mut snapshot = TasksSnapshot::default();
    for task in counted {
        let id = task.id.unwrap_or_default();
        if task.is_completed {
            snapshot.completed.push(SnapshotCompleted {
                id,
                title: task.title.clone(),
                category: task.category,
                completed_at: task.completed_at,
                estimated_minutes: task.estimated_minutes,
                actual_minutes: task.actual_minutes,
            });
        } else {
            snapshot.incomplete.push(SnapshotPending {
                id,
                title: task.title.clone(),
                category: task.category,
                estimated_minutes: task.estimated_minutes,
            });
        }
    }
    (stats, snapshot)
}

/// Create or overwrite the reflection for `date`, recomputing its snapshot
/// from the current task collection.
pub fn upsert_reflection<S>(
    store: &S,
    clock: &dyn Clock,
    date: NaiveDate,
    input: ReflectionInput,
) -> Result<DailyReflection, DomainError>
where
    S: TaskStore + ReflectionStore + ?Sized,
{
    let text = input.text.trim();
    if text.is_empty() {
        return Err(DomainError::validation("Reflection text must not be empty"));
    }
    let satisfaction_score = validate_score("Satisfaction score", input.satisfaction_score)?;
    let energy_level = validate_score("Energy level", input.energy_level)?;

    let tasks = store.all()?;
    let (stats, snapshot) = build_snapshot(&tasks, &Day::of(date, clock));
    let now = clock.now();
    let existing = store.find_by_date(date)?;

    let mut reflection = DailyReflection {
        id: existing.as_ref().and_then(|r| r.id),
        reflection_date: date,
        reflection_text: text.to_string(),
        total_tasks: stats.total,
        completed_tasks: stats.completed,
        completion_rate: stats.completion_rate,
        snapshot,
        satisfaction_score,
        energy_level,
        generated_content: None,
        generation_prompt: None,
        generated_at: None,
        created_at: existing.as_ref().map_or(now, |r| r.created_at),
        updated_at: existing.as_ref().map(|_| now),
    };
    if let Some(previous) = existing {
        reflection.generated_content = previous.generated_content;
        reflection.generation_prompt = previous.generation_prompt;
        reflection.generated_at = previous.generated_at;
    }

    let id = store.upsert(&reflection)?;
    reflection.id = Some(id);
    info!(
        %date,
        total = reflection.total_tasks,
        completed = reflection.completed_tasks,
        "saved reflection"
    );
    Ok(reflection)
}

pub fn get_reflection<S>(store: &S, date: NaiveDate) -> Result<DailyReflection, DomainError>
where
    S: ReflectionStore + ?Sized,
{
    store
        .find_by_date(date)?
        .ok_or_else(|| DomainError::not_found("Reflection", date))
}

pub fn delete_reflection<S>(store: &S, date: NaiveDate) -> Result<(), DomainError>
where
    S: ReflectionStore + ?Sized,
{
    if !store.delete_by_date(date)? {
        return Err(DomainError::not_found("Reflection", date));
    }
    info!(%date, "deleted reflection");
    Ok(())
}

pub fn recent_reflections(db: &Database, limit: u32) -> Result<Vec<DailyReflection>, DomainError> {
    Ok(db.get_recent_reflections(limit)?)
}

/// Reflections of one calendar month, newest first.
pub fn reflections_in_month(
    db: &Database,
    year: i32,
    month: u32,
) -> Result<Vec<DailyReflection>, DomainError> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| DomainError::validation(format!("Invalid month {year}-{month}")))?;
    let next = if month == 12 {
        year.checked_add(1).and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| DomainError::validation(format!("Invalid month {year}-{month}")))?;
    let end = next
        .pred_opt()
        .ok_or_else(|| DomainError::validation(format!("Invalid month {year}-{month}")))?;

    let mut reflections = db.get_reflections_between(start, end)?;
    reflections.reverse();
    Ok(reflections)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReflectionStats {
    pub total_days: u32,
    pub avg_completion_rate: f64,
    pub avg_satisfaction: f64,
    pub avg_energy: f64,
    pub total_tasks: u32,
    pub total_completed: u32,
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { round1(sum / count as f64) }
}

pub fn stats_for(reflections: &[DailyReflection]) -> ReflectionStats {
    ReflectionStats {
        total_days: reflections.len() as u32,
        avg_completion_rate: average(reflections.iter().map(|r| r.completion_rate)),
        avg_satisfaction: average(
            reflections
                .iter()
                .filter_map(|r| r.satisfaction_score.map(f64::from)),
        ),
        avg_energy: average(reflections.iter().filter_map(|r| r.energy_level.map(f64::from))),
        total_tasks: reflections.iter().map(|r| r.total_tasks).sum(),
        total_completed: reflections.iter().map(|r| r.completed_tasks).sum(),
    }
}

/// Averages over reflections dated within the last `days` days, today
/// included.
pub fn reflection_stats(
    db: &Database,
    clock: &dyn Clock,
    days: i64,
) -> Result<ReflectionStats, DomainError> {
    let end = clock.today();
    let start = Duration::try_days(days.max(0))
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| DomainError::validation(format!("days out of range: {days}")))?;
    Ok(stats_for(&db.get_reflections_between(start, end)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::tasks::{create_task, reschedule, toggle_complete, NewTask};
    use crate::testing::date;

    fn input(text: &str) -> ReflectionInput {
        ReflectionInput {
            text: text.into(),
            ..ReflectionInput::default()
        }
    }

    #[test]
    fn snapshot_is_frozen_until_recreated() {
        let today = date(2025, 7, 1);
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::at_noon(today);

        let ids: Vec<i64> = (0..5)
            .map(|i| {
                create_task(&db, &clock, NewTask::titled(format!("t{i}")))
                    .unwrap()
                    .id
                    .unwrap()
            })
            .collect();
        toggle_complete(&db, &clock, ids[0], None, None).unwrap();
        toggle_complete(&db, &clock, ids[1], None, None).unwrap();

        let first = upsert_reflection(&db, &clock, today, input("ok day")).unwrap();
        assert_eq!((first.total_tasks, first.completed_tasks), (5, 2));
        assert_eq!(first.completion_rate, 40.0);
        assert_eq!(first.snapshot.completed.len(), 2);
        assert_eq!(first.snapshot.incomplete.len(), 3);

        let sixth = create_task(&db, &clock, NewTask::titled("t5")).unwrap();
        toggle_complete(&db, &clock, sixth.id.unwrap(), None, None).unwrap();

        let stored = get_reflection(&db, today).unwrap();
        assert_eq!((stored.total_tasks, stored.completed_tasks), (5, 2));
        assert_eq!(stored.completion_rate, 40.0);

        let again = upsert_reflection(&db, &clock, today, input("better")).unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!((again.total_tasks, again.completed_tasks), (6, 3));
        assert_eq!(again.completion_rate, 50.0);
        assert!(again.updated_at.is_some());
        assert_eq!(recent_reflections(&db, 30).unwrap().len(), 1);
    }

    #[test]
    fn snapshot_excludes_tasks_pushed_past_the_date() {
        let today = date(2025, 7, 1);
        let db = Database::open_in_memory().unwrap();
        let mut clock = FixedClock::at_noon(date(2025, 6, 29));
        let carried = create_task(&db, &clock, NewTask::titled("carried")).unwrap();
        let pushed = create_task(&db, &clock, NewTask::titled("pushed")).unwrap();
        reschedule(&db, &clock, pushed.id.unwrap(), date(2025, 7, 3), Some("later")).unwrap();

        clock.advance_to(today);
        let reflection = upsert_reflection(&db, &clock, today, input("meh")).unwrap();
        assert_eq!(reflection.total_tasks, 1);
        assert_eq!(reflection.snapshot.incomplete[0].id, carried.id.unwrap());
    }

    #[test]
    fn scores_outside_range_are_rejected_before_writing() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::at_noon(date(2025, 7, 1));
        for (satisfaction, energy) in [(Some(0), None), (None, Some(6))] {
            let err = upsert_reflection(
                &db,
                &clock,
                clock.today(),
                ReflectionInput {
                    text: "x".into(),
                    satisfaction_score: satisfaction,
                    energy_level: energy,
                },
            )
            .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
        assert!(db.find_by_date(clock.today()).unwrap().is_none());
    }

    #[test]
    fn delete_missing_reflection_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = delete_reflection(&db, date(2025, 1, 1)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[test]
    fn month_listing_and_stats() {
        let db = Database::open_in_memory().unwrap();
        let mut clock = FixedClock::at_noon(date(2025, 2, 27));
        for (day, satisfaction) in [(27, Some(4)), (28, None)] {
            let d = date(2025, 2, day);
            clock.advance_to(d);
            upsert_reflection(
                &db,
                &clock,
                d,
                ReflectionInput {
                    text: "x".into(),
                    satisfaction_score: satisfaction,
                    energy_level: Some(2),
                },
            )
            .unwrap();
        }
        clock.advance_to(date(2025, 3, 1));
        upsert_reflection(&db, &clock, date(2025, 3, 1), input("march")).unwrap();

        let february = reflections_in_month(&db, 2025, 2).unwrap();
        let dates: Vec<_> = february.iter().map(|r| r.reflection_date).collect();
        assert_eq!(dates, vec![date(2025, 2, 28), date(2025, 2, 27)]);
        assert!(reflections_in_month(&db, 2025, 13).is_err());

        let stats = reflection_stats(&db, &clock, DEFAULT_STATS_DAYS).unwrap();
        assert_eq!(stats.total_days, 3);
        assert_eq!(stats.avg_satisfaction, 4.0);
        assert_eq!(stats.avg_energy, 2.0);
    }

    #[test]
    fn out_of_range_periods_are_validation_errors() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::at_noon(date(2025, 6, 1));

        let err = reflection_stats(&db, &clock, 100_000_000).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        let err = reflection_stats(&db, &clock, i64::MAX).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(reflection_stats(&db, &clock, -5).unwrap().total_days, 0);

        for year in [i32::MAX, i32::MIN] {
            let err = reflections_in_month(&db, year, 12).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
        assert!(reflections_in_month(&db, 2025, 12).unwrap().is_empty());
    }
}
