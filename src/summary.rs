//! Aggregate counts derived from task selections.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::models::{Category, Task};
use crate::rollover::{self, Day};

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `part / whole` as a percentage with one decimal, 0.0 for an empty whole.
pub fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round1(part as f64 / whole as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailySummary {
    pub total: u32,
    pub completed: u32,
    pub pending: u32,
    pub completion_rate: f64,
}

impl DailySummary {
    fn from_counts(total: u32, completed: u32) -> Self {
        Self {
            total,
            completed,
            pending: total - completed,
            completion_rate: percentage(completed, total),
        }
    }
}

/// Reduce an already selected set of tasks.
pub fn aggregate<'a, I>(tasks: I) -> DailySummary
where
    I: IntoIterator<Item = &'a Task>,
{
    let (total, completed) = tasks.into_iter().fold((0u32, 0u32), |(total, done), task| {
        (total + 1, done + u32::from(task.is_completed))
    });
    DailySummary::from_counts(total, completed)
}

/// Summary of the today view, counted in one pass over the whole collection
/// with the same visibility predicate [`rollover::rollover`] uses.
pub fn live_summary(tasks: &[Task], day: &Day) -> DailySummary {
    let mut total = 0;
    let mut completed = 0;
    for task in tasks.iter().filter(|t| rollover::is_visible(t, day)) {
        total += 1;
        if task.is_completed {
            completed += 1;
        }
    }
    DailySummary::from_counts(total, completed)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub total: u32,
    pub completed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    /// Monday through Sunday, tasks grouped by creation date.
    pub days: Vec<DayCount>,
    pub total_tasks: u32,
    pub total_completed: u32,
}

pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(today.weekday().num_days_from_monday() as i64)
}

pub fn weekly_summary(tasks: &[Task], today: NaiveDate) -> WeeklySummary {
    let start = week_start(today);
    let days: Vec<DayCount> = (0..7)
        .map(|offset| {
            let date = start + Duration::days(offset);
            let summary = aggregate(tasks.iter().filter(|t| t.created_date == date));
            DayCount {
                date,
                total: summary.total,
                completed: summary.completed,
            }
        })
        .collect();
    WeeklySummary {
        week_start: start,
        total_tasks: days.iter().map(|d| d.total).sum(),
        total_completed: days.iter().map(|d| d.completed).sum(),
        days,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub total: u32,
    pub completed: u32,
    /// Share of the day's tasks, in percent.
    pub share: f64,
}

/// Per-category counts for tasks created on `today`. Empty categories are
/// left out.
pub fn category_summary(tasks: &[Task], today: NaiveDate) -> Vec<CategoryCount> {
    let todays: Vec<&Task> = tasks.iter().filter(|t| t.created_date == today).collect();
    let day_total = todays.len() as u32;
    Category::ALL
        .into_iter()
        .filter_map(|category| {
            let summary = aggregate(todays.iter().copied().filter(|t| t.category == category));
            (summary.total > 0).then(|| CategoryCount {
                category,
                total: summary.total,
                completed: summary.completed,
                share: percentage(summary.total, day_total),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollover::rollover;
    use crate::testing::{date, pending_task, utc_day};
    use chrono::{Offset, Utc};
    use proptest::prelude::*;

    fn day(d: NaiveDate) -> Day {
        Day::new(d, Utc.fix())
    }

    #[test]
    fn empty_selection_has_zero_rate() {
        let summary = aggregate(std::iter::empty::<&Task>());
        assert_eq!(summary, DailySummary::default());
    }

    #[test]
    fn rate_rounds_to_one_decimal() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(2, 5), 40.0);
        assert_eq!(percentage(3, 3), 100.0);
    }

    #[test]
    fn postponed_task_leaves_the_summary() {
        let today = date(2025, 4, 2);
        let kept = pending_task(1, today);
        let mut pushed = pending_task(2, today);
        pushed.scheduled_date = Some(date(2025, 4, 3));
        let tasks = vec![kept, pushed];

        let summary = live_summary(&tasks, &day(today));
        assert_eq!(summary.total, 1);
        assert_eq!(summary.pending, 1);
    }

    #[test]
    fn week_starts_on_monday() {
        // 2025-04-02 is a Wednesday
        assert_eq!(week_start(date(2025, 4, 2)), date(2025, 3, 31));
        assert_eq!(week_start(date(2025, 3, 31)), date(2025, 3, 31));
        assert_eq!(week_start(date(2025, 4, 6)), date(2025, 3, 31));
    }

    #[test]
    fn weekly_summary_groups_by_creation_date() {
        let mut done = pending_task(1, date(2025, 3, 31));
        done.complete(utc_day(date(2025, 4, 1)));
        let tasks = vec![
            done,
            pending_task(2, date(2025, 3, 31)),
            pending_task(3, date(2025, 4, 2)),
            pending_task(4, date(2025, 3, 30)),
        ];

        let week = weekly_summary(&tasks, date(2025, 4, 2));
        assert_eq!(week.days.len(), 7);
        assert_eq!(week.days[0].total, 2);
        assert_eq!(week.days[0].completed, 1);
        assert_eq!(week.days[2].total, 1);
        assert_eq!(week.total_tasks, 3);
        assert_eq!(week.total_completed, 1);
    }

    #[test]
    fn category_summary_skips_empty_categories() {
        let today = date(2025, 4, 2);
        let mut work = pending_task(1, today);
        work.category = Category::Work;
        let mut health = pending_task(2, today);
        health.category = Category::Health;
        health.complete(utc_day(today));
        let mut more_work = pending_task(3, today);
        more_work.category = Category::Work;
        let yesterday = pending_task(4, date(2025, 4, 1));

        let counts = category_summary(&[work, health, more_work, yesterday], today);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].category, Category::Work);
        assert_eq!(counts[0].total, 2);
        assert_eq!(counts[0].share, 66.7);
        assert_eq!(counts[1].category, Category::Health);
        assert_eq!(counts[1].completed, 1);
    }

    fn arb_task() -> impl Strategy<Value = Task> {
        (
            1i64..1000,
            0i64..8,
            proptest::option::of(0i64..10),
            proptest::option::of(0i64..4),
        )
            .prop_map(|(id, created_off, sched_off, done_after)| {
                let base = date(2025, 2, 1);
                let mut task = pending_task(id, base + Duration::days(created_off));
                task.scheduled_date = sched_off.map(|s| base + Duration::days(s));
                if let Some(after) = done_after {
                    task.complete(utc_day(task.created_date + Duration::days(after)));
                }
                task
            })
    }

    proptest! {
        #[test]
        fn live_summary_matches_aggregated_rollover(
            tasks in proptest::collection::vec(arb_task(), 0..40),
            today_off in 0i64..10,
        ) {
            let d = day(date(2025, 2, 1) + Duration::days(today_off));
            let listed = rollover(&tasks, &d);
            prop_assert_eq!(aggregate(listed.iter().copied()), live_summary(&tasks, &d));
        }

        #[test]
        fn pending_plus_completed_is_total(
            tasks in proptest::collection::vec(arb_task(), 0..40),
            today_off in 0i64..10,
        ) {
            let d = day(date(2025, 2, 1) + Duration::days(today_off));
            let summary = live_summary(&tasks, &d);
            prop_assert_eq!(summary.pending + summary.completed, summary.total);
            prop_assert!((0.0..=100.0).contains(&summary.completion_rate));
        }
    }
}
