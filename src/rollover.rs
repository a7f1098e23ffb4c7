//! Which tasks belong on a given day.
//!
//! The today view is the union of four inclusion rules evaluated against a
//! local calendar date. Everything here is pure: callers load the task
//! collection once and filter it in memory.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::models::Task;

/// A local calendar date plus the offset used to place instants on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Day {
    pub date: NaiveDate,
    pub offset: FixedOffset,
}

impl Day {
    pub fn new(date: NaiveDate, offset: FixedOffset) -> Self {
        Self { date, offset }
    }

    pub fn today(clock: &dyn Clock) -> Self {
        Self::new(clock.today(), clock.offset())
    }

    /// Another date under the clock's offset.
    pub fn of(date: NaiveDate, clock: &dyn Clock) -> Self {
        Self::new(date, clock.offset())
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    fn completed_on_this_day(&self, task: &Task) -> bool {
        task.is_completed
            && task
                .completed_at
                .is_some_and(|at| self.local_date(at) == self.date)
    }
}

/// The four ways a task can make it onto a day's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Created on the day and not pushed past it.
    CreatedToday,
    /// Created earlier, completed on the day.
    CompletedToday,
    /// Created earlier, still open, not pushed past the day.
    CarriedOver,
    /// Still open and explicitly scheduled for the day.
    PostponedIntoToday,
}

impl Rule {
    pub const ALL: [Rule; 4] = [
        Rule::CreatedToday,
        Rule::CompletedToday,
        Rule::CarriedOver,
        Rule::PostponedIntoToday,
    ];

    pub fn matches(self, task: &Task, day: &Day) -> bool {
        let today = day.date;
        let not_in_future = task.scheduled_date.is_none_or(|s| s <= today);
        match self {
            Rule::CreatedToday => task.created_date == today && not_in_future,
            Rule::CompletedToday => task.created_date < today && day.completed_on_this_day(task),
            Rule::CarriedOver => !task.is_completed && task.created_date < today && not_in_future,
            Rule::PostponedIntoToday => !task.is_completed && task.scheduled_date == Some(today),
        }
    }
}

/// Rules a task satisfies on `day`, in rule order.
pub fn matching_rules(task: &Task, day: &Day) -> Vec<Rule> {
    Rule::ALL
        .into_iter()
        .filter(|rule| rule.matches(task, day))
        .collect()
}

pub fn is_visible(task: &Task, day: &Day) -> bool {
    Rule::ALL.iter().any(|rule| rule.matches(task, day))
}

/// Display order of the today list: oldest creation date first, then
/// creation instant, then id.
pub fn display_order(a: &Task, b: &Task) -> std::cmp::Ordering {
    a.created_date
        .cmp(&b.created_date)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

/// Tasks visible on `day`, in display order.
pub fn rollover<'a>(tasks: &'a [Task], day: &Day) -> Vec<&'a Task> {
    let mut visible: Vec<&Task> = tasks.iter().filter(|t| is_visible(t, day)).collect();
    visible.sort_by(|a, b| display_order(a, b));
    visible
}

/// Selection used when freezing a reflection for `day`: tasks completed on
/// that date plus open tasks that were due by then.
///
/// Unlike [`rollover`], this does not require a completed task to predate
/// the day, and it drops open tasks created after the day even when they
/// are scheduled onto it.
pub fn counted_for_reflection(task: &Task, day: &Day) -> bool {
    if task.is_completed {
        day.completed_on_this_day(task)
    } else {
        task.created_date <= day.date && task.scheduled_date.is_none_or(|s| s <= day.date)
    }
}

pub fn reflection_tasks<'a>(tasks: &'a [Task], day: &Day) -> Vec<&'a Task> {
    let mut counted: Vec<&Task> = tasks
        .iter()
        .filter(|t| counted_for_reflection(t, day))
        .collect();
    counted.sort_by(|a, b| display_order(a, b));
    counted
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverdueStatus {
    Scheduled,
    Today,
    Overdue,
}

/// A today-view row with its lateness relative to the creation date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayItem {
    pub task: Task,
    pub days_overdue: i64,
    pub status: OverdueStatus,
}

impl TodayItem {
    pub fn annotate(task: &Task, today: NaiveDate) -> Self {
        let days_overdue = (today - task.created_date).num_days();
        let status = if task.scheduled_date.is_some_and(|s| s > today) {
            OverdueStatus::Scheduled
        } else if days_overdue > 0 {
            OverdueStatus::Overdue
        } else {
            OverdueStatus::Today
        };
        Self {
            task: task.clone(),
            days_overdue,
            status,
        }
    }
}

pub fn today_items(tasks: &[Task], day: &Day) -> Vec<TodayItem> {
    rollover(tasks, day)
        .into_iter()
        .map(|t| TodayItem::annotate(t, day.date))
        .collect()
}
