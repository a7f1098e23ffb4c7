//! Shared fixtures for unit tests.

use chrono::{DateTime, NaiveDate, Utc};

use crate::clock::FixedClock;
use crate::models::Task;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Noon UTC of `d`.
pub fn utc_day(d: NaiveDate) -> DateTime<Utc> {
    d.and_hms_opt(12, 0, 0).unwrap().and_utc()
}

/// Open task created at noon UTC of `created`, scheduled for the same day.
pub fn pending_task(id: i64, created: NaiveDate) -> Task {
    let mut task = Task::new(&format!("task {id}"), &FixedClock::at_noon(created));
    task.id = Some(id);
    task
}
