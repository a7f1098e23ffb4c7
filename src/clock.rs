//! Calendar source for "today".
//!
//! Storage keeps instants in UTC; everything date-shaped (created dates,
//! "completed today", reflection dates) is a local calendar date under the
//! configured display offset. The offset is carried by the clock value that
//! callers pass in, never read from a global.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Largest offset chrono accepts for a `FixedOffset`, in minutes.
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

pub trait Clock {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Display offset used to turn instants into calendar dates.
    fn offset(&self) -> FixedOffset;

    /// Local calendar date of an instant.
    fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset()).date_naive()
    }

    /// Current local calendar date.
    fn today(&self) -> NaiveDate {
        self.date_of(self.now())
    }
}

/// Wall clock with a fixed display offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Build from an offset in minutes east of UTC (e.g. 540 for UTC+9).
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        offset_from_minutes(minutes).map(Self::new)
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Clock frozen at a given instant. Used by tests and for replaying a day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    /// Clock in UTC reading noon of the given date.
    pub fn at_noon(date: NaiveDate) -> Self {
        let now = date
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self::new(now, Utc.fix())
    }

    pub fn set(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    /// Move the clock to noon of another date, keeping the offset.
    pub fn advance_to(&mut self, date: NaiveDate) {
        if let Some(dt) = date.and_hms_opt(12, 0, 0) {
            // noon local, expressed in UTC
            let local = dt - chrono::Duration::seconds(self.offset.local_minus_utc() as i64);
            self.now = local.and_utc();
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    if minutes.abs() > MAX_OFFSET_MINUTES {
        return None;
    }
    FixedOffset::east_opt(minutes * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn date_of_respects_offset() {
        let seoul = offset_from_minutes(540).unwrap();
        // 2025-03-01 16:30 UTC is already 2025-03-02 in Seoul
        let instant = Utc.with_ymd_and_hms(2025, 3, 1, 16, 30, 0).unwrap();
        let clock = FixedClock::new(instant, seoul);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(
            SystemClock::utc().date_of(instant),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
    }

    #[test]
    fn rejects_out_of_range_offsets() {
        assert!(SystemClock::from_offset_minutes(19 * 60).is_none());
        assert!(SystemClock::from_offset_minutes(-300).is_some());
    }

    #[test]
    fn advance_to_lands_on_requested_local_date() {
        let offset = offset_from_minutes(-600).unwrap();
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut clock = FixedClock::new(start, offset);
        let target = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        clock.advance_to(target);
        assert_eq!(clock.today(), target);
    }
}
