//! Dated memos written during the day.

use chrono::NaiveDate;
use tracing::info;

use crate::clock::Clock;
use crate::database::Database;
use crate::error::DomainError;
use crate::models::DailyMemo;

pub const RECENT_LIMIT: u32 = 10;
pub const SEARCH_LIMIT: u32 = 50;

fn clean_content(content: &str) -> Result<String, DomainError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(DomainError::validation("Memo content must not be empty"));
    }
    Ok(content.to_string())
}

/// Write a memo for `date`, or for today when no date is given.
pub fn create_memo(
    db: &Database,
    clock: &dyn Clock,
    content: &str,
    date: Option<NaiveDate>,
) -> Result<DailyMemo, DomainError> {
    let content = clean_content(content)?;
    let mut memo = DailyMemo::new(date.unwrap_or_else(|| clock.today()), &content, clock.now());
    let id = db.insert_memo(&memo)?;
    memo.id = Some(id);
    info!(id, date = %memo.memo_date, "created memo");
    Ok(memo)
}

pub fn get_memo(db: &Database, id: i64) -> Result<DailyMemo, DomainError> {
    db.get_memo(id)?
        .ok_or_else(|| DomainError::not_found("Memo", id))
}

pub fn update_memo(
    db: &Database,
    clock: &dyn Clock,
    id: i64,
    content: &str,
) -> Result<DailyMemo, DomainError> {
    let content = clean_content(content)?;
    let mut memo = get_memo(db, id)?;
    memo.content = content;
    memo.updated_at = Some(clock.now());
    db.update_memo(&memo)?;
    info!(id, "updated memo");
    Ok(memo)
}

pub fn delete_memo(db: &Database, id: i64) -> Result<(), DomainError> {
    if !db.delete_memo(id)? {
        return Err(DomainError::not_found("Memo", id));
    }
    info!(id, "deleted memo");
    Ok(())
}

pub fn memos_for_date(db: &Database, date: NaiveDate) -> Result<Vec<DailyMemo>, DomainError> {
    Ok(db.get_memos_by_date(date)?)
}

pub fn memo_count(db: &Database, date: NaiveDate) -> Result<i64, DomainError> {
    Ok(db.count_memos_by_date(date)?)
}

pub fn recent_memos(db: &Database, limit: u32) -> Result<Vec<DailyMemo>, DomainError> {
    Ok(db.get_recent_memos(limit)?)
}

pub fn memos_between(
    db: &Database,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DailyMemo>, DomainError> {
    if end < start {
        return Err(DomainError::validation("End date must not be before start date"));
    }
    Ok(db.get_memos_between(start, end)?)
}

/// Case-insensitive search; a blank keyword matches nothing.
pub fn search_memos(db: &Database, keyword: &str, limit: u32) -> Result<Vec<DailyMemo>, DomainError> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(Vec::new());
    }
    Ok(db.search_memos(keyword, limit)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::testing::{date, utc_day};
    use chrono::Duration;

    fn setup() -> (Database, FixedClock) {
        (Database::open_in_memory().unwrap(), FixedClock::at_noon(date(2025, 8, 1)))
    }

    #[test]
    fn memos_keep_writing_order_within_a_day() {
        let (db, mut clock) = setup();
        create_memo(&db, &clock, "  morning run ", None).unwrap();
        clock.set(utc_day(date(2025, 8, 1)) + Duration::hours(3));
        create_memo(&db, &clock, "lunch with Jin", None).unwrap();

        let memos = memos_for_date(&db, date(2025, 8, 1)).unwrap();
        let contents: Vec<_> = memos.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["morning run", "lunch with Jin"]);
        assert_eq!(memo_count(&db, date(2025, 8, 1)).unwrap(), 2);

        let recent = recent_memos(&db, RECENT_LIMIT).unwrap();
        assert_eq!(recent[0].content, "lunch with Jin");
    }

    #[test]
    fn blank_content_is_rejected() {
        let (db, clock) = setup();
        assert!(matches!(
            create_memo(&db, &clock, "   ", None),
            Err(DomainError::Validation(_))
        ));
        let memo = create_memo(&db, &clock, "x", None).unwrap();
        assert!(update_memo(&db, &clock, memo.id.unwrap(), "").is_err());
        assert_eq!(get_memo(&db, memo.id.unwrap()).unwrap().content, "x");
    }

    #[test]
    fn update_and_delete_report_missing_memos() {
        let (db, clock) = setup();
        assert!(matches!(
            update_memo(&db, &clock, 5, "y"),
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(delete_memo(&db, 5), Err(DomainError::NotFound { .. })));

        let memo = create_memo(&db, &clock, "x", None).unwrap();
        let updated = update_memo(&db, &clock, memo.id.unwrap(), " y ").unwrap();
        assert_eq!(updated.content, "y");
        assert!(updated.updated_at.is_some());
        delete_memo(&db, memo.id.unwrap()).unwrap();
    }

    #[test]
    fn search_is_case_insensitive_and_blank_matches_nothing() {
        let (db, clock) = setup();
        create_memo(&db, &clock, "Bought NEW shoes", None).unwrap();
        create_memo(&db, &clock, "old book", Some(date(2025, 7, 30))).unwrap();

        assert_eq!(search_memos(&db, "new", SEARCH_LIMIT).unwrap().len(), 1);
        assert!(search_memos(&db, "  ", SEARCH_LIMIT).unwrap().is_empty());

        let range = memos_between(&db, date(2025, 7, 29), date(2025, 8, 1)).unwrap();
        assert_eq!(range[0].content, "old book");
        assert!(memos_between(&db, date(2025, 8, 2), date(2025, 8, 1)).is_err());
    }
}
