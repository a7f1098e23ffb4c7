use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clock::Clock;

/// Closed set of task categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Work,
    Learning,
    Health,
    Personal,
    Relationship,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Work,
        Category::Learning,
        Category::Health,
        Category::Personal,
        Category::Relationship,
        Category::Other,
    ];

    /// Stable storage key.
    pub fn key(self) -> &'static str {
        match self {
            Category::Work => "WORK",
            Category::Learning => "LEARNING",
            Category::Health => "HEALTH",
            Category::Personal => "PERSONAL",
            Category::Relationship => "RELATIONSHIP",
            Category::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Strict parse of a storage key. For user input use
/// [`crate::labels::parse_category`], which also accepts display labels.
impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "category",
                value: s.to_string(),
            })
    }
}

/// One explicit reschedule, appended to a task's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostponeRecord {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
    pub postponed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub category: Category,
    /// Local date the task was created on. Only the legacy reschedule path
    /// ever rewrites it.
    pub created_date: NaiveDate,
    /// Creation instant; orders tasks sharing a `created_date`.
    pub created_at: DateTime<Utc>,
    pub scheduled_date: Option<NaiveDate>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub completion_reflection: Option<String>,
    pub completion_image: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    pub postpone_count: u32,
    pub postpone_history: Vec<PostponeRecord>,
    pub journey_id: Option<i64>,
}

impl Task {
    /// New pending task dated today, scheduled for today.
    pub fn new(title: &str, clock: &dyn Clock) -> Self {
        let today = clock.today();
        Self {
            id: None,
            title: title.trim().to_string(),
            description: None,
            notes: None,
            category: Category::Other,
            created_date: today,
            created_at: clock.now(),
            scheduled_date: Some(today),
            is_completed: false,
            completed_at: None,
            completion_reflection: None,
            completion_image: None,
            estimated_minutes: None,
            actual_minutes: None,
            postpone_count: 0,
            postpone_history: Vec::new(),
            journey_id: None,
        }
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.is_completed = true;
        self.completed_at = Some(now);
    }

    /// Back to pending. Completion metadata goes with the timestamp.
    pub fn uncomplete(&mut self) {
        self.is_completed = false;
        self.completed_at = None;
        self.completion_reflection = None;
        self.completion_image = None;
    }

    /// The date the task currently targets.
    pub fn current_date(&self) -> NaiveDate {
        self.scheduled_date.unwrap_or(self.created_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JourneyStatus {
    Planning,
    Active,
    Completed,
    Paused,
}

impl JourneyStatus {
    pub const ALL: [JourneyStatus; 4] = [
        JourneyStatus::Planning,
        JourneyStatus::Active,
        JourneyStatus::Completed,
        JourneyStatus::Paused,
    ];

    pub fn key(self) -> &'static str {
        match self {
            JourneyStatus::Planning => "PLANNING",
            JourneyStatus::Active => "ACTIVE",
            JourneyStatus::Completed => "COMPLETED",
            JourneyStatus::Paused => "PAUSED",
        }
    }
}

impl FromStr for JourneyStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JourneyStatus::ALL
            .into_iter()
            .find(|st| st.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "journey status",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    pub id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: JourneyStatus,
    /// Last stored progress. Display only; recompute with
    /// [`crate::journey::progress`].
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Journey {
    pub fn new(title: &str, start_date: NaiveDate, end_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            title: title.trim().to_string(),
            description: None,
            start_date,
            end_date,
            status: JourneyStatus::Planning,
            progress: 0.0,
            created_at: now,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TodoStatus {
    Todo,
    InProgress,
    Completed,
    Cancelled,
}

impl TodoStatus {
    pub const ALL: [TodoStatus; 4] = [
        TodoStatus::Todo,
        TodoStatus::InProgress,
        TodoStatus::Completed,
        TodoStatus::Cancelled,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TodoStatus::Todo => "TODO",
            TodoStatus::InProgress => "IN_PROGRESS",
            TodoStatus::Completed => "COMPLETED",
            TodoStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for TodoStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TodoStatus::ALL
            .into_iter()
            .find(|st| st.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "todo status",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TodoPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl TodoPriority {
    pub const ALL: [TodoPriority; 4] = [
        TodoPriority::Low,
        TodoPriority::Normal,
        TodoPriority::High,
        TodoPriority::Urgent,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TodoPriority::Low => "LOW",
            TodoPriority::Normal => "NORMAL",
            TodoPriority::High => "HIGH",
            TodoPriority::Urgent => "URGENT",
        }
    }
}

impl FromStr for TodoPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TodoPriority::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "priority",
                value: s.to_string(),
            })
    }
}

/// Entry of the older, journey-scoped todo collection. It has no dates of
/// its own and never takes part in the today view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyTodo {
    pub id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub category: Category,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    pub journey_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl LegacyTodo {
    pub fn new(title: &str, journey_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            title: title.trim().to_string(),
            description: None,
            status: TodoStatus::Todo,
            priority: TodoPriority::Normal,
            category: Category::Other,
            is_completed: false,
            completed_at: None,
            estimated_minutes: None,
            actual_minutes: None,
            journey_id: Some(journey_id),
            created_at: now,
        }
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.is_completed = true;
        self.completed_at = Some(now);
        self.status = TodoStatus::Completed;
    }

    pub fn uncomplete(&mut self) {
        self.is_completed = false;
        self.completed_at = None;
        self.status = TodoStatus::Todo;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotCompleted {
    pub id: i64,
    pub title: String,
    pub category: Category,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPending {
    pub id: i64,
    pub title: String,
    pub category: Category,
    pub estimated_minutes: Option<i64>,
}

/// Task lists frozen into a reflection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TasksSnapshot {
    pub completed: Vec<SnapshotCompleted>,
    pub incomplete: Vec<SnapshotPending>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReflection {
    pub id: Option<i64>,
    pub reflection_date: NaiveDate,
    pub reflection_text: String,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub completion_rate: f64,
    pub snapshot: TasksSnapshot,
    pub satisfaction_score: Option<u8>,
    pub energy_level: Option<u8>,
    pub generated_content: Option<String>,
    pub generation_prompt: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Short dated note, independent of tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMemo {
    pub id: Option<i64>,
    pub memo_date: NaiveDate,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DailyMemo {
    pub fn new(memo_date: NaiveDate, content: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            memo_date,
            content: content.trim().to_string(),
            created_at: now,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    #[test]
    fn new_task_is_scheduled_for_creation_day() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let clock = FixedClock::at_noon(day);
        let task = Task::new("  write report ", &clock);
        assert_eq!(task.title, "write report");
        assert_eq!(task.created_date, day);
        assert_eq!(task.scheduled_date, Some(day));
        assert_eq!(task.category, Category::Other);
        assert!(!task.is_completed);
    }

    #[test]
    fn uncomplete_clears_all_completion_metadata() {
        let clock = FixedClock::at_noon(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        let mut task = Task::new("run", &clock);
        task.complete(clock.now());
        task.completion_reflection = Some("felt good".into());
        task.completion_image = Some("uploads/run.png".into());

        task.uncomplete();
        assert!(!task.is_completed);
        assert!(task.completed_at.is_none());
        assert!(task.completion_reflection.is_none());
        assert!(task.completion_image.is_none());
    }

    #[test]
    fn category_keys_round_trip_through_from_str() {
        for category in Category::ALL {
            assert_eq!(category.key().parse::<Category>().unwrap(), category);
        }
        assert!("sleeping".parse::<Category>().is_err());
    }

    #[test]
    fn postpone_record_serializes_dates_as_iso() {
        let record = PostponeRecord {
            from_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            to_date: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            reason: "busy".into(),
            postponed_at: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"from_date\":\"2025-01-01\""));
        assert!(json.contains("\"to_date\":\"2025-01-03\""));
    }
}
