use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::models::{
    DailyMemo, DailyReflection, Journey, JourneyStatus, LegacyTodo, Task, UnknownVariant,
};

/// Storage format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Storage format for instants, always UTC.
pub const INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Failed to encode column value: {0}")]
    EncodeError(#[from] serde_json::Error),
    #[error("Cannot update {0} without an id")]
    MissingId(&'static str),
    #[error("No {kind} with id {id} to update")]
    MissingRow { kind: &'static str, id: i64 },
}

/// Record store for tasks.
pub trait TaskStore {
    fn find_by_id(&self, id: i64) -> Result<Option<Task>, DatabaseError>;

    /// Tasks matching `predicate`, ordered by creation date, creation
    /// instant and id.
    fn filter(&self, predicate: &dyn Fn(&Task) -> bool) -> Result<Vec<Task>, DatabaseError>;

    /// Insert when the task has no id yet, update otherwise. Returns the id.
    fn save(&self, task: &Task) -> Result<i64, DatabaseError>;

    /// Returns false when nothing was deleted.
    fn delete(&self, id: i64) -> Result<bool, DatabaseError>;

    /// Whether a journey a task may point at exists.
    fn journey_exists(&self, id: i64) -> Result<bool, DatabaseError>;

    fn all(&self) -> Result<Vec<Task>, DatabaseError> {
        self.filter(&|_| true)
    }
}

/// Record store for reflections, keyed by date.
pub trait ReflectionStore {
    fn find_by_date(&self, date: NaiveDate) -> Result<Option<DailyReflection>, DatabaseError>;

    /// Insert or overwrite the row for `reflection.reflection_date`. Cached
    /// generated content is left as it is. Returns the row id.
    fn upsert(&self, reflection: &DailyReflection) -> Result<i64, DatabaseError>;

    fn delete_by_date(&self, date: NaiveDate) -> Result<bool, DatabaseError>;
}

pub struct Database {
    conn: Connection,
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format(INSTANT_FORMAT).to_string()
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_date_column(raw: &str, idx: usize) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn parse_instant_column(raw: &str, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    NaiveDateTime::parse_from_str(raw, INSTANT_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| conversion_error(idx, e))
}

fn get_date(row: &Row, idx: usize) -> Result<NaiveDate, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    parse_date_column(&raw, idx)
}

fn get_opt_date(row: &Row, idx: usize) -> Result<Option<NaiveDate>, rusqlite::Error> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_date_column(&raw, idx))
        .transpose()
}

fn get_instant(row: &Row, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    parse_instant_column(&raw, idx)
}

fn get_opt_instant(row: &Row, idx: usize) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_instant_column(&raw, idx))
        .transpose()
}

fn get_enum<T>(row: &Row, idx: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn get_json<T: DeserializeOwned + Default>(row: &Row, idx: usize) -> Result<T, rusqlite::Error> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) if !raw.trim().is_empty() => {
            serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
        }
        _ => Ok(T::default()),
    }
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2")?;
    let count: i64 = stmt.query_row(params![table, column], |row| row.get(0))?;
    Ok(count > 0)
}

const TASK_COLUMNS: &str = "id, title, description, notes, category, created_date, created_at, \
     scheduled_date, is_completed, completed_at, completion_reflection, completion_image, \
     estimated_minutes, actual_minutes, postpone_count, postpone_history, journey_id";

const REFLECTION_COLUMNS: &str = "id, reflection_date, reflection_text, total_tasks, \
     completed_tasks, completion_rate, tasks_snapshot, satisfaction_score, energy_level, \
     generated_content, generation_prompt, generated_at, created_at, updated_at";

const JOURNEY_COLUMNS: &str =
    "id, title, description, start_date, end_date, status, progress, created_at, updated_at";

const LEGACY_TODO_COLUMNS: &str = "id, title, description, status, priority, category, \
     is_completed, completed_at, estimated_minutes, actual_minutes, journey_id, created_at";

const MEMO_COLUMNS: &str = "id, memo_date, content, created_at, updated_at";

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        debug!(path = %db_path.display(), "opened database");

        let db = Database { conn };
        db.initialize_schema()?;

        Ok(db)
    }

    /// Private in-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS journeys (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                description     TEXT,
                start_date      TEXT NOT NULL,
                end_date        TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'PLANNING',
                progress        REAL NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL,
                updated_at      TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                title                   TEXT NOT NULL,
                description             TEXT,
                notes                   TEXT,
                category                TEXT NOT NULL DEFAULT 'OTHER',
                created_date            TEXT NOT NULL,
                created_at              TEXT NOT NULL,
                scheduled_date          TEXT,
                is_completed            INTEGER NOT NULL DEFAULT 0,
                completed_at            TEXT,
                completion_reflection   TEXT,
                completion_image        TEXT,
                estimated_minutes       INTEGER,
                actual_minutes          INTEGER,
                postpone_count          INTEGER NOT NULL DEFAULT 0,
                postpone_history        TEXT NOT NULL DEFAULT '[]',
                journey_id              INTEGER REFERENCES journeys(id)
            )",
            [],
        )?;

        // Older collection of journey-scoped todos
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS journey_todos (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                title               TEXT NOT NULL,
                description         TEXT,
                status              TEXT NOT NULL DEFAULT 'TODO',
                priority            TEXT NOT NULL DEFAULT 'NORMAL',
                category            TEXT NOT NULL DEFAULT 'OTHER',
                is_completed        INTEGER NOT NULL DEFAULT 0,
                completed_at        TEXT,
                estimated_minutes   INTEGER,
                actual_minutes      INTEGER,
                journey_id          INTEGER REFERENCES journeys(id),
                created_at          TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS daily_reflections (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                reflection_date     TEXT NOT NULL UNIQUE,
                reflection_text     TEXT NOT NULL,
                total_tasks         INTEGER NOT NULL DEFAULT 0,
                completed_tasks     INTEGER NOT NULL DEFAULT 0,
                completion_rate     REAL NOT NULL DEFAULT 0,
                tasks_snapshot      TEXT,
                satisfaction_score  INTEGER CHECK (satisfaction_score BETWEEN 1 AND 5),
                energy_level        INTEGER CHECK (energy_level BETWEEN 1 AND 5),
                created_at          TEXT NOT NULL,
                updated_at          TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS daily_memos (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                memo_date       TEXT NOT NULL,
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT
            )",
            [],
        )?;

        self.migrate_columns()?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_created_date ON tasks(created_date)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_scheduled_date ON tasks(scheduled_date)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_journey_id ON tasks(journey_id)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_journey_todos_journey_id ON journey_todos(journey_id)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_daily_memos_date ON daily_memos(memo_date)",
            [],
        )?;

        Ok(())
    }

    /// Add columns introduced after the first schema version.
    fn migrate_columns(&self) -> Result<(), DatabaseError> {
        let added: [(&str, &str, &str); 5] = [
            ("tasks", "postpone_count", "INTEGER NOT NULL DEFAULT 0"),
            ("tasks", "postpone_history", "TEXT NOT NULL DEFAULT '[]'"),
            ("daily_reflections", "generated_content", "TEXT"),
            ("daily_reflections", "generation_prompt", "TEXT"),
            ("daily_reflections", "generated_at", "TEXT"),
        ];
        for (table, column, definition) in added {
            if !column_exists(&self.conn, table, column)? {
                self.conn.execute(
                    &format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"),
                    [],
                )?;
                debug!(table, column, "added column");
            }
        }
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // ---- tasks ----

    fn row_to_task(row: &Row) -> Result<Task, rusqlite::Error> {
        Ok(Task {
            id: Some(row.get(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            notes: row.get(3)?,
            category: get_enum(row, 4)?,
            created_date: get_date(row, 5)?,
            created_at: get_instant(row, 6)?,
            scheduled_date: get_opt_date(row, 7)?,
            is_completed: row.get::<_, i64>(8)? != 0,
            completed_at: get_opt_instant(row, 9)?,
            completion_reflection: row.get(10)?,
            completion_image: row.get(11)?,
            estimated_minutes: row.get(12)?,
            actual_minutes: row.get(13)?,
            postpone_count: row.get(14)?,
            postpone_history: get_json(row, 15)?,
            journey_id: row.get(16)?,
        })
    }

    /// Insert a task and return its ID
    pub fn insert_task(&self, task: &Task) -> Result<i64, DatabaseError> {
        let history = serde_json::to_string(&task.postpone_history)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO tasks (title, description, notes, category, created_date, created_at,
                scheduled_date, is_completed, completed_at, completion_reflection, completion_image,
                estimated_minutes, actual_minutes, postpone_count, postpone_history, journey_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                task.title,
                task.description,
                task.notes,
                task.category.key(),
                format_date(task.created_date),
                format_instant(task.created_at),
                task.scheduled_date.map(format_date),
                if task.is_completed { 1 } else { 0 },
                task.completed_at.map(format_instant),
                task.completion_reflection,
                task.completion_image,
                task.estimated_minutes,
                task.actual_minutes,
                task.postpone_count,
                history,
                task.journey_id,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    /// Overwrite every stored field of an existing task. Returns false when
    /// no row has that id.
    pub fn update_task(&self, task: &Task) -> Result<bool, DatabaseError> {
        let id = task.id.ok_or(DatabaseError::MissingId("task"))?;
        let history = serde_json::to_string(&task.postpone_history)?;

        let tx = self.conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE tasks SET title = ?1, description = ?2, notes = ?3, category = ?4,
                created_date = ?5, scheduled_date = ?6, is_completed = ?7, completed_at = ?8,
                completion_reflection = ?9, completion_image = ?10, estimated_minutes = ?11,
                actual_minutes = ?12, postpone_count = ?13, postpone_history = ?14,
                journey_id = ?15
             WHERE id = ?16",
            params![
                task.title,
                task.description,
                task.notes,
                task.category.key(),
                format_date(task.created_date),
                task.scheduled_date.map(format_date),
                if task.is_completed { 1 } else { 0 },
                task.completed_at.map(format_instant),
                task.completion_reflection,
                task.completion_image,
                task.estimated_minutes,
                task.actual_minutes,
                task.postpone_count,
                history,
                task.journey_id,
                id
            ],
        )?;
        tx.commit()?;
        Ok(updated > 0)
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
        let task = stmt
            .query_row(params![id], Self::row_to_task)
            .optional()?;
        Ok(task)
    }

    /// All tasks in display order
    pub fn get_all_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_date ASC, created_at ASC, id ASC"
        ))?;
        let tasks = stmt
            .query_map([], Self::row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn get_tasks_for_journey(&self, journey_id: i64) -> Result<Vec<Task>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE journey_id = ?1
             ORDER BY created_date ASC, created_at ASC, id ASC"
        ))?;
        let tasks = stmt
            .query_map(params![journey_id], Self::row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn delete_task(&self, id: i64) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let deleted = tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    // ---- reflections ----

    fn row_to_reflection(row: &Row) -> Result<DailyReflection, rusqlite::Error> {
        Ok(DailyReflection {
            id: Some(row.get(0)?),
            reflection_date: get_date(row, 1)?,
            reflection_text: row.get(2)?,
            total_tasks: row.get(3)?,
            completed_tasks: row.get(4)?,
            completion_rate: row.get(5)?,
            snapshot: get_json(row, 6)?,
            satisfaction_score: row.get(7)?,
            energy_level: row.get(8)?,
            generated_content: row.get(9)?,
            generation_prompt: row.get(10)?,
            generated_at: get_opt_instant(row, 11)?,
            created_at: get_instant(row, 12)?,
            updated_at: get_opt_instant(row, 13)?,
        })
    }

    pub fn get_reflection(&self, date: NaiveDate) -> Result<Option<DailyReflection>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REFLECTION_COLUMNS} FROM daily_reflections WHERE reflection_date = ?1"
        ))?;
        let reflection = stmt
            .query_row(params![format_date(date)], Self::row_to_reflection)
            .optional()?;
        Ok(reflection)
    }

    pub fn upsert_reflection(&self, reflection: &DailyReflection) -> Result<i64, DatabaseError> {
        let snapshot = serde_json::to_string(&reflection.snapshot)?;
        let date = format_date(reflection.reflection_date);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO daily_reflections (reflection_date, reflection_text, total_tasks,
                completed_tasks, completion_rate, tasks_snapshot, satisfaction_score, energy_level,
                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(reflection_date) DO UPDATE SET
                reflection_text = excluded.reflection_text,
                total_tasks = excluded.total_tasks,
                completed_tasks = excluded.completed_tasks,
                completion_rate = excluded.completion_rate,
                tasks_snapshot = excluded.tasks_snapshot,
                satisfaction_score = excluded.satisfaction_score,
                energy_level = excluded.energy_level,
                updated_at = excluded.updated_at",
            params![
                date,
                reflection.reflection_text,
                reflection.total_tasks,
                reflection.completed_tasks,
                reflection.completion_rate,
                snapshot,
                reflection.satisfaction_score,
                reflection.energy_level,
                format_instant(reflection.created_at),
                reflection.updated_at.map(format_instant),
            ],
        )?;
        let id: i64 = tx.query_row(
            "SELECT id FROM daily_reflections WHERE reflection_date = ?1",
            params![date],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(id)
    }

    /// Store generated content for a date. Returns false when no reflection
    /// exists for it.
    pub fn save_generated_content(
        &self,
        date: NaiveDate,
        content: &str,
        prompt: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE daily_reflections SET generated_content = ?1, generation_prompt = ?2,
                generated_at = ?3
             WHERE reflection_date = ?4",
            params![content, prompt, format_instant(generated_at), format_date(date)],
        )?;
        tx.commit()?;
        Ok(updated > 0)
    }

    pub fn delete_reflection(&self, date: NaiveDate) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let deleted = tx.execute(
            "DELETE FROM daily_reflections WHERE reflection_date = ?1",
            params![format_date(date)],
        )?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Newest date first
    pub fn get_recent_reflections(&self, limit: u32) -> Result<Vec<DailyReflection>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REFLECTION_COLUMNS} FROM daily_reflections
             ORDER BY reflection_date DESC LIMIT ?1"
        ))?;
        let reflections = stmt
            .query_map(params![limit], Self::row_to_reflection)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reflections)
    }

    /// Reflections dated within `[start, end]`, oldest first
    pub fn get_reflections_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyReflection>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REFLECTION_COLUMNS} FROM daily_reflections
             WHERE reflection_date >= ?1 AND reflection_date <= ?2
             ORDER BY reflection_date ASC"
        ))?;
        let reflections = stmt
            .query_map(
                params![format_date(start), format_date(end)],
                Self::row_to_reflection,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reflections)
    }

    // ---- journeys ----

    fn row_to_journey(row: &Row) -> Result<Journey, rusqlite::Error> {
        Ok(Journey {
            id: Some(row.get(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            start_date: get_date(row, 3)?,
            end_date: get_date(row, 4)?,
            status: get_enum(row, 5)?,
            progress: row.get(6)?,
            created_at: get_instant(row, 7)?,
            updated_at: get_opt_instant(row, 8)?,
        })
    }

    pub fn insert_journey(&self, journey: &Journey) -> Result<i64, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO journeys (title, description, start_date, end_date, status, progress,
                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                journey.title,
                journey.description,
                format_date(journey.start_date),
                format_date(journey.end_date),
                journey.status.key(),
                journey.progress,
                format_instant(journey.created_at),
                journey.updated_at.map(format_instant),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    pub fn update_journey(&self, journey: &Journey) -> Result<(), DatabaseError> {
        let id = journey.id.ok_or(DatabaseError::MissingId("journey"))?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE journeys SET title = ?1, description = ?2, start_date = ?3, end_date = ?4,
                status = ?5, progress = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                journey.title,
                journey.description,
                format_date(journey.start_date),
                format_date(journey.end_date),
                journey.status.key(),
                journey.progress,
                journey.updated_at.map(format_instant),
                id
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_journey(&self, id: i64) -> Result<Option<Journey>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {JOURNEY_COLUMNS} FROM journeys WHERE id = ?1"))?;
        let journey = stmt
            .query_row(params![id], Self::row_to_journey)
            .optional()?;
        Ok(journey)
    }

    /// Newest first
    pub fn get_all_journeys(&self) -> Result<Vec<Journey>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {JOURNEY_COLUMNS} FROM journeys ORDER BY created_at DESC, id DESC"
        ))?;
        let journeys = stmt
            .query_map([], Self::row_to_journey)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(journeys)
    }

    pub fn get_journeys_with_status(
        &self,
        status: JourneyStatus,
    ) -> Result<Vec<Journey>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {JOURNEY_COLUMNS} FROM journeys WHERE status = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;
        let journeys = stmt
            .query_map(params![status.key()], Self::row_to_journey)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(journeys)
    }

    /// Delete a journey together with the daily tasks attached to it.
    /// Returns the number of tasks removed, or None when the journey did not
    /// exist.
    pub fn delete_journey_cascade(&self, id: i64) -> Result<Option<usize>, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let tasks = tx.execute("DELETE FROM tasks WHERE journey_id = ?1", params![id])?;
        let journeys = tx.execute("DELETE FROM journeys WHERE id = ?1", params![id])?;
        if journeys == 0 {
            // nothing to delete; keep any tasks that pointed at a stale id
            tx.rollback()?;
            return Ok(None);
        }
        tx.commit()?;
        Ok(Some(tasks))
    }

    // ---- legacy journey todos ----

    fn row_to_legacy_todo(row: &Row) -> Result<LegacyTodo, rusqlite::Error> {
        Ok(LegacyTodo {
            id: Some(row.get(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            status: get_enum(row, 3)?,
            priority: get_enum(row, 4)?,
            category: get_enum(row, 5)?,
            is_completed: row.get::<_, i64>(6)? != 0,
            completed_at: get_opt_instant(row, 7)?,
            estimated_minutes: row.get(8)?,
            actual_minutes: row.get(9)?,
            journey_id: row.get(10)?,
            created_at: get_instant(row, 11)?,
        })
    }

    pub fn insert_legacy_todo(&self, todo: &LegacyTodo) -> Result<i64, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO journey_todos (title, description, status, priority, category,
                is_completed, completed_at, estimated_minutes, actual_minutes, journey_id,
                created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                todo.title,
                todo.description,
                todo.status.key(),
                todo.priority.key(),
                todo.category.key(),
                if todo.is_completed { 1 } else { 0 },
                todo.completed_at.map(format_instant),
                todo.estimated_minutes,
                todo.actual_minutes,
                todo.journey_id,
                format_instant(todo.created_at),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    pub fn update_legacy_todo(&self, todo: &LegacyTodo) -> Result<(), DatabaseError> {
        let id = todo.id.ok_or(DatabaseError::MissingId("journey todo"))?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE journey_todos SET title = ?1, description = ?2, status = ?3, priority = ?4,
                category = ?5, is_completed = ?6, completed_at = ?7, estimated_minutes = ?8,
                actual_minutes = ?9, journey_id = ?10
             WHERE id = ?11",
            params![
                todo.title,
                todo.description,
                todo.status.key(),
                todo.priority.key(),
                todo.category.key(),
                if todo.is_completed { 1 } else { 0 },
                todo.completed_at.map(format_instant),
                todo.estimated_minutes,
                todo.actual_minutes,
                todo.journey_id,
                id
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_legacy_todo(&self, id: i64) -> Result<Option<LegacyTodo>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LEGACY_TODO_COLUMNS} FROM journey_todos WHERE id = ?1"
        ))?;
        let todo = stmt
            .query_row(params![id], Self::row_to_legacy_todo)
            .optional()?;
        Ok(todo)
    }

    pub fn get_legacy_todos_for_journey(
        &self,
        journey_id: i64,
    ) -> Result<Vec<LegacyTodo>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LEGACY_TODO_COLUMNS} FROM journey_todos WHERE journey_id = ?1
             ORDER BY created_at ASC, id ASC"
        ))?;
        let todos = stmt
            .query_map(params![journey_id], Self::row_to_legacy_todo)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(todos)
    }

    pub fn count_legacy_todos(&self, journey_id: i64) -> Result<i64, DatabaseError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM journey_todos WHERE journey_id = ?1",
            params![journey_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ---- memos ----

    fn row_to_memo(row: &Row) -> Result<DailyMemo, rusqlite::Error> {
        Ok(DailyMemo {
            id: Some(row.get(0)?),
            memo_date: get_date(row, 1)?,
            content: row.get(2)?,
            created_at: get_instant(row, 3)?,
            updated_at: get_opt_instant(row, 4)?,
        })
    }

    fn query_memos(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<DailyMemo>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let memos = stmt
            .query_map(params, Self::row_to_memo)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(memos)
    }

    pub fn insert_memo(&self, memo: &DailyMemo) -> Result<i64, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO daily_memos (memo_date, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                format_date(memo.memo_date),
                memo.content,
                format_instant(memo.created_at),
                memo.updated_at.map(format_instant),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    pub fn update_memo(&self, memo: &DailyMemo) -> Result<(), DatabaseError> {
        let id = memo.id.ok_or(DatabaseError::MissingId("memo"))?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE daily_memos SET content = ?1, updated_at = ?2 WHERE id = ?3",
            params![memo.content, memo.updated_at.map(format_instant), id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_memo(&self, id: i64) -> Result<Option<DailyMemo>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {MEMO_COLUMNS} FROM daily_memos WHERE id = ?1"))?;
        let memo = stmt.query_row(params![id], Self::row_to_memo).optional()?;
        Ok(memo)
    }

    pub fn delete_memo(&self, id: i64) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let deleted = tx.execute("DELETE FROM daily_memos WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Memos of one date in the order they were written
    pub fn get_memos_by_date(&self, date: NaiveDate) -> Result<Vec<DailyMemo>, DatabaseError> {
        self.query_memos(
            &format!(
                "SELECT {MEMO_COLUMNS} FROM daily_memos WHERE memo_date = ?1
                 ORDER BY created_at ASC, id ASC"
            ),
            params![format_date(date)],
        )
    }

    pub fn count_memos_by_date(&self, date: NaiveDate) -> Result<i64, DatabaseError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM daily_memos WHERE memo_date = ?1",
            params![format_date(date)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn get_recent_memos(&self, limit: u32) -> Result<Vec<DailyMemo>, DatabaseError> {
        self.query_memos(
            &format!(
                "SELECT {MEMO_COLUMNS} FROM daily_memos
                 ORDER BY created_at DESC, id DESC LIMIT ?1"
            ),
            params![limit],
        )
    }

    pub fn get_memos_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyMemo>, DatabaseError> {
        self.query_memos(
            &format!(
                "SELECT {MEMO_COLUMNS} FROM daily_memos
                 WHERE memo_date >= ?1 AND memo_date <= ?2
                 ORDER BY memo_date ASC, created_at ASC, id ASC"
            ),
            params![format_date(start), format_date(end)],
        )
    }

    /// Case-insensitive substring match on memo content, newest first
    pub fn search_memos(&self, keyword: &str, limit: u32) -> Result<Vec<DailyMemo>, DatabaseError> {
        let escaped = keyword
            .to_lowercase()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        self.query_memos(
            &format!(
                "SELECT {MEMO_COLUMNS} FROM daily_memos
                 WHERE lower(content) LIKE '%' || ?1 || '%' ESCAPE '\\'
                 ORDER BY created_at DESC, id DESC LIMIT ?2"
            ),
            params![escaped, limit],
        )
    }
}

impl TaskStore for Database {
    fn find_by_id(&self, id: i64) -> Result<Option<Task>, DatabaseError> {
        self.get_task(id)
    }

    fn filter(&self, predicate: &dyn Fn(&Task) -> bool) -> Result<Vec<Task>, DatabaseError> {
        Ok(self
            .get_all_tasks()?
            .into_iter()
            .filter(|task| predicate(task))
            .collect())
    }

    fn save(&self, task: &Task) -> Result<i64, DatabaseError> {
        match task.id {
            Some(id) if self.update_task(task)? => Ok(id),
            Some(id) => Err(DatabaseError::MissingRow { kind: "task", id }),
            None => self.insert_task(task),
        }
    }

    fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        self.delete_task(id)
    }

    fn journey_exists(&self, id: i64) -> Result<bool, DatabaseError> {
        Ok(self.get_journey(id)?.is_some())
    }
}

impl ReflectionStore for Database {
    fn find_by_date(&self, date: NaiveDate) -> Result<Option<DailyReflection>, DatabaseError> {
        self.get_reflection(date)
    }

    fn upsert(&self, reflection: &DailyReflection) -> Result<i64, DatabaseError> {
        self.upsert_reflection(reflection)
    }

    fn delete_by_date(&self, date: NaiveDate) -> Result<bool, DatabaseError> {
        self.delete_reflection(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, PostponeRecord, TasksSnapshot};
    use crate::testing::{date, pending_task, utc_day};
    use tempfile::TempDir;

    fn reflection_for(d: NaiveDate, text: &str) -> DailyReflection {
        DailyReflection {
            id: None,
            reflection_date: d,
            reflection_text: text.to_string(),
            total_tasks: 2,
            completed_tasks: 1,
            completion_rate: 50.0,
            snapshot: TasksSnapshot::default(),
            satisfaction_score: Some(4),
            energy_level: None,
            generated_content: None,
            generation_prompt: None,
            generated_at: None,
            created_at: utc_day(d),
            updated_at: None,
        }
    }

    #[test]
    fn task_round_trips_with_history() {
        let db = Database::open_in_memory().unwrap();
        let mut task = pending_task(0, date(2025, 5, 1));
        task.id = None;
        task.category = Category::Health;
        task.postpone_count = 1;
        task.postpone_history.push(PostponeRecord {
            from_date: date(2025, 5, 1),
            to_date: date(2025, 5, 3),
            reason: "rain".into(),
            postponed_at: utc_day(date(2025, 5, 1)),
        });

        let id = db.save(&task).unwrap();
        let loaded = db.find_by_id(id).unwrap().unwrap();
        task.id = Some(id);
        assert_eq!(loaded, task);
    }

    #[test]
    fn missing_task_is_none_and_delete_reports_false() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.find_by_id(42).unwrap().is_none());
        assert!(!TaskStore::delete(&db, 42).unwrap());
    }

    #[test]
    fn saving_a_stale_id_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        let task = pending_task(42, date(2025, 5, 1));
        assert!(!db.update_task(&task).unwrap());
        assert!(matches!(
            db.save(&task),
            Err(DatabaseError::MissingRow { kind: "task", id: 42 })
        ));
        assert!(db.all().unwrap().is_empty());
    }

    #[test]
    fn journey_existence_is_reported() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.journey_exists(1).unwrap());
        let journey = Journey::new("Tidy", date(2025, 5, 1), date(2025, 6, 1), utc_day(date(2025, 5, 1)));
        let id = db.insert_journey(&journey).unwrap();
        assert!(db.journey_exists(id).unwrap());
    }

    #[test]
    fn filter_returns_display_order() {
        let db = Database::open_in_memory().unwrap();
        for created in [date(2025, 5, 3), date(2025, 5, 1), date(2025, 5, 2)] {
            let mut task = pending_task(0, created);
            task.id = None;
            db.save(&task).unwrap();
        }
        let dates: Vec<_> = db.all().unwrap().iter().map(|t| t.created_date).collect();
        assert_eq!(dates, vec![date(2025, 5, 1), date(2025, 5, 2), date(2025, 5, 3)]);
    }

    #[test]
    fn reflection_upsert_keeps_one_row_per_date() {
        let db = Database::open_in_memory().unwrap();
        let d = date(2025, 5, 1);
        let first = db.upsert(&reflection_for(d, "first")).unwrap();
        db.save_generated_content(d, "# post", "prompt", utc_day(d)).unwrap();

        let mut second = reflection_for(d, "second");
        second.total_tasks = 3;
        let again = db.upsert(&second).unwrap();
        assert_eq!(first, again);

        let stored = db.find_by_date(d).unwrap().unwrap();
        assert_eq!(stored.reflection_text, "second");
        assert_eq!(stored.total_tasks, 3);
        assert_eq!(stored.generated_content.as_deref(), Some("# post"));
        assert_eq!(db.get_recent_reflections(10).unwrap().len(), 1);

        assert!(db.delete_by_date(d).unwrap());
        assert!(!db.delete_by_date(d).unwrap());
    }

    #[test]
    fn journey_delete_cascades_to_tasks_only() {
        let db = Database::open_in_memory().unwrap();
        let journey = Journey::new("Marathon", date(2025, 5, 1), date(2025, 6, 1), utc_day(date(2025, 5, 1)));
        let journey_id = db.insert_journey(&journey).unwrap();
        let mut task = pending_task(0, date(2025, 5, 1));
        task.id = None;
        task.journey_id = Some(journey_id);
        db.save(&task).unwrap();
        let mut other = pending_task(0, date(2025, 5, 1));
        other.id = None;
        db.save(&other).unwrap();

        assert_eq!(db.delete_journey_cascade(journey_id).unwrap(), Some(1));
        assert_eq!(db.all().unwrap().len(), 1);
        assert_eq!(db.delete_journey_cascade(journey_id).unwrap(), None);
    }

    #[test]
    fn memo_search_treats_wildcards_literally() {
        let db = Database::open_in_memory().unwrap();
        let d = date(2025, 5, 1);
        for content in ["100% done", "Called Mom", "1000 steps"] {
            db.insert_memo(&DailyMemo::new(d, content, utc_day(d))).unwrap();
        }
        assert_eq!(db.search_memos("100%", 50).unwrap().len(), 1);
        assert_eq!(db.search_memos("mom", 50).unwrap().len(), 1);
        assert_eq!(db.count_memos_by_date(d).unwrap(), 3);
    }

    #[test]
    fn opening_an_old_file_adds_missing_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(
                "CREATE TABLE tasks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    description TEXT,
                    notes TEXT,
                    category TEXT NOT NULL DEFAULT 'OTHER',
                    created_date TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    scheduled_date TEXT,
                    is_completed INTEGER NOT NULL DEFAULT 0,
                    completed_at TEXT,
                    completion_reflection TEXT,
                    completion_image TEXT,
                    estimated_minutes INTEGER,
                    actual_minutes INTEGER,
                    journey_id INTEGER
                )",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO tasks (title, created_date, created_at)
                 VALUES ('old', '2024-12-31', '2024-12-31 08:00:00')",
                [],
            )
            .unwrap();
        }

        let db = Database::new(path.to_str().unwrap()).unwrap();
        let tasks = db.all().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].postpone_count, 0);
        assert!(tasks[0].postpone_history.is_empty());
        assert!(tasks[0].scheduled_date.is_none());
    }
}
