use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use thiserror::Error;

use crate::clock::Clock;
use crate::config::{Config, ConfigError};
use crate::database::{Database, DatabaseError};
use crate::error::DomainError;
use crate::generation::{self, BlogOptions, HttpGenerator};
use crate::journey::{self, JourneyPatch, NewJourney};
use crate::labels::{parse_category, Labels};
use crate::memo;
use crate::models::{DailyMemo, DailyReflection, Journey, JourneyStatus, TodoPriority, TodoStatus};
use crate::reflection::{self, ReflectionInput, ReflectionStats};
use crate::rollover::OverdueStatus;
use crate::summary::{CategoryCount, WeeklySummary};
use crate::tasks::{self, NewTask, PostponeSummary, TaskPatch, TodayView};
use crate::utils::parse_date;

#[derive(Parser)]
#[command(name = "daybook")]
#[command(about = "Daily tasks that roll over, journeys and end-of-day reflections")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive today board (default if no subcommand)
    Tui,
    /// Show today's tasks, including carried-over ones
    Today {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a task for today (or a later date)
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Category key or label (unknown values become "other")
        #[arg(long)]
        category: Option<String>,
        /// Estimated minutes
        #[arg(long)]
        estimate: Option<i64>,
        /// Journey to attach the task to
        #[arg(long)]
        journey: Option<i64>,
        /// Scheduled date (YYYY-MM-DD, today, tomorrow)
        #[arg(long)]
        date: Option<String>,
    },
    /// Edit a task; an empty string clears a text field
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        estimate: Option<i64>,
        /// Actual minutes spent
        #[arg(long)]
        actual: Option<i64>,
        #[arg(long)]
        journey: Option<i64>,
    },
    /// Complete a task, or reopen a completed one
    Toggle {
        id: i64,
        /// Short note on how it went
        #[arg(long)]
        reflection: Option<String>,
        /// Image reference attached to the completion
        #[arg(long)]
        image: Option<String>,
    },
    /// Move an open task to a later date
    Postpone {
        id: i64,
        /// Target date (defaults to tomorrow)
        #[arg(long)]
        to: Option<String>,
        /// Reason, recorded in the postpone history
        #[arg(long)]
        reason: Option<String>,
    },
    /// Show a task's postpone history
    PostponeInfo { id: i64 },
    /// Delete a task
    Delete { id: i64 },
    /// Today's completion summary
    Summary {
        #[arg(long)]
        json: bool,
    },
    /// This week's tasks per day
    Week,
    /// Today's tasks per category
    Categories,
    /// Write (or rewrite) the reflection for a day
    Reflect {
        text: String,
        /// Satisfaction 1-5
        #[arg(long)]
        satisfaction: Option<u8>,
        /// Energy 1-5
        #[arg(long)]
        energy: Option<u8>,
        /// Reflection date (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Read and manage reflections
    Reflection {
        #[command(subcommand)]
        command: ReflectionCommand,
    },
    /// Turn a reflection into a blog post
    Blog {
        #[arg(long)]
        date: Option<String>,
        /// Regenerate even if a post is cached
        #[arg(long)]
        force: bool,
        /// Extra instructions for the writer
        #[arg(long)]
        extra: Option<String>,
        /// Leave completion images out of the prompt
        #[arg(long)]
        no_images: bool,
    },
    /// Manage journeys
    Journey {
        #[command(subcommand)]
        command: JourneyCommand,
    },
    /// Manage daily memos
    Memo {
        #[command(subcommand)]
        command: MemoCommand,
    },
}

#[derive(Subcommand)]
pub enum ReflectionCommand {
    Show {
        date: Option<String>,
    },
    List {
        #[arg(long, default_value_t = reflection::DEFAULT_RECENT_LIMIT)]
        limit: u32,
    },
    Month {
        year: i32,
        month: u32,
    },
    Stats {
        #[arg(long, default_value_t = reflection::DEFAULT_STATS_DAYS)]
        days: i64,
    },
    Delete {
        date: String,
    },
}

#[derive(Subcommand)]
pub enum JourneyCommand {
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Start date (defaults to today)
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: String,
        /// PLANNING, ACTIVE, COMPLETED or PAUSED
        #[arg(long)]
        status: Option<String>,
    },
    List {
        /// Only active journeys
        #[arg(long)]
        active: bool,
    },
    Show {
        id: i64,
    },
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        progress: Option<f64>,
    },
    /// Recompute progress from the journey's tasks
    Refresh {
        id: i64,
    },
    /// Delete a journey together with its tasks
    Delete {
        id: i64,
    },
    /// Add a journey todo
    TodoAdd {
        journey_id: i64,
        title: String,
        /// LOW, NORMAL, HIGH or URGENT
        #[arg(long)]
        priority: Option<String>,
        /// TODO, IN_PROGRESS, COMPLETED or CANCELLED
        #[arg(long)]
        status: Option<String>,
    },
    TodoToggle {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum MemoCommand {
    Add {
        content: String,
        #[arg(long)]
        date: Option<String>,
    },
    List {
        #[arg(long)]
        date: Option<String>,
    },
    Edit {
        id: i64,
        content: String,
    },
    Delete {
        id: i64,
    },
    Search {
        keyword: String,
        #[arg(long, default_value_t = memo::SEARCH_LIMIT)]
        limit: u32,
    },
    Recent {
        #[arg(long, default_value_t = memo::RECENT_LIMIT)]
        limit: u32,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything a command handler needs.
pub struct Context<'a> {
    pub db: &'a Database,
    pub clock: &'a dyn Clock,
    pub labels: Labels,
    pub config: &'a Config,
}

impl Context<'_> {
    fn date(&self, value: &str) -> Result<NaiveDate, CliError> {
        parse_date(value, self.clock.today()).map_err(CliError::DateParseError)
    }

    fn date_or_today(&self, value: Option<&str>) -> Result<NaiveDate, CliError> {
        value.map_or_else(|| Ok(self.clock.today()), |v| self.date(v))
    }
}

fn parse_arg<T>(value: &str) -> Result<T, CliError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| CliError::InvalidArgument(e.to_string()))
}

/// Run every command except `tui`.
pub fn run(command: Commands, ctx: &Context) -> Result<(), CliError> {
    match command {
        Commands::Tui => Ok(()),
        Commands::Today { json } => handle_today(json, ctx),
        Commands::Add {
            title,
            description,
            notes,
            category,
            estimate,
            journey,
            date,
        } => {
            let new = NewTask {
                title,
                description,
                notes,
                category: category.as_deref().map(parse_category).unwrap_or_default(),
                estimated_minutes: estimate,
                journey_id: journey,
                scheduled_date: date.as_deref().map(|d| ctx.date(d)).transpose()?,
            };
            handle_add(new, ctx)
        }
        Commands::Edit {
            id,
            title,
            description,
            notes,
            category,
            estimate,
            actual,
            journey,
        } => {
            let patch = TaskPatch {
                title,
                description,
                notes,
                category: category.as_deref().map(parse_category),
                estimated_minutes: estimate,
                actual_minutes: actual,
                journey_id: journey,
            };
            let task = tasks::update_task(ctx.db, id, patch)?;
            println!("Task {} updated: {}", id, task.title);
            Ok(())
        }
        Commands::Toggle {
            id,
            reflection,
            image,
        } => {
            let task = tasks::toggle_complete(
                ctx.db,
                ctx.clock,
                id,
                reflection.as_deref(),
                image.as_deref(),
            )?;
            let state = if task.is_completed { "completed" } else { "reopened" };
            println!("Task {} {}: {}", id, state, task.title);
            Ok(())
        }
        Commands::Postpone { id, to, reason } => {
            let target = match to {
                Some(to) => ctx.date(&to)?,
                None => ctx.date("tomorrow")?,
            };
            let task = tasks::reschedule(ctx.db, ctx.clock, id, target, reason.as_deref())?;
            println!(
                "Task {} postponed to {} (postponed {} time(s))",
                id, target, task.postpone_count
            );
            Ok(())
        }
        Commands::PostponeInfo { id } => {
            let summary = tasks::postpone_summary(ctx.db, id)?;
            print!("{}", format_postpone_summary(&summary));
            Ok(())
        }
        Commands::Delete { id } => {
            tasks::delete_task(ctx.db, id)?;
            println!("Task {} deleted", id);
            Ok(())
        }
        Commands::Summary { json } => {
            let summary = tasks::today_summary(ctx.db, ctx.clock)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "{}: {}/{} done, {} pending ({:.1}%)",
                    ctx.clock.today(),
                    summary.completed,
                    summary.total,
                    summary.pending,
                    summary.completion_rate
                );
            }
            Ok(())
        }
        Commands::Week => {
            let week = tasks::weekly_summary(ctx.db, ctx.clock)?;
            print!("{}", format_week(&week));
            Ok(())
        }
        Commands::Categories => {
            let counts = tasks::category_summary(ctx.db, ctx.clock)?;
            print!("{}", format_categories(&counts, &ctx.labels));
            Ok(())
        }
        Commands::Reflect {
            text,
            satisfaction,
            energy,
            date,
        } => {
            let date = ctx.date_or_today(date.as_deref())?;
            let input = ReflectionInput {
                text,
                satisfaction_score: satisfaction,
                energy_level: energy,
            };
            let saved = reflection::upsert_reflection(ctx.db, ctx.clock, date, input)?;
            println!(
                "Reflection saved for {}: {}/{} tasks done ({:.1}%)",
                date, saved.completed_tasks, saved.total_tasks, saved.completion_rate
            );
            Ok(())
        }
        Commands::Reflection { command } => handle_reflection(command, ctx),
        Commands::Blog {
            date,
            force,
            extra,
            no_images,
        } => {
            let date = ctx.date_or_today(date.as_deref())?;
            handle_blog(date, force, extra, no_images, ctx)
        }
        Commands::Journey { command } => handle_journey(command, ctx),
        Commands::Memo { command } => handle_memo(command, ctx),
    }
}

fn handle_today(json: bool, ctx: &Context) -> Result<(), CliError> {
    let view = tasks::today_view(ctx.db, ctx.clock)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", format_today(&view, &ctx.labels));
    }
    Ok(())
}

/// Handle the add command
pub fn handle_add(new: NewTask, ctx: &Context) -> Result<(), CliError> {
    let task = tasks::create_task(ctx.db, ctx.clock, new)?;
    println!("Task created successfully (ID: {})", task.id.unwrap_or_default());
    Ok(())
}

fn handle_reflection(command: ReflectionCommand, ctx: &Context) -> Result<(), CliError> {
    match command {
        ReflectionCommand::Show { date } => {
            let date = ctx.date_or_today(date.as_deref())?;
            let found = reflection::get_reflection(ctx.db, date)?;
            print!("{}", format_reflection(&found, &ctx.labels));
        }
        ReflectionCommand::List { limit } => {
            let all = reflection::recent_reflections(ctx.db, limit)?;
            print!("{}", format_reflection_list(&all));
        }
        ReflectionCommand::Month { year, month } => {
            let all = reflection::reflections_in_month(ctx.db, year, month)?;
            print!("{}", format_reflection_list(&all));
        }
        ReflectionCommand::Stats { days } => {
            let stats = reflection::reflection_stats(ctx.db, ctx.clock, days)?;
            print!("{}", format_stats(&stats, days));
        }
        ReflectionCommand::Delete { date } => {
            let date = ctx.date(&date)?;
            reflection::delete_reflection(ctx.db, date)?;
            println!("Reflection for {} deleted", date);
        }
    }
    Ok(())
}

fn handle_blog(
    date: NaiveDate,
    force: bool,
    extra: Option<String>,
    no_images: bool,
    ctx: &Context,
) -> Result<(), CliError> {
    let options = BlogOptions {
        force,
        include_images: ctx.config.generation.include_images && !no_images,
        extra_request: extra,
    };
    // Serve the cache without requiring an API key.
    if !force {
        if let Some(post) = generation::cached_blog(ctx.db, date)? {
            println!("{}", post.content);
            return Ok(());
        }
    }
    let generator = HttpGenerator::from_config(&ctx.config.generation).map_err(DomainError::from)?;
    let post = generation::generate_blog(ctx.db, ctx.clock, &generator, &ctx.labels, date, &options)?;
    println!("{}", post.content);
    Ok(())
}

fn handle_journey(command: JourneyCommand, ctx: &Context) -> Result<(), CliError> {
    match command {
        JourneyCommand::Add {
            title,
            description,
            start,
            end,
            status,
        } => {
            let new = NewJourney {
                title,
                description,
                start_date: ctx.date_or_today(start.as_deref())?,
                end_date: ctx.date(&end)?,
                status: status.as_deref().map(parse_arg::<JourneyStatus>).transpose()?,
            };
            let created = journey::create_journey(ctx.db, ctx.clock, new)?;
            println!("Journey created successfully (ID: {})", created.id.unwrap_or_default());
        }
        JourneyCommand::List { active } => {
            let journeys = if active {
                journey::active_journeys(ctx.db)?
            } else {
                journey::list_journeys(ctx.db)?
            };
            print!("{}", format_journey_list(&journeys, &ctx.labels));
        }
        JourneyCommand::Show { id } => {
            let found = journey::get_journey(ctx.db, id)?;
            let stats = journey::journey_statistics(ctx.db, id)?;
            let todos = journey::legacy_todos(ctx.db, id)?;
            let mut out = format_journey_list(std::slice::from_ref(&found), &ctx.labels);
            if let Some(description) = &found.description {
                let _ = writeln!(out, "  {description}");
            }
            let _ = writeln!(
                out,
                "  {}/{} done ({:.1}%), {} min estimated, {} min spent",
                stats.completed_tasks,
                stats.total_tasks,
                stats.progress,
                stats.estimated_minutes,
                stats.actual_minutes
            );
            for todo in todos {
                let _ = writeln!(
                    out,
                    "  - #{} [{}] {} ({})",
                    todo.id.unwrap_or_default(),
                    ctx.labels.todo_status(todo.status),
                    todo.title,
                    ctx.labels.priority(todo.priority)
                );
            }
            print!("{out}");
        }
        JourneyCommand::Edit {
            id,
            title,
            description,
            start,
            end,
            status,
            progress,
        } => {
            let patch = JourneyPatch {
                title,
                description,
                start_date: start.as_deref().map(|d| ctx.date(d)).transpose()?,
                end_date: end.as_deref().map(|d| ctx.date(d)).transpose()?,
                status: status.as_deref().map(parse_arg::<JourneyStatus>).transpose()?,
                progress,
            };
            journey::update_journey(ctx.db, ctx.clock, id, patch)?;
            println!("Journey {} updated", id);
        }
        JourneyCommand::Refresh { id } => {
            let refreshed = journey::refresh_journey_progress(ctx.db, ctx.clock, id)?;
            println!(
                "Journey {}: {:.1}% ({})",
                id,
                refreshed.progress,
                ctx.labels.journey_status(refreshed.status)
            );
        }
        JourneyCommand::Delete { id } => {
            let removed = journey::delete_journey(ctx.db, id)?;
            println!("Journey {} deleted along with {} task(s)", id, removed);
        }
        JourneyCommand::TodoAdd {
            journey_id,
            title,
            priority,
            status,
        } => {
            let priority = priority
                .as_deref()
                .map(parse_arg::<TodoPriority>)
                .transpose()?
                .unwrap_or(TodoPriority::Normal);
            let status = status
                .as_deref()
                .map(parse_arg::<TodoStatus>)
                .transpose()?
                .unwrap_or(TodoStatus::Todo);
            let todo = journey::add_legacy_todo(ctx.db, ctx.clock, journey_id, &title, priority, status)?;
            println!("Journey todo created successfully (ID: {})", todo.id.unwrap_or_default());
        }
        JourneyCommand::TodoToggle { id } => {
            let todo = journey::toggle_legacy_todo(ctx.db, ctx.clock, id)?;
            println!("Journey todo {} is now {}", id, ctx.labels.todo_status(todo.status));
        }
    }
    Ok(())
}

fn handle_memo(command: MemoCommand, ctx: &Context) -> Result<(), CliError> {
    let offset = ctx.clock.offset();
    match command {
        MemoCommand::Add { content, date } => {
            let date = date.as_deref().map(|d| ctx.date(d)).transpose()?;
            let created = memo::create_memo(ctx.db, ctx.clock, &content, date)?;
            println!("Memo created successfully (ID: {})", created.id.unwrap_or_default());
        }
        MemoCommand::List { date } => {
            let date = ctx.date_or_today(date.as_deref())?;
            let memos = memo::memos_for_date(ctx.db, date)?;
            print!("{}", format_memos(&memos, offset));
        }
        MemoCommand::Edit { id, content } => {
            memo::update_memo(ctx.db, ctx.clock, id, &content)?;
            println!("Memo {} updated", id);
        }
        MemoCommand::Delete { id } => {
            memo::delete_memo(ctx.db, id)?;
            println!("Memo {} deleted", id);
        }
        MemoCommand::Search { keyword, limit } => {
            let memos = memo::search_memos(ctx.db, &keyword, limit)?;
            print!("{}", format_memos(&memos, offset));
        }
        MemoCommand::Recent { limit } => {
            let memos = memo::recent_memos(ctx.db, limit)?;
            print!("{}", format_memos(&memos, offset));
        }
    }
    Ok(())
}

pub fn format_today(view: &TodayView, labels: &Labels) -> String {
    let mut out = String::new();
    let s = &view.summary;
    let _ = writeln!(
        out,
        "{}  {}/{} done ({:.1}%)",
        view.date, s.completed, s.total, s.completion_rate
    );
    if view.items.is_empty() {
        out.push_str("  Nothing for today\n");
    }
    for item in &view.items {
        let task = &item.task;
        let mark = if task.is_completed { "x" } else { " " };
        let _ = write!(
            out,
            "  [{}] #{} {} ({})",
            mark,
            task.id.unwrap_or_default(),
            task.title,
            labels.category(task.category)
        );
        if !task.is_completed && item.status == OverdueStatus::Overdue {
            let _ = write!(out, " {} {}d", labels.overdue(item.status), item.days_overdue);
        }
        if task.postpone_count > 0 {
            let _ = write!(out, " postponed x{}", task.postpone_count);
        }
        out.push('\n');
    }
    out
}

pub fn format_postpone_summary(summary: &PostponeSummary) -> String {
    let mut out = format!(
        "Postponed {} time(s): {} -> {} ({} day(s))\n",
        summary.postpone_count,
        summary.original_date,
        summary.current_date,
        summary.total_days_postponed
    );
    for record in summary.history.iter().rev() {
        let _ = writeln!(
            out,
            "  {} -> {}: {}",
            record.from_date, record.to_date, record.reason
        );
    }
    out
}

pub fn format_week(week: &WeeklySummary) -> String {
    let mut out = format!(
        "Week of {}: {}/{} done\n",
        week.week_start, week.total_completed, week.total_tasks
    );
    for day in &week.days {
        let _ = writeln!(
            out,
            "  {} {}  {}/{}",
            day.date.weekday(),
            day.date,
            day.completed,
            day.total
        );
    }
    out
}

pub fn format_categories(counts: &[CategoryCount], labels: &Labels) -> String {
    if counts.is_empty() {
        return "No tasks created today\n".to_string();
    }
    counts
        .iter()
        .map(|c| {
            format!(
                "  {:<14} {}/{} ({:.1}% of today)\n",
                labels.category(c.category),
                c.completed,
                c.total,
                c.share
            )
        })
        .collect()
}

fn score(value: Option<u8>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v}/5"))
}

pub fn format_reflection(reflection: &DailyReflection, labels: &Labels) -> String {
    let mut out = format!(
        "{}  {}/{} done ({:.1}%)  satisfaction {}  energy {}\n\n{}\n",
        reflection.reflection_date,
        reflection.completed_tasks,
        reflection.total_tasks,
        reflection.completion_rate,
        score(reflection.satisfaction_score),
        score(reflection.energy_level),
        reflection.reflection_text
    );
    for task in &reflection.snapshot.completed {
        let _ = writeln!(out, "  [x] {} ({})", task.title, labels.category(task.category));
    }
    for task in &reflection.snapshot.incomplete {
        let _ = writeln!(out, "  [ ] {} ({})", task.title, labels.category(task.category));
    }
    if reflection.generated_content.is_some() {
        out.push_str("\nA blog post is cached for this day (daybook blog).\n");
    }
    out
}

fn format_reflection_list(reflections: &[DailyReflection]) -> String {
    if reflections.is_empty() {
        return "No reflections\n".to_string();
    }
    reflections
        .iter()
        .map(|r| {
            let first_line = r.reflection_text.lines().next().unwrap_or_default();
            format!(
                "  {}  {:>5.1}%  {}\n",
                r.reflection_date, r.completion_rate, first_line
            )
        })
        .collect()
}

fn format_stats(stats: &ReflectionStats, days: i64) -> String {
    format!(
        "Last {} day(s): {} reflection(s)\n  completion {:.1}%  satisfaction {:.1}  energy {:.1}\n  tasks {}/{}\n",
        days,
        stats.total_days,
        stats.avg_completion_rate,
        stats.avg_satisfaction,
        stats.avg_energy,
        stats.total_completed,
        stats.total_tasks
    )
}

fn format_journey_list(journeys: &[Journey], labels: &Labels) -> String {
    if journeys.is_empty() {
        return "No journeys\n".to_string();
    }
    journeys
        .iter()
        .map(|j| {
            format!(
                "#{} {} [{}] {} .. {}  {:.1}%\n",
                j.id.unwrap_or_default(),
                j.title,
                labels.journey_status(j.status),
                j.start_date,
                j.end_date,
                j.progress
            )
        })
        .collect()
}

fn format_memos(memos: &[DailyMemo], offset: chrono::FixedOffset) -> String {
    if memos.is_empty() {
        return "No memos\n".to_string();
    }
    memos
        .iter()
        .map(|m| {
            format!(
                "#{} {} {}  {}\n",
                m.id.unwrap_or_default(),
                m.memo_date,
                m.created_at.with_timezone(&offset).format("%H:%M"),
                m.content
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::testing::date;
    use chrono::Duration;

    #[test]
    fn today_listing_marks_overdue_and_postponed_tasks() {
        let db = Database::open_in_memory().unwrap();
        let mut clock = FixedClock::at_noon(date(2025, 4, 1));
        let old = tasks::create_task(&db, &clock, NewTask::titled("Old chore")).unwrap();
        clock.advance_to(date(2025, 4, 3));
        tasks::create_task(&db, &clock, NewTask::titled("Fresh")).unwrap();
        let id = old.id.unwrap();
        tasks::reschedule(&db, &clock, id, clock.today(), Some("busy")).unwrap();

        let view = tasks::today_view(&db, &clock).unwrap();
        let text = format_today(&view, &Labels::default());
        assert!(text.starts_with("2025-04-03  0/2 done (0.0%)"));
        assert!(text.contains("Old chore (Other) overdue 2d postponed x1"));
        assert!(text.contains("Fresh (Other)\n"));
    }

    #[test]
    fn week_lists_monday_to_sunday() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::at_noon(date(2025, 4, 3));
        tasks::create_task(&db, &clock, NewTask::titled("x")).unwrap();
        let week = tasks::weekly_summary(&db, &clock).unwrap();
        let text = format_week(&week);
        assert!(text.starts_with("Week of 2025-03-31: 0/1 done"));
        assert!(text.contains("Thu 2025-04-03  0/1"));
        assert_eq!(text.lines().count(), 8);
    }

    #[test]
    fn memo_times_use_the_display_offset() {
        let clock = FixedClock::at_noon(date(2025, 4, 3));
        let memo = DailyMemo::new(clock.today(), "tea", clock.now());
        let offset = chrono::FixedOffset::east_opt(9 * 3600).unwrap();
        assert!(format_memos(&[memo], offset).contains("21:00  tea"));
    }

    #[test]
    fn postpone_history_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::at_noon(date(2025, 4, 1));
        let id = tasks::create_task(&db, &clock, NewTask::titled("x")).unwrap().id.unwrap();
        tasks::reschedule(&db, &clock, id, date(2025, 4, 2), Some("first")).unwrap();
        tasks::reschedule(&db, &clock, id, date(2025, 4, 2) + Duration::days(2), Some("second")).unwrap();

        let text = format_postpone_summary(&tasks::postpone_summary(&db, id).unwrap());
        let second = text.find("second").unwrap();
        let first = text.find("first").unwrap();
        assert!(second < first);
        assert!(text.starts_with("Postponed 2 time(s): 2025-04-01 -> 2025-04-04 (3 day(s))"));
    }
}
