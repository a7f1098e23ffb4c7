pub mod cli;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod generation;
pub mod journey;
pub mod labels;
pub mod memo;
pub mod models;
pub mod reflection;
pub mod rollover;
pub mod summary;
pub mod tasks;
pub mod tui;
pub mod utils;

#[cfg(test)]
mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use database::Database;
pub use error::{DomainError, GenerationError};
pub use models::{DailyMemo, DailyReflection, Journey, Task};
pub use utils::Profile;
