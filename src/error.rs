use thiserror::Error;

use crate::database::DatabaseError;

/// Failures of the text-generation provider.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0} is not set")]
    MissingApiKey(&'static str),
    #[error("Unknown generation provider: {0}")]
    UnknownProvider(String),
    #[error("Request to {provider} failed: {message}")]
    Transport { provider: String, message: String },
    #[error("{provider} returned status {status}: {message}")]
    Status {
        provider: String,
        status: u16,
        message: String,
    },
    #[error("Could not read {provider} response: {message}")]
    InvalidResponse { provider: String, message: String },
}

/// Error taxonomy shared by every domain operation.
///
/// Validation and state errors are always raised before anything is written.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    InvalidStateTransition(String),
    #[error("Text generation failed: {0}")]
    ExternalProvider(#[from] GenerationError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl DomainError {
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        DomainError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }
}
