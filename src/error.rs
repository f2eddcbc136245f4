//! Error types for autoguess.
//!
//! All errors are strongly typed using thiserror. Degenerate reasoning
//! states (no matching entities, collapsed belief mass, an empty question
//! pool) are not errors; they are handled by policy inside the engine.

use thiserror::Error;

/// Errors raised while loading the catalog. These are fatal: the engine
/// cannot start without a catalog.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("Catalog contains no records")]
    EmptyCatalog,

    #[error("Row {row}: required field '{field}' is missing")]
    MissingField {
        row: usize,
        field: String,
    },

    #[error("Row {row}: field '{field}' has malformed value {value:?}: {reason}")]
    MalformedField {
        row: usize,
        field: String,
        value: String,
        reason: String,
    },

    #[error("Row {row}: duplicate model '{model}'")]
    DuplicateModel {
        row: usize,
        model: String,
    },

    #[error("Failed to read catalog source '{path}': {message}")]
    Io {
        path: String,
        message: String,
    },

    #[error("Failed to parse catalog source: {message}")]
    Parse {
        message: String,
    },
}

/// Errors raised by a reasoning session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unknown question id: {id}")]
    UnknownQuestion {
        id: String,
    },
}

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{name} value {value} is out of range [0.0, 1.0]")]
    ThresholdOutOfRange {
        name: String,
        value: f64,
    },

    #[error("max_questions must be greater than zero")]
    ZeroQuestionBudget,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Top-level error type for autoguess.
#[derive(Debug, Error)]
pub enum GuessError {
    #[error("Data load error: {0}")]
    Load(#[from] DataLoadError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl GuessError {
    /// Returns true if the engine cannot start because of this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Load(_))
    }

    /// Returns true if this error signals a caller bug (for example an
    /// answer to a question the session never issued).
    #[must_use]
    pub const fn is_integration(&self) -> bool {
        matches!(self, Self::Session(SessionError::UnknownQuestion { .. }))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for autoguess operations.
pub type GuessResult<T> = Result<T, GuessError>;
