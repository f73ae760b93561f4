//! Error taxonomy for the recommendation engine.
//!
//! Query-time failures (`TrackNotFound`, `InvalidDate`, `InvalidArgument`)
//! are recoverable and meant to be shown to the user. Load-time failures
//! (`InvalidData` and the wrapped I/O errors) mean the catalog must not be
//! served.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("track '{0}' not found in catalog")]
    TrackNotFound(String),

    #[error("invalid release date '{value}' for track '{track}' (expected YYYY-MM-DD)")]
    InvalidDate { track: String, value: String },

    #[error("invalid catalog data at line {line}, column '{column}': {message}")]
    InvalidData {
        line: u64,
        column: String,
        message: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RecommendError {
    pub(crate) fn invalid_data(line: u64, column: &str, message: impl Into<String>) -> Self {
        RecommendError::InvalidData {
            line,
            column: column.to_string(),
            message: message.into(),
        }
    }

    /// True for errors caused by the query rather than the catalog.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RecommendError::TrackNotFound(_)
                | RecommendError::InvalidDate { .. }
                | RecommendError::InvalidArgument(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RecommendError>;
