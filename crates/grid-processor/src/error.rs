//! Error types for resampling.

use grib2_parser::Grib2Error;
use projection::ProjectionError;
use thiserror::Error;

/// Errors that can occur while decoding or resampling a field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridProcessorError {
    /// The method cannot operate on the given source or target grid.
    #[error("incompatible grid: {0}")]
    IncompatibleGrid(String),

    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Grib2(#[from] Grib2Error),

    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// The caller's time budget ran out before `stage` completed.
    #[error("deadline exceeded during {stage}")]
    DeadlineExceeded { stage: &'static str },

    #[error("thread pool error: {0}")]
    ThreadPool(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl GridProcessorError {
    pub fn incompatible_grid(msg: impl Into<String>) -> Self {
        Self::IncompatibleGrid(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}

/// Failure of one message inside a multi-message buffer.
///
/// `next_offset` is where the caller can resume, when the failed record's
/// length is known.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("message at byte {offset}: {error}")]
pub struct MessageFailure {
    pub offset: usize,
    pub next_offset: Option<usize>,
    #[source]
    pub error: GridProcessorError,
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
