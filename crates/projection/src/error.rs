//! Error types for projection and grid geometry.

use thiserror::Error;

/// Errors raised while building projections or grid geometry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    /// A projection parameter is outside its valid range.
    #[error("Invalid projection parameter: {0}")]
    InvalidParameter(String),

    /// The grid description is internally inconsistent.
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// The requested operation has no meaning for this grid.
    #[error("Unsupported grid operation: {0}")]
    Unsupported(String),
}

impl ProjectionError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
