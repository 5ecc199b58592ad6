//! Error types for GRIB2 parsing and unpacking.

use thiserror::Error;

/// Coarse classification of a [`Grib2Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Structurally malformed input; the record must be discarded
    Format,
    /// Recognized but unimplemented template, codec or projection
    Unsupported,
    /// A codec ran but its input or output was inconsistent
    Decode,
    /// An internal invariant was violated
    Internal,
}

/// Errors raised while reading GRIB2 data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Grib2Error {
    #[error("Invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    #[error("Invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("Unsupported GRIB edition {0}")]
    UnsupportedEdition(u8),

    #[error("Read past end of buffer: {requested} bits at bit offset {offset}, {available} bits available")]
    OutOfBounds {
        offset: usize,
        requested: usize,
        available: usize,
    },

    #[error("Unsupported template {section}.{template}")]
    UnsupportedTemplate { section: u8, template: u16 },

    #[error("No codec registered for data representation template 5.{0}")]
    UnsupportedCodec(u16),

    #[error("Unsupported grid definition template 3.{0}")]
    UnsupportedProjection(u16),

    #[error("Unpacking error: {0}")]
    UnpackingError(String),

    #[error("Codec produced {actual} values, expected {expected}")]
    CountMismatch { expected: usize, actual: usize },
}

impl Grib2Error {
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    pub fn invalid_section(section: u8, reason: impl Into<String>) -> Self {
        Self::InvalidSection {
            section,
            reason: reason.into(),
        }
    }

    pub fn unpacking(msg: impl Into<String>) -> Self {
        Self::UnpackingError(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Grib2Error::InvalidFormat(_)
            | Grib2Error::InvalidSection { .. }
            | Grib2Error::UnsupportedEdition(_)
            | Grib2Error::OutOfBounds { .. } => ErrorKind::Format,
            Grib2Error::UnsupportedTemplate { .. }
            | Grib2Error::UnsupportedCodec(_)
            | Grib2Error::UnsupportedProjection(_) => ErrorKind::Unsupported,
            Grib2Error::UnpackingError(_) => ErrorKind::Decode,
            Grib2Error::CountMismatch { .. } => ErrorKind::Internal,
        }
    }

    /// Re-attribute a reader error to the section being parsed.
    pub(crate) fn in_section(self, section: u8) -> Self {
        match self {
            Grib2Error::OutOfBounds { .. } => Grib2Error::invalid_section(
                section,
                format!("section body truncated ({})", self),
            ),
            other => other,
        }
    }
}

impl From<projection::ProjectionError> for Grib2Error {
    fn from(err: projection::ProjectionError) -> Self {
        Grib2Error::invalid_section(3, err.to_string())
    }
}

/// A record-level failure, with the number of bytes the failed record
/// occupies when the section lengths read so far determine it.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{error}")]
pub struct MessageError {
    #[source]
    pub error: Grib2Error,
    pub consumed: Option<usize>,
}

impl MessageError {
    pub fn new(error: Grib2Error, consumed: Option<usize>) -> Self {
        Self { error, consumed }
    }
}

pub type Result<T> = std::result::Result<T, Grib2Error>;
