//! GRIB2 parser implementation (WMO FM 92 GRIB Edition 2).
//!
//! This crate provides a pure Rust implementation for parsing GRIB2 files,
//! the standard format for meteorological data exchange: section parsing
//! through a template decode table, a registry of packing codecs, and a
//! resolver from grid templates to canonical [`projection::GridDescriptor`]s.
//!
//! ```no_run
//! use bytes::Bytes;
//! use grib2_parser::{CodecRegistry, Grib2Reader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = Bytes::from(std::fs::read("gfs.grib2")?);
//! let registry = CodecRegistry::with_builtin();
//! for message in Grib2Reader::new(data) {
//!     let message = message?;
//!     let grid = message.grid()?;
//!     let field = message.unpack(&registry)?;
//!     println!("{} points on {}", field.len(), grid.projection.kind());
//! }
//! # Ok(())
//! # }
//! ```

pub mod bitstream;
pub mod error;
pub mod grid;
pub mod message;
pub mod reader;
pub mod sections;
pub mod tables;
pub mod templates;
pub mod unpacking;

pub use error::{ErrorKind, Grib2Error, MessageError, Result};
pub use message::{parse_record, Grib2Message, ParsedRecord};
pub use reader::Grib2Reader;
pub use sections::{Bitmap, FixedSurface, Identification, Indicator, ProductDefinition, SectionSpan};
pub use tables::{Grib2Tables, LevelDescription, ParameterInfo};
pub use unpacking::{
    encode_simple, Codec, CodecParameters, CodecRegistry, CodecSpecific, DecodedField, SimplePacked,
    DEFAULT_MISSING_VALUE,
};
