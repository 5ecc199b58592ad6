//! Resampling of decoded GRIB2 fields between grids.
//!
//! This crate turns the fields produced by `grib2-parser` into values on a
//! caller-chosen target grid. It provides:
//!
//! - **Interpolation**: nearest neighbour, bilinear, bicubic, budget
//!   (area-weighted) and spectral methods over any [`projection::GridDescriptor`]
//! - **Spectral transforms**: spherical harmonic analysis, synthesis and
//!   filtering on Gaussian and global lat/lon grids
//! - **Pipeline**: [`GribResampler`] decodes every message of a buffer and
//!   resamples it, reporting per-message diagnostics
//!
//! # Architecture
//!
//! ```text
//! GRIB2 bytes
//!      │
//!      ▼
//! GribResampler::resample_all(request)
//!      │
//!      ├─► Grib2Reader: frame records, split fields
//!      │
//!      ├─► CodecRegistry: unpack data section (+ bitmap)
//!      │
//!      ├─► GridDescriptor: resolve source grid
//!      │
//!      └─► interpolation::resample on the rayon pool
//!               │
//!               ▼
//!          ResampledMessage + DiagnosticsSink event
//! ```
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use grid_processor::{GribResampler, ResampleConfig};
//! use projection::GridDescriptor;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = Bytes::from(std::fs::read("gfs.grib2")?);
//! let resampler = GribResampler::new(ResampleConfig::from_env())?;
//! let request = resampler.request(GridDescriptor::lat_lon(-90.0, 0.0, 1.0, 1.0, 360, 181));
//! for result in resampler.resample_all(&data, &request) {
//!     let resampled = result?;
//!     println!("{} missing", resampled.diagnostics.missing_count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod interpolation;
pub mod pipeline;
pub mod spectral;
pub mod types;

pub use config::ResampleConfig;
pub use diagnostics::{CollectingSink, DiagnosticEvent, DiagnosticsSink, NullSink, TracingSink};
pub use error::{GridProcessorError, MessageFailure, Result};
pub use interpolation::{resample, resample_points, PointSampler, SourceField};
pub use pipeline::{DecodedMessage, GribResampler, ResampleDiagnostics, ResampledMessage};
pub use spectral::{SpectralCoefficients, SpectralFilter};
pub use types::{InterpolationMethod, InterpolationRequest, MethodOptions, ResampleOutput};
