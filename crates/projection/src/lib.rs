//! Coordinate reference system transformations and grid geometry.
//!
//! Implements the map projections used by GRIB2 grid templates from scratch,
//! and the [`GridDescriptor`] value type that describes a grid independently
//! of how a message encoded it.

pub mod descriptor;
pub mod error;
pub mod gaussian;
pub mod geographic;
pub mod geometry;
pub mod lambert;
pub mod mercator;
pub mod polar;
pub mod rotated;
pub mod transform;

pub use descriptor::{GridDescriptor, GridShape, Projection, ScanMode};
pub use error::{ProjectionError, Result};
pub use geographic::GeoPoint;
pub use geometry::{GridGeometry, GridLocation};
pub use lambert::LambertConformal;
pub use mercator::Mercator;
pub use polar::PolarStereographic;
pub use rotated::RotatedPole;
pub use transform::MapProjection;
