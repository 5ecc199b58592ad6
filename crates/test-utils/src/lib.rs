//! Shared test utilities for the GRIB2 workspace.
//!
//! - [`Grib2Builder`] synthesizes complete GRIB2 records
//! - [`BitWriter`] assembles packed payloads bit by bit
//! - generators for verifiable synthetic fields
//! - skip macros for optional sample files
//!
//! ```ignore
//! use test_utils::{require_test_file, Grib2Builder};
//! ```

pub mod bitwriter;
pub mod generators;
pub mod grib2_builder;
pub mod paths;

pub use bitwriter::BitWriter;
pub use generators::*;
pub use grib2_builder::{BitmapSpec, FieldSpec, Grib2Builder, GridTemplate, Packing};
pub use paths::*;

/// Path of a sample file, or return early from the test with a skip
/// notice when it cannot be found.
///
/// ```ignore
/// #[test]
/// fn test_real_gfs() {
///     let path = test_utils::require_test_file!("gfs_sample.grib2");
/// }
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!("SKIPPED: sample '{}' not found, set TEST_DATA_DIR to run", $name);
                return;
            }
        }
    }};
}

/// Approximate equality of two numbers, compared as `f64`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Element-wise [`assert_approx_eq!`] over two slices of equal length.
#[macro_export]
macro_rules! assert_slice_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = &$left;
        let right = &$right;
        assert_eq!(left.len(), right.len(), "slice lengths differ");
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let diff = (*l as f64 - *r as f64).abs();
            if !(diff <= $epsilon as f64) {
                panic!("slices differ at {}: {:?} vs {:?}", i, l, r);
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_rejects_nan() {
        assert_approx_eq!(f64::NAN, 1.0, 0.001);
    }

    #[test]
    fn test_assert_slice_approx_eq() {
        assert_slice_approx_eq!([1.0, 2.0], vec![1.00001, 1.99999], 0.001);
    }
}
