//! Configuration for resampling.

use std::str::FromStr;
use std::time::Duration;

use grib2_parser::DEFAULT_MISSING_VALUE;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::InterpolationMethod;

/// Configuration for the resampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Marker written at missing points unless a request overrides it.
    pub missing_value: f64,

    /// Interpolation method used by [`crate::GribResampler::request`].
    pub method: InterpolationMethod,

    /// Spectral truncation; `None` uses the highest the source grid supports.
    pub truncation: Option<usize>,

    /// Worker threads for data-parallel loops; 0 runs sequentially.
    pub threads: usize,

    /// Sub-points per target cell side for budget interpolation.
    pub budget_subdivisions: usize,

    /// Time budget in milliseconds for one pipeline call.
    pub timeout_ms: Option<u64>,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            missing_value: DEFAULT_MISSING_VALUE,
            method: InterpolationMethod::Bilinear,
            truncation: None,
            threads: 0,
            budget_subdivisions: 4,
            timeout_ms: None,
        }
    }
}

/// Parse `var` if set; warn and return `None` when the value is invalid.
fn env_parse<T: FromStr>(var: &str) -> Option<T> {
    let val = std::env::var(var).ok()?;
    match val.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(var, value = %val, "Ignoring invalid environment value, using default");
            None
        }
    }
}

impl ResampleConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(value) = env_parse::<f64>("GRIB_MISSING_VALUE") {
            if value.is_finite() {
                config.missing_value = value;
            } else {
                warn!(value, "GRIB_MISSING_VALUE must be finite, using default");
            }
        }

        if let Some(method) = env_parse("GRID_INTERPOLATION") {
            config.method = method;
        }

        if let Some(truncation) = env_parse("SPECTRAL_TRUNCATION") {
            config.truncation = Some(truncation);
        }

        if let Some(threads) = env_parse("RESAMPLE_THREADS") {
            config.threads = threads;
        }

        if let Some(subdivisions) = env_parse::<usize>("BUDGET_SUBDIVISIONS") {
            if subdivisions > 0 {
                config.budget_subdivisions = subdivisions;
            } else {
                warn!("BUDGET_SUBDIVISIONS must be > 0, using default");
            }
        }

        if let Some(timeout) = env_parse("RESAMPLE_TIMEOUT_MS") {
            config.timeout_ms = Some(timeout);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.missing_value.is_finite() {
            return Err("missing_value must be finite".to_string());
        }

        if self.budget_subdivisions == 0 {
            return Err("budget_subdivisions must be > 0".to_string());
        }

        if self.timeout_ms == Some(0) {
            return Err("timeout_ms must be > 0 when set".to_string());
        }

        Ok(())
    }

    /// Time budget of one pipeline call.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
