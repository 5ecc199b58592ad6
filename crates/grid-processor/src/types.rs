//! Core types for resampling requests and results.

use projection::GridDescriptor;
use serde::{Deserialize, Serialize};

use crate::spectral::SpectralFilter;

/// Interpolation method for grid resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    /// Nearest neighbor (preserves exact values).
    Nearest,
    /// Bilinear interpolation (smooth, slight value changes).
    #[default]
    Bilinear,
    /// Catmull-Rom bicubic interpolation over a 4x4 neighbourhood.
    Bicubic,
    /// Area-weighted mean over sub-sampled target cells.
    Budget,
    /// Spherical harmonic analysis and synthesis.
    Spectral,
}

impl InterpolationMethod {
    pub const ALL: [InterpolationMethod; 5] = [
        Self::Nearest,
        Self::Bilinear,
        Self::Bicubic,
        Self::Budget,
        Self::Spectral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Bicubic => "bicubic",
            Self::Budget => "budget",
            Self::Spectral => "spectral",
        }
    }

    /// Methods that need quadrilateral source cells.
    pub fn needs_quadrilateral_source(&self) -> bool {
        matches!(self, Self::Bilinear | Self::Bicubic)
    }
}

impl std::str::FromStr for InterpolationMethod {
    type Err = String;

    /// Parse from string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nearest" | "nn" => Ok(Self::Nearest),
            "bilinear" | "linear" => Ok(Self::Bilinear),
            "bicubic" | "cubic" => Ok(Self::Bicubic),
            "budget" | "conservative" => Ok(Self::Budget),
            "spectral" => Ok(Self::Spectral),
            other => Err(format!("unknown interpolation method '{}'", other)),
        }
    }
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-method tuning knobs. Unset fields take the configuration or grid
/// derived default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodOptions {
    /// Nearest-neighbour search radius in km; default two source spacings.
    #[serde(default)]
    pub search_radius_km: Option<f64>,
    /// Sub-points per target cell side for the budget method.
    #[serde(default)]
    pub budget_subdivisions: Option<usize>,
    /// Half-width of the budget sampling window, in target cell units.
    #[serde(default = "default_budget_radius")]
    pub budget_radius: f64,
    /// Spectral truncation; default the highest the source supports.
    #[serde(default)]
    pub truncation: Option<usize>,
    /// Filter applied to spectral coefficients before synthesis.
    #[serde(default)]
    pub filter: SpectralFilter,
}

fn default_budget_radius() -> f64 {
    0.5
}

impl Default for MethodOptions {
    fn default() -> Self {
        Self {
            search_radius_km: None,
            budget_subdivisions: None,
            budget_radius: default_budget_radius(),
            truncation: None,
            filter: SpectralFilter::None,
        }
    }
}

/// Everything one resampling call needs besides the source field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationRequest {
    pub target: GridDescriptor,
    #[serde(default)]
    pub method: InterpolationMethod,
    #[serde(default)]
    pub options: MethodOptions,
    /// Marker for missing output points, overriding the configuration.
    #[serde(default)]
    pub missing_value: Option<f64>,
    /// Spectral smoothing of the source before any method runs.
    #[serde(default)]
    pub prefilter: Option<SpectralFilter>,
}

impl InterpolationRequest {
    pub fn new(target: GridDescriptor, method: InterpolationMethod) -> Self {
        Self {
            target,
            method,
            options: MethodOptions::default(),
            missing_value: None,
            prefilter: None,
        }
    }

    pub fn with_options(mut self, options: MethodOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_missing_value(mut self, missing_value: f64) -> Self {
        self.missing_value = Some(missing_value);
        self
    }

    pub fn with_prefilter(mut self, filter: SpectralFilter) -> Self {
        self.prefilter = Some(filter);
        self
    }

    pub fn with_search_radius_km(mut self, radius: f64) -> Self {
        self.options.search_radius_km = Some(radius);
        self
    }

    pub fn with_truncation(mut self, truncation: usize) -> Self {
        self.options.truncation = Some(truncation);
        self
    }
}

/// A resampled field over the target grid, in target storage order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampleOutput {
    pub values: Vec<f64>,
    pub missing_count: usize,
    /// `missing_count / values.len()`, 0 for an empty target
    pub missing_fraction: f64,
    pub method: InterpolationMethod,
    /// Marker written at missing points
    pub missing_value: f64,
    /// Per-point presence; a real value may coincide with the marker
    pub present: Vec<bool>,
}

impl ResampleOutput {
    /// Build from per-point results, writing `missing_value` for `None`.
    pub fn from_options(results: Vec<Option<f64>>, method: InterpolationMethod, missing_value: f64) -> Self {
        let missing_count = results.iter().filter(|v| v.is_none()).count();
        let missing_fraction = if results.is_empty() {
            0.0
        } else {
            missing_count as f64 / results.len() as f64
        };
        let present = results.iter().map(Option::is_some).collect();
        Self {
            values: results.into_iter().map(|v| v.unwrap_or(missing_value)).collect(),
            missing_count,
            missing_fraction,
            method,
            missing_value,
            present,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values with missing points as `None`.
    pub fn to_options(&self) -> Vec<Option<f64>> {
        self.values
            .iter()
            .zip(&self.present)
            .map(|(v, present)| present.then_some(*v))
            .collect()
    }
}
