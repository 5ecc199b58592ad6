//! GRIB2 parameter and level lookup tables.
//!
//! Translates `(discipline, category, number)` triples and fixed surface
//! types (Code Table 4.5) into readable names. [`Grib2Tables::ncep`] ships
//! the WMO entries most operational models use plus the common NCEP and
//! MRMS local ones; callers can extend or replace them.

use std::collections::HashMap;

use crate::sections::FixedSurface;

/// Lookup key for parameter: (discipline, category, number)
pub type ParamKey = (u8, u8, u8);

/// Names and units of one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    /// Short name (e.g. "TMP", "UGRD")
    pub short_name: String,
    pub description: String,
    pub units: String,
}

impl ParameterInfo {
    pub fn new(short_name: &str, description: &str, units: &str) -> Self {
        Self {
            short_name: short_name.to_string(),
            description: description.to_string(),
            units: units.to_string(),
        }
    }
}

/// Level description, either fixed text or a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelDescription {
    /// Static description (e.g., "surface", "mean sea level")
    Static(String),
    /// Pattern with a `{value}` placeholder, or `{value_hpa}` for pressure
    /// levels given in Pa
    Template(String),
}

impl LevelDescription {
    /// Format the description for a surface value.
    pub fn format(&self, value: Option<f64>) -> String {
        match self {
            LevelDescription::Static(s) => s.clone(),
            LevelDescription::Template(t) => {
                let value = match value {
                    Some(v) => v,
                    None => return t.replace("{value_hpa}", "?").replace("{value}", "?"),
                };
                t.replace("{value_hpa}", &format_number(value / 100.0))
                    .replace("{value}", &format_number(value))
            }
        }
    }
}

/// Integers print without a fractional part.
fn format_number(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{}", v)
    }
}

/// GRIB2 parameter and level lookup tables.
#[derive(Debug, Clone, Default)]
pub struct Grib2Tables {
    parameters: HashMap<ParamKey, ParameterInfo>,
    /// level_type -> description pattern
    levels: HashMap<u8, LevelDescription>,
}

impl Grib2Tables {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Common WMO Code Table 4.2 entries, NCEP and MRMS locals, and the
    /// usual fixed surface types.
    pub fn ncep() -> Self {
        let mut tables = Self::new();
        let params: &[(ParamKey, &str, &str, &str)] = &[
            ((0, 0, 0), "TMP", "Temperature", "K"),
            ((0, 0, 2), "POT", "Potential temperature", "K"),
            ((0, 0, 4), "TMAX", "Maximum temperature", "K"),
            ((0, 0, 5), "TMIN", "Minimum temperature", "K"),
            ((0, 0, 6), "DPT", "Dew point temperature", "K"),
            ((0, 1, 0), "SPFH", "Specific humidity", "kg kg-1"),
            ((0, 1, 1), "RH", "Relative humidity", "%"),
            ((0, 1, 3), "PWAT", "Precipitable water", "kg m-2"),
            ((0, 1, 7), "PRATE", "Precipitation rate", "kg m-2 s-1"),
            ((0, 1, 8), "APCP", "Total precipitation", "kg m-2"),
            ((0, 1, 13), "WEASD", "Water equivalent of accumulated snow depth", "kg m-2"),
            ((0, 2, 0), "WDIR", "Wind direction", "degree"),
            ((0, 2, 1), "WIND", "Wind speed", "m s-1"),
            ((0, 2, 2), "UGRD", "U-component of wind", "m s-1"),
            ((0, 2, 3), "VGRD", "V-component of wind", "m s-1"),
            ((0, 2, 8), "VVEL", "Vertical velocity (pressure)", "Pa s-1"),
            ((0, 2, 10), "ABSV", "Absolute vorticity", "s-1"),
            ((0, 2, 22), "GUST", "Wind speed (gust)", "m s-1"),
            ((0, 3, 0), "PRES", "Pressure", "Pa"),
            ((0, 3, 1), "PRMSL", "Pressure reduced to MSL", "Pa"),
            ((0, 3, 5), "HGT", "Geopotential height", "gpm"),
            ((0, 6, 1), "TCDC", "Total cloud cover", "%"),
            ((0, 7, 6), "CAPE", "Convective available potential energy", "J kg-1"),
            ((0, 7, 7), "CIN", "Convective inhibition", "J kg-1"),
            ((0, 16, 196), "REFC", "Composite reflectivity", "dB"),
            ((0, 19, 0), "VIS", "Visibility", "m"),
            ((2, 0, 0), "LAND", "Land cover", "Proportion"),
            ((10, 0, 3), "HTSGW", "Significant height of combined wind waves and swell", "m"),
            ((209, 0, 16), "REFL", "MRMS reflectivity at lowest altitude", "dBZ"),
            ((209, 6, 1), "PRECIPRATE", "MRMS radar precipitation rate", "mm hr-1"),
        ];
        for (key, short, description, units) in params {
            tables.add_parameter(key.0, key.1, key.2, ParameterInfo::new(short, description, units));
        }

        let levels: &[(u8, LevelDescription)] = &[
            (1, LevelDescription::Static("surface".to_string())),
            (2, LevelDescription::Static("cloud base".to_string())),
            (3, LevelDescription::Static("cloud top".to_string())),
            (4, LevelDescription::Static("0C isotherm".to_string())),
            (6, LevelDescription::Static("max wind".to_string())),
            (7, LevelDescription::Static("tropopause".to_string())),
            (8, LevelDescription::Static("top of atmosphere".to_string())),
            (100, LevelDescription::Template("{value_hpa} mb".to_string())),
            (101, LevelDescription::Static("mean sea level".to_string())),
            (102, LevelDescription::Template("{value} m above mean sea level".to_string())),
            (103, LevelDescription::Template("{value} m above ground".to_string())),
            (104, LevelDescription::Template("sigma {value}".to_string())),
            (105, LevelDescription::Template("hybrid level {value}".to_string())),
            (106, LevelDescription::Template("{value} m below ground".to_string())),
            (108, LevelDescription::Template("{value_hpa} mb above ground".to_string())),
            (200, LevelDescription::Static("entire atmosphere".to_string())),
        ];
        for (level_type, description) in levels {
            tables.add_level(*level_type, description.clone());
        }
        tables
    }

    /// Add or replace a parameter mapping
    pub fn add_parameter(&mut self, discipline: u8, category: u8, number: u8, info: ParameterInfo) {
        self.parameters.insert((discipline, category, number), info);
    }

    /// Add or replace a level description mapping
    pub fn add_level(&mut self, level_type: u8, description: LevelDescription) {
        self.levels.insert(level_type, description);
    }

    pub fn parameter(&self, discipline: u8, category: u8, number: u8) -> Option<&ParameterInfo> {
        self.parameters.get(&(discipline, category, number))
    }

    /// Look up parameter short name by GRIB2 codes.
    ///
    /// Returns "P{discipline}_{category}_{number}" if not found.
    pub fn parameter_name(&self, discipline: u8, category: u8, number: u8) -> String {
        self.parameter(discipline, category, number)
            .map(|info| info.short_name.clone())
            .unwrap_or_else(|| format!("P{}_{}_{}", discipline, category, number))
    }

    /// Describe a fixed surface.
    ///
    /// Returns "Level type {type} value {value}" if the type is unknown.
    pub fn level_description(&self, surface: &FixedSurface) -> String {
        match self.levels.get(&surface.surface_type) {
            Some(desc) => desc.format(surface.value),
            None => match surface.value {
                Some(v) => format!("Level type {} value {}", surface.surface_type, format_number(v)),
                None => format!("Level type {}", surface.surface_type),
            },
        }
    }

    /// Get the number of parameters in the table
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Get the number of level types in the table
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Check if the tables are empty
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(surface_type: u8, value: Option<f64>) -> FixedSurface {
        FixedSurface { surface_type, value }
    }

    #[test]
    fn test_ncep_parameter_lookup() {
        let tables = Grib2Tables::ncep();

        assert_eq!(tables.parameter_name(0, 0, 0), "TMP");
        assert_eq!(tables.parameter_name(0, 2, 2), "UGRD");
        assert_eq!(tables.parameter_name(209, 0, 16), "REFL");
        let info = tables.parameter(0, 3, 1).unwrap();
        assert_eq!(info.units, "Pa");
    }

    #[test]
    fn test_parameter_not_found() {
        let tables = Grib2Tables::ncep();

        assert_eq!(tables.parameter_name(99, 99, 99), "P99_99_99");
        assert!(tables.parameter(0, 0, 99).is_none());
    }

    #[test]
    fn test_level_descriptions() {
        let tables = Grib2Tables::ncep();

        assert_eq!(tables.level_description(&surface(1, None)), "surface");
        assert_eq!(tables.level_description(&surface(100, Some(85000.0))), "850 mb");
        assert_eq!(tables.level_description(&surface(103, Some(2.0))), "2 m above ground");
        assert_eq!(tables.level_description(&surface(104, Some(0.995))), "sigma 0.995");
        assert_eq!(tables.level_description(&surface(99, Some(123.0))), "Level type 99 value 123");
        assert_eq!(tables.level_description(&surface(99, None)), "Level type 99");
    }

    #[test]
    fn test_custom_entries_override() {
        let mut tables = Grib2Tables::ncep();
        let before = tables.parameter_count();
        tables.add_parameter(0, 0, 0, ParameterInfo::new("T", "Air temperature", "K"));
        tables.add_level(1, LevelDescription::Static("ground".to_string()));

        assert_eq!(tables.parameter_count(), before);
        assert_eq!(tables.parameter_name(0, 0, 0), "T");
        assert_eq!(tables.level_description(&surface(1, Some(0.0))), "ground");
    }

    #[test]
    fn test_empty_tables() {
        let tables = Grib2Tables::new();

        assert_eq!(tables.parameter_count(), 0);
        assert_eq!(tables.level_count(), 0);
        assert!(tables.is_empty());
        assert_eq!(tables.parameter_name(0, 0, 0), "P0_0_0");
    }
}
