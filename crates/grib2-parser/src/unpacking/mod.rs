//! GRIB2 data unpacking algorithms.
//!
//! Codecs are registered in a [`CodecRegistry`] keyed by data
//! representation template number. The registry is built from whichever
//! codecs are compiled in:
//! - Simple packing (5.0) and simple packing with log pre-processing (5.61)
//! - Complex packing with and without spatial differencing (5.2, 5.3)
//! - IEEE floating point (5.4)
//! - JPEG2000 (5.40, `jpeg2000` feature)
//! - PNG (5.41, `png` feature)
//! - CCSDS/AEC (5.42, `aec` feature)
//! - Spectral coefficients (5.50, 5.51)
//! - Run-length with level values (5.200)
//!
//! Every integer codec reconstructs `Y = (R + X * 2^E) * 10^-D`. Codecs mark
//! in-band missing values as `NaN`; [`DecodedField::expand`] turns those and
//! the section 6 bitmap into the caller's missing marker.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Grib2Error, Result};
use crate::sections::Bitmap;

#[cfg(feature = "aec")]
pub mod aec;
pub mod complex;
pub mod ieee;
#[cfg(feature = "jpeg2000")]
pub mod jpeg2000;
#[cfg(feature = "png")]
pub mod png;
pub mod run_length;
pub mod simple;
pub mod spectral;

pub use simple::{encode_simple, unpack_simple, SimplePacked};

/// Missing-value marker used when the caller supplies none.
pub const DEFAULT_MISSING_VALUE: f64 = 9.999e20;

/// Group descriptors of complex packing (templates 5.2 and 5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexPacking {
    pub splitting_method: u8,
    /// Code Table 5.5: 0 none, 1 primary, 2 primary and secondary
    pub missing_management: u8,
    pub primary_missing: u32,
    pub secondary_missing: u32,
    pub groups: u32,
    pub group_width_reference: u8,
    pub group_width_bits: u8,
    pub group_length_reference: u32,
    pub group_length_increment: u8,
    pub last_group_length: u32,
    pub group_length_bits: u8,
    /// Order of spatial differencing; 0 for template 5.2
    pub spatial_order: u8,
    /// Octets per extra descriptor in section 7
    pub extra_octets: u8,
}

/// Template-specific packing parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecSpecific {
    None,
    SimpleLog {
        preprocess: f32,
    },
    Complex(ComplexPacking),
    Ieee {
        precision: u8,
    },
    Jpeg2000 {
        compression_type: u8,
        target_ratio: u8,
    },
    Aec {
        flags: u8,
        block_size: u8,
        reference_sample_interval: u16,
    },
    SpectralSimple {
        real_00: f32,
    },
    SpectralComplex {
        /// Laplacian scaling factor P in units of 1e-6
        laplacian_scaling: i32,
        js: u16,
        ks: u16,
        ms: u16,
        ts: u32,
        unpacked_precision: u8,
    },
    RunLength {
        /// Highest level value used in this field
        max_level: u16,
        /// Representative value of each level 1..=MVL, scaled by 10^D
        level_values: Vec<u16>,
    },
}

/// Packing parameters decoded from section 5.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecParameters {
    /// Data representation template number
    pub template: u16,
    pub reference_value: f32,
    pub binary_scale: i16,
    pub decimal_scale: i16,
    pub nbits: u8,
    /// Code Table 5.1: 0 floating point, 1 integer
    pub original_type: u8,
    pub specific: CodecSpecific,
}

impl CodecParameters {
    /// Reconstruction from packed integers for these parameters.
    pub fn scaling(&self) -> Scaling {
        Scaling::new(self.reference_value, self.binary_scale, self.decimal_scale)
    }
}

/// `Y = (R + X * 2^E) * 10^-D`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    reference: f64,
    binary: f64,
    decimal: f64,
}

impl Scaling {
    pub fn new(reference_value: f32, binary_scale: i16, decimal_scale: i16) -> Self {
        Self {
            reference: reference_value as f64,
            binary: 2f64.powi(binary_scale as i32),
            decimal: 10f64.powi(-(decimal_scale as i32)),
        }
    }

    #[inline]
    pub fn apply(&self, packed: f64) -> f64 {
        (self.reference + packed * self.binary) * self.decimal
    }

    /// Value of every point when the bit width is zero.
    pub fn constant(&self) -> f64 {
        self.reference * self.decimal
    }
}

/// A decoder for one data representation template.
pub trait Codec: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Decode `count` packed values from the section 7 payload. Missing
    /// values encoded in-band are returned as `NaN`.
    fn decode(&self, data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>>;
}

/// Runtime capability table of codecs, keyed by template number.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<u16, Arc<dyn Codec>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl CodecRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every codec compiled into this build.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(0, Arc::new(simple::SimpleCodec));
        registry.register(61, Arc::new(simple::SimpleLogCodec));
        registry.register(2, Arc::new(complex::ComplexCodec));
        registry.register(3, Arc::new(complex::ComplexCodec));
        registry.register(4, Arc::new(ieee::IeeeCodec));
        registry.register(50, Arc::new(spectral::SpectralSimpleCodec));
        registry.register(51, Arc::new(spectral::SpectralComplexCodec));
        registry.register(200, Arc::new(run_length::RunLengthCodec));
        #[cfg(feature = "png")]
        registry.register(41, Arc::new(png::PngCodec));
        #[cfg(feature = "jpeg2000")]
        registry.register(40, Arc::new(jpeg2000::Jpeg2000Codec));
        #[cfg(feature = "aec")]
        registry.register(42, Arc::new(aec::AecCodec));
        registry
    }

    /// Add or replace the codec for a template.
    pub fn register(&mut self, template: u16, codec: Arc<dyn Codec>) {
        self.codecs.insert(template, codec);
    }

    pub fn supports(&self, template: u16) -> bool {
        self.codecs.contains_key(&template)
    }

    /// Registered `(template, codec name)` pairs, sorted by template.
    pub fn capabilities(&self) -> Vec<(u16, &'static str)> {
        let mut caps: Vec<_> = self.codecs.iter().map(|(t, c)| (*t, c.name())).collect();
        caps.sort_unstable_by_key(|(t, _)| *t);
        caps
    }

    /// Name of the codec handling `template`.
    pub fn codec_name(&self, template: u16) -> Option<&'static str> {
        self.codecs.get(&template).map(|c| c.name())
    }

    /// Decode exactly `count` values or fail.
    pub fn decode(&self, data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>> {
        let codec = self
            .codecs
            .get(&params.template)
            .ok_or(Grib2Error::UnsupportedCodec(params.template))?;

        debug!(
            template = params.template,
            codec = codec.name(),
            count,
            nbits = params.nbits,
            "Dispatching codec"
        );

        let values = codec.decode(data, params, count)?;
        if values.len() != count {
            return Err(Grib2Error::CountMismatch {
                expected: count,
                actual: values.len(),
            });
        }
        Ok(values)
    }
}

/// A decoded field over the grid points of its message, in stored order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    pub values: Vec<f64>,
    /// `true` where a value is present; `None` when every point is present
    pub bitmap: Option<Vec<bool>>,
    /// Marker written at absent points
    pub missing_value: f64,
}

impl DecodedField {
    /// Spread packed values over `point_count` grid points following the
    /// bitmap, replacing absent and in-band missing points with
    /// `missing_value`.
    pub fn expand(packed: Vec<f64>, bitmap: &Bitmap, point_count: usize, missing_value: f64) -> Result<Self> {
        match &bitmap.data {
            Some(bits) => {
                if bits.len() * 8 < point_count {
                    return Err(Grib2Error::invalid_section(
                        6,
                        format!("bitmap holds {} bits for {} points", bits.len() * 8, point_count),
                    ));
                }
                let mut present = Vec::with_capacity(point_count);
                let mut values = Vec::with_capacity(point_count);
                let mut packed_iter = packed.iter();
                for index in 0..point_count {
                    if bitmap.is_present(index) {
                        let value = packed_iter.next().copied().ok_or_else(|| {
                            Grib2Error::invalid_format(format!(
                                "bitmap marks more points present than the {} packed values",
                                packed.len()
                            ))
                        })?;
                        if value.is_nan() {
                            present.push(false);
                            values.push(missing_value);
                        } else {
                            present.push(true);
                            values.push(value);
                        }
                    } else {
                        present.push(false);
                        values.push(missing_value);
                    }
                }
                if packed_iter.next().is_some() {
                    return Err(Grib2Error::invalid_format(format!(
                        "{} packed values but only {} points present in the bitmap",
                        packed.len(),
                        present.iter().filter(|p| **p).count()
                    )));
                }
                Ok(Self {
                    values,
                    bitmap: Some(present),
                    missing_value,
                })
            }
            None => {
                if packed.len() != point_count {
                    return Err(Grib2Error::invalid_format(format!(
                        "{} packed values for {} grid points without a bitmap",
                        packed.len(),
                        point_count
                    )));
                }
                if !packed.iter().any(|v| v.is_nan()) {
                    return Ok(Self {
                        values: packed,
                        bitmap: None,
                        missing_value,
                    });
                }
                let present: Vec<bool> = packed.iter().map(|v| !v.is_nan()).collect();
                let values = packed
                    .into_iter()
                    .map(|v| if v.is_nan() { missing_value } else { v })
                    .collect();
                Ok(Self {
                    values,
                    bitmap: Some(present),
                    missing_value,
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_present(&self, index: usize) -> bool {
        self.bitmap.as_ref().map_or(true, |b| b[index])
    }

    pub fn missing_count(&self) -> usize {
        self.bitmap
            .as_ref()
            .map_or(0, |b| b.iter().filter(|present| !**present).count())
    }

    /// Values with absent points as `None`.
    pub fn to_options(&self) -> Vec<Option<f64>> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| self.is_present(i).then_some(*v))
            .collect()
    }
}

/// Read `count` values of `nbits` bits each, rejecting short payloads.
pub(crate) fn read_packed_integers(data: &[u8], nbits: usize, count: usize) -> Result<Vec<u64>> {
    let needed_bits = count * nbits;
    if data.len() * 8 < needed_bits {
        return Err(Grib2Error::unpacking(format!(
            "data section holds {} bytes, {} values of {} bits need {}",
            data.len(),
            count,
            nbits,
            (needed_bits + 7) / 8
        )));
    }
    let mut reader = crate::bitstream::BitReader::new(data);
    (0..count).map(|_| reader.read_bits(nbits)).collect()
}
