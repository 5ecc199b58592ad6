//! JPEG 2000 code stream packing (template 5.40).
//!
//! Decoding goes through OpenJPEG, so this codec is behind the `jpeg2000`
//! feature.

use crate::error::{Grib2Error, Result};

use super::{Codec, CodecParameters};

pub struct Jpeg2000Codec;

impl Codec for Jpeg2000Codec {
    fn name(&self) -> &'static str {
        "jpeg2000"
    }

    fn decode(&self, data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>> {
        let scaling = params.scaling();
        if params.nbits == 0 {
            return Ok(vec![scaling.constant(); count]);
        }

        let image = jpeg2k::Image::from_bytes(data)
            .map_err(|e| Grib2Error::unpacking(format!("JPEG 2000 decoding failed: {}", e)))?;
        let components = image.components();
        let component = components
            .first()
            .ok_or_else(|| Grib2Error::unpacking("JPEG 2000 image without components"))?;
        let samples = component.data();
        check_sample_count(samples.len(), count)?;

        Ok(samples.iter().map(|x| scaling.apply(*x as f64)).collect())
    }
}

/// The code stream must hold exactly one sample per packed point.
fn check_sample_count(samples: usize, count: usize) -> Result<()> {
    if samples != count {
        return Err(Grib2Error::unpacking(format!(
            "JPEG 2000 image holds {} samples, expected {}",
            samples, count
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unpacking::CodecSpecific;

    fn params(nbits: u8) -> CodecParameters {
        CodecParameters {
            template: 40,
            reference_value: 5.0,
            binary_scale: 0,
            decimal_scale: 0,
            nbits,
            original_type: 0,
            specific: CodecSpecific::Jpeg2000 {
                compression_type: 0,
                target_ratio: 255,
            },
        }
    }

    #[test]
    fn test_zero_width_is_constant() {
        let values = Jpeg2000Codec.decode(&[], &params(0), 3).unwrap();
        assert_eq!(values, vec![5.0; 3]);
    }

    #[test]
    fn test_sample_count_must_match() {
        assert!(check_sample_count(6, 6).is_ok());
        assert!(matches!(check_sample_count(6, 4), Err(Grib2Error::UnpackingError(_))));
        assert!(check_sample_count(3, 4).is_err());
    }

    #[test]
    fn test_invalid_codestream() {
        assert!(Jpeg2000Codec.decode(&[0xFF, 0x4F, 0x00], &params(12), 4).is_err());
    }
}
