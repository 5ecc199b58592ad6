//! PNG packing (template 5.41).
//!
//! The data section is a PNG image whose samples are the packed integers;
//! reconstruction then follows simple packing.

use std::io::Cursor;

use ::png::{Decoder, Transformations};

use crate::error::{Grib2Error, Result};

use super::{read_packed_integers, Codec, CodecParameters};

pub struct PngCodec;

impl Codec for PngCodec {
    fn name(&self) -> &'static str {
        "png"
    }

    fn decode(&self, data: &[u8], params: &CodecParameters, count: usize) -> Result<Vec<f64>> {
        let scaling = params.scaling();
        if params.nbits == 0 {
            return Ok(vec![scaling.constant(); count]);
        }

        let (buffer, line_size, width) = read_image(data)?;
        let nbits = params.nbits as usize;
        let row_bits = width * nbits;
        if row_bits > line_size * 8 {
            return Err(Grib2Error::unpacking(format!(
                "PNG rows of {} bytes cannot hold {} samples of {} bits",
                line_size, width, nbits
            )));
        }

        let samples = width * (buffer.len() / line_size.max(1));
        if samples != count {
            return Err(Grib2Error::unpacking(format!(
                "PNG image holds {} samples, expected {}",
                samples, count
            )));
        }

        // Rows are padded to whole bytes; read each row separately
        let mut packed = Vec::with_capacity(count);
        for row in buffer.chunks(line_size) {
            packed.extend(read_packed_integers(row, nbits, width)?);
        }

        Ok(packed.into_iter().map(|x| scaling.apply(x as f64)).collect())
    }
}

fn png_err(err: ::png::DecodingError) -> Grib2Error {
    Grib2Error::unpacking(format!("PNG decoding failed: {}", err))
}

/// Raw image bytes with their row stride and width in samples.
fn read_image(data: &[u8]) -> Result<(Vec<u8>, usize, usize)> {
    let mut decoder = Decoder::new(Cursor::new(data));
    decoder.set_transformations(Transformations::IDENTITY);
    let mut reader = decoder.read_info().map_err(png_err)?;
    let mut buffer = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buffer).map_err(png_err)?;

    let channels = info.color_type.samples();
    buffer.truncate(info.line_size * info.height as usize);
    Ok((buffer, info.line_size, info.width as usize * channels))
}
