//! Print a summary of every field in a GRIB2 file.
//!
//! Run with: cargo run --package grib2-parser --example inspect_grib2 -- <file.grib2>
//!
//! Set `RUST_LOG=grib2_parser=debug` to trace section parsing.

use std::path::Path;

use bytes::Bytes;
use grib2_parser::{CodecRegistry, Grib2Message, Grib2Reader, Grib2Tables};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

/// One line of output per field.
#[derive(Debug, Clone, PartialEq)]
struct FieldSummary {
    offset: usize,
    field_index: usize,
    parameter: String,
    level: String,
    projection: String,
    points: usize,
    missing: usize,
    range: Option<(f64, f64)>,
}

impl std::fmt::Display for FieldSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "@{:<10} #{} {:<8} {:<24} {:<20} {:>9} pts {:>7} missing",
            self.offset, self.field_index, self.parameter, self.level, self.projection, self.points, self.missing
        )?;
        match self.range {
            Some((min, max)) => write!(f, "  [{:.3}, {:.3}]", min, max),
            None => write!(f, "  [no data]"),
        }
    }
}

fn summarize(message: &Grib2Message, registry: &CodecRegistry, tables: &Grib2Tables) -> anyhow::Result<FieldSummary> {
    let grid = message.grid()?;
    let field = message.unpack(registry)?;
    let range = field
        .to_options()
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            Some((min, max)) => Some((min.min(v), max.max(v))),
            None => Some((v, v)),
        });

    Ok(FieldSummary {
        offset: message.offset,
        field_index: message.field_index,
        parameter: message.parameter_name(tables),
        level: message.level_description(tables),
        projection: grid.projection.kind().to_string(),
        points: field.len(),
        missing: field.missing_count(),
        range,
    })
}

/// Summaries of every field that decodes; failures are logged and skipped.
fn inspect_file(path: &Path) -> anyhow::Result<Vec<FieldSummary>> {
    let data = Bytes::from(std::fs::read(path)?);
    let registry = CodecRegistry::with_builtin();
    let tables = Grib2Tables::ncep();

    let mut summaries = Vec::new();
    let mut reader = Grib2Reader::new(data);
    loop {
        match reader.next_message() {
            Ok(Some(message)) => match summarize(&message, &registry, &tables) {
                Ok(summary) => summaries.push(summary),
                Err(e) => warn!(offset = message.offset, error = %e, "Skipping field"),
            },
            Ok(None) => break,
            Err(e) => warn!(offset = reader.record_offset(), error = %e.error, "Skipping record"),
        }
    }
    Ok(summaries)
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(true).init();

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: inspect_grib2 <file.grib2>"))?;

    let summaries = inspect_file(Path::new(&path))?;
    for summary in &summaries {
        println!("{}", summary);
    }
    println!("{} fields", summaries.len());
    Ok(())
}
