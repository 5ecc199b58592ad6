//! Decode-to-resample pipeline over buffers of GRIB2 records.
//!
//! [`GribResampler`] owns the configuration, the codec registry, a
//! diagnostics sink and a dedicated rayon pool. Each call runs
//! synchronously: records are parsed in order, each field is decoded, its
//! grid resolved and, for the resampling calls, interpolated onto the
//! request's target grid. A failed message is reported with the offset to
//! resume from and does not stop the remaining messages.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use grib2_parser::{parse_record, CodecRegistry, DecodedField, Grib2Message, Grib2Reader, MessageError};
use projection::{GeoPoint, GridDescriptor};
use tracing::debug;

use crate::config::ResampleConfig;
use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink, TracingSink};
use crate::error::{GridProcessorError, MessageFailure, Result};
use crate::interpolation::{self, SourceField};
use crate::types::{InterpolationMethod, InterpolationRequest, ResampleOutput};

/// A decoded field with its message and resolved grid.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    pub message: Grib2Message,
    pub grid: GridDescriptor,
    pub field: DecodedField,
    /// Name of the codec that unpacked the data section
    pub codec: &'static str,
    /// Offset of the record following this message's record
    pub next_offset: usize,
}

/// Summary of one resampling step.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampleDiagnostics {
    pub missing_count: usize,
    pub missing_fraction: f64,
    pub codec: &'static str,
    pub source_projection: &'static str,
    pub target_projection: &'static str,
    pub method: InterpolationMethod,
    pub elapsed: Duration,
}

/// A field resampled onto the request's target grid.
#[derive(Debug, Clone)]
pub struct ResampledMessage {
    pub message: Grib2Message,
    pub source_grid: GridDescriptor,
    pub output: ResampleOutput,
    pub diagnostics: ResampleDiagnostics,
    pub next_offset: usize,
}

/// Time budget of one pipeline call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    end: Option<Instant>,
}

impl Deadline {
    pub(crate) fn new(timeout: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            end: timeout.and_then(|t| now.checked_add(t)),
        }
    }

    /// Fail when the budget ran out before `stage`.
    pub(crate) fn check(&self, stage: &'static str) -> Result<()> {
        match self.end {
            Some(end) if Instant::now() >= end => Err(GridProcessorError::DeadlineExceeded { stage }),
            _ => Ok(()),
        }
    }
}

/// Decodes and resamples GRIB2 buffers.
pub struct GribResampler {
    config: ResampleConfig,
    registry: Arc<CodecRegistry>,
    sink: Arc<dyn DiagnosticsSink>,
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for GribResampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GribResampler")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl GribResampler {
    /// Resampler with every built-in codec and a [`TracingSink`].
    ///
    /// The pool has `config.threads` workers, or one when `threads` is 0.
    pub fn new(config: ResampleConfig) -> Result<Self> {
        config.validate().map_err(GridProcessorError::Config)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads.max(1))
            .thread_name(|i| format!("grib-resample-{}", i))
            .build()
            .map_err(|e| GridProcessorError::ThreadPool(e.to_string()))?;
        debug!(threads = pool.current_num_threads(), "Created resampling pool");

        Ok(Self {
            config,
            registry: Arc::new(CodecRegistry::with_builtin()),
            sink: Arc::new(TracingSink),
            pool,
        })
    }

    pub fn with_registry(mut self, registry: Arc<CodecRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ResampleConfig {
        &self.config
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// Request onto `target` using the configured method and options.
    pub fn request(&self, target: GridDescriptor) -> InterpolationRequest {
        let mut request = InterpolationRequest::new(target, self.config.method);
        request.options.truncation = self.config.truncation;
        request.options.budget_subdivisions = Some(self.config.budget_subdivisions);
        request
    }

    fn fail(&self, offset: usize, next_offset: Option<usize>, error: GridProcessorError) -> MessageFailure {
        self.sink.record(&DiagnosticEvent::MessageFailed {
            offset,
            next_offset,
            error: error.clone(),
        });
        MessageFailure {
            offset,
            next_offset,
            error,
        }
    }

    fn record_failure(&self, offset: usize, err: MessageError) -> MessageFailure {
        let next_offset = err.consumed.map(|consumed| offset + consumed);
        self.fail(offset, next_offset, err.error.into())
    }

    /// Decode one field of a parsed record.
    fn decode_message(&self, message: Grib2Message, deadline: &Deadline) -> std::result::Result<DecodedMessage, MessageFailure> {
        let offset = message.offset;
        let next_offset = message.offset + message.record_length;
        let started = Instant::now();

        let decoded = (|| -> Result<(GridDescriptor, DecodedField)> {
            deadline.check("resolve")?;
            let grid = message.grid()?;
            deadline.check("decode")?;
            let field = self
                .pool
                .install(|| message.unpack_with_missing(&self.registry, self.config.missing_value))?;
            Ok((grid, field))
        })();
        let (grid, field) = decoded.map_err(|e| self.fail(offset, Some(next_offset), e))?;

        let codec = self.registry.codec_name(message.packing_template()).unwrap_or("unknown");
        self.sink.record(&DiagnosticEvent::MessageDecoded {
            offset,
            field_index: message.field_index,
            codec,
            points: field.len(),
            missing_count: field.missing_count(),
            elapsed: started.elapsed(),
        });

        Ok(DecodedMessage {
            message,
            grid,
            field,
            codec,
            next_offset,
        })
    }

    fn resample_with(
        &self,
        decoded: DecodedMessage,
        request: &InterpolationRequest,
        deadline: &Deadline,
    ) -> std::result::Result<ResampledMessage, MessageFailure> {
        let offset = decoded.message.offset;
        let started = Instant::now();
        let output = deadline
            .check("resample")
            .and_then(|_| {
                self.pool.install(|| {
                    interpolation::resample(SourceField::from(&decoded.field), &decoded.grid, request, &self.config)
                })
            })
            .map_err(|e| self.fail(offset, Some(decoded.next_offset), e))?;

        let diagnostics = ResampleDiagnostics {
            missing_count: output.missing_count,
            missing_fraction: output.missing_fraction,
            codec: decoded.codec,
            source_projection: decoded.grid.projection.kind(),
            target_projection: request.target.projection.kind(),
            method: request.method,
            elapsed: started.elapsed(),
        };
        self.sink.record(&DiagnosticEvent::MessageResampled {
            offset,
            field_index: decoded.message.field_index,
            method: diagnostics.method,
            source_projection: diagnostics.source_projection,
            target_projection: diagnostics.target_projection,
            missing_count: diagnostics.missing_count,
            missing_fraction: diagnostics.missing_fraction,
            elapsed: diagnostics.elapsed,
        });

        Ok(ResampledMessage {
            message: decoded.message,
            source_grid: decoded.grid,
            output,
            diagnostics,
            next_offset: decoded.next_offset,
        })
    }

    /// Walk every record in `data`, handing each decoded field to `each`.
    fn for_each_decoded<T>(
        &self,
        data: &Bytes,
        deadline: &Deadline,
        mut each: impl FnMut(DecodedMessage) -> std::result::Result<T, MessageFailure>,
    ) -> Vec<std::result::Result<T, MessageFailure>> {
        let mut results = Vec::new();
        let mut reader = Grib2Reader::new(data.clone());
        loop {
            if let Err(error) = deadline.check("parse") {
                let offset = reader.offset();
                results.push(Err(self.fail(offset, Some(offset), error)));
                break;
            }
            match reader.next_message() {
                Ok(Some(message)) => {
                    let result = self.decode_message(message, deadline).and_then(&mut each);
                    let expired = matches!(
                        result,
                        Err(MessageFailure {
                            error: GridProcessorError::DeadlineExceeded { .. },
                            ..
                        })
                    );
                    results.push(result);
                    if expired {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => results.push(Err(self.record_failure(reader.record_offset(), err))),
            }
        }
        results
    }

    /// Decode every field of every record in `data`.
    pub fn decode_all(&self, data: &Bytes) -> Vec<std::result::Result<DecodedMessage, MessageFailure>> {
        let deadline = Deadline::new(self.config.timeout());
        self.for_each_decoded(data, &deadline, Ok)
    }

    /// Decode the fields of the record starting at `offset`.
    pub fn decode_at(&self, data: &Bytes, offset: usize) -> std::result::Result<Vec<DecodedMessage>, MessageFailure> {
        let deadline = Deadline::new(self.config.timeout());
        self.decode_record(data, offset, &deadline)
    }

    fn decode_record(
        &self,
        data: &Bytes,
        offset: usize,
        deadline: &Deadline,
    ) -> std::result::Result<Vec<DecodedMessage>, MessageFailure> {
        deadline.check("parse").map_err(|e| self.fail(offset, None, e))?;
        let record = parse_record(data, offset).map_err(|err| self.record_failure(offset, err))?;
        record
            .messages
            .into_iter()
            .map(|message| self.decode_message(message, deadline))
            .collect()
    }

    /// Decode and resample every field in `data`.
    pub fn resample_all(
        &self,
        data: &Bytes,
        request: &InterpolationRequest,
    ) -> Vec<std::result::Result<ResampledMessage, MessageFailure>> {
        let deadline = Deadline::new(self.config.timeout());
        self.for_each_decoded(data, &deadline, |decoded| self.resample_with(decoded, request, &deadline))
    }

    /// Decode and resample the fields of the record starting at `offset`.
    pub fn resample_at(
        &self,
        data: &Bytes,
        offset: usize,
        request: &InterpolationRequest,
    ) -> std::result::Result<Vec<ResampledMessage>, MessageFailure> {
        let deadline = Deadline::new(self.config.timeout());
        self.decode_record(data, offset, &deadline)?
            .into_iter()
            .map(|decoded| self.resample_with(decoded, request, &deadline))
            .collect()
    }

    /// Resample an already decoded message.
    pub fn resample_decoded(
        &self,
        decoded: DecodedMessage,
        request: &InterpolationRequest,
    ) -> std::result::Result<ResampledMessage, MessageFailure> {
        let deadline = Deadline::new(self.config.timeout());
        self.resample_with(decoded, request, &deadline)
    }

    /// Interpolate a decoded field at arbitrary geographic points.
    pub fn extract_points(
        &self,
        decoded: &DecodedMessage,
        points: &[GeoPoint],
        method: InterpolationMethod,
    ) -> Result<ResampleOutput> {
        let options = self.request(decoded.grid.clone()).options;
        self.pool.install(|| {
            interpolation::resample_points(
                SourceField::from(&decoded.field),
                &decoded.grid,
                points,
                method,
                &options,
                &self.config,
            )
        })
    }
}
