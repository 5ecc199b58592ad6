//! Per-message diagnostics reported by the pipeline.

use std::sync::Mutex;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::GridProcessorError;
use crate::types::InterpolationMethod;

/// What happened to one message.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    MessageDecoded {
        offset: usize,
        field_index: usize,
        codec: &'static str,
        points: usize,
        missing_count: usize,
        elapsed: Duration,
    },
    MessageResampled {
        offset: usize,
        field_index: usize,
        method: InterpolationMethod,
        source_projection: &'static str,
        target_projection: &'static str,
        missing_count: usize,
        missing_fraction: f64,
        elapsed: Duration,
    },
    MessageFailed {
        offset: usize,
        next_offset: Option<usize>,
        error: GridProcessorError,
    },
}

/// Receiver of pipeline diagnostics.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, event: &DiagnosticEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, event: &DiagnosticEvent) {
        match event {
            DiagnosticEvent::MessageDecoded {
                offset,
                field_index,
                codec,
                points,
                missing_count,
                elapsed,
            } => info!(
                offset,
                field_index,
                codec,
                points,
                missing = missing_count,
                elapsed_us = elapsed.as_micros() as u64,
                "Decoded message"
            ),
            DiagnosticEvent::MessageResampled {
                offset,
                field_index,
                method,
                source_projection,
                target_projection,
                missing_count,
                missing_fraction,
                elapsed,
            } => info!(
                offset,
                field_index,
                method = %method,
                source = source_projection,
                target = target_projection,
                missing = missing_count,
                missing_fraction,
                elapsed_us = elapsed.as_micros() as u64,
                "Resampled message"
            ),
            DiagnosticEvent::MessageFailed {
                offset,
                next_offset,
                error,
            } => warn!(offset, next_offset = ?next_offset, error = %error, "Message failed"),
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn record(&self, _event: &DiagnosticEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for CollectingSink {
    fn record(&self, event: &DiagnosticEvent) {
        let mut events = self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event.clone());
    }
}
