//! Multi-message buffers through `GribResampler`: ordering, failure
//! recovery, diagnostics and the time budget.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use grib2_parser::{CodecRegistry, Grib2Error};
use grid_processor::{
    CollectingSink, DiagnosticEvent, DiagnosticsSink, GribResampler, GridProcessorError, InterpolationMethod,
    ResampleConfig,
};
use projection::GridDescriptor;
use test_utils::{create_temperature_grid, FieldSpec, Grib2Builder, GridTemplate, Packing};

fn grid() -> GridTemplate {
    GridTemplate::lat_lon(6, 4, 30.0, 250.0, 1.0, 1.0)
}

fn record(values: Vec<f64>) -> Vec<u8> {
    Grib2Builder::new().field(FieldSpec::new(grid(), values)).build()
}

fn target() -> GridDescriptor {
    GridDescriptor::lat_lon(30.5, 250.5, 1.0, 1.0, 5, 3)
}

/// The record with section 4 renumbered as a second section 5.
fn corrupt(mut bytes: Vec<u8>) -> Vec<u8> {
    let section3_len = u32::from_be_bytes([bytes[37], bytes[38], bytes[39], bytes[40]]) as usize;
    bytes[37 + section3_len + 4] = 5;
    bytes
}

fn collecting(config: ResampleConfig) -> (GribResampler, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let resampler = GribResampler::new(config).unwrap().with_sink(sink.clone());
    (resampler, sink)
}

#[test]
fn test_decode_all_in_buffer_order() {
    let first = record(vec![1.0; 24]);
    let second = Grib2Builder::new()
        .field(FieldSpec::new(grid(), vec![2.0; 24]).parameter(0, 2))
        .field(FieldSpec::new(grid(), vec![3.0; 24]).parameter(2, 2))
        .build();
    let mut bytes = first.clone();
    bytes.extend(second.clone());
    let data = Bytes::from(bytes);

    let (resampler, _) = collecting(ResampleConfig::default());
    let decoded: Vec<_> = resampler
        .decode_all(&data)
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded[0].field.values[0], 1.0);
    assert_eq!(decoded[1].field.values[0], 2.0);
    assert_eq!(decoded[2].field.values[0], 3.0);
    assert_eq!(decoded[0].next_offset, first.len());
    assert_eq!(decoded[1].next_offset, first.len() + second.len());
    assert_eq!(decoded[2].message.field_index, 1);
    assert_eq!(decoded[0].codec, "simple");

    let again = resampler.decode_at(&data, decoded[0].next_offset).unwrap();
    assert_eq!(again.len(), 2);
    assert_eq!(again[1].field, decoded[2].field);
}

#[test]
fn test_failed_record_reports_resume_offset() {
    let good = record(create_temperature_grid(6, 4));
    let bad = corrupt(good.clone());
    let mut bytes = good.clone();
    bytes.extend(bad.clone());
    bytes.extend(good.clone());
    let data = Bytes::from(bytes);

    let (resampler, sink) = collecting(ResampleConfig::default());
    let request = resampler.request(target());
    let results = resampler.resample_all(&data, &request);
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[2].is_ok());

    let failure = results[1].as_ref().unwrap_err();
    assert_eq!(failure.offset, good.len());
    assert_eq!(failure.next_offset, Some(good.len() + bad.len()));
    assert!(matches!(failure.error, GridProcessorError::Grib2(_)));

    // Resuming at the reported offset reaches the good record
    let resumed = resampler.resample_at(&data, failure.next_offset.unwrap(), &request).unwrap();
    assert_eq!(resumed[0].output, results[2].as_ref().unwrap().output);

    let failed_events = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, DiagnosticEvent::MessageFailed { .. }))
        .count();
    assert_eq!(failed_events, 1);
}

#[test]
fn test_unsupported_template_fails_only_that_record() {
    let unknown = Grib2Builder::new()
        .field(FieldSpec::new(grid(), vec![0.0; 24]).packing(Packing::Raw {
            template: 999,
            body: Vec::new(),
            data: vec![0; 8],
            num_packed: 24,
        }))
        .build();
    let mut bytes = unknown.clone();
    bytes.extend(record(vec![5.0; 24]));
    let data = Bytes::from(bytes);

    let (resampler, _) = collecting(ResampleConfig::default());
    let results = resampler.decode_all(&data);
    assert_eq!(results.len(), 2);
    let failure = results[0].as_ref().unwrap_err();
    assert_eq!(failure.offset, 0);
    assert_eq!(failure.next_offset, Some(unknown.len()));
    assert_eq!(
        failure.error,
        GridProcessorError::Grib2(Grib2Error::UnsupportedTemplate {
            section: 5,
            template: 999
        })
    );
    assert_eq!(results[1].as_ref().unwrap().field.values, vec![5.0; 24]);
}

#[test]
fn test_custom_registry() {
    let data = Bytes::from(record(vec![1.0; 24]));
    let resampler = GribResampler::new(ResampleConfig::default())
        .unwrap()
        .with_registry(Arc::new(CodecRegistry::new()));
    let failure = resampler.decode_at(&data, 0).unwrap_err();
    assert_eq!(failure.error, GridProcessorError::Grib2(Grib2Error::UnsupportedCodec(0)));
}

#[test]
fn test_diagnostics_events() {
    let data = Bytes::from(record(create_temperature_grid(6, 4)));
    let (resampler, sink) = collecting(ResampleConfig {
        method: InterpolationMethod::Nearest,
        threads: 2,
        ..Default::default()
    });
    let results = resampler.resample_all(&data, &resampler.request(target()));
    let resampled = results[0].as_ref().unwrap();
    assert_eq!(resampled.diagnostics.method, InterpolationMethod::Nearest);
    assert_eq!(resampled.diagnostics.codec, "simple");

    let events = sink.events();
    assert_eq!(events.len(), 2);
    match &events[0] {
        DiagnosticEvent::MessageDecoded { offset, points, codec, .. } => {
            assert_eq!(*offset, 0);
            assert_eq!(*points, 24);
            assert_eq!(*codec, "simple");
        }
        other => panic!("unexpected event {:?}", other),
    }
    match &events[1] {
        DiagnosticEvent::MessageResampled {
            method,
            missing_count,
            target_projection,
            ..
        } => {
            assert_eq!(*method, InterpolationMethod::Nearest);
            assert_eq!(*missing_count, 0);
            assert_eq!(*target_projection, "regular_ll");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

/// Sleeps on every decoded message to exhaust the time budget.
struct SlowSink;

impl DiagnosticsSink for SlowSink {
    fn record(&self, event: &DiagnosticEvent) {
        if matches!(event, DiagnosticEvent::MessageDecoded { .. }) {
            std::thread::sleep(Duration::from_millis(30));
        }
    }
}

#[test]
fn test_deadline_stops_processing() {
    let mut bytes = record(vec![1.0; 24]);
    bytes.extend(record(vec![2.0; 24]));
    let data = Bytes::from(bytes);

    let resampler = GribResampler::new(ResampleConfig {
        timeout_ms: Some(5),
        ..Default::default()
    })
    .unwrap()
    .with_sink(Arc::new(SlowSink));

    let results = resampler.resample_all(&data, &resampler.request(target()));
    assert_eq!(results.len(), 1);
    let failure = results[0].as_ref().unwrap_err();
    assert_eq!(failure.offset, 0);
    assert_eq!(failure.error, GridProcessorError::DeadlineExceeded { stage: "resample" });

    let decoded = resampler.decode_all(&data);
    assert_eq!(decoded.len(), 2);
    assert!(decoded[0].is_ok());
    assert_eq!(
        decoded[1].as_ref().unwrap_err().error,
        GridProcessorError::DeadlineExceeded { stage: "parse" }
    );
}
