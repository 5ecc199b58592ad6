//! Benchmarks for resampling decoded fields and the full pipeline.
//!
//! Run with: cargo bench --package grid-processor --bench resample

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use grid_processor::{
    resample, GribResampler, InterpolationMethod, InterpolationRequest, NullSink, ResampleConfig, SourceField,
};
use projection::GridDescriptor;
use rand::Rng;
use std::sync::Arc;
use test_utils::{create_temperature_grid, FieldSpec, Grib2Builder, GridTemplate};

/// Temperature-like field with random noise.
fn noisy_field(nx: usize, ny: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    create_temperature_grid(nx, ny)
        .into_iter()
        .map(|v| v + rng.gen_range(-0.5..0.5))
        .collect()
}

/// Regional 0.25 degree source and a 0.1 degree target inside it.
fn regional_grids(nx: usize, ny: usize) -> (GridDescriptor, GridDescriptor) {
    let source = GridDescriptor::lat_lon(20.0, 230.0, 0.25, 0.25, nx, ny);
    let span_lat = 0.25 * (ny as f64 - 1.0);
    let span_lon = 0.25 * (nx as f64 - 1.0);
    let tx = (span_lon / 0.1) as usize - 1;
    let ty = (span_lat / 0.1) as usize - 1;
    let target = GridDescriptor::lat_lon(20.05, 230.05, 0.1, 0.1, tx, ty);
    (source, target)
}

// =============================================================================
// INTERPOLATION BENCHMARKS
// =============================================================================

fn bench_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample_methods");
    let config = ResampleConfig::default();
    let (source, target) = regional_grids(200, 120);
    let values = noisy_field(200, 120);
    group.throughput(Throughput::Elements(target.point_count() as u64));

    for method in [
        InterpolationMethod::Nearest,
        InterpolationMethod::Bilinear,
        InterpolationMethod::Bicubic,
        InterpolationMethod::Budget,
    ] {
        let request = InterpolationRequest::new(target.clone(), method);
        group.bench_with_input(BenchmarkId::new("method", method.as_str()), &request, |b, request| {
            b.iter(|| resample(SourceField::new(black_box(&values)), &source, request, &config));
        });
    }

    group.finish();
}

fn bench_bilinear_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("bilinear_sizes");
    let config = ResampleConfig::default();

    for (nx, ny) in [(100, 60), (400, 240), (1000, 600)] {
        let (source, target) = regional_grids(nx, ny);
        let values = noisy_field(nx, ny);
        let request = InterpolationRequest::new(target.clone(), InterpolationMethod::Bilinear);
        group.throughput(Throughput::Elements(target.point_count() as u64));
        group.bench_with_input(
            BenchmarkId::new("source", format!("{}x{}", nx, ny)),
            &request,
            |b, request| {
                b.iter(|| resample(SourceField::new(black_box(&values)), &source, request, &config));
            },
        );
    }

    group.finish();
}

fn bench_spectral(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectral");
    let config = ResampleConfig::default();
    let target = GridDescriptor::lat_lon(-90.0, 0.0, 2.0, 2.0, 180, 91);

    for n in [16, 48] {
        let source = GridDescriptor::regular_gaussian(n, 4 * n);
        let values = noisy_field(4 * n, 2 * n);
        let request = InterpolationRequest::new(target.clone(), InterpolationMethod::Spectral);
        group.bench_with_input(BenchmarkId::new("gaussian_n", n), &request, |b, request| {
            b.iter(|| resample(SourceField::new(black_box(&values)), &source, request, &config));
        });
    }

    group.finish();
}

// =============================================================================
// PIPELINE BENCHMARKS
// =============================================================================

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let (nx, ny) = (360, 180);
    let mut builder = Grib2Builder::new();
    for _ in 0..4 {
        builder = builder.field(FieldSpec::new(
            GridTemplate::lat_lon(nx as u32, ny as u32, 20.0, 230.0, 0.25, 0.25),
            noisy_field(nx, ny),
        ));
    }
    let data = Bytes::from(builder.build());
    let (_, target) = regional_grids(nx, ny);

    for threads in [1, 4] {
        let resampler = GribResampler::new(ResampleConfig {
            threads,
            ..Default::default()
        })
        .expect("valid config")
        .with_sink(Arc::new(NullSink));
        let request = resampler.request(target.clone());

        group.bench_function(BenchmarkId::new("decode_all", threads), |b| {
            b.iter(|| resampler.decode_all(black_box(&data)));
        });
        group.bench_function(BenchmarkId::new("resample_all_bilinear", threads), |b| {
            b.iter(|| resampler.resample_all(black_box(&data), &request));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_methods, bench_bilinear_sizes, bench_spectral, bench_pipeline);
criterion_main!(benches);
