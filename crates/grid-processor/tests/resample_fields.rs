//! Resampling of synthesized GRIB2 fields through the public API.

use bytes::Bytes;
use grid_processor::{
    resample, GribResampler, GridProcessorError, InterpolationMethod, InterpolationRequest, NullSink,
    ResampleConfig, SourceField,
};
use projection::{GeoPoint, GridDescriptor, GridGeometry};
use std::sync::Arc;
use test_utils::{
    assert_approx_eq, assert_slice_approx_eq, create_spectral_coefficients, FieldSpec, Grib2Builder, GridTemplate,
    Packing,
};

fn resampler() -> GribResampler {
    GribResampler::new(ResampleConfig::default())
        .unwrap()
        .with_sink(Arc::new(NullSink))
}

fn linear(lat: f64, lon: f64) -> f64 {
    10.0 * lat + lon
}

/// One record holding `value(lat, lon)` on a north-first lat/lon grid.
fn north_first_record(nx: u32, ny: u32, lat_north: f64, lon_west: f64, step: f64) -> Bytes {
    let mut stored = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            stored.push(linear(lat_north - step * j as f64, lon_west + step * i as f64));
        }
    }
    let grid = GridTemplate::lat_lon_north_first(nx, ny, lat_north, lon_west, step, step);
    Bytes::from(
        Grib2Builder::new()
            .field(FieldSpec::new(grid, stored).packing(Packing::Ieee64))
            .build(),
    )
}

#[test]
fn test_bilinear_is_exact_for_linear_field() {
    let data = north_first_record(8, 6, 50.0, 10.0, 1.0);
    let resampler = resampler();
    let target = GridDescriptor::lat_lon(45.5, 10.25, 0.75, 1.5, 4, 5);
    let results = resampler.resample_all(&data, &resampler.request(target.clone()));
    assert_eq!(results.len(), 1);
    let resampled = results.into_iter().next().unwrap().unwrap();

    assert_eq!(resampled.output.missing_count, 0);
    let geometry = GridGeometry::new(&target).unwrap();
    let expected: Vec<f64> = geometry.points().iter().map(|p| linear(p.lat, p.lon)).collect();
    assert_slice_approx_eq!(resampled.output.values, expected, 1e-9);
    assert_eq!(resampled.diagnostics.source_projection, "regular_ll");
    assert_eq!(resampled.diagnostics.target_projection, "regular_ll");
    assert_eq!(resampled.diagnostics.method, InterpolationMethod::Bilinear);
}

#[test]
fn test_colocated_target_has_no_missing() {
    let data = north_first_record(4, 4, 43.0, 10.0, 1.0);
    let resampler = resampler();
    let target = GridDescriptor::lat_lon(41.0, 11.0, 1.0, 1.0, 2, 2);
    let expected: Vec<f64> = GridGeometry::new(&target)
        .unwrap()
        .points()
        .iter()
        .map(|p| linear(p.lat, p.lon))
        .collect();

    for method in InterpolationMethod::ALL {
        if method == InterpolationMethod::Spectral {
            continue;
        }
        let request = InterpolationRequest::new(target.clone(), method);
        let resampled = resampler.resample_at(&data, 0, &request).unwrap().remove(0);
        assert_eq!(resampled.output.missing_count, 0, "{}", method);
        assert_eq!(resampled.output.missing_fraction, 0.0);
        assert_eq!(resampled.output.values, expected, "{}", method);
    }
}

#[test]
fn test_target_outside_source_is_all_missing() {
    let data = north_first_record(4, 4, 43.0, 10.0, 1.0);
    let resampler = resampler();
    let target = GridDescriptor::lat_lon(-30.0, 200.0, 1.0, 1.0, 3, 3);
    let request = resampler.request(target).with_missing_value(-1.0);
    let resampled = resampler.resample_at(&data, 0, &request).unwrap().remove(0);

    assert_eq!(resampled.output.missing_count, 9);
    assert_eq!(resampled.output.missing_fraction, 1.0);
    assert!(resampled.output.values.iter().all(|v| *v == -1.0));
    assert_eq!(resampled.diagnostics.missing_fraction, 1.0);
}

#[test]
fn test_bitmap_missing_reaches_output() {
    let grid = GridTemplate::lat_lon(3, 3, 0.0, 0.0, 1.0, 1.0);
    let values: Vec<f64> = (0..9).map(|v| v as f64).collect();
    let mut present = vec![true; 9];
    present[4] = false;
    let data = Bytes::from(
        Grib2Builder::new()
            .field(FieldSpec::new(grid, values).packing(Packing::Ieee32).bitmap(present))
            .build(),
    );
    let resampler = resampler();
    let target = GridDescriptor::lat_lon(0.0, 0.0, 1.0, 1.0, 3, 3);
    let request = InterpolationRequest::new(target, InterpolationMethod::Nearest).with_search_radius_km(1.0);
    let resampled = resampler.resample_at(&data, 0, &request).unwrap().remove(0);

    let options = resampled.output.to_options();
    assert_eq!(options[4], None);
    assert_eq!(options[0], Some(0.0));
    assert_eq!(resampled.output.missing_count, 1);
}

#[test]
fn test_spectral_message_synthesized_on_lat_lon() {
    let coefficients = create_spectral_coefficients(3, &[(0, 0, 12.0, 0.0), (1, 0, 2.0, 0.0)]);
    let data = Bytes::from(
        Grib2Builder::new()
            .field(
                FieldSpec::new(GridTemplate::SphericalHarmonic { truncation: 3 }, coefficients)
                    .packing(Packing::Ieee64),
            )
            .build(),
    );
    let resampler = resampler();
    let target = GridDescriptor::lat_lon(-60.0, 0.0, 30.0, 90.0, 4, 5);
    let request = InterpolationRequest::new(target.clone(), InterpolationMethod::Spectral);
    let resampled = resampler.resample_at(&data, 0, &request).unwrap().remove(0);

    assert_eq!(resampled.diagnostics.source_projection, "spherical_harmonic");
    let root3 = 3f64.sqrt();
    for (value, point) in resampled.output.values.iter().zip(GridGeometry::new(&target).unwrap().points()) {
        assert_approx_eq!(*value, 12.0 + 2.0 * root3 * point.lat.to_radians().sin(), 1e-9);
    }

    // Spectral coefficients cannot be read point-wise
    let bilinear = InterpolationRequest::new(target, InterpolationMethod::Bilinear);
    let failure = resampler.resample_at(&data, 0, &bilinear).unwrap_err();
    assert!(matches!(failure.error, GridProcessorError::IncompatibleGrid(_)));
}

#[test]
fn test_spectral_round_trip_on_gaussian_grid() {
    let source = GridDescriptor::regular_gaussian(16, 64);
    let geometry = GridGeometry::new(&source).unwrap();
    let values: Vec<f64> = geometry
        .points()
        .iter()
        .map(|p| {
            let (lat, lon) = (p.lat.to_radians(), p.lon.to_radians());
            280.0 + 15.0 * lat.sin() + 4.0 * lat.cos() * lon.cos()
        })
        .collect();

    let request = InterpolationRequest::new(source.clone(), InterpolationMethod::Spectral);
    let output = resample(SourceField::new(&values), &source, &request, &ResampleConfig::default()).unwrap();
    assert_eq!(output.missing_count, 0);
    assert_slice_approx_eq!(output.values, values, 1e-8);
}

#[test]
fn test_point_extraction() {
    let data = north_first_record(8, 6, 50.0, 10.0, 1.0);
    let resampler = resampler();
    let decoded = resampler.decode_at(&data, 0).unwrap().remove(0);
    let points = [GeoPoint::new(47.5, 12.25), GeoPoint::new(0.0, 0.0)];

    let output = resampler
        .extract_points(&decoded, &points, InterpolationMethod::Bilinear)
        .unwrap();
    assert_approx_eq!(output.values[0], linear(47.5, 12.25), 1e-9);
    assert_eq!(output.to_options()[1], None);

    let err = resampler
        .extract_points(&decoded, &points, InterpolationMethod::Budget)
        .unwrap_err();
    assert!(matches!(err, GridProcessorError::InvalidRequest(_)));

    // Spectral synthesis reports an unlocatable point as missing too
    let coefficients = create_spectral_coefficients(3, &[(0, 0, 12.0, 0.0), (1, 0, 2.0, 0.0)]);
    let data = Bytes::from(
        Grib2Builder::new()
            .field(
                FieldSpec::new(GridTemplate::SphericalHarmonic { truncation: 3 }, coefficients)
                    .packing(Packing::Ieee64),
            )
            .build(),
    );
    let decoded = resampler.decode_at(&data, 0).unwrap().remove(0);
    let points = [GeoPoint::new(10.0, 20.0), GeoPoint::new(f64::NAN, 20.0)];
    let output = resampler
        .extract_points(&decoded, &points, InterpolationMethod::Spectral)
        .unwrap();
    assert_approx_eq!(output.values[0], 12.0 + 2.0 * 3f64.sqrt() * 10f64.to_radians().sin(), 1e-9);
    assert_eq!(output.missing_count, 1);
    assert_eq!(output.to_options()[1], None);
}

#[test]
fn test_identity_on_source_grid() {
    let data = north_first_record(7, 5, 60.0, 350.0, 0.5);
    let resampler = resampler();
    let decoded = resampler.decode_at(&data, 0).unwrap().remove(0);

    for method in [InterpolationMethod::Nearest, InterpolationMethod::Bilinear] {
        let request = InterpolationRequest::new(decoded.grid.clone(), method);
        let resampled = resampler.resample_decoded(decoded.clone(), &request).unwrap();
        assert_eq!(resampled.output.missing_count, 0);
        assert_eq!(resampled.output.values, decoded.field.values, "{}", method);
    }
}
