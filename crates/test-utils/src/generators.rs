//! Synthetic field generators with values that are easy to verify.
//!
//! All grids are row-major with `nx` columns, row 0 first.

/// Grid where each value encodes its position: `col * 1000 + row`.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(nx: usize, ny: usize) -> Vec<f64> {
    (0..ny)
        .flat_map(|row| (0..nx).map(move |col| (col * 1000 + row) as f64))
        .collect()
}

/// Temperature-like gradient in Kelvin, 250 K to about 310 K.
pub fn create_temperature_grid(nx: usize, ny: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(nx * ny);
    for row in 0..ny {
        for col in 0..nx {
            let x = col as f64 / nx.max(1) as f64;
            let y = row as f64 / ny.max(1) as f64;
            data.push(250.0 + x * 30.0 + y * 30.0);
        }
    }
    data
}

/// Plane `a + b*col + c*row`. Bilinear interpolation reproduces it exactly.
pub fn create_linear_grid(nx: usize, ny: usize, a: f64, b: f64, c: f64) -> Vec<f64> {
    (0..ny)
        .flat_map(|row| (0..nx).map(move |col| a + b * col as f64 + c * row as f64))
        .collect()
}

/// Smooth field of latitude and longitude in degrees.
pub fn smooth_lat_lon_value(lat: f64, lon: f64) -> f64 {
    280.0 + 20.0 * lat.to_radians().cos() + 5.0 * (2.0 * lon.to_radians()).sin()
}

/// Sample [`smooth_lat_lon_value`] on a regular lat/lon grid.
pub fn create_lat_lon_field(nx: usize, ny: usize, lat_first: f64, lon_first: f64, dlat: f64, dlon: f64) -> Vec<f64> {
    (0..ny)
        .flat_map(|row| {
            (0..nx).map(move |col| smooth_lat_lon_value(lat_first + row as f64 * dlat, lon_first + col as f64 * dlon))
        })
        .collect()
}

pub fn create_constant_grid(nx: usize, ny: usize, value: f64) -> Vec<f64> {
    vec![value; nx * ny]
}

/// Presence mask with every `period`-th point absent.
pub fn create_sparse_mask(count: usize, period: usize) -> Vec<bool> {
    (0..count).map(|i| period == 0 || i % period != 0).collect()
}

/// Spherical harmonic coefficients for triangular truncation `truncation`,
/// in storage order: `m` outer, `n` from `m` to `truncation`, real then
/// imaginary part. Only the listed `(n, m, re, im)` terms are non-zero.
///
/// ```
/// use test_utils::create_spectral_coefficients;
///
/// let coeffs = create_spectral_coefficients(2, &[(0, 0, 1.0, 0.0)]);
/// assert_eq!(coeffs.len(), 12);
/// assert_eq!(coeffs[0], 1.0);
/// ```
pub fn create_spectral_coefficients(truncation: usize, terms: &[(usize, usize, f64, f64)]) -> Vec<f64> {
    let mut coeffs = vec![0.0; (truncation + 1) * (truncation + 2)];
    let mut index = 0;
    for m in 0..=truncation {
        for n in m..=truncation {
            for &(tn, tm, re, im) in terms {
                if tn == n && tm == m {
                    coeffs[index] = re;
                    coeffs[index + 1] = im;
                }
            }
            index += 2;
        }
    }
    coeffs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(3, 2);
        assert_eq!(grid, vec![0.0, 1000.0, 2000.0, 1.0, 1001.0, 2001.0]);
    }

    #[test]
    fn test_temperature_range() {
        let grid = create_temperature_grid(20, 10);
        assert!(grid.iter().all(|t| (250.0..=310.0).contains(t)));
    }

    #[test]
    fn test_linear_grid() {
        let grid = create_linear_grid(4, 3, 1.0, 2.0, 10.0);
        assert_eq!(grid[0], 1.0);
        assert_eq!(grid[3], 7.0);
        assert_eq!(grid[4 * 2 + 1], 23.0);
    }

    #[test]
    fn test_sparse_mask() {
        let mask = create_sparse_mask(7, 3);
        assert_eq!(mask, vec![false, true, true, false, true, true, false]);
        assert!(create_sparse_mask(4, 0).iter().all(|p| *p));
    }

    #[test]
    fn test_spectral_layout() {
        // T=2: (0,0) (1,0) (2,0) (1,1) (2,1) (2,2)
        let coeffs = create_spectral_coefficients(2, &[(1, 1, 3.0, -4.0), (2, 0, 5.0, 0.0)]);
        assert_eq!(coeffs[4], 5.0);
        assert_eq!(coeffs[6], 3.0);
        assert_eq!(coeffs[7], -4.0);
    }
}
