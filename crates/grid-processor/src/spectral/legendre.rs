//! Normalized associated Legendre functions.
//!
//! `P̄ₙᵐ(μ)` for `0 ≤ m ≤ n ≤ T`, without the Condon-Shortley phase,
//! normalized so that `½∫₋₁¹ P̄ₙᵐ(μ)² dμ = 1`. Values are stored m-major in
//! the same triangle layout as [`super::SpectralCoefficients`].

/// Number of `(n, m)` pairs with `0 ≤ m ≤ n ≤ truncation`.
pub fn triangle_len(truncation: usize) -> usize {
    (truncation + 1) * (truncation + 2) / 2
}

/// Position of the first `n = m` entry of order `m`.
#[inline]
pub fn order_offset(truncation: usize, m: usize) -> usize {
    m * (truncation + 1) - m * m.saturating_sub(1) / 2
}

/// Position of `(n, m)` in the triangle.
#[inline]
pub fn triangle_index(truncation: usize, n: usize, m: usize) -> usize {
    order_offset(truncation, m) + (n - m)
}

/// All `P̄ₙᵐ(μ)` up to `truncation` at one `μ = sin(latitude)`.
pub fn legendre_table(truncation: usize, mu: f64) -> Vec<f64> {
    let mut table = vec![0.0; triangle_len(truncation)];
    let sin_theta = (1.0 - mu * mu).max(0.0).sqrt();

    let mut sectoral = 1.0;
    for m in 0..=truncation {
        if m > 0 {
            let m_f = m as f64;
            sectoral *= ((2.0 * m_f + 1.0) / (2.0 * m_f)).sqrt() * sin_theta;
        }
        let base = order_offset(truncation, m);
        table[base] = sectoral;
        if m == truncation {
            break;
        }
        table[base + 1] = (2.0 * m as f64 + 3.0).sqrt() * mu * sectoral;

        let m2 = (m * m) as f64;
        for n in (m + 2)..=truncation {
            let n_f = n as f64;
            let nm1 = n_f - 1.0;
            let a = ((4.0 * n_f * n_f - 1.0) / (n_f * n_f - m2)).sqrt();
            let b = ((nm1 * nm1 - m2) / (4.0 * nm1 * nm1 - 1.0)).sqrt();
            let k = base + n - m;
            table[k] = a * (mu * table[k - 1] - b * table[k - 2]);
        }
    }
    table
}

/// Unnormalized Legendre polynomials `P_0..P_{count-1}` at `x`.
pub fn legendre_polynomials(count: usize, x: f64) -> Vec<f64> {
    let mut p = Vec::with_capacity(count);
    for k in 0..count {
        let value = match k {
            0 => 1.0,
            1 => x,
            _ => {
                let k_f = k as f64;
                ((2.0 * k_f - 1.0) * x * p[k - 1] - (k_f - 1.0) * p[k - 2]) / k_f
            }
        };
        p.push(value);
    }
    p
}
