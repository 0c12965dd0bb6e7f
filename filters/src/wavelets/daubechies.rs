//! Daubechies and Symlet scaling filters by spectral factorization.
//!
//! Both families share the half-band product filter
//! `|H(z)|^2 = ((1 + z)(1 + 1/z) / 4)^N * P(y)`, `y = (2 - z - 1/z) / 4`,
//! `P(y) = sum_{k < N} C(N - 1 + k, k) y^k`. Every root of `P` yields a reciprocal pair of
//! roots in `z`. Daubechies filters keep the ones inside the unit circle (minimum phase),
//! Symlets pick the combination with the most linear phase.
use crate::{poly, FilterResult};
use num::complex::Complex64;
use std::f64::consts::{PI, SQRT_2};

/// Number of frequency samples used to judge phase linearity.
const PHASE_SAMPLES: usize = 128;
/// Roots with a smaller imaginary part are treated as real.
const REAL_ROOT_TOLERANCE: f64 = 1e-7;

pub const MAX_DAUBECHIES_ORDER: usize = 38;
pub const MAX_SYMLET_ORDER: usize = 20;

fn daubechies_polynomial(order: usize) -> Vec<f64> {
    (0..order)
        .map(|k| poly::binomial(order - 1 + k, k))
        .collect()
}

/// The two roots in z belonging to a root y of P, (inside, outside) the unit circle.
fn z_roots(y: Complex64) -> (Complex64, Complex64) {
    // y = (2 - z - 1/z) / 4  <=>  z^2 - (2 - 4y) z + 1 = 0
    let b = Complex64::new(2.0, 0.0) - y * 4.0;
    let d = (b * b - 4.0).sqrt();
    let z1 = (b + d) / 2.0;
    let z2 = (b - d) / 2.0;
    if z1.norm() < 1.0 {
        (z1, z2)
    } else {
        (z2, z1)
    }
}

/// Builds the real filter with the given zeros plus `order` zeros at z = -1,
/// normalized to a coefficient sum of sqrt(2).
fn filter_from_zeros(zeros: &[Complex64], order: usize) -> Vec<f64> {
    let mut h = vec![Complex64::new(1.0, 0.0)];
    for &z in zeros {
        h = poly::multiply(&h, &[-z, Complex64::new(1.0, 0.0)]);
    }
    let one = Complex64::new(1.0, 0.0);
    for _ in 0..order {
        h = poly::multiply(&h, &[one, one]);
    }
    let real: Vec<f64> = h.iter().map(|c| c.re).collect();
    let sum: f64 = real.iter().sum();
    real.iter().map(|v| v * SQRT_2 / sum).collect()
}

/// Decomposition low-pass filter of the Daubechies wavelet with `order` vanishing moments,
/// of length `2 * order`.
pub fn daubechies(order: usize) -> FilterResult<Vec<f64>> {
    if order == 1 {
        return Ok(vec![SQRT_2 / 2.0; 2]);
    }
    let zeros: Vec<Complex64> = poly::roots(&daubechies_polynomial(order))?
        .into_iter()
        .map(|y| z_roots(y).0)
        .collect();
    Ok(filter_from_zeros(&zeros, order))
}

/// Roots of P grouped so that every group yields a real factor:
/// a single real root, or a complex conjugate pair.
fn conjugate_groups(roots: &[Complex64]) -> Vec<Vec<Complex64>> {
    let mut groups = Vec::new();
    for &y in roots {
        if y.im.abs() < REAL_ROOT_TOLERANCE {
            groups.push(vec![Complex64::new(y.re, 0.0)]);
        } else if y.im > 0.0 {
            groups.push(vec![y, y.conj()]);
        }
    }
    groups
}

/// Residual of a least squares line through the unwrapped phase response.
fn phase_nonlinearity(h: &[f64]) -> f64 {
    let mut frequencies = Vec::with_capacity(PHASE_SAMPLES);
    let mut phases = Vec::with_capacity(PHASE_SAMPLES);
    let mut previous = 0.0;
    let mut offset = 0.0;
    for k in 0..PHASE_SAMPLES {
        let w = PI * (k as f64 + 0.5) / PHASE_SAMPLES as f64;
        let response: Complex64 = h
            .iter()
            .enumerate()
            .map(|(n, &c)| Complex64::from_polar(c, -w * n as f64))
            .sum();
        let raw = response.arg();
        while raw + offset - previous > PI {
            offset -= 2.0 * PI;
        }
        while raw + offset - previous < -PI {
            offset += 2.0 * PI;
        }
        previous = raw + offset;
        frequencies.push(w);
        phases.push(previous);
    }

    let n = PHASE_SAMPLES as f64;
    let mean_w = frequencies.iter().sum::<f64>() / n;
    let mean_p = phases.iter().sum::<f64>() / n;
    let covariance: f64 = frequencies
        .iter()
        .zip(&phases)
        .map(|(w, p)| (w - mean_w) * (p - mean_p))
        .sum();
    let variance: f64 = frequencies.iter().map(|w| (w - mean_w).powi(2)).sum();
    let slope = covariance / variance;
    frequencies
        .iter()
        .zip(&phases)
        .map(|(w, p)| (p - mean_p - slope * (w - mean_w)).powi(2))
        .sum()
}

/// Decomposition low-pass filter of the Symlet with `order` vanishing moments,
/// the least asymmetric filter of length `2 * order`.
pub fn symlet(order: usize) -> FilterResult<Vec<f64>> {
    if order == 1 {
        return daubechies(1);
    }
    let groups = conjugate_groups(&poly::roots(&daubechies_polynomial(order))?);

    // Mirroring every root gives the time reversed filter with the same phase linearity,
    // so the first group can stay fixed.
    let free_groups = groups.len().saturating_sub(1);
    let mut best: Option<(f64, Vec<f64>)> = None;
    for mask in 0..(1usize << free_groups) {
        let zeros: Vec<Complex64> = groups
            .iter()
            .enumerate()
            .flat_map(|(g, group)| {
                let outside = g > 0 && (mask >> (g - 1)) & 1 == 1;
                group.iter().map(move |&y| {
                    let (inner, outer) = z_roots(y);
                    if outside {
                        outer
                    } else {
                        inner
                    }
                })
            })
            .collect();
        let h = filter_from_zeros(&zeros, order);
        let cost = phase_nonlinearity(&h);
        match &best {
            Some((best_cost, _)) if cost >= best_cost - 1e-12 => {}
            _ => best = Some((cost, h)),
        }
    }
    match best {
        Some((_, h)) => Ok(h),
        None => daubechies(order),
    }
}
