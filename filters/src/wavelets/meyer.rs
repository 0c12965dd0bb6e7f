//! FIR approximation of the Meyer scaling filter ("dmey").
//!
//! The taps are the Fourier coefficients of the Meyer low-pass response,
//! truncated to 61 taps and preceded by a single zero to give an even length of 62.
use std::f64::consts::{PI, SQRT_2};

pub const DMEY_LENGTH: usize = 62;
const HALF_SUPPORT: i64 = 30;
const INTEGRATION_INTERVALS: usize = 4096;

/// Smooth transition polynomial, 0 at x = 0 and 1 at x = 1.
fn meyer_nu(x: f64) -> f64 {
    let x = x.max(0.0).min(1.0);
    x.powi(4) * (35.0 - 84.0 * x + 70.0 * x.powi(2) - 20.0 * x.powi(3))
}

/// Frequency response of the scaling filter on [0, pi].
fn response(w: f64) -> f64 {
    if w <= PI / 3.0 {
        SQRT_2
    } else if w >= 2.0 * PI / 3.0 {
        0.0
    } else {
        SQRT_2 * (PI / 2.0 * meyer_nu(3.0 * w / PI - 1.0)).cos()
    }
}

/// `h[n] = 1/pi * int_0^{2pi/3} H(w) cos(n w) dw` with the composite Simpson rule.
fn tap(n: i64) -> f64 {
    let upper = 2.0 * PI / 3.0;
    let step = upper / INTEGRATION_INTERVALS as f64;
    let f = |w: f64| response(w) * (n as f64 * w).cos();
    let mut total = f(0.0) + f(upper);
    for i in 1..INTEGRATION_INTERVALS {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        total += weight * f(i as f64 * step);
    }
    total * step / 3.0 / PI
}

/// Decomposition low-pass filter of the discrete Meyer wavelet.
pub fn dmey() -> Vec<f64> {
    let mut h = vec![0.0; DMEY_LENGTH];
    for (i, n) in (-HALF_SUPPORT..=HALF_SUPPORT).enumerate() {
        h[i + 1] = tap(n);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dmey_shape() {
        let h = dmey();
        assert_eq!(h.len(), DMEY_LENGTH);
        assert_eq!(h[0], 0.0);
        // symmetric around the center tap
        for d in 1..=HALF_SUPPORT as usize {
            assert!((h[31 - d] - h[31 + d]).abs() < 1e-12);
        }
        assert!(h.iter().all(|v| v.abs() <= h[31]));
        assert!((h[31] - 0.74375).abs() < 1e-4);
    }

    #[test]
    fn test_dmey_nearly_orthonormal() {
        let h = dmey();
        let sum: f64 = h.iter().sum();
        assert!((sum - SQRT_2).abs() < 1e-3, "sum {}", sum);
        let norm: f64 = h.iter().map(|v| v * v).sum();
        assert!((norm - 1.0).abs() < 1e-3, "norm {}", norm);
        let shifted: f64 = (0..h.len() - 2).map(|n| h[n] * h[n + 2]).sum();
        assert!(shifted.abs() < 1e-3);
    }
}
