//! Coiflet scaling filters.
//!
//! A coiflet of order N has length 6N, 2N vanishing wavelet moments and 2N - 1 vanishing
//! scaling function moments. The moment conditions are linear in the filter taps, the
//! orthonormality conditions are quadratic. We restrict the filter to the affine space
//! defined by the moment conditions and run Gauss-Newton on the orthonormality conditions,
//! starting from a half-band Lagrange interpolation filter.
//!
//! Moments are taken against Chebyshev polynomials on positions scaled to [-1, 1]. They span
//! the same space as the monomials but keep the linear system well conditioned for high orders.
use crate::linalg::{lstsq, null_space};
use crate::{FilterError, FilterResult};
use ndarray::*;
use std::f64::consts::SQRT_2;

pub const MAX_COIFLET_ORDER: usize = 17;

const MAX_ITERATIONS: usize = 100;
const CONVERGED_RESIDUAL: f64 = 1e-28;
const ACCEPTED_RESIDUAL: f64 = 1e-20;

/// Lagrange weights interpolating the value at 0 from the odd positions +-1, +-3, ..., +-(2N - 1).
fn half_band_weights(order: usize) -> Vec<(i64, f64)> {
    let nodes: Vec<i64> = (0..2 * order as i64)
        .map(|i| -(2 * order as i64 - 1) + 2 * i)
        .collect();
    nodes
        .iter()
        .map(|&xj| {
            let weight: f64 = nodes
                .iter()
                .filter(|&&xm| xm != xj)
                .map(|&xm| (0 - xm) as f64 / (xj - xm) as f64)
                .product();
            (xj, weight)
        })
        .collect()
}

fn chebyshev(k: usize, x: f64) -> f64 {
    (k as f64 * x.max(-1.0).min(1.0).acos()).cos()
}

/// Tap positions mapped linearly onto [-1, 1].
fn positions(length: usize) -> Array1<f64> {
    Array1::linspace(-1.0, 1.0, length)
}

/// Moment conditions as a linear system `constraints * h = targets`.
fn moment_conditions(order: usize, length: usize, center: usize) -> (Array2<f64>, Array1<f64>) {
    let x = positions(length);
    let mut constraints = Array2::zeros((4 * order, length));
    let mut targets = Array1::zeros(4 * order);
    for k in 0..2 * order {
        // scaling function moments around the center, k = 0 fixes the coefficient sum
        for n in 0..length {
            constraints[[k, n]] = chebyshev(k, x[n]);
        }
        targets[k] = SQRT_2 * chebyshev(k, x[center]);

        // wavelet moments
        let row = 2 * order + k;
        for n in 0..length {
            let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
            constraints[[row, n]] = sign * chebyshev(k, x[n]);
        }
    }
    (constraints, targets)
}

/// Orthonormality residuals `sum_n h[n] h[n + 2m] - delta_m` and their Jacobian.
fn orthonormality(h: &Array1<f64>) -> (Array1<f64>, Array2<f64>) {
    let length = h.len();
    let shifts = length / 2;
    let mut residual = Array1::zeros(shifts);
    let mut jacobian = Array2::zeros((shifts, length));
    for m in 0..shifts {
        let offset = 2 * m;
        let mut value = 0.0;
        for n in 0..length - offset {
            value += h[n] * h[n + offset];
            jacobian[[m, n]] += h[n + offset];
            jacobian[[m, n + offset]] += h[n];
        }
        residual[m] = if m == 0 { value - 1.0 } else { value };
    }
    (residual, jacobian)
}

/// Decomposition low-pass filter of the coiflet of the given order.
pub fn coiflet(order: usize) -> FilterResult<Vec<f64>> {
    let length = 6 * order;
    let center = 2 * order;
    let (constraints, targets) = moment_conditions(order, length, center);

    // minimum norm solution plus an orthonormal basis of the remaining freedom
    let particular = lstsq(&constraints, &targets)?;
    let basis = null_space(&constraints)?;

    let mut initial: Array1<f64> = Array1::zeros(length);
    initial[center] = SQRT_2 / 2.0;
    for (offset, weight) in half_band_weights(order) {
        initial[(center as i64 + offset) as usize] += weight / SQRT_2;
    }
    let mut t = basis.t().dot(&(&initial - &particular));

    let filter_at = |t: &Array1<f64>| &particular + &basis.dot(t);
    let cost_at = |t: &Array1<f64>| orthonormality(&filter_at(t)).0.mapv(|v| v * v).sum();

    let mut cost = cost_at(&t);
    for _ in 0..MAX_ITERATIONS {
        if cost < CONVERGED_RESIDUAL {
            break;
        }
        let (residual, jacobian_h) = orthonormality(&filter_at(&t));
        let jacobian = jacobian_h.dot(&basis);
        let step = lstsq(&jacobian, &(-residual))?;

        let mut damping = 1.0;
        let mut improved = false;
        while damping > 1e-6 {
            let candidate = &t + &(&step * damping);
            let candidate_cost = cost_at(&candidate);
            if candidate_cost < cost {
                t = candidate;
                cost = candidate_cost;
                improved = true;
                break;
            }
            damping /= 2.0;
        }
        if !improved {
            break;
        }
    }

    if cost > ACCEPTED_RESIDUAL {
        return Err(FilterError::DidNotConverge {
            name: format!("coif{}", order),
            residual: cost,
        });
    }
    log::trace!("coif{} converged with residual {:e}", order, cost);

    // reconstruction ordering -> decomposition ordering
    Ok(filter_at(&t).iter().rev().cloned().collect())
}
