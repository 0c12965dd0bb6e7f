//! Biorthogonal spline wavelets (Cohen-Daubechies-Feauveau).
//!
//! The primal filter is a B-spline of order `nr`, the dual filter carries the
//! remaining factor of the half-band product filter. For 4.4, 5.5 and 6.8 the roots of
//! that factor are split between both filters, 4.4 is the well known 9/7 pair.
use crate::{poly, FilterResult};
use num::complex::Complex64;
use std::cmp::Ordering;
use std::f64::consts::SQRT_2;

/// Valid (primal order, dual order) pairs, in catalog order.
pub const BIORTHOGONAL_ORDERS: [(usize, usize); 15] = [
    (1, 1),
    (1, 3),
    (1, 5),
    (2, 2),
    (2, 4),
    (2, 6),
    (2, 8),
    (3, 1),
    (3, 3),
    (3, 5),
    (3, 7),
    (3, 9),
    (4, 4),
    (5, 5),
    (6, 8),
];

/// How the remaining factor is divided for pairs that are not plain splines.
struct RootSplit {
    orders: (usize, usize),
    /// zeros at z = -1 of the dual filter, the primal filter gets the rest
    dual_zeros: usize,
    /// root groups of the remaining factor that go to the dual filter,
    /// indexed by decreasing real part
    dual_groups: &'static [usize],
}

const ROOT_SPLITS: [RootSplit; 3] = [
    RootSplit {
        orders: (4, 4),
        dual_zeros: 4,
        dual_groups: &[0],
    },
    RootSplit {
        orders: (5, 5),
        dual_zeros: 4,
        dual_groups: &[0],
    },
    RootSplit {
        orders: (6, 8),
        dual_zeros: 8,
        dual_groups: &[0, 2],
    },
];

/// `y = (2 - z - 1/z) / 4` as coefficients of z^-1, z^0, z^1.
const Y: [f64; 3] = [-0.25, 0.5, -0.25];

/// Low-pass filters of a biorthogonal pair. `primal` is the spline (reconstruction)
/// filter, `dual` the analysis (decomposition) filter.
#[derive(Debug, Clone, PartialEq)]
pub struct SplinePair {
    pub primal: Vec<f64>,
    pub dual: Vec<f64>,
}

/// Turns a polynomial in y into a (symmetric, Laurent) polynomial in z.
fn y_to_z(coefficients: &[f64]) -> Vec<f64> {
    let degree = coefficients.len().saturating_sub(1);
    let mut out = vec![0.0; 2 * degree + 1];
    let mut power = vec![1.0];
    for (k, &c) in coefficients.iter().enumerate() {
        let offset = degree - k;
        for (i, &p) in power.iter().enumerate() {
            out[offset + i] += c * p;
        }
        power = poly::multiply(&power, &Y);
    }
    out
}

/// `(1 + z)^order`
fn binomial_factor(order: usize) -> Vec<f64> {
    (0..order).fold(vec![1.0], |acc, _| poly::multiply(&acc, &[1.0, 1.0]))
}

fn normalized(h: Vec<f64>) -> Vec<f64> {
    let sum: f64 = h.iter().sum();
    h.into_iter().map(|v| v * SQRT_2 / sum).collect()
}

/// Coefficients in y of the factor `1 - y / root`, merged with the conjugate root if complex.
fn real_factor(root: Complex64) -> Vec<f64> {
    if root.im.abs() < 1e-9 {
        vec![1.0, -1.0 / root.re]
    } else {
        let norm_sq = root.norm_sqr();
        vec![1.0, -2.0 * root.re / norm_sq, 1.0 / norm_sq]
    }
}

/// Real roots and the upper member of every conjugate pair, by decreasing real part.
fn root_groups(roots: Vec<Complex64>) -> Vec<Complex64> {
    let mut groups: Vec<Complex64> = roots
        .into_iter()
        .filter(|r| r.im > -1e-9)
        .collect();
    groups.sort_by(|a, b| b.re.partial_cmp(&a.re).unwrap_or(Ordering::Equal));
    groups
}

/// Spline pair of the given orders. Callers are expected to pass one of [`BIORTHOGONAL_ORDERS`].
pub fn spline_pair(nr: usize, nd: usize) -> FilterResult<SplinePair> {
    let l = (nr + nd) / 2;
    let remainder: Vec<f64> = (0..l).map(|k| poly::binomial(l - 1 + k, k)).collect();

    if let Some(split) = ROOT_SPLITS.iter().find(|split| split.orders == (nr, nd)) {
        let mut primal_factor = vec![1.0];
        let mut dual_factor = vec![1.0];
        for (i, root) in root_groups(poly::roots(&remainder)?).into_iter().enumerate() {
            if split.dual_groups.contains(&i) {
                dual_factor = poly::multiply(&dual_factor, &real_factor(root));
            } else {
                primal_factor = poly::multiply(&primal_factor, &real_factor(root));
            }
        }
        let primal_zeros = 2 * l - split.dual_zeros;
        return Ok(SplinePair {
            primal: normalized(poly::multiply(
                &binomial_factor(primal_zeros),
                &y_to_z(&primal_factor),
            )),
            dual: normalized(poly::multiply(
                &binomial_factor(split.dual_zeros),
                &y_to_z(&dual_factor),
            )),
        });
    }

    Ok(SplinePair {
        primal: normalized(binomial_factor(nr)),
        dual: normalized(poly::multiply(&binomial_factor(nd), &y_to_z(&remainder))),
    })
}
