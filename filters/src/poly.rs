//! Polynomial helpers. Coefficients are always stored in ascending order,
//! i.e. `p[k]` belongs to `x^k`.
use crate::{FilterError, FilterResult};
use nalgebra::linalg::balancing::balance_parlett_reinsch;
use nalgebra::linalg::Schur;
use nalgebra::DMatrix;
use num::complex::Complex64;

const MAX_EIGEN_ITERATIONS: usize = 10_000;
const POLISH_ITERATIONS: usize = 20;
const ROOT_TOLERANCE: f64 = 1e-15;

/// Product of two polynomials.
pub fn multiply<T>(a: &[T], b: &[T]) -> Vec<T>
where
    T: Copy + num::Zero + std::ops::Mul<Output = T>,
{
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![T::zero(); a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            out[i + j] = out[i + j] + x * y;
        }
    }
    out
}

/// Evaluates the polynomial at `x` (Horner scheme).
pub fn evaluate(p: &[Complex64], x: Complex64) -> Complex64 {
    p.iter()
        .rev()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * x + c)
}

/// Derivative of the polynomial.
pub fn derivative(p: &[Complex64]) -> Vec<Complex64> {
    p.iter()
        .enumerate()
        .skip(1)
        .map(|(k, &c)| c * k as f64)
        .collect()
}

/// Binomial coefficient as a float, large arguments would overflow integers.
/// Requires `k <= n`.
pub fn binomial(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Refines approximate roots of a monic polynomial with the Aberth-Ehrlich iteration.
fn aberth(monic: &[Complex64], mut z: Vec<Complex64>) -> Vec<Complex64> {
    let monic_derivative = derivative(monic);
    for _ in 0..POLISH_ITERATIONS {
        let mut max_step: f64 = 0.0;
        for i in 0..z.len() {
            let ratio = evaluate(monic, z[i]) / evaluate(&monic_derivative, z[i]);
            let repulsion: Complex64 = (0..z.len())
                .filter(|&j| j != i)
                .map(|j| (z[i] - z[j]).inv())
                .sum();
            let step = ratio / (Complex64::new(1.0, 0.0) - ratio * repulsion);
            if step.is_finite() {
                z[i] -= step;
                max_step = max_step.max(step.norm());
            }
        }
        if max_step < ROOT_TOLERANCE {
            break;
        }
    }
    z
}

/// All complex roots of a real polynomial: eigenvalues of the balanced companion matrix,
/// polished on the polynomial itself. The highest coefficient must not be zero.
pub fn roots(coefficients: &[f64]) -> FilterResult<Vec<Complex64>> {
    let degree = coefficients.len().saturating_sub(1);
    if degree == 0 {
        return Ok(Vec::new());
    }
    let lead = coefficients[degree];
    let mut companion = DMatrix::zeros(degree, degree);
    for j in 0..degree {
        companion[(0, j)] = -coefficients[degree - 1 - j] / lead;
    }
    for i in 1..degree {
        companion[(i, i - 1)] = 1.0;
    }
    balance_parlett_reinsch(&mut companion);
    let eigenvalues = Schur::try_new(companion, f64::EPSILON, MAX_EIGEN_ITERATIONS)
        .ok_or(FilterError::Decomposition("eigenvalues of the companion matrix did not converge"))?
        .complex_eigenvalues();

    let monic: Vec<Complex64> = coefficients
        .iter()
        .map(|&c| Complex64::new(c / lead, 0.0))
        .collect();
    Ok(aberth(&monic, eigenvalues.iter().copied().collect()))
}
