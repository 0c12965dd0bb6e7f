//! Random convolution weights with a power law spectrum.
//!
//! The weights of a layer with shape (out, in, kh, kw) are treated as a matrix of `out`
//! samples with `n = in * kh * kw` features. The i-th eigenvalue of their covariance
//! (or the i-th singular value) decays like i^-1.
use crate::convolutions::ConvolutionLayer;
use crate::device::Device;
use crate::{ModelError, ModelResult, WeightPrecision};
use filters::linalg::qr;
use log::debug;
use ndarray::*;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::Rng;

pub const POWER_LAW_EXPONENT: f64 = -1.0;

/// How the spectrum is imposed on the weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumMode {
    /// Random combinations of an orthonormal basis whose variances follow the power law
    Direct,
    /// Composition U S V^T of random orthonormal factors and power law singular values
    Factorized,
}

impl SpectrumMode {
    pub fn from_svd_flag(svd: bool) -> Self {
        if svd {
            SpectrumMode::Factorized
        } else {
            SpectrumMode::Direct
        }
    }
}

/// `i^POWER_LAW_EXPONENT` for i = 1..=n
pub fn power_law_eigenvalues(n: usize) -> Array1<f64> {
    (1..=n).map(|i| (i as f64).powf(POWER_LAW_EXPONENT)).collect()
}

fn standard_normal<R: Rng + ?Sized>(shape: (usize, usize), rng: &mut R) -> Array2<f64> {
    Array2::random_using(shape, StandardNormal, rng)
}

/// out x n matrix whose rows have covariance Q diag(lambda) Q^T for a random orthonormal Q.
fn direct_spectrum<R: Rng + ?Sized>(out: usize, n: usize, rng: &mut R) -> Array2<f64> {
    let (eigenvectors, _) = qr(&standard_normal((n, n), rng));
    let scales = power_law_eigenvalues(n).mapv(f64::sqrt);
    let scaled = eigenvectors * &scales.insert_axis(Axis(0));
    standard_normal((out, n), rng).dot(&scaled)
}

/// out x n matrix U S V^T with singular values sqrt(lambda_i (out - 1)).
fn factorized_spectrum<R: Rng + ?Sized>(out: usize, n: usize, rng: &mut R) -> Array2<f64> {
    let components = out.min(n);
    let (u, _) = qr(&standard_normal((out, components), rng));
    let (v, _) = qr(&standard_normal((n, components), rng));
    let singular_values =
        power_law_eigenvalues(components).mapv(|l| (l * out.saturating_sub(1) as f64).sqrt());
    (u * &singular_values.insert_axis(Axis(0))).dot(&v.t())
}

/// Synthesizes weights of the given shape, which has to be 4-dimensional
/// (out channels, in channels, kernel height, kernel width).
pub fn synthesize_weights<R: Rng + ?Sized>(
    shape: &[usize],
    mode: SpectrumMode,
    device: Device,
    rng: &mut R,
) -> ModelResult<Array4<WeightPrecision>> {
    let (out, in_channels, kernel_h, kernel_w) = match *shape {
        [out, in_channels, kernel_h, kernel_w] => (out, in_channels, kernel_h, kernel_w),
        _ => {
            return Err(ModelError::ShapeMismatch {
                expected: "[out_channels, in_channels, kernel_height, kernel_width]".to_string(),
                found: shape.to_vec(),
            })
        }
    };
    let n = in_channels * kernel_h * kernel_w;
    let matrix = match device {
        Device::Cpu => match mode {
            SpectrumMode::Direct => direct_spectrum(out, n, rng),
            SpectrumMode::Factorized => factorized_spectrum(out, n, rng),
        },
    };
    debug!("Synthesized {:?} weights ({:?} mode) on {}", shape, mode, device);
    Ok(Array4::from_shape_vec(
        (out, in_channels, kernel_h, kernel_w),
        matrix.iter().map(|&v| v as WeightPrecision).collect(),
    )?)
}

/// Replaces the weight of the layer with synthesized power law weights of the same shape.
/// Bias, stride and padding stay untouched.
pub fn change_weights<'a, R: Rng + ?Sized>(
    layer: &'a mut ConvolutionLayer,
    mode: SpectrumMode,
    device: Device,
    rng: &mut R,
) -> ModelResult<&'a mut ConvolutionLayer> {
    let weights = synthesize_weights(layer.weight().shape(), mode, device, rng)?;
    layer.replace_weight(weights)?;
    Ok(layer)
}
