//! Oriented filter banks: curvature ("banana") filters and Gabor filters.
//!
//! Both banks are returned as one stacked kernel of shape
//! (number of filters, 1, size, size), every plane has zero mean.
use crate::{check_filter_size, FilterKernel, FilterPrecision, FilterResult};
use ndarray::*;
use std::f64::consts::PI;
use std::fmt::{self, Display};

/// Parameters of the curvature filter bank.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvatureParams {
    /// Number of orientations, spread evenly over the full circle
    pub n_ories: usize,
    /// Number of curvatures, spaced logarithmically between 10^-2 and 10^-0.1
    pub n_curves: usize,
    /// Sizes of the Gaussian envelope
    pub gau_sizes: Vec<f64>,
    /// Spatial frequencies of the carrier
    pub spatial_fre: Vec<f64>,
}

impl Default for CurvatureParams {
    fn default() -> Self {
        CurvatureParams {
            n_ories: 12,
            n_curves: 3,
            gau_sizes: vec![5.0],
            spatial_fre: vec![1.2],
        }
    }
}

impl CurvatureParams {
    /// Number of filter planes the bank contains.
    pub fn num_filters(&self) -> usize {
        self.n_ories * self.n_curves * self.gau_sizes.len() * self.spatial_fre.len()
    }
}

impl Display for CurvatureParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{n_ories: {}, n_curves: {}, gau_sizes: {:?}, spatial_fre: {:?}}}",
            self.n_ories, self.n_curves, self.gau_sizes, self.spatial_fre
        )
    }
}

/// Parameters of the Gabor filter bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaborParams {
    /// Number of orientations, spread evenly over half a circle
    pub n_ories: usize,
    /// Number of wavelengths, each one a factor sqrt(2) shorter than the last
    pub num_scales: usize,
}

impl Default for GaborParams {
    fn default() -> Self {
        GaborParams {
            n_ories: 12,
            num_scales: 3,
        }
    }
}

impl GaborParams {
    pub fn num_filters(&self) -> usize {
        self.n_ories * self.num_scales
    }
}

impl Display for GaborParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{n_ories: {}, num_scales: {}}}",
            self.n_ories, self.num_scales
        )
    }
}

/// Pixel coordinates of a filter of the given size.
/// x runs along the first (row) axis in ascending order,
/// y along the second axis in descending order, both centered around 0.
fn sampling_grid(size: usize) -> (Vec<f64>, Vec<f64>) {
    let half = (size / 2) as i64;
    let odd = (size % 2) as i64;
    let xs = (-half..half + odd).map(|v| v as f64).collect();
    let ys = (-half - odd + 1..=half).rev().map(|v| v as f64).collect();
    (xs, ys)
}

fn remove_mean(plane: &mut Array2<f64>) {
    let mean = plane.mean().unwrap_or(0.0);
    plane.mapv_inplace(|v| v - mean);
}

/// A single curvature filter: a curved Gaussian envelope times a curved cosine carrier,
/// with the carrier's DC part suppressed.
///
/// `envelope` is the size of the Gaussian envelope, `frequency` the carrier frequency,
/// `theta` the orientation and `curvature` the bending of the filter's axis.
pub fn banana_filter(
    envelope: f64,
    frequency: f64,
    theta: f64,
    curvature: f64,
    size: usize,
) -> Array2<f64> {
    let (xs, ys) = sampling_grid(size);
    let (sigma_x, sigma_y, gamma) = (envelope, envelope, 1.0);
    let bias = (-sigma_x / 2.0).exp();

    let mut plane = Array2::from_shape_fn((size, size), |(i, j)| {
        let (x, y) = (xs[i], ys[j]);
        let x_rot = x * theta.cos() + y * theta.sin();
        let y_rot = -x * theta.sin() + y * theta.cos();
        let k = x_rot + curvature * y_rot.powi(2);
        let k2 = (k / sigma_x).powi(2) + (y_rot / (sigma_y * envelope)).powi(2);
        let gauss = (-k2 * frequency.powi(2) / 2.0).exp();
        gamma * gauss * ((frequency * k).cos() - bias)
    });
    remove_mean(&mut plane);
    plane
}

/// A single even-symmetric Gabor filter.
pub fn gabor_filter(wavelength: f64, theta: f64, size: usize) -> Array2<f64> {
    const ASPECT_RATIO: f64 = 0.5;
    let sigma = 0.56 * wavelength;
    let (xs, ys) = sampling_grid(size);

    let mut plane = Array2::from_shape_fn((size, size), |(i, j)| {
        let (x, y) = (xs[i], ys[j]);
        let x_rot = x * theta.cos() + y * theta.sin();
        let y_rot = -x * theta.sin() + y * theta.cos();
        let envelope =
            (-(x_rot.powi(2) + ASPECT_RATIO.powi(2) * y_rot.powi(2)) / (2.0 * sigma.powi(2))).exp();
        envelope * (2.0 * PI * x_rot / wavelength).cos()
    });
    remove_mean(&mut plane);
    plane
}

/// Curvatures of the banana filters, log spaced from 10^-2 to 10^-0.1.
fn curvatures(n_curves: usize) -> Array1<f64> {
    Array1::logspace(10.0, -2.0, -0.1, n_curves)
}

fn stack_planes(planes: Vec<Array2<f64>>, size: usize) -> FilterKernel {
    let mut kernel = Array4::zeros((planes.len(), 1, size, size));
    for (i, plane) in planes.iter().enumerate() {
        kernel
            .slice_mut(s![i, 0, .., ..])
            .assign(&plane.mapv(|v| v as FilterPrecision));
    }
    kernel
}

/// Curvature filter bank, ordered by curvature, envelope size, orientation and frequency
/// (the last one varying fastest).
pub fn curvature_filters(size: usize, params: &CurvatureParams) -> FilterResult<FilterKernel> {
    check_filter_size(size)?;
    let orientations: Vec<f64> = (0..params.n_ories)
        .map(|j| 2.0 * PI * j as f64 / params.n_ories as f64)
        .collect();
    let mut planes = Vec::with_capacity(params.num_filters());
    for &curvature in curvatures(params.n_curves).iter() {
        for &envelope in &params.gau_sizes {
            for &theta in &orientations {
                for &frequency in &params.spatial_fre {
                    planes.push(banana_filter(envelope, frequency, theta, curvature, size));
                }
            }
        }
    }
    Ok(stack_planes(planes, size))
}

/// Gabor filter bank, ordered by wavelength and then orientation.
pub fn gabor_filters(size: usize, params: &GaborParams) -> FilterResult<FilterKernel> {
    check_filter_size(size)?;
    let longest_wavelength = size as f64 / 2.0;

    let mut planes = Vec::with_capacity(params.num_filters());
    for scale in 0..params.num_scales {
        let wavelength = longest_wavelength / 2f64.sqrt().powi(scale as i32);
        for j in 0..params.n_ories {
            let theta = PI * j as f64 / params.n_ories as f64;
            planes.push(gabor_filter(wavelength, theta, size));
        }
    }
    Ok(stack_planes(planes, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FilterError;

    #[test]
    fn test_sampling_grid() {
        assert_eq!(
            sampling_grid(7),
            (
                vec![-3., -2., -1., 0., 1., 2., 3.],
                vec![3., 2., 1., 0., -1., -2., -3.]
            )
        );
        assert_eq!(
            sampling_grid(4),
            (vec![-2., -1., 0., 1.], vec![2., 1., 0., -1.])
        );
    }

    #[test]
    fn test_curvatures() {
        let values = curvatures(3);
        assert_eq!(values.len(), 3);
        assert!((values[0] - 0.01).abs() < 1e-12);
        assert!((values[1] - 10f64.powf(-1.05)).abs() < 1e-12);
        assert!((values[2] - 10f64.powf(-0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_curvature_bank_shape() {
        let params = CurvatureParams::default();
        let bank = curvature_filters(8, &params).unwrap();
        assert_eq!(bank.shape(), &[36, 1, 8, 8]);
        for plane in bank.outer_iter() {
            assert!(plane.mean().unwrap().abs() < 1e-5);
            assert!(plane.iter().any(|v| v.abs() > 1e-3));
        }
    }

    #[test]
    fn test_gabor_bank_shape() {
        let bank = gabor_filters(9, &GaborParams::default()).unwrap();
        assert_eq!(bank.shape(), &[36, 1, 9, 9]);
        for plane in bank.outer_iter() {
            assert!(plane.mean().unwrap().abs() < 1e-5);
        }
    }

    #[test]
    fn test_gabor_orientation() {
        // theta = 0 varies along x (rows) only for the carrier, so a horizontal
        // line through the center is symmetric under y -> -y
        let plane = gabor_filter(4.0, 0.0, 9);
        for i in 0..9 {
            for d in 1..=4 {
                assert!((plane[[i, 4 - d]] - plane[[i, 4 + d]]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_too_small() {
        assert_eq!(
            gabor_filters(1, &GaborParams::default()),
            Err(FilterError::InvalidFilterSize(1))
        );
        assert_eq!(
            curvature_filters(0, &CurvatureParams::default()),
            Err(FilterError::InvalidFilterSize(0))
        );
    }

    #[test]
    fn test_deterministic() {
        let params = CurvatureParams::default();
        assert_eq!(
            curvature_filters(6, &params).unwrap(),
            curvature_filters(6, &params).unwrap()
        );
    }
}
