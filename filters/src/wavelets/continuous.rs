//! Continuous wavelets, sampled on a square grid at several scales.
use crate::poly;
use crate::{check_filter_size, FilterError, FilterKernel, FilterPrecision, FilterResult};
use ndarray::*;
use num::complex::Complex64;
use std::f64::consts::PI;
use std::fmt::{self, Display};
use std::str::FromStr;

pub const MAX_GAUSSIAN_ORDER: u32 = 8;

/// A continuous wavelet with all of its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContinuousWavelet {
    /// Derivative of the given order of a Gaussian
    Gaus(u32),
    /// Mexican hat, the negative normalized second derivative of a Gaussian
    Mexh,
    /// Real Morlet wavelet
    Morl,
    /// Derivative of the given order of a complex Gaussian
    Cgau(u32),
    /// Complex Morlet wavelet
    Cmor { bandwidth: f64, center: f64 },
    /// Shannon wavelet
    Shan { bandwidth: f64, center: f64 },
    /// Frequency B-spline wavelet
    Fbsp { order: u32, bandwidth: f64, center: f64 },
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Physicists' Hermite polynomial H_n(x).
fn hermite(n: u32, x: f64) -> f64 {
    let (mut previous, mut current) = (1.0, 2.0 * x);
    if n == 0 {
        return previous;
    }
    for k in 1..n {
        let next = 2.0 * x * current - 2.0 * k as f64 * previous;
        previous = current;
        current = next;
    }
    current
}

/// Polynomial factor Q_n of the n-th derivative of exp(-ix - x^2) = Q_n(x) exp(-ix - x^2).
fn complex_gaussian_factor(order: u32) -> Vec<Complex64> {
    let inner_derivative = [Complex64::new(0.0, -1.0), Complex64::new(-2.0, 0.0)];
    let mut q = vec![Complex64::new(1.0, 0.0)];
    for _ in 0..order {
        let mut next = poly::multiply(&q, &inner_derivative);
        for (k, c) in poly::derivative(&q).into_iter().enumerate() {
            next[k] += c;
        }
        q = next;
    }
    q
}

impl ContinuousWavelet {
    pub fn is_complex(&self) -> bool {
        matches!(
            self,
            ContinuousWavelet::Cgau(_)
                | ContinuousWavelet::Cmor { .. }
                | ContinuousWavelet::Shan { .. }
                | ContinuousWavelet::Fbsp { .. }
        )
    }

    /// Effective support the wavelet is sampled on.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            ContinuousWavelet::Cmor { .. } => (-8.0, 8.0),
            ContinuousWavelet::Shan { .. } | ContinuousWavelet::Fbsp { .. } => (-20.0, 20.0),
            _ => (-5.0, 5.0),
        }
    }

    /// Evaluates the (unnormalized) wavelet at the given positions.
    pub fn evaluate(&self, xs: &[f64]) -> Vec<Complex64> {
        match *self {
            ContinuousWavelet::Gaus(order) => {
                let sign = if order % 2 == 0 { 1.0 } else { -1.0 };
                xs.iter()
                    .map(|&x| Complex64::new(sign * hermite(order, x) * (-x * x).exp(), 0.0))
                    .collect()
            }
            ContinuousWavelet::Mexh => {
                let scale = 2.0 / (3f64.sqrt() * PI.powf(0.25));
                xs.iter()
                    .map(|&x| Complex64::new(scale * (1.0 - x * x) * (-x * x / 2.0).exp(), 0.0))
                    .collect()
            }
            ContinuousWavelet::Morl => xs
                .iter()
                .map(|&x| Complex64::new((-x * x / 2.0).exp() * (5.0 * x).cos(), 0.0))
                .collect(),
            ContinuousWavelet::Cgau(order) => {
                let factor = complex_gaussian_factor(order);
                xs.iter()
                    .map(|&x| {
                        let z = Complex64::new(x, 0.0);
                        poly::evaluate(&factor, z) * Complex64::new(-x * x, -x).exp()
                    })
                    .collect()
            }
            ContinuousWavelet::Cmor { bandwidth, center } => xs
                .iter()
                .map(|&x| {
                    let envelope = (-x * x / bandwidth).exp() / (PI * bandwidth).sqrt();
                    Complex64::from_polar(envelope, 2.0 * PI * center * x)
                })
                .collect(),
            ContinuousWavelet::Shan { bandwidth, center } => xs
                .iter()
                .map(|&x| {
                    let envelope = bandwidth.sqrt() * sinc(bandwidth * x);
                    Complex64::from_polar(envelope, 2.0 * PI * center * x)
                })
                .collect(),
            ContinuousWavelet::Fbsp {
                order,
                bandwidth,
                center,
            } => xs
                .iter()
                .map(|&x| {
                    let envelope =
                        bandwidth.sqrt() * sinc(bandwidth * x / order as f64).powi(order as i32);
                    Complex64::from_polar(envelope, 2.0 * PI * center * x)
                })
                .collect(),
        }
    }

    /// Square kernels of the given size for the scales `1..=num_scales`.
    /// Every scale gives the real part, complex wavelets additionally the imaginary part.
    pub fn kernels(&self, size: usize, num_scales: usize) -> FilterResult<Vec<FilterKernel>> {
        check_filter_size(size)?;
        let (lower, upper) = self.bounds();
        let grid = Array1::linspace(lower, upper, size);

        let mut kernels = Vec::with_capacity(num_scales * 2);
        for scale in 1..=num_scales {
            let xs: Vec<f64> = grid.iter().map(|x| x / scale as f64).collect();
            let mut profile = self.evaluate(&xs);
            let norm = profile.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
            if norm > 0.0 {
                profile.iter_mut().for_each(|c| *c /= norm);
            }
            let outer = Array2::from_shape_fn((size, size), |(i, j)| profile[i] * profile[j]);

            kernels.push(plane_kernel(outer.mapv(|c| c.re)));
            if self.is_complex() {
                kernels.push(plane_kernel(outer.mapv(|c| c.im)));
            }
        }
        Ok(kernels)
    }
}

fn plane_kernel(plane: Array2<f64>) -> FilterKernel {
    let (h, w) = plane.dim();
    Array4::from_shape_fn((1, 1, h, w), |(_, _, i, j)| plane[[i, j]] as FilterPrecision)
}

/// Parses `B-C` into bandwidth and center frequency.
fn parse_bandwidth_center(name: &str, params: &str) -> FilterResult<(f64, f64)> {
    let unknown = || FilterError::UnknownWavelet(name.to_string());
    let mut parts = params.splitn(2, '-');
    let bandwidth = parts.next().and_then(|p| p.parse().ok()).ok_or_else(unknown)?;
    let center = parts.next().and_then(|p| p.parse().ok()).ok_or_else(unknown)?;
    Ok((bandwidth, center))
}

fn parse_order(name: &str, order: &str) -> FilterResult<u32> {
    match order.parse() {
        Ok(p) if (1..=MAX_GAUSSIAN_ORDER).contains(&p) => Ok(p),
        _ => Err(FilterError::UnknownWavelet(name.to_string())),
    }
}

impl FromStr for ContinuousWavelet {
    type Err = FilterError;

    fn from_str(name: &str) -> FilterResult<Self> {
        let unknown = || FilterError::UnknownWavelet(name.to_string());
        match name {
            "mexh" => return Ok(ContinuousWavelet::Mexh),
            "morl" => return Ok(ContinuousWavelet::Morl),
            _ => {}
        }
        if let Some(order) = name.strip_prefix("gaus") {
            Ok(ContinuousWavelet::Gaus(parse_order(name, order)?))
        } else if let Some(order) = name.strip_prefix("cgau") {
            Ok(ContinuousWavelet::Cgau(parse_order(name, order)?))
        } else if let Some(params) = name.strip_prefix("cmor") {
            let (bandwidth, center) = parse_bandwidth_center(name, params)?;
            Ok(ContinuousWavelet::Cmor { bandwidth, center })
        } else if let Some(params) = name.strip_prefix("shan") {
            let (bandwidth, center) = parse_bandwidth_center(name, params)?;
            Ok(ContinuousWavelet::Shan { bandwidth, center })
        } else if let Some(params) = name.strip_prefix("fbsp") {
            let mut parts = params.splitn(2, '-');
            let order: u32 = parts
                .next()
                .and_then(|p| p.parse().ok())
                .filter(|&m| m > 0)
                .ok_or_else(unknown)?;
            let (bandwidth, center) = parse_bandwidth_center(name, parts.next().unwrap_or(""))?;
            Ok(ContinuousWavelet::Fbsp {
                order,
                bandwidth,
                center,
            })
        } else {
            Err(unknown())
        }
    }
}

impl Display for ContinuousWavelet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContinuousWavelet::Gaus(p) => write!(f, "gaus{}", p),
            ContinuousWavelet::Mexh => write!(f, "mexh"),
            ContinuousWavelet::Morl => write!(f, "morl"),
            ContinuousWavelet::Cgau(p) => write!(f, "cgau{}", p),
            ContinuousWavelet::Cmor { bandwidth, center } => {
                write!(f, "cmor{:?}-{:?}", bandwidth, center)
            }
            ContinuousWavelet::Shan { bandwidth, center } => {
                write!(f, "shan{:?}-{:?}", bandwidth, center)
            }
            ContinuousWavelet::Fbsp {
                order,
                bandwidth,
                center,
            } => write!(f, "fbsp{}-{:?}-{:?}", order, bandwidth, center),
        }
    }
}
