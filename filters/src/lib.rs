//! Synthesis of the fixed filter kernels used by the vision front end.
//!
//! The crate knows three kinds of filters:
//! - oriented filters (curvature "banana" filters and Gabor filters), see [`oriented`],
//! - discrete wavelets (Daubechies, Symlets, Coiflets, biorthogonal splines, discrete Meyer),
//! - continuous wavelets sampled on a grid (Gaussian derivatives, Mexican hat, Morlet, ...).
//!
//! All kernels are returned as 4-dimensional arrays in Pytorch layout
//! (output channels x input channels x height x width), with a single input channel.
//!
//! Example:
//! ```
//! use filters::wavelets::{discrete_wavelet_family, DiscreteFamily};
//!
//! let kernels = discrete_wavelet_family(DiscreteFamily::Haar).unwrap();
//! // one approximation and one detail kernel
//! assert_eq!(kernels.len(), 2);
//! assert_eq!(kernels[0].shape(), &[1, 1, 2, 2]);
//! ```
use ndarray::Array4;
use thiserror::Error;

pub mod linalg;
pub mod oriented;
pub mod poly;
pub mod wavelets;

pub type FilterPrecision = f32;
pub type FilterKernel = Array4<FilterPrecision>;

pub type FilterResult<T> = Result<T, FilterError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Filter size {0} is too small, filters need to be at least 2 pixels wide")]
    InvalidFilterSize(usize),
    #[error("Unknown wavelet {0}")]
    UnknownWavelet(String),
    #[error("Construction of wavelet {name} did not converge (residual {residual:e})")]
    DidNotConverge { name: String, residual: f64 },
    #[error("Matrix decomposition failed: {0}")]
    Decomposition(&'static str),
}

/// Smallest kernel width the fixed convolution can use, its padding is `width / 2 - 1`.
pub const MIN_FILTER_SIZE: usize = 2;

pub(crate) fn check_filter_size(size: usize) -> FilterResult<()> {
    if size < MIN_FILTER_SIZE {
        return Err(FilterError::InvalidFilterSize(size));
    }
    Ok(())
}
