//! Fixed filter convolutions and structured weight synthesis.
//!
//! The entry points are [`wavelet_convolution::WaveletConvolution`], which applies a
//! non-trainable filter bank to every input channel, and
//! [`weight_synthesis::change_weights`], which replaces the weights of a trainable
//! [`convolutions::ConvolutionLayer`] with power law noise.
pub mod convolutions;
pub mod device;
pub mod filter_bank;
pub mod filter_types;
pub mod initialization;
pub mod model_errors;
pub mod wavelet_convolution;
pub mod weight_loader;
pub mod weight_synthesis;

pub use model_errors::ModelError;

pub type WeightPrecision = f32;
pub type ImagePrecision = f32;

pub type ModelResult<T> = std::result::Result<T, ModelError>;
