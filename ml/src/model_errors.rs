use filters::FilterError;
use ndarray::ShapeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unsupported kernel type: {0}")]
    UnsupportedKernelType(String),
    #[error("Invalid initialization type {requested}, choose one of {valid:?}")]
    InvalidInitialization {
        requested: String,
        valid: Vec<&'static str>,
    },
    #[error("Expected a weight of shape {expected}, found shape {found:?}")]
    ShapeMismatch { expected: String, found: Vec<usize> },
    #[error("Kernel parameters {params} can not be used for filter type {filter_type}")]
    KernelParamsMismatch { filter_type: String, params: String },
    #[error("Unsupported device {0}, only cpu is available")]
    UnsupportedDevice(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Could not build filters: {0}")]
    FilterError(#[from] FilterError),
    #[error("Wrong shape:\n {0}.")]
    WrongShape(#[from] ShapeError),
}
