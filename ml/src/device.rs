//! Compute targets for filter banks and synthesized weights.
use crate::{ModelError, ModelResult};
use ndarray::{ArrayBase, ArrayView, Data, Dimension};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Where tensors live while they are convolved or synthesized.
/// Only the host is available, other names are rejected when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
}

impl Default for Device {
    fn default() -> Self {
        Device::Cpu
    }
}

impl Device {
    /// Makes the array available on this device.
    pub fn place<'a, S, D>(&self, array: &'a ArrayBase<S, D>) -> ArrayView<'a, S::Elem, D>
    where
        S: Data,
        D: Dimension,
    {
        match self {
            Device::Cpu => array.view(),
        }
    }
}

impl FromStr for Device {
    type Err = ModelError;

    fn from_str(name: &str) -> ModelResult<Self> {
        match name {
            "cpu" => Ok(Device::Cpu),
            _ => Err(ModelError::UnsupportedDevice(name.to_string())),
        }
    }
}

impl Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
        }
    }
}
