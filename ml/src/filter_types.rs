//! Filter types, their kernel parameters and the number of channels they produce.
use crate::{ModelError, ModelResult};
use filters::oriented::{CurvatureParams, GaborParams};
use filters::wavelets::{ContinuousFamily, DiscreteFamily};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Fixed filters are replicated over the red, green and blue channel.
pub const RGB_CHANNELS: usize = 3;
/// Every discrete wavelet contributes an approximation and a detail filter.
pub const FILTERS_PER_DISCRETE_WAVELET: usize = 2;
pub const CONTINUOUS_NUM_SCALES: usize = 3;

/// Identifies a family of fixed filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    Curvature,
    Gabor,
    DiscreteWavelet(DiscreteFamily),
    ContinuousWavelet(ContinuousFamily),
}

impl FromStr for FilterType {
    type Err = ModelError;

    fn from_str(tag: &str) -> ModelResult<Self> {
        match tag {
            "curvature" => Ok(FilterType::Curvature),
            "gabor" => Ok(FilterType::Gabor),
            _ => DiscreteFamily::from_tag(tag)
                .map(FilterType::DiscreteWavelet)
                .or_else(|| ContinuousFamily::from_tag(tag).map(FilterType::ContinuousWavelet))
                .ok_or_else(|| ModelError::UnsupportedKernelType(tag.to_string())),
        }
    }
}

impl Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterType::Curvature => write!(f, "curvature"),
            FilterType::Gabor => write!(f, "gabor"),
            FilterType::DiscreteWavelet(family) => write!(f, "{}", family),
            FilterType::ContinuousWavelet(family) => write!(f, "{}", family),
        }
    }
}

/// Parameters of continuous wavelet banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuousParams {
    /// Every member is sampled at the scales 1..=num_scales
    pub num_scales: usize,
}

impl Default for ContinuousParams {
    fn default() -> Self {
        ContinuousParams {
            num_scales: CONTINUOUS_NUM_SCALES,
        }
    }
}

/// Parameters needed to build the filters of a filter type.
/// Discrete wavelets carry none, their names define the filters completely.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelParams {
    Curvature(CurvatureParams),
    Gabor(GaborParams),
    DiscreteWavelet,
    ContinuousWavelet(ContinuousParams),
}

impl Display for KernelParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelParams::Curvature(params) => write!(f, "{}", params),
            KernelParams::Gabor(params) => write!(f, "{}", params),
            KernelParams::DiscreteWavelet => write!(f, "None"),
            KernelParams::ContinuousWavelet(params) => {
                write!(f, "{{num_scales: {}}}", params.num_scales)
            }
        }
    }
}

/// Preset parameters of a filter type.
pub fn kernel_params(filter_type: FilterType) -> KernelParams {
    match filter_type {
        FilterType::Curvature => KernelParams::Curvature(CurvatureParams::default()),
        FilterType::Gabor => KernelParams::Gabor(GaborParams::default()),
        FilterType::DiscreteWavelet(_) => KernelParams::DiscreteWavelet,
        FilterType::ContinuousWavelet(_) => KernelParams::ContinuousWavelet(ContinuousParams::default()),
    }
}

/// Resolves the preset parameters of the filter type with the given name.
pub fn get_kernel_params(kernel_type: &str) -> ModelResult<KernelParams> {
    Ok(kernel_params(kernel_type.parse()?))
}

pub(crate) fn params_mismatch(filter_type: FilterType, params: &KernelParams) -> ModelError {
    ModelError::KernelParamsMismatch {
        filter_type: filter_type.to_string(),
        params: params.to_string(),
    }
}

/// Number of output channels a fixed filter convolution produces for RGB input,
/// computed without building any filter.
pub fn layer_size(filter_type: FilterType, params: &KernelParams) -> ModelResult<usize> {
    let filters_per_channel = match (filter_type, params) {
        (FilterType::Curvature, KernelParams::Curvature(p)) => {
            p.n_ories * p.n_curves * (p.gau_sizes.len() * p.spatial_fre.len())
        }
        (FilterType::Gabor, KernelParams::Gabor(p)) => p.n_ories * p.num_scales,
        (FilterType::DiscreteWavelet(family), KernelParams::DiscreteWavelet) => {
            family.members().len() * FILTERS_PER_DISCRETE_WAVELET
        }
        (FilterType::ContinuousWavelet(family), KernelParams::ContinuousWavelet(p)) => {
            let parts = if family.is_complex() { 2 } else { 1 };
            family.members().len() * p.num_scales * parts
        }
        _ => return Err(params_mismatch(filter_type, params)),
    };
    Ok(filters_per_channel * RGB_CHANNELS)
}

/// [`layer_size`] for a filter type given by name.
pub fn get_layer_size(kernel_type: &str, params: &KernelParams) -> ModelResult<usize> {
    layer_size(kernel_type.parse()?, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter_types() {
        assert_eq!("curvature".parse::<FilterType>().unwrap(), FilterType::Curvature);
        assert_eq!(
            "db".parse::<FilterType>().unwrap(),
            FilterType::DiscreteWavelet(DiscreteFamily::Db)
        );
        assert_eq!(
            "mexh".parse::<FilterType>().unwrap(),
            FilterType::ContinuousWavelet(ContinuousFamily::Mexh)
        );
        for tag in &["curvature", "gabor", "bior", "dmey", "sym", "cmor", "gaus"] {
            assert_eq!(&tag.parse::<FilterType>().unwrap().to_string(), tag);
        }
    }

    #[test]
    fn test_gabor_layer_size() {
        let params = get_kernel_params("gabor").unwrap();
        assert_eq!(
            params,
            KernelParams::Gabor(GaborParams {
                n_ories: 12,
                num_scales: 3
            })
        );
        assert_eq!(get_layer_size("gabor", &params).unwrap(), 108);
    }

    #[test]
    fn test_curvature_layer_size() {
        let params = get_kernel_params("curvature").unwrap();
        assert_eq!(
            params,
            KernelParams::Curvature(CurvatureParams {
                n_ories: 12,
                n_curves: 3,
                gau_sizes: vec![5.0],
                spatial_fre: vec![1.2],
            })
        );
        assert_eq!(get_layer_size("curvature", &params).unwrap(), 108);
    }

    #[test]
    fn test_wavelet_layer_sizes() {
        let size = |tag: &str| get_layer_size(tag, &get_kernel_params(tag).unwrap()).unwrap();
        assert_eq!(size("haar"), 6);
        assert_eq!(size("db"), 38 * 2 * 3);
        assert_eq!(size("bior"), 15 * 2 * 3);
        assert_eq!(size("rbio"), 90);
        assert_eq!(size("coif"), 17 * 2 * 3);
        assert_eq!(size("sym"), 19 * 2 * 3);
        assert_eq!(size("mexh"), 3 * 3);
        assert_eq!(size("cgau"), 8 * 3 * 2 * 3);
    }

    #[test]
    fn test_unsupported_kernel_type() {
        for tag in &["", "Gabor", "wavelet", "db4", "curvatures"] {
            assert!(matches!(
                get_kernel_params(tag),
                Err(ModelError::UnsupportedKernelType(t)) if &t == tag
            ));
            assert!(matches!(
                get_layer_size(tag, &KernelParams::DiscreteWavelet),
                Err(ModelError::UnsupportedKernelType(t)) if &t == tag
            ));
        }
        let message = get_kernel_params("lanczos").unwrap_err().to_string();
        assert!(message.contains("lanczos"));
    }

    #[test]
    fn test_params_mismatch() {
        assert!(matches!(
            get_layer_size("gabor", &KernelParams::DiscreteWavelet),
            Err(ModelError::KernelParamsMismatch { .. })
        ));
    }

    #[test]
    fn test_params_display() {
        assert_eq!(
            get_kernel_params("gabor").unwrap().to_string(),
            "{n_ories: 12, num_scales: 3}"
        );
        assert_eq!(get_kernel_params("coif").unwrap().to_string(), "None");
    }
}
