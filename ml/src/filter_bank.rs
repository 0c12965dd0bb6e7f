//! Builds the fixed filters of a filter type.
use crate::filter_types::{params_mismatch, FilterType, KernelParams};
use crate::ModelResult;
use filters::oriented::{curvature_filters, gabor_filters};
use filters::wavelets::{continuous_wavelet_family, discrete_wavelet_family};
use filters::{FilterError, FilterKernel, MIN_FILTER_SIZE};
use log::debug;
use ndarray::Axis;

/// Ordered filter groups. Each group has shape (planes, 1, height, width) and is applied
/// to every input channel on its own.
pub type FilterBank = Vec<FilterKernel>;

/// Generates the filter bank of the given filter type.
///
/// Curvature and Gabor filters come as a single group containing all planes,
/// wavelet families as one group per filter (and scale).
/// Discrete wavelets have their own, fixed sizes and ignore `filter_size`.
pub fn generate_filters(
    filter_type: FilterType,
    params: &KernelParams,
    filter_size: usize,
) -> ModelResult<FilterBank> {
    if filter_size < MIN_FILTER_SIZE {
        return Err(FilterError::InvalidFilterSize(filter_size).into());
    }
    let bank = match (filter_type, params) {
        (FilterType::Curvature, KernelParams::Curvature(p)) => {
            vec![curvature_filters(filter_size, p)?]
        }
        (FilterType::Gabor, KernelParams::Gabor(p)) => vec![gabor_filters(filter_size, p)?],
        (FilterType::DiscreteWavelet(family), KernelParams::DiscreteWavelet) => {
            discrete_wavelet_family(family)?
        }
        (FilterType::ContinuousWavelet(family), KernelParams::ContinuousWavelet(p)) => {
            continuous_wavelet_family(family, filter_size, p.num_scales)?
        }
        _ => return Err(params_mismatch(filter_type, params)),
    };
    debug!(
        "Generated {} filter groups with {} planes for {} (size {})",
        bank.len(),
        num_planes(&bank),
        filter_type,
        filter_size
    );
    Ok(bank)
}

/// Total number of filter planes, i.e. output channels per input channel.
pub fn num_planes(bank: &[FilterKernel]) -> usize {
    bank.iter().map(|group| group.len_of(Axis(0))).sum()
}
