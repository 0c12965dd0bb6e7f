//! Convolution with a fixed, non-trainable filter bank.
use crate::convolutions::conv_2d_batch;
use crate::device::Device;
use crate::filter_bank::{generate_filters, num_planes, FilterBank};
use crate::filter_types::{kernel_params, layer_size, FilterType, KernelParams};
use crate::{ImagePrecision, ModelResult};
use log::{debug, trace};
use ndarray::*;
use std::fmt::{self, Display};

/// Zero padding used for a filter of the given width. This is not "same" padding:
/// even widths shrink the image by one pixel, odd widths by two.
pub fn fixed_padding(filter_width: usize) -> usize {
    (filter_width / 2).saturating_sub(1)
}

/// Applies a fixed filter bank to every input channel independently and
/// concatenates the results along the channel axis.
///
/// The filter bank is built once on construction and reused for every forward pass.
#[derive(Debug, Clone)]
pub struct WaveletConvolution {
    filter_type: FilterType,
    filter_size: usize,
    filter_params: KernelParams,
    layer_size: usize,
    device: Device,
    filters: FilterBank,
}

impl WaveletConvolution {
    /// Creates the module for the filter type with the given name.
    pub fn new(filter_type: &str, filter_size: usize, device: Device) -> ModelResult<Self> {
        WaveletConvolution::with_filter_type(filter_type.parse()?, filter_size, device)
    }

    pub fn with_filter_type(
        filter_type: FilterType,
        filter_size: usize,
        device: Device,
    ) -> ModelResult<Self> {
        let filter_params = kernel_params(filter_type);
        let layer_size = layer_size(filter_type, &filter_params)?;
        let filters = generate_filters(filter_type, &filter_params, filter_size)?
            .iter()
            .map(|group| device.place(group).to_owned())
            .collect();
        debug!(
            "Created {} convolution with layer size {} on {}",
            filter_type, layer_size, device
        );
        Ok(WaveletConvolution {
            filter_type,
            filter_size,
            filter_params,
            layer_size,
            device,
            filters,
        })
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    pub fn filter_params(&self) -> &KernelParams {
        &self.filter_params
    }

    /// Number of output channels for RGB input.
    pub fn layer_size(&self) -> usize {
        self.layer_size
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn filters(&self) -> &FilterBank {
        &self.filters
    }

    /// Number of output channels for input with the given number of channels.
    pub fn output_channels(&self, in_channels: usize) -> usize {
        num_planes(&self.filters) * in_channels
    }

    /// Convolves a (batch, channels, height, width) input.
    ///
    /// The output channels are ordered by filter group first and input channel second:
    /// `[group0 x channel0, group0 x channel1, ..., group1 x channel0, ...]`,
    /// each group contributing all of its planes.
    pub fn forward(&self, x: &Array4<ImagePrecision>) -> ModelResult<Array4<ImagePrecision>> {
        let x = self.device.place(x);
        let in_channels = x.len_of(Axis(1));

        let mut convolved = Vec::with_capacity(self.filters.len() * in_channels);
        for group in &self.filters {
            let padding = fixed_padding(group.len_of(Axis(3)));
            for i in 0..in_channels {
                let channel_image = x.slice(s![.., i..i + 1, .., ..]);
                convolved.push(conv_2d_batch(channel_image, group.view(), 1, padding)?);
            }
        }
        let views: Vec<ArrayView4<ImagePrecision>> = convolved.iter().map(|c| c.view()).collect();
        let output = concatenate(Axis(1), &views)?;
        trace!("{} forward: {:?} -> {:?}", self.filter_type, x.shape(), output.shape());
        Ok(output)
    }
}

impl Display for WaveletConvolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "filter_size={}, filter_params:{}",
            self.filter_size, self.filter_params
        )
    }
}
