use crate::{ImagePrecision, ModelError, ModelResult, WeightPrecision};
use ndarray::*;

/// Rust implementation of a trainable convolutional layer.
/// The weight matrix has dimension (in that order)
/// output channels x input channels x kernel height x kernel width
/// (to comply with the order in which pytorch weights are saved).
#[derive(Debug, Clone, PartialEq)]
pub struct ConvolutionLayer {
    /// Weight matrix of the kernel
    weight: Array4<WeightPrecision>,
    /// One entry per output channel
    bias: Option<Array1<WeightPrecision>>,
    stride: usize,
    padding: usize,
}

impl ConvolutionLayer {
    pub fn new(
        weight: Array4<WeightPrecision>,
        bias: Option<Array1<WeightPrecision>>,
        stride: usize,
        padding: usize,
    ) -> ModelResult<ConvolutionLayer> {
        if stride == 0 {
            return Err(ModelError::InvalidInput("Stride of 0 passed".to_string()));
        }
        if let Some(b) = &bias {
            if b.len() != weight.len_of(Axis(0)) {
                return Err(ModelError::ShapeMismatch {
                    expected: format!("[{}]", weight.len_of(Axis(0))),
                    found: b.shape().to_vec(),
                });
            }
        }
        Ok(ConvolutionLayer {
            weight,
            bias,
            stride,
            padding,
        })
    }

    /// Layer with zero weights and no bias, to be filled by an initializer or the synthesizer.
    pub fn zeros(
        out_channels: usize,
        in_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
    ) -> ModelResult<ConvolutionLayer> {
        ConvolutionLayer::new(
            Array4::zeros((out_channels, in_channels, kernel_size, kernel_size)),
            None,
            stride,
            padding,
        )
    }

    pub fn weight(&self) -> &Array4<WeightPrecision> {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Array1<WeightPrecision>> {
        self.bias.as_ref()
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn out_channels(&self) -> usize {
        self.weight.len_of(Axis(0))
    }

    pub fn in_channels(&self) -> usize {
        self.weight.len_of(Axis(1))
    }

    /// Replaces the weight. Bias, stride and padding stay as they are.
    /// The new weight must have the shape of the old one.
    pub fn replace_weight(&mut self, weight: Array4<WeightPrecision>) -> ModelResult<()> {
        if weight.shape() != self.weight.shape() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{:?}", self.weight.shape()),
                found: weight.shape().to_vec(),
            });
        }
        self.weight = weight;
        Ok(())
    }

    /// Convolves a batch of images of shape (batch, channels, height, width).
    pub fn convolve(
        &self,
        images: &Array4<ImagePrecision>,
    ) -> ModelResult<Array4<ImagePrecision>> {
        let mut output = conv_2d_batch(images.view(), self.weight.view(), self.stride, self.padding)?;
        if let Some(bias) = &self.bias {
            for (mut channel, b) in output.axis_iter_mut(Axis(1)).zip(bias.iter()) {
                channel += *b;
            }
        }
        Ok(output)
    }
}

/// Zero pads the two spatial axes of a (channels, height, width) image on every side.
fn pad_image(image: ArrayView3<ImagePrecision>, padding: usize) -> Array3<ImagePrecision> {
    let (channels, height, width) = image.dim();
    let mut padded = Array3::zeros((channels, height + 2 * padding, width + 2 * padding));
    padded
        .slice_mut(s![.., padding..padding + height, padding..padding + width])
        .assign(&image);
    padded
}

/// Rearranges every (channels, kernel_height, kernel_width) patch of the image into a row.
/// Read more here:
/// https://leonardoaraujosantos.gitbook.io/artificial-inteligence/machine_learning/deep_learning/convolution_layer/making_faster
fn im2col(
    image: ArrayView3<ImagePrecision>,
    kernel_height: usize,
    kernel_width: usize,
    stride: usize,
) -> Array2<ImagePrecision> {
    let (channels, height, width) = image.dim();
    let new_h = (height - kernel_height) / stride + 1;
    let new_w = (width - kernel_width) / stride + 1;
    let mut img_matrix: Array2<ImagePrecision> =
        Array::zeros((new_h * new_w, channels * kernel_height * kernel_width));

    let mut row = 0;
    for i in 0..new_h {
        let top = i * stride;
        for j in 0..new_w {
            let left = j * stride;
            let patch = image.slice(s![.., top..top + kernel_height, left..left + kernel_width]);
            img_matrix
                .row_mut(row)
                .iter_mut()
                .zip(patch.iter())
                .for_each(|(target, value)| *target = *value);
            row += 1;
        }
    }
    img_matrix
}

/// 2D convolution (cross correlation, like pytorch) of a (channels, height, width) image with
/// a (filters, channels, kernel_height, kernel_width) kernel.
/// Returns an array of shape (filters, new_height, new_width) with
/// new_h = (H + 2 * P - KH) / S + 1.
pub fn conv_2d(
    image: ArrayView3<ImagePrecision>,
    kernel: ArrayView4<WeightPrecision>,
    stride: usize,
    padding: usize,
) -> ModelResult<Array3<ImagePrecision>> {
    let (filters, kernel_channels, kernel_height, kernel_width) = kernel.dim();
    let (channels, height, width) = image.dim();
    if kernel_channels != channels {
        return Err(ModelError::InvalidInput(format!(
            "Kernel expects {} channels, image has {}",
            kernel_channels, channels
        )));
    }
    if stride == 0 {
        return Err(ModelError::InvalidInput("Stride of 0 passed".to_string()));
    }
    let (padded_h, padded_w) = (height + 2 * padding, width + 2 * padding);
    if padded_h < kernel_height || padded_w < kernel_width {
        return Err(ModelError::InvalidInput(format!(
            "Image of size {}x{} (padding {}) is smaller than the {}x{} kernel",
            height, width, padding, kernel_height, kernel_width
        )));
    }
    let new_h = (padded_h - kernel_height) / stride + 1;
    let new_w = (padded_w - kernel_width) / stride + 1;

    let im_col = if padding > 0 {
        im2col(pad_image(image, padding).view(), kernel_height, kernel_width, stride)
    } else {
        im2col(image, kernel_height, kernel_width, stride)
    };
    // weights.reshape(F, C*KH*KW)
    let kernel_col = Array2::from_shape_vec(
        (filters, channels * kernel_height * kernel_width),
        kernel.iter().cloned().collect(),
    )?;
    let activations = kernel_col.dot(&im_col.t());

    Ok(Array3::from_shape_fn((filters, new_h, new_w), |(f, i, j)| {
        activations[[f, i * new_w + j]]
    }))
}

/// [`conv_2d`] for every image of a (batch, channels, height, width) batch.
pub fn conv_2d_batch(
    images: ArrayView4<ImagePrecision>,
    kernel: ArrayView4<WeightPrecision>,
    stride: usize,
    padding: usize,
) -> ModelResult<Array4<ImagePrecision>> {
    let convolved = images
        .outer_iter()
        .map(|image| conv_2d(image, kernel, stride, padding))
        .collect::<ModelResult<Vec<_>>>()?;
    let views: Vec<ArrayView3<ImagePrecision>> = convolved.iter().map(|c| c.view()).collect();
    if views.is_empty() {
        return Err(ModelError::InvalidInput("Empty batch".to_string()));
    }
    Ok(stack(Axis(0), &views)?)
}
