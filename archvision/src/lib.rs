//! Helpers shared by the archvision subcommands: reading inputs, preparing
//! layers and writing the results.
use dataloading::{collate, DataError, Transform};
use image::io::Reader as ImageReader;
use ml::convolutions::ConvolutionLayer;
use ml::filter_bank::FilterBank;
use ml::weight_loader::{write_npz, NpzWeightLoader, WeightError};
use ml::{ImagePrecision, ModelError, WeightPrecision};
use ndarray::{Array3, Array4};
use ndarray_npy::{read_npy, ReadNpyError};
use rand::Rng;
use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type CommandResult<T> = std::result::Result<T, CommandError>;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Image had unrecognized type {0:?}. Only .jpg, .png and .npy are supported.")]
    UnsupportedImageFormat(PathBuf),
    #[error("Pass either a weight shape or a weight file with the name of the weight")]
    MissingWeights,
    #[error("A convolution weight needs 4 dimensions (out, in, height, width), got {0:?}")]
    WeightShape(Vec<usize>),
    #[error("Could not read the image:\n {0}.")]
    Image(#[from] image::ImageError),
    #[error("Could not read the array:\n {0}.")]
    Npy(#[from] ReadNpyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Weight(#[from] WeightError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Images are run through the transform, `.npy` arrays of shape (channels, height, width)
/// are taken as already preprocessed.
fn load_image<R: Rng + ?Sized>(
    im_path: &Path,
    transform: &Transform,
    rng: &mut R,
) -> CommandResult<Array3<ImagePrecision>> {
    match im_path.extension().and_then(OsStr::to_str) {
        Some("npy") => Ok(read_npy(im_path)?),
        Some("png") | Some("jpg") | Some("jpeg") => {
            let decoded = ImageReader::open(im_path)?.decode()?;
            Ok(transform.apply(&decoded, rng))
        }
        _ => Err(CommandError::UnsupportedImageFormat(im_path.to_path_buf())),
    }
}

/// Returns the preprocessed (batch, channels, height, width) images, in the given order.
/// All images have to end up with the same size.
pub fn get_images<P: AsRef<Path>, R: Rng + ?Sized>(
    im_paths: &[P],
    transform: &Transform,
    rng: &mut R,
) -> CommandResult<Array4<ImagePrecision>> {
    let mut samples = Vec::with_capacity(im_paths.len());
    for (index, path) in im_paths.iter().enumerate() {
        samples.push((load_image(path.as_ref(), transform, rng)?, index));
    }
    let (batch, _) = collate(&samples)?;
    Ok(batch)
}

/// Returns the preprocessed (1, channels, height, width) image.
pub fn get_image<R: Rng + ?Sized>(
    im_path: &Path,
    transform: &Transform,
    rng: &mut R,
) -> CommandResult<Array4<ImagePrecision>> {
    get_images(&[im_path], transform, rng)
}

/// Either a zero weight layer of the given shape or the named weight of an npz file.
/// Stride 1 and no padding in both cases, the weight is all that gets replaced.
pub fn get_layer(
    shape: &[usize],
    weights: Option<&Path>,
    name: Option<&str>,
) -> CommandResult<ConvolutionLayer> {
    match (weights, name) {
        (Some(path), Some(name)) => Ok(NpzWeightLoader::from_path(path)?.conv_layer(name, 0)?),
        (None, _) if !shape.is_empty() => match *shape {
            [out, in_channels, kernel_h, kernel_w] => Ok(ConvolutionLayer::new(
                Array4::zeros((out, in_channels, kernel_h, kernel_w)),
                None,
                1,
                0,
            )?),
            _ => Err(CommandError::WeightShape(shape.to_vec())),
        },
        _ => Err(CommandError::MissingWeights),
    }
}

/// Writes every filter group under the name `group_<index>`.
pub fn save_filter_bank(bank: &FilterBank, path: &Path) -> CommandResult<()> {
    let arrays: Vec<(String, Array4<WeightPrecision>)> = bank
        .iter()
        .enumerate()
        .map(|(i, group)| (format!("group_{}", i), group.clone()))
        .collect();
    write_npz(File::create(path)?, &arrays)?;
    Ok(())
}

/// `<dir>/<stem><suffix>` next to the input, used when no output path is given.
pub fn default_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("output");
    input.with_file_name(format!("{}{}", stem, suffix))
}
