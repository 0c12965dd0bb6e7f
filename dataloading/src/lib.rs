//! In-memory image preprocessing: dataset statistics presets, the train and test
//! transform pipelines and batch collation.
//!
//! Walking datasets on disk is left to the caller, the pipelines start from decoded images.
use ndarray::{stack, Array3, Array4, ArrayView3, Axis, ShapeError};
use thiserror::Error;

pub mod stats;
pub mod transforms;

pub use stats::{DatasetPreset, DatasetStats};
pub use transforms::{get_transform, split_transforms, SplitTransforms, Transform};

pub type ImagePrecision = f32;

pub type DataResult<T> = std::result::Result<T, DataError>;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Unknown dataset statistics {0}, choose one of {1:?}")]
    UnknownDatasetStats(String, Vec<&'static str>),
    #[error("Samples can not be batched:\n {0}.")]
    Collate(#[from] ShapeError),
}

/// Stacks equally sized (channels, height, width) samples into a
/// (batch, channels, height, width) array and collects their labels.
pub fn collate(
    samples: &[(Array3<ImagePrecision>, usize)],
) -> DataResult<(Array4<ImagePrecision>, Vec<usize>)> {
    let views: Vec<ArrayView3<ImagePrecision>> = samples.iter().map(|(x, _)| x.view()).collect();
    let batch = stack(Axis(0), &views)?;
    let labels = samples.iter().map(|(_, label)| *label).collect();
    Ok((batch, labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collate() {
        let samples = vec![
            (Array3::zeros((3, 4, 4)), 2),
            (Array3::ones((3, 4, 4)), 0),
        ];
        let (batch, labels) = collate(&samples).unwrap();
        assert_eq!(batch.shape(), &[2, 3, 4, 4]);
        assert_eq!(labels, vec![2, 0]);
        assert_eq!(batch[[1, 2, 3, 3]], 1.0);
    }

    #[test]
    fn test_collate_rejects_mismatched_samples() {
        let samples = vec![
            (Array3::zeros((3, 4, 4)), 0),
            (Array3::zeros((3, 5, 4)), 1),
        ];
        assert!(matches!(collate(&samples), Err(DataError::Collate(_))));
        assert!(collate(&[]).is_err());
    }
}
