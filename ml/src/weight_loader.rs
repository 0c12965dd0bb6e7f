use crate::convolutions::ConvolutionLayer;
use crate::{ModelError, WeightPrecision};
use ndarray::{Array, ArrayBase, ArrayD, Data, Dimension, IxDyn, ShapeError, StrideShape};
use ndarray_npy::{NpzReader, NpzWriter, ReadNpzError, WriteNpzError};
use std::io::{Cursor, Read, Seek, Write};
use std::{fs::File, path::Path};
use thiserror::Error;

type WeightResult<T> = Result<T, WeightError>;

#[derive(Error, Debug)]
pub enum WeightError {
    #[error("No weights with name {0} found")]
    WeightKeyError(String),
    #[error("Weight file not found. Filesystem reported error\n {0}.")]
    WeightFileNotFoundError(#[from] std::io::Error),
    #[error("Weight file not readable. Filesystem reported error\n {0}.")]
    WeightFileNpzError(#[from] ReadNpzError),
    #[error("Weight file not writable. Filesystem reported error\n {0}.")]
    WeightFileNpzWriteError(#[from] WriteNpzError),
    #[error("Wrong shape for weight:\n {0}.")]
    WeightShapeError(#[from] ShapeError),
    #[error("Weight can not be used as a layer:\n {0}.")]
    WeightLayerError(#[from] ModelError),
}

pub trait WeightLoader {
    fn get_weight<D, Sh>(
        &mut self,
        param_name: &str,
        shape: Sh,
    ) -> WeightResult<Array<WeightPrecision, D>>
    where
        D: Dimension,
        Sh: Into<StrideShape<D>>;

    /// Returns the weight with the given name in whatever shape it was stored.
    fn get_dyn_weight(&mut self, param_name: &str) -> WeightResult<ArrayD<WeightPrecision>>;

    /// Names of all stored weights.
    fn names(&mut self) -> WeightResult<Vec<String>>;
}

pub struct NpzWeightLoader<R>
where
    R: Seek + Read,
{
    handle: R,
}

impl NpzWeightLoader<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> WeightResult<NpzWeightLoader<File>> {
        let handle = File::open(path)?;
        Ok(NpzWeightLoader { handle })
    }
}

impl<'a> NpzWeightLoader<Cursor<&'a [u8]>> {
    pub fn from_buffer(bytes_array: &'a [u8]) -> WeightResult<NpzWeightLoader<Cursor<&'a [u8]>>> {
        Ok(NpzWeightLoader {
            handle: Cursor::new(bytes_array),
        })
    }
}

impl<R> NpzWeightLoader<R>
where
    R: Seek + Read,
{
    /// npz archives store their arrays under `<name>.npy`, numpy accepts both spellings.
    fn find_name(&mut self, param_name: &str) -> WeightResult<String> {
        let with_suffix = format!("{}.npy", param_name);
        self.names()?
            .into_iter()
            .find(|name| name == param_name || *name == with_suffix)
            .ok_or_else(|| WeightError::WeightKeyError(param_name.to_string()))
    }

    /// Builds a stride 1 convolution layer without bias from the stored
    /// (out, in, kernel height, kernel width) weight.
    pub fn conv_layer(&mut self, param_name: &str, padding: usize) -> WeightResult<ConvolutionLayer> {
        let weight = self
            .get_dyn_weight(param_name)?
            .into_dimensionality::<ndarray::Ix4>()?;
        Ok(ConvolutionLayer::new(weight, None, 1, padding)?)
    }
}

impl<R> WeightLoader for NpzWeightLoader<R>
where
    R: Seek + Read,
{
    fn get_weight<D, Sh>(
        &mut self,
        param_name: &str,
        shape: Sh,
    ) -> WeightResult<Array<WeightPrecision, D>>
    where
        D: Dimension,
        Sh: Into<StrideShape<D>>,
    {
        let arr = self.get_dyn_weight(param_name)?;
        let shape = shape.into();
        let arr = arr.into_dimensionality::<D>()?;
        if arr.raw_dim() != *shape.raw_dim() {
            return Err(ShapeError::from_kind(ndarray::ErrorKind::IncompatibleShape).into());
        }
        Ok(arr)
    }

    fn get_dyn_weight(&mut self, param_name: &str) -> WeightResult<ArrayD<WeightPrecision>> {
        let name = self.find_name(param_name)?;
        // The reader has to be mut and borrows the handle, so we recreate it on every access.
        let mut reader = NpzReader::new(&mut self.handle)?;
        let arr: ArrayBase<_, IxDyn> = reader.by_name(&name)?;
        Ok(arr)
    }

    fn names(&mut self) -> WeightResult<Vec<String>> {
        let mut reader = NpzReader::new(&mut self.handle)?;
        Ok(reader.names()?)
    }
}

/// Writes the named arrays into an npz archive.
pub fn write_npz<W, S, D>(writer: W, arrays: &[(String, ArrayBase<S, D>)]) -> WeightResult<W>
where
    W: Write + Seek,
    S: Data<Elem = WeightPrecision>,
    D: Dimension,
{
    let mut npz = NpzWriter::new(writer);
    for (name, array) in arrays {
        npz.add_array(name.as_str(), array)?;
    }
    Ok(npz.finish()?)
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;
    use ndarray::{array, Array1, Array2, Array4};
    use tempfile::tempdir;

    #[test]
    fn test_npz_weight_loader() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("temp-weights.npz");
        let file = File::create(&file_path).unwrap();
        let mut npz = NpzWriter::new(file);
        let a: Array2<f32> = array![[1., 2., 3.], [4., 5., 6.]];
        let b: Array1<f32> = array![7., 8., 9.];
        npz.add_array("a", &a).unwrap();
        npz.add_array("b", &b).unwrap();
        npz.finish().unwrap();

        let mut loader = NpzWeightLoader::from_path(&file_path).unwrap();

        assert_eq!(loader.get_weight("a", (2, 3)).unwrap(), a);
        assert_eq!(loader.get_weight("b", 3).unwrap(), b);
        assert_eq!(loader.get_dyn_weight("b").unwrap().shape(), &[3]);
        assert!(loader.get_weight::<ndarray::Ix2, _>("a", (3, 2)).is_err());
        assert!(matches!(
            loader.get_dyn_weight("c"),
            Err(WeightError::WeightKeyError(_))
        ));

        dir.close().unwrap();
    }

    #[test]
    fn test_write_and_load_conv_layer() {
        let weight = Array4::from_shape_fn((4, 2, 3, 3), |(o, i, h, w)| (o + i + h * w) as f32);
        let buffer = write_npz(
            Cursor::new(Vec::new()),
            &[("features.conv1.weight".to_string(), weight.clone())],
        )
        .unwrap()
        .into_inner();

        let mut loader = NpzWeightLoader::from_buffer(&buffer).unwrap();
        assert_eq!(loader.names().unwrap().len(), 1);
        let layer = loader.conv_layer("features.conv1.weight", 1).unwrap();
        assert_eq!(layer.weight(), &weight);
        assert_eq!((layer.stride(), layer.padding()), (1, 1));
        assert!(layer.bias().is_none());
    }

    #[test]
    fn test_conv_layer_needs_four_dimensions() {
        let buffer = write_npz(
            Cursor::new(Vec::new()),
            &[("fc.weight".to_string(), Array2::<f32>::zeros((3, 4)))],
        )
        .unwrap()
        .into_inner();
        let mut loader = NpzWeightLoader::from_buffer(&buffer).unwrap();
        assert!(matches!(
            loader.conv_layer("fc.weight", 0),
            Err(WeightError::WeightShapeError(_))
        ));
    }
}
