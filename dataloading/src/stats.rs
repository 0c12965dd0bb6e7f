//! Per channel statistics of the datasets the models are trained on.
use crate::{DataError, DataResult};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Mean and standard deviation of the RGB channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetStats {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for DatasetStats {
    fn default() -> Self {
        DatasetPreset::Imgnet.stats()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetPreset {
    TinyImagenet,
    Imgnet,
}

impl DatasetPreset {
    pub const ALL: [DatasetPreset; 2] = [DatasetPreset::TinyImagenet, DatasetPreset::Imgnet];

    pub fn name(&self) -> &'static str {
        match self {
            DatasetPreset::TinyImagenet => "tiny-imagenet",
            DatasetPreset::Imgnet => "imgnet",
        }
    }

    pub fn stats(&self) -> DatasetStats {
        match self {
            DatasetPreset::TinyImagenet => DatasetStats {
                mean: [0.480, 0.448, 0.398],
                std: [0.272, 0.265, 0.274],
            },
            DatasetPreset::Imgnet => DatasetStats {
                mean: [0.485, 0.456, 0.406],
                std: [0.229, 0.224, 0.225],
            },
        }
    }
}

impl FromStr for DatasetPreset {
    type Err = DataError;

    fn from_str(name: &str) -> DataResult<Self> {
        DatasetPreset::ALL
            .iter()
            .copied()
            .find(|preset| preset.name() == name)
            .ok_or_else(|| {
                DataError::UnknownDatasetStats(
                    name.to_string(),
                    DatasetPreset::ALL.iter().map(|p| p.name()).collect(),
                )
            })
    }
}

impl Display for DatasetPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let tiny: DatasetPreset = "tiny-imagenet".parse().unwrap();
        assert_eq!(tiny.stats().mean, [0.480, 0.448, 0.398]);
        assert_eq!(tiny.stats().std, [0.272, 0.265, 0.274]);
        assert_eq!("imgnet".parse::<DatasetPreset>().unwrap().stats(), DatasetStats::default());
        assert_eq!(tiny.to_string(), "tiny-imagenet");
    }

    #[test]
    fn test_unknown_preset() {
        let err = "cifar10".parse::<DatasetPreset>().unwrap_err();
        assert!(matches!(&err, DataError::UnknownDatasetStats(name, _) if name == "cifar10"));
        assert!(err.to_string().contains("tiny-imagenet"));
    }
}
