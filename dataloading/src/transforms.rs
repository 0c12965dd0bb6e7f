//! Image transform pipelines: resize, optional augmentation, conversion to a
//! (channels, height, width) array and per channel normalization.
use crate::stats::DatasetStats;
use crate::ImagePrecision;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use log::trace;
use ndarray::{Array3, Axis};
use nshare::ToNdarray3;
use rand::Rng;

pub const DEFAULT_IMAGE_SIZE: u32 = 64;
/// Augmented images are rotated by an angle drawn uniformly from +-10 degrees.
pub const MAX_ROTATION_DEGREES: f64 = 10.0;
pub const FLIP_PROBABILITY: f64 = 0.5;

/// Resizes the image so that its shorter edge equals `size`, keeping the aspect ratio.
/// Empty images are returned unchanged.
pub fn resize_shorter_edge(image: &RgbImage, size: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let short = width.min(height);
    if short == size || short == 0 {
        return image.clone();
    }
    let long = width.max(height);
    let new_long = (size as u64 * long as u64 / short as u64) as u32;
    let (new_width, new_height) = if width <= height {
        (size, new_long)
    } else {
        (new_long, size)
    };
    imageops::resize(image, new_width, new_height, FilterType::Triangle)
}

/// Flips the image horizontally with probability [`FLIP_PROBABILITY`].
pub fn random_horizontal_flip<R: Rng + ?Sized>(image: RgbImage, rng: &mut R) -> RgbImage {
    if rng.gen_bool(FLIP_PROBABILITY) {
        imageops::flip_horizontal(&image)
    } else {
        image
    }
}

/// Rotates the image counter-clockwise around its center by the given angle.
/// Pixels are sampled by nearest neighbour, uncovered areas are black.
pub fn rotate(image: &RgbImage, degrees: f64) -> RgbImage {
    let (width, height) = image.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let center_x = (width as f64 - 1.0) / 2.0;
    let center_y = (height as f64 - 1.0) / 2.0;

    RgbImage::from_fn(width, height, |x, y| {
        let dx = x as f64 - center_x;
        let dy = y as f64 - center_y;
        let source_x = (dx * cos - dy * sin + center_x).round();
        let source_y = (dx * sin + dy * cos + center_y).round();
        if source_x >= 0.0
            && source_y >= 0.0
            && source_x < width as f64
            && source_y < height as f64
        {
            *image.get_pixel(source_x as u32, source_y as u32)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Rotates by an angle drawn uniformly from [-MAX_ROTATION_DEGREES, MAX_ROTATION_DEGREES].
pub fn random_rotation<R: Rng + ?Sized>(image: &RgbImage, rng: &mut R) -> RgbImage {
    let degrees = rng.gen_range(-MAX_ROTATION_DEGREES..=MAX_ROTATION_DEGREES);
    trace!("Rotating by {:.2} degrees", degrees);
    rotate(image, degrees)
}

/// (channels, height, width) array scaled to [0, 1].
pub fn to_tensor(image: RgbImage) -> Array3<ImagePrecision> {
    image
        .into_ndarray3()
        .mapv(|x| x as ImagePrecision / 255.0)
}

/// Subtracts the mean and divides by the standard deviation of every channel.
pub fn normalize(mut tensor: Array3<ImagePrecision>, stats: &DatasetStats) -> Array3<ImagePrecision> {
    for (c, mut channel) in tensor.axis_iter_mut(Axis(0)).enumerate() {
        let (mean, std) = (stats.mean[c], stats.std[c]);
        channel.mapv_inplace(|v| (v - mean) / std);
    }
    tensor
}

/// A preprocessing pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    stats: DatasetStats,
    data_augment: bool,
    image_size: u32,
}

impl Transform {
    pub fn stats(&self) -> &DatasetStats {
        &self.stats
    }

    pub fn data_augment(&self) -> bool {
        self.data_augment
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Transforms the image into a normalized (3, height, width) array.
    /// The generator is only drawn from when augmenting.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        image: &DynamicImage,
        rng: &mut R,
    ) -> Array3<ImagePrecision> {
        let mut resized = resize_shorter_edge(&image.to_rgb8(), self.image_size);
        if self.data_augment {
            resized = random_horizontal_flip(resized, rng);
            resized = random_rotation(&resized, rng);
        }
        normalize(to_tensor(resized), &self.stats)
    }
}

/// Builds the preprocessing pipeline.
pub fn get_transform(stats: DatasetStats, data_augment: bool, image_size: u32) -> Transform {
    Transform {
        stats,
        data_augment,
        image_size,
    }
}

/// Pipelines for the training split (augmented) and the test split.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitTransforms {
    pub train: Transform,
    pub test: Transform,
}

pub fn split_transforms(stats: DatasetStats) -> SplitTransforms {
    SplitTransforms {
        train: get_transform(stats, true, DEFAULT_IMAGE_SIZE),
        test: get_transform(stats, false, DEFAULT_IMAGE_SIZE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::DatasetPreset;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gradient_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_resize_shorter_edge() {
        let image = gradient_image(100, 50);
        assert_eq!(resize_shorter_edge(&image, 64).dimensions(), (128, 64));
        let image = gradient_image(30, 45);
        assert_eq!(resize_shorter_edge(&image, 20).dimensions(), (20, 30));
        let image = gradient_image(64, 80);
        assert_eq!(resize_shorter_edge(&image, 64), image);
    }

    #[test]
    fn test_resize_empty_image() {
        assert_eq!(resize_shorter_edge(&RgbImage::new(0, 10), 8).dimensions(), (0, 10));
        assert_eq!(resize_shorter_edge(&RgbImage::new(12, 0), 8).dimensions(), (12, 0));
        assert_eq!(resize_shorter_edge(&RgbImage::new(0, 0), 8).dimensions(), (0, 0));
    }

    #[test]
    fn test_rotation() {
        let image = gradient_image(9, 6);
        assert_eq!(rotate(&image, 0.0), image);
        let flipped = imageops::flip_vertical(&imageops::flip_horizontal(&image));
        assert_eq!(rotate(&image, 180.0), flipped);
    }

    #[test]
    fn test_rotation_fills_corners() {
        let image = RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]));
        let rotated = rotate(&image, 10.0);
        assert_eq!(rotated.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(rotated.get_pixel(10, 10), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_quarter_turn_is_counter_clockwise() {
        // the top right pixel ends up at the top left
        let mut image = RgbImage::new(5, 5);
        image.put_pixel(4, 0, Rgb([255, 0, 0]));
        let rotated = rotate(&image, 90.0);
        assert_eq!(rotated.get_pixel(0, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_to_tensor_and_normalize() {
        let image = RgbImage::from_pixel(4, 3, Rgb([255, 0, 51]));
        let tensor = to_tensor(image);
        assert_eq!(tensor.shape(), &[3, 3, 4]);
        assert_eq!(tensor[[0, 2, 3]], 1.0);
        assert_eq!(tensor[[1, 0, 0]], 0.0);
        assert!((tensor[[2, 1, 1]] - 0.2).abs() < 1e-6);

        let stats = DatasetPreset::Imgnet.stats();
        let normalized = normalize(tensor, &stats);
        assert!((normalized[[0, 0, 0]] - (1.0 - 0.485) / 0.229).abs() < 1e-5);
        assert!((normalized[[1, 0, 0]] + 0.456 / 0.224).abs() < 1e-5);
    }

    #[test]
    fn test_pipeline_shapes() {
        let image = DynamicImage::ImageRgb8(gradient_image(100, 80));
        let transforms = split_transforms(DatasetPreset::TinyImagenet.stats());
        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(transforms.train.apply(&image, &mut rng).shape(), &[3, 64, 80]);
        assert_eq!(transforms.test.apply(&image, &mut rng).shape(), &[3, 64, 80]);
        assert!(transforms.train.data_augment() && !transforms.test.data_augment());
    }

    #[test]
    fn test_augmentation_is_seeded() {
        let image = DynamicImage::ImageRgb8(gradient_image(64, 64));
        let transform = get_transform(DatasetStats::default(), true, 64);
        let run = |seed| transform.apply(&image, &mut StdRng::seed_from_u64(seed));
        assert_eq!(run(1), run(1));

        // without augmentation the generator is irrelevant
        let plain = get_transform(DatasetStats::default(), false, 64);
        assert_eq!(
            plain.apply(&image, &mut StdRng::seed_from_u64(1)),
            plain.apply(&image, &mut StdRng::seed_from_u64(2))
        );
    }
}
