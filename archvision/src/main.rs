//! Command line interface to the fixed filter convolutions and the weight synthesis.

use archvision::{default_output, get_images, get_layer, save_filter_bank};
use dataloading::{get_transform, DatasetPreset};
use env_logger::Builder;
use log::info;
use ml::device::Device;
use ml::filter_types::{get_kernel_params, get_layer_size};
use ml::initialization::{initialize_conv_layer, Initialization};
use ml::wavelet_convolution::WaveletConvolution;
use ml::weight_synthesis::{change_weights, SpectrumMode};
use ndarray_npy::write_npy;
use quicli::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use structopt::StructOpt;

/// Prints the number of output channels a filter type produces for RGB input
#[derive(Debug, StructOpt)]
struct LayerSizeOpts {
    /// Filter type, e.g. gabor, curvature, db or morl
    filter_type: String,
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Writes the filter bank of a filter type to an npz file
#[derive(Debug, StructOpt)]
struct FiltersOpts {
    /// Filter type, e.g. gabor, curvature, db or morl
    filter_type: String,
    /// Filter width and height, discrete wavelets ignore it
    #[structopt(short = "s", long = "size", default_value = "7")]
    size: usize,
    /// Output path, writes to ./<filter_type>-filters.npz if not available
    #[structopt(short = "o", long = "output", parse(from_os_str))]
    output: Option<PathBuf>,
    /// Compute device
    #[structopt(long = "device", default_value = "cpu")]
    device: String,
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Convolves an image with the filter bank of a filter type
#[derive(Debug, StructOpt)]
struct ConvolveOpts {
    /// Path to the image (.png, .jpg, or a preprocessed .npy array)
    #[structopt(parse(from_os_str))]
    image: PathBuf,
    /// Filter type, e.g. gabor, curvature, db or morl
    filter_type: String,
    /// Further images convolved in the same batch, they have to preprocess to the same size
    #[structopt(long = "batch", parse(from_os_str))]
    batch: Vec<PathBuf>,
    /// Filter width and height, discrete wavelets ignore it
    #[structopt(short = "s", long = "size", default_value = "7")]
    size: usize,
    /// Dataset statistics used for normalization (tiny-imagenet or imgnet)
    #[structopt(long = "stats", default_value = "tiny-imagenet")]
    stats: String,
    /// Length of the shorter image edge after resizing
    #[structopt(long = "image-size", default_value = "64")]
    image_size: u32,
    /// Output path, writes to /path/to/image-<filter_type>.npy if not available
    #[structopt(short = "o", long = "output", parse(from_os_str))]
    output: Option<PathBuf>,
    /// Compute device
    #[structopt(long = "device", default_value = "cpu")]
    device: String,
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Replaces convolution weights with power law or initialization noise
#[derive(Debug, StructOpt)]
struct SynthesizeOpts {
    /// Output path of the .npy weight
    #[structopt(short = "o", long = "output", parse(from_os_str))]
    output: PathBuf,
    /// Weight shape: out channels, in channels, kernel height, kernel width
    #[structopt(long = "shape")]
    shape: Vec<usize>,
    /// npz file holding the weight to replace
    #[structopt(long = "weights", parse(from_os_str))]
    weights: Option<PathBuf>,
    /// Name of the weight inside the npz file
    #[structopt(long = "name")]
    name: Option<String>,
    /// Impose the spectrum through the singular values instead of the covariance
    #[structopt(long = "svd")]
    svd: bool,
    /// Use a standard initialization scheme instead of the power law, e.g. kaiming_normal
    #[structopt(long = "init")]
    init: Option<String>,
    /// Seed of the random generator
    #[structopt(long = "seed")]
    seed: Option<u64>,
    /// Compute device
    #[structopt(long = "device", default_value = "cpu")]
    device: String,
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Fixed filter banks and structured weights for vision models.
#[derive(Debug, StructOpt)]
#[structopt(name = "archvision")]
enum Archvision {
    #[structopt(
        name = "layer-size",
        about = "Prints the number of output channels of a filter type for RGB input."
    )]
    LayerSize(LayerSizeOpts),
    #[structopt(name = "filters", about = "Writes the filter bank of a filter type to npz.")]
    Filters(FiltersOpts),
    #[structopt(
        name = "convolve",
        about = "Convolves an image with a fixed filter bank and writes the feature maps to npy."
    )]
    Convolve(ConvolveOpts),
    #[structopt(
        name = "synthesize",
        about = "Synthesizes convolution weights with a power law spectrum."
    )]
    Synthesize(SynthesizeOpts),
}

/// Trait for the subcommands that archvision uses
trait ArchvisionOpts {
    /// Performs the subcommand
    fn run(&self) -> CliResult;
    /// Returns the verbosity command
    fn get_verbosity(&self) -> &Verbosity;
    /// Sets up logging
    fn setup_env_logger(&self) -> CliResult {
        let mut builder = Builder::from_default_env();

        builder
            .filter(None, self.get_verbosity().log_level().to_level_filter())
            .init();

        Ok(())
    }
}

impl ArchvisionOpts for LayerSizeOpts {
    fn run(&self) -> CliResult {
        let params = get_kernel_params(&self.filter_type)?;
        let layer_size = get_layer_size(&self.filter_type, &params)?;
        info!("{} uses the parameters {}", self.filter_type, params);
        println!("{}", layer_size);
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl ArchvisionOpts for FiltersOpts {
    fn run(&self) -> CliResult {
        let device: Device = self.device.parse()?;
        let module = WaveletConvolution::new(&self.filter_type, self.size, device)?;
        let output = match &self.output {
            Some(p) => p.clone(),
            None => PathBuf::from(format!("{}-filters.npz", self.filter_type)),
        };
        save_filter_bank(module.filters(), &output)?;
        info!(
            "Wrote {} filter groups ({}) to {:?}",
            module.filters().len(),
            module,
            output
        );
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl ArchvisionOpts for ConvolveOpts {
    fn run(&self) -> CliResult {
        let device: Device = self.device.parse()?;
        let stats = self.stats.parse::<DatasetPreset>()?.stats();
        let transform = get_transform(stats, false, self.image_size);
        // the test transform never draws from the generator
        let mut rng = StdRng::seed_from_u64(0);
        let paths: Vec<&PathBuf> = std::iter::once(&self.image).chain(&self.batch).collect();
        let images = get_images(&paths, &transform, &mut rng)?;

        let module = WaveletConvolution::new(&self.filter_type, self.size, device)?;
        let feature_maps = module.forward(&images)?;

        let output = match &self.output {
            Some(p) => p.clone(),
            None => default_output(&self.image, &format!("-{}.npy", self.filter_type)),
        };
        write_npy(&output, &feature_maps)?;
        info!("Wrote feature maps of shape {:?} to {:?}", feature_maps.shape(), output);
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl ArchvisionOpts for SynthesizeOpts {
    fn run(&self) -> CliResult {
        let device: Device = self.device.parse()?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut layer = get_layer(
            &self.shape,
            self.weights.as_deref(),
            self.name.as_deref(),
        )?;

        match &self.init {
            Some(init) => {
                let initialization: Initialization = init.parse()?;
                initialize_conv_layer(&mut layer, initialization, &mut rng)?;
            }
            None => {
                change_weights(&mut layer, SpectrumMode::from_svd_flag(self.svd), device, &mut rng)?;
            }
        }
        write_npy(&self.output, layer.weight())?;
        info!("Wrote weight of shape {:?} to {:?}", layer.weight().shape(), self.output);
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl ArchvisionOpts for Archvision {
    fn run(&self) -> CliResult {
        match self {
            Archvision::LayerSize(c) => c.run(),
            Archvision::Filters(c) => c.run(),
            Archvision::Convolve(c) => c.run(),
            Archvision::Synthesize(c) => c.run(),
        }
    }

    fn get_verbosity(&self) -> &Verbosity {
        match self {
            Archvision::LayerSize(c) => c.get_verbosity(),
            Archvision::Filters(c) => c.get_verbosity(),
            Archvision::Convolve(c) => c.get_verbosity(),
            Archvision::Synthesize(c) => c.get_verbosity(),
        }
    }
}

fn main() -> CliResult {
    let args = Archvision::from_args();
    args.setup_env_logger()?;
    args.run()
}
