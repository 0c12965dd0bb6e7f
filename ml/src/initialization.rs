//! Standard weight initialization schemes for convolution layers,
//! with the same defaults as pytorch's `torch.nn.init`.
use crate::convolutions::ConvolutionLayer;
use crate::{ModelError, ModelResult, WeightPrecision};
use filters::linalg::qr;
use log::debug;
use ndarray::*;
use ndarray_rand::rand_distr::{StandardNormal, Uniform};
use ndarray_rand::RandomExt;
use rand::Rng;
use std::fmt::{self, Display};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialization {
    KaimingUniform,
    KaimingNormal,
    Orthogonal,
    XavierUniform,
    XavierNormal,
    Uniform,
    Normal,
}

impl Initialization {
    pub const ALL: [Initialization; 7] = [
        Initialization::KaimingUniform,
        Initialization::KaimingNormal,
        Initialization::Orthogonal,
        Initialization::XavierUniform,
        Initialization::XavierNormal,
        Initialization::Uniform,
        Initialization::Normal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Initialization::KaimingUniform => "kaiming_uniform",
            Initialization::KaimingNormal => "kaiming_normal",
            Initialization::Orthogonal => "orthogonal",
            Initialization::XavierUniform => "xavier_uniform",
            Initialization::XavierNormal => "xavier_normal",
            Initialization::Uniform => "uniform",
            Initialization::Normal => "normal",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Initialization::ALL.iter().map(|i| i.name()).collect()
    }
}

impl FromStr for Initialization {
    type Err = ModelError;

    fn from_str(name: &str) -> ModelResult<Self> {
        Initialization::ALL
            .iter()
            .copied()
            .find(|i| i.name() == name)
            .ok_or_else(|| ModelError::InvalidInitialization {
                requested: name.to_string(),
                valid: Initialization::names(),
            })
    }
}

impl Display for Initialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Gain of kaiming initialization for relu (negative slope 0).
const KAIMING_GAIN: f64 = std::f64::consts::SQRT_2;

/// (fan in, fan out) of a convolution weight.
fn fans(shape: (usize, usize, usize, usize)) -> (usize, usize) {
    let (out, in_channels, kernel_h, kernel_w) = shape;
    let receptive_field = kernel_h * kernel_w;
    (in_channels * receptive_field, out * receptive_field)
}

fn uniform_weights<R: Rng + ?Sized>(
    shape: (usize, usize, usize, usize),
    bound: f64,
    rng: &mut R,
) -> Array4<WeightPrecision> {
    let bound = bound as WeightPrecision;
    Array4::random_using(shape, Uniform::new(-bound, bound), rng)
}

fn normal_weights<R: Rng + ?Sized>(
    shape: (usize, usize, usize, usize),
    std: f64,
    rng: &mut R,
) -> Array4<WeightPrecision> {
    let std = std as WeightPrecision;
    Array4::<WeightPrecision>::random_using(shape, StandardNormal, rng).mapv(|v| v * std)
}

/// Semi-orthogonal weights: the (out, in * kh * kw) matrix has orthonormal rows or columns,
/// whichever is fewer.
fn orthogonal_weights<R: Rng + ?Sized>(
    shape: (usize, usize, usize, usize),
    rng: &mut R,
) -> ModelResult<Array4<WeightPrecision>> {
    let (out, in_channels, kernel_h, kernel_w) = shape;
    let (rows, cols) = (out, in_channels * kernel_h * kernel_w);
    let mut flattened: Array2<f64> = Array2::random_using((rows, cols), StandardNormal, rng);
    if rows < cols {
        flattened = flattened.reversed_axes();
    }
    let (mut q, r) = qr(&flattened);
    // make the decomposition unique
    for (j, mut column) in q.axis_iter_mut(Axis(1)).enumerate() {
        if r[[j, j]] < 0.0 {
            column.mapv_inplace(|v| -v);
        }
    }
    if rows < cols {
        q = q.reversed_axes();
    }
    Ok(Array4::from_shape_vec(
        shape,
        q.iter().map(|&v| v as WeightPrecision).collect(),
    )?)
}

/// Initial weights of the given (out, in, kernel height, kernel width) shape.
pub fn initial_weights<R: Rng + ?Sized>(
    shape: (usize, usize, usize, usize),
    initialization: Initialization,
    rng: &mut R,
) -> ModelResult<Array4<WeightPrecision>> {
    let (fan_in, fan_out) = fans(shape);
    if fan_in == 0 || fan_out == 0 {
        return Err(ModelError::InvalidInput(format!(
            "Can not initialize an empty weight of shape {:?}",
            shape
        )));
    }
    let weights = match initialization {
        Initialization::KaimingUniform => {
            uniform_weights(shape, KAIMING_GAIN * (3.0 / fan_in as f64).sqrt(), rng)
        }
        Initialization::KaimingNormal => {
            normal_weights(shape, KAIMING_GAIN / (fan_in as f64).sqrt(), rng)
        }
        Initialization::Orthogonal => orthogonal_weights(shape, rng)?,
        Initialization::XavierUniform => {
            uniform_weights(shape, (6.0 / (fan_in + fan_out) as f64).sqrt(), rng)
        }
        Initialization::XavierNormal => {
            normal_weights(shape, (2.0 / (fan_in + fan_out) as f64).sqrt(), rng)
        }
        Initialization::Uniform => Array4::random_using(shape, Uniform::new(0.0, 1.0), rng),
        Initialization::Normal => normal_weights(shape, 1.0, rng),
    };
    Ok(weights)
}

/// Replaces the weight of the layer using the given scheme.
pub fn initialize_conv_layer<R: Rng + ?Sized>(
    layer: &mut ConvolutionLayer,
    initialization: Initialization,
    rng: &mut R,
) -> ModelResult<()> {
    let weights = initial_weights(layer.weight().dim(), initialization, rng)?;
    layer.replace_weight(weights)?;
    debug!("Initialized {:?} weights with {}", layer.weight().shape(), initialization);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_initialization() {
        for init in Initialization::ALL.iter() {
            assert_eq!(init.name().parse::<Initialization>().unwrap(), *init);
        }
        let err = "he_normal".parse::<Initialization>().unwrap_err();
        assert!(matches!(
            &err,
            ModelError::InvalidInitialization { requested, valid }
                if requested == "he_normal" && valid.len() == 7
        ));
        let message = err.to_string();
        assert!(message.contains("kaiming_uniform") && message.contains("normal"));
    }

    #[test]
    fn test_uniform_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let shape = (16, 8, 3, 3);
        let fan_in = 8.0 * 9.0;
        let fan_out = 16.0 * 9.0;

        let kaiming = initial_weights(shape, Initialization::KaimingUniform, &mut rng).unwrap();
        let bound = (2.0f64 * 3.0 / fan_in).sqrt() as f32;
        assert!(kaiming.iter().all(|v| v.abs() <= bound));

        let xavier = initial_weights(shape, Initialization::XavierUniform, &mut rng).unwrap();
        let bound = (6.0f64 / (fan_in + fan_out)).sqrt() as f32;
        assert!(xavier.iter().all(|v| v.abs() <= bound));

        let uniform = initial_weights(shape, Initialization::Uniform, &mut rng).unwrap();
        assert!(uniform.iter().all(|&v| (0.0..1.0).contains(&v)));
    }

    #[test]
    fn test_normal_std() {
        let mut rng = StdRng::seed_from_u64(12);
        let shape = (64, 16, 3, 3);
        let weights = initial_weights(shape, Initialization::KaimingNormal, &mut rng).unwrap();
        let std = weights.mapv(|v| v as f64).std(0.0);
        let expected = (2.0f64 / (16.0 * 9.0)).sqrt();
        assert!((std - expected).abs() < 0.05 * expected);
    }

    #[test]
    fn test_orthogonal() {
        let mut rng = StdRng::seed_from_u64(13);
        // fewer rows than columns: orthonormal rows
        let weights = initial_weights((4, 2, 3, 3), Initialization::Orthogonal, &mut rng).unwrap();
        let flattened = weights.into_shape((4, 18)).unwrap().mapv(|v| v as f64);
        let gram = flattened.dot(&flattened.t());
        assert!(gram
            .indexed_iter()
            .all(|((i, j), v)| (v - if i == j { 1.0 } else { 0.0 }).abs() < 1e-5));

        // more rows than columns: orthonormal columns
        let weights = initial_weights((12, 1, 2, 2), Initialization::Orthogonal, &mut rng).unwrap();
        let flattened = weights.into_shape((12, 4)).unwrap().mapv(|v| v as f64);
        let gram = flattened.t().dot(&flattened);
        assert!(gram
            .indexed_iter()
            .all(|((i, j), v)| (v - if i == j { 1.0 } else { 0.0 }).abs() < 1e-5));
    }

    #[test]
    fn test_initialize_layer() {
        let mut rng = StdRng::seed_from_u64(14);
        let mut layer = ConvolutionLayer::zeros(8, 3, 5, 1, 2).unwrap();
        initialize_conv_layer(&mut layer, Initialization::XavierNormal, &mut rng).unwrap();
        assert_eq!(layer.weight().shape(), &[8, 3, 5, 5]);
        assert!(layer.weight().iter().any(|&v| v != 0.0));
        assert_eq!(layer.padding(), 2);
    }

    #[test]
    fn test_empty_weight() {
        let mut rng = StdRng::seed_from_u64(15);
        assert!(matches!(
            initial_weights((0, 3, 3, 3), Initialization::Normal, &mut rng),
            Err(ModelError::InvalidInput(_))
        ));
    }
}
