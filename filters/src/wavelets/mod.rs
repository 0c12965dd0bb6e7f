//! Wavelet catalog and wavelet filter banks.
//!
//! Every wavelet known to the crate is listed by [`wavelist`]. Families are identified by a
//! short tag and consist of all catalog names that contain the tag.
pub mod biorthogonal;
pub mod coiflets;
pub mod continuous;
pub mod daubechies;
pub mod meyer;

use crate::{FilterError, FilterKernel, FilterPrecision, FilterResult};
use biorthogonal::{spline_pair, BIORTHOGONAL_ORDERS};
use coiflets::{coiflet, MAX_COIFLET_ORDER};
pub use continuous::ContinuousWavelet;
use continuous::MAX_GAUSSIAN_ORDER;
use daubechies::{daubechies, symlet, MAX_DAUBECHIES_ORDER, MAX_SYMLET_ORDER};
use ndarray::*;
use std::fmt::{self, Display};
use std::str::FromStr;

const MIN_SYMLET_ORDER: usize = 2;

/// Families of discrete wavelets, each yields one filter pair per member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscreteFamily {
    Bior,
    Coif,
    Db,
    Dmey,
    Haar,
    Rbio,
    Sym,
}

/// Families of continuous wavelets, sampled at several scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContinuousFamily {
    Cmor,
    Shan,
    Fbsp,
    Cgau,
    Gaus,
    Mexh,
    Morl,
}

impl DiscreteFamily {
    pub const ALL: [DiscreteFamily; 7] = [
        DiscreteFamily::Bior,
        DiscreteFamily::Coif,
        DiscreteFamily::Db,
        DiscreteFamily::Dmey,
        DiscreteFamily::Haar,
        DiscreteFamily::Rbio,
        DiscreteFamily::Sym,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            DiscreteFamily::Bior => "bior",
            DiscreteFamily::Coif => "coif",
            DiscreteFamily::Db => "db",
            DiscreteFamily::Dmey => "dmey",
            DiscreteFamily::Haar => "haar",
            DiscreteFamily::Rbio => "rbio",
            DiscreteFamily::Sym => "sym",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.tag() == tag)
    }

    /// Catalog names belonging to this family.
    pub fn members(&self) -> Vec<String> {
        family_members(self.tag())
    }
}

impl ContinuousFamily {
    pub const ALL: [ContinuousFamily; 7] = [
        ContinuousFamily::Cmor,
        ContinuousFamily::Shan,
        ContinuousFamily::Fbsp,
        ContinuousFamily::Cgau,
        ContinuousFamily::Gaus,
        ContinuousFamily::Mexh,
        ContinuousFamily::Morl,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ContinuousFamily::Cmor => "cmor",
            ContinuousFamily::Shan => "shan",
            ContinuousFamily::Fbsp => "fbsp",
            ContinuousFamily::Cgau => "cgau",
            ContinuousFamily::Gaus => "gaus",
            ContinuousFamily::Mexh => "mexh",
            ContinuousFamily::Morl => "morl",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.tag() == tag)
    }

    /// Complex families produce a real and an imaginary kernel per scale.
    pub fn is_complex(&self) -> bool {
        matches!(
            self,
            ContinuousFamily::Cmor
                | ContinuousFamily::Shan
                | ContinuousFamily::Fbsp
                | ContinuousFamily::Cgau
        )
    }

    pub fn members(&self) -> Vec<String> {
        family_members(self.tag())
    }
}

impl Display for DiscreteFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl Display for ContinuousFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Names of all known wavelets, grouped by family in alphabetical family order.
pub fn wavelist() -> Vec<String> {
    let spline_orders: Vec<String> = BIORTHOGONAL_ORDERS
        .iter()
        .map(|(nr, nd)| format!("{}.{}", nr, nd))
        .collect();

    let mut names = Vec::new();
    names.extend(spline_orders.iter().map(|o| format!("bior{}", o)));
    names.extend((1..=MAX_GAUSSIAN_ORDER).map(|p| format!("cgau{}", p)));
    names.push("cmor1.5-1.0".to_string());
    names.extend((1..=MAX_COIFLET_ORDER).map(|n| format!("coif{}", n)));
    names.extend((1..=MAX_DAUBECHIES_ORDER).map(|n| format!("db{}", n)));
    names.push("dmey".to_string());
    names.push("fbsp1-1.5-1.0".to_string());
    names.extend((1..=MAX_GAUSSIAN_ORDER).map(|p| format!("gaus{}", p)));
    names.push("haar".to_string());
    names.push("mexh".to_string());
    names.push("morl".to_string());
    names.extend(spline_orders.iter().map(|o| format!("rbio{}", o)));
    names.push("shan1.5-1.0".to_string());
    names.extend((MIN_SYMLET_ORDER..=MAX_SYMLET_ORDER).map(|n| format!("sym{}", n)));
    names
}

/// All catalog names containing `tag`.
pub fn family_members(tag: &str) -> Vec<String> {
    wavelist()
        .into_iter()
        .filter(|name| name.contains(tag))
        .collect()
}

/// A single discrete wavelet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscreteWavelet {
    Haar,
    Db(usize),
    Sym(usize),
    Coif(usize),
    Bior(usize, usize),
    Rbio(usize, usize),
    Dmey,
}

/// Decomposition filters of a discrete wavelet, zero padded to the same even length.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPair {
    pub dec_lo: Vec<f64>,
    pub dec_hi: Vec<f64>,
}

fn alternating_sign(n: usize) -> f64 {
    // (-1)^(n + 1)
    if n % 2 == 0 {
        -1.0
    } else {
        1.0
    }
}

/// Which side receives the extra zero when a filter is padded by an odd amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OddZero {
    First,
    Last,
}

/// Zero pads `h` on both sides to `length`.
fn pad_centered(h: &[f64], length: usize, odd_zero: OddZero) -> Vec<f64> {
    let difference = length - h.len();
    let offset = match odd_zero {
        OddZero::First => (difference + 1) / 2,
        OddZero::Last => difference / 2,
    };
    let mut padded = vec![0.0; length];
    padded[offset..offset + h.len()].copy_from_slice(h);
    padded
}

fn even_length(a: usize, b: usize) -> usize {
    let longest = a.max(b);
    longest + longest % 2
}

impl FilterPair {
    /// Quadrature mirror pair of an orthogonal wavelet.
    pub fn orthogonal(lo: &[f64]) -> Self {
        let length = even_length(lo.len(), lo.len());
        let dec_lo = pad_centered(lo, length, OddZero::First);
        let dec_hi = (0..length)
            .map(|n| alternating_sign(n) * dec_lo[length - 1 - n])
            .collect();
        FilterPair { dec_lo, dec_hi }
    }

    /// Pair of a biorthogonal wavelet: the high pass is the modulated synthesis low pass.
    /// The analysis filter takes the odd padding zero in front, the synthesis filter at
    /// the end, which keeps both centers one tap apart.
    pub fn biorthogonal(analysis: &[f64], synthesis: &[f64]) -> Self {
        let length = even_length(analysis.len(), synthesis.len());
        let dec_lo = pad_centered(analysis, length, OddZero::First);
        let dec_hi = pad_centered(synthesis, length, OddZero::Last)
            .into_iter()
            .enumerate()
            .map(|(n, v)| alternating_sign(n) * v)
            .collect();
        FilterPair { dec_lo, dec_hi }
    }

    pub fn len(&self) -> usize {
        self.dec_lo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dec_lo.is_empty()
    }

    /// Separable 2D kernels: approximation (lo x lo) and diagonal detail (hi x hi),
    /// each of shape (1, 1, length, length).
    pub fn kernels(&self) -> Vec<FilterKernel> {
        let length = self.len();
        [&self.dec_lo, &self.dec_hi]
            .iter()
            .map(|h| {
                Array4::from_shape_fn((1, 1, length, length), |(_, _, i, j)| {
                    (h[i] * h[j]) as FilterPrecision
                })
            })
            .collect()
    }
}

impl DiscreteWavelet {
    pub fn filter_pair(&self) -> FilterResult<FilterPair> {
        let pair = match *self {
            DiscreteWavelet::Haar => FilterPair::orthogonal(&daubechies(1)?),
            DiscreteWavelet::Db(order) => FilterPair::orthogonal(&daubechies(order)?),
            DiscreteWavelet::Sym(order) => FilterPair::orthogonal(&symlet(order)?),
            DiscreteWavelet::Coif(order) => FilterPair::orthogonal(&coiflet(order)?),
            DiscreteWavelet::Bior(nr, nd) => {
                let splines = spline_pair(nr, nd)?;
                FilterPair::biorthogonal(&splines.dual, &splines.primal)
            }
            DiscreteWavelet::Rbio(nr, nd) => {
                let splines = spline_pair(nr, nd)?;
                FilterPair::biorthogonal(&splines.primal, &splines.dual)
            }
            DiscreteWavelet::Dmey => FilterPair::orthogonal(&meyer::dmey()),
        };
        Ok(pair)
    }
}

fn parse_spline_orders(orders: &str) -> Option<(usize, usize)> {
    let mut parts = orders.splitn(2, '.');
    let nr = parts.next()?.parse().ok()?;
    let nd = parts.next()?.parse().ok()?;
    BIORTHOGONAL_ORDERS
        .iter()
        .copied()
        .find(|&orders| orders == (nr, nd))
}

fn parse_bounded(order: &str, min: usize, max: usize) -> Option<usize> {
    order.parse().ok().filter(|n| (min..=max).contains(n))
}

impl FromStr for DiscreteWavelet {
    type Err = FilterError;

    fn from_str(name: &str) -> FilterResult<Self> {
        let wavelet = match name {
            "haar" => Some(DiscreteWavelet::Haar),
            "dmey" => Some(DiscreteWavelet::Dmey),
            _ => {
                if let Some(order) = name.strip_prefix("db") {
                    parse_bounded(order, 1, MAX_DAUBECHIES_ORDER).map(DiscreteWavelet::Db)
                } else if let Some(order) = name.strip_prefix("sym") {
                    parse_bounded(order, MIN_SYMLET_ORDER, MAX_SYMLET_ORDER)
                        .map(DiscreteWavelet::Sym)
                } else if let Some(order) = name.strip_prefix("coif") {
                    parse_bounded(order, 1, MAX_COIFLET_ORDER).map(DiscreteWavelet::Coif)
                } else if let Some(orders) = name.strip_prefix("bior") {
                    parse_spline_orders(orders).map(|(nr, nd)| DiscreteWavelet::Bior(nr, nd))
                } else if let Some(orders) = name.strip_prefix("rbio") {
                    parse_spline_orders(orders).map(|(nr, nd)| DiscreteWavelet::Rbio(nr, nd))
                } else {
                    None
                }
            }
        };
        wavelet.ok_or_else(|| FilterError::UnknownWavelet(name.to_string()))
    }
}

impl Display for DiscreteWavelet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscreteWavelet::Haar => write!(f, "haar"),
            DiscreteWavelet::Db(n) => write!(f, "db{}", n),
            DiscreteWavelet::Sym(n) => write!(f, "sym{}", n),
            DiscreteWavelet::Coif(n) => write!(f, "coif{}", n),
            DiscreteWavelet::Bior(nr, nd) => write!(f, "bior{}.{}", nr, nd),
            DiscreteWavelet::Rbio(nr, nd) => write!(f, "rbio{}.{}", nr, nd),
            DiscreteWavelet::Dmey => write!(f, "dmey"),
        }
    }
}

/// Filter bank of a discrete wavelet family: for every member in catalog order
/// the approximation kernel followed by the detail kernel.
pub fn discrete_wavelet_family(family: DiscreteFamily) -> FilterResult<Vec<FilterKernel>> {
    let mut kernels = Vec::new();
    for name in family.members() {
        let wavelet: DiscreteWavelet = name.parse()?;
        let pair = wavelet.filter_pair()?;
        log::trace!("{}: filter length {}", wavelet, pair.len());
        kernels.extend(pair.kernels());
    }
    log::debug!("Built {} kernels for wavelet family {}", kernels.len(), family);
    Ok(kernels)
}

/// Filter bank of a continuous wavelet family: for every member and every scale in
/// `1..=num_scales` the real kernel, followed by the imaginary kernel for complex wavelets.
pub fn continuous_wavelet_family(
    family: ContinuousFamily,
    size: usize,
    num_scales: usize,
) -> FilterResult<Vec<FilterKernel>> {
    let mut kernels = Vec::new();
    for name in family.members() {
        let wavelet: ContinuousWavelet = name.parse()?;
        kernels.extend(wavelet.kernels(size, num_scales)?);
    }
    log::debug!(
        "Built {} kernels of size {} for wavelet family {}",
        kernels.len(),
        size,
        family
    );
    Ok(kernels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_counts() {
        let counts: Vec<(&str, usize)> = DiscreteFamily::ALL
            .iter()
            .map(|f| (f.tag(), f.members().len()))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("bior", 15),
                ("coif", 17),
                ("db", 38),
                ("dmey", 1),
                ("haar", 1),
                ("rbio", 15),
                ("sym", 19)
            ]
        );
        let counts: Vec<usize> = ContinuousFamily::ALL
            .iter()
            .map(|f| f.members().len())
            .collect();
        assert_eq!(counts, vec![1, 1, 1, 8, 8, 1, 1]);
        assert_eq!(wavelist().len(), 127);
    }

    #[test]
    fn test_families_do_not_overlap() {
        let total: usize = DiscreteFamily::ALL
            .iter()
            .map(|f| f.members().len())
            .chain(ContinuousFamily::ALL.iter().map(|f| f.members().len()))
            .sum();
        assert_eq!(total, wavelist().len());
    }

    #[test]
    fn test_every_name_parses() {
        for family in DiscreteFamily::ALL.iter() {
            for name in family.members() {
                let wavelet: DiscreteWavelet = name.parse().unwrap();
                assert_eq!(wavelet.to_string(), name);
            }
        }
        for family in ContinuousFamily::ALL.iter() {
            for name in family.members() {
                let wavelet: ContinuousWavelet = name.parse().unwrap();
                assert_eq!(wavelet.is_complex(), family.is_complex(), "{}", name);
            }
        }
        assert_eq!(
            "db39".parse::<DiscreteWavelet>(),
            Err(FilterError::UnknownWavelet("db39".to_string()))
        );
        assert!("sym1".parse::<DiscreteWavelet>().is_err());
        assert!("bior1.2".parse::<DiscreteWavelet>().is_err());
        assert!("morl".parse::<DiscreteWavelet>().is_err());
    }

    #[test]
    fn test_family_tags() {
        assert_eq!(DiscreteFamily::from_tag("db"), Some(DiscreteFamily::Db));
        assert_eq!(ContinuousFamily::from_tag("morl"), Some(ContinuousFamily::Morl));
        assert_eq!(DiscreteFamily::from_tag("morl"), None);
        assert_eq!(ContinuousFamily::from_tag("gabor"), None);
    }

    #[test]
    fn test_haar_pair() {
        let pair = DiscreteWavelet::Haar.filter_pair().unwrap();
        let r = std::f64::consts::FRAC_1_SQRT_2;
        assert_eq!(pair.dec_lo, vec![r, r]);
        assert_eq!(pair.dec_hi, vec![-r, r]);

        let kernels = pair.kernels();
        assert_eq!(kernels.len(), 2);
        assert!(kernels[0].iter().all(|&v| (v - 0.5).abs() < 1e-7));
        assert!((kernels[1][[0, 0, 0, 0]] - 0.5).abs() < 1e-7);
        assert!((kernels[1][[0, 0, 0, 1]] + 0.5).abs() < 1e-7);
        assert!((kernels[1][[0, 0, 1, 1]] - 0.5).abs() < 1e-7);
    }

    #[test]
    fn test_orthogonal_high_pass_is_orthogonal_to_low_pass() {
        for wavelet in &[
            DiscreteWavelet::Db(4),
            DiscreteWavelet::Sym(6),
            DiscreteWavelet::Coif(2),
        ] {
            let pair = wavelet.filter_pair().unwrap();
            for shift in 0..pair.len() / 2 {
                let dot: f64 = (0..pair.len() - 2 * shift)
                    .map(|n| pair.dec_lo[n + 2 * shift] * pair.dec_hi[n])
                    .sum();
                assert!(dot.abs() < 1e-9, "{} shift {}", wavelet, shift);
            }
            assert!(pair.dec_hi.iter().sum::<f64>().abs() < 1e-9);
        }
    }

    #[test]
    fn test_biorthogonal_padding() {
        let pair = DiscreteWavelet::Bior(2, 2).filter_pair().unwrap();
        assert_eq!(pair.len(), 6);
        let expected_lo = [
            0.0,
            -0.1767766952966369,
            0.3535533905932738,
            1.0606601717798214,
            0.3535533905932738,
            -0.1767766952966369,
        ];
        let expected_hi = [
            0.0,
            0.3535533905932738,
            -0.7071067811865476,
            0.3535533905932738,
            0.0,
            0.0,
        ];
        for n in 0..6 {
            assert!((pair.dec_lo[n] - expected_lo[n]).abs() < 1e-12, "{:?}", pair);
            assert!((pair.dec_hi[n] - expected_hi[n]).abs() < 1e-12, "{:?}", pair);
        }
        // high pass sums to zero, low pass to sqrt(2)
        assert!(pair.dec_hi.iter().sum::<f64>().abs() < 1e-12);
        assert!((pair.dec_lo.iter().sum::<f64>() - std::f64::consts::SQRT_2).abs() < 1e-12);

        let swapped = DiscreteWavelet::Rbio(2, 2).filter_pair().unwrap();
        assert_eq!(swapped.len(), 6);
        assert_ne!(swapped.dec_lo, pair.dec_lo);
    }

    #[test]
    fn test_discrete_family_kernels() {
        let kernels = discrete_wavelet_family(DiscreteFamily::Bior).unwrap();
        assert_eq!(kernels.len(), 15 * 2);
        for kernel in &kernels {
            let shape = kernel.shape();
            assert_eq!(&shape[..2], &[1, 1]);
            assert_eq!(shape[2], shape[3]);
            assert_eq!(shape[2] % 2, 0);
        }
    }

    #[test]
    fn test_discrete_family_is_deterministic() {
        assert_eq!(
            discrete_wavelet_family(DiscreteFamily::Sym).unwrap(),
            discrete_wavelet_family(DiscreteFamily::Sym).unwrap()
        );
    }

    #[test]
    fn test_continuous_family_kernels() {
        let kernels = continuous_wavelet_family(ContinuousFamily::Cgau, 5, 3).unwrap();
        assert_eq!(kernels.len(), 8 * 3 * 2);
        assert!(kernels.iter().all(|k| k.shape() == &[1, 1, 5, 5]));

        let kernels = continuous_wavelet_family(ContinuousFamily::Gaus, 6, 2).unwrap();
        assert_eq!(kernels.len(), 8 * 2);
    }

    #[test]
    fn test_split_biorthogonal_pairs() {
        let pair = DiscreteWavelet::Bior(5, 5).filter_pair().unwrap();
        assert_eq!(pair.len(), 12);
        assert_eq!(&pair.dec_lo[..2], &[0.0, 0.0]);
        assert_eq!(pair.dec_lo[11], 0.0);
        assert!((pair.dec_lo[2] - 0.03968708834740544).abs() < 1e-8);
        assert!((pair.dec_hi[0] + 0.013456709459118716).abs() < 1e-8);
        assert!((pair.dec_hi[5] - 0.8995061097486484).abs() < 1e-8);
        assert_eq!(pair.dec_hi[11], 0.0);

        let pair = DiscreteWavelet::Bior(6, 8).filter_pair().unwrap();
        assert_eq!(pair.len(), 18);
        assert_eq!(pair.dec_lo[0], 0.0);
        assert!((pair.dec_lo[1] - 0.0019088317364812906).abs() < 1e-8);
        assert_eq!(&pair.dec_hi[..3], &[0.0, 0.0, 0.0]);
        assert!((pair.dec_hi[3] - 0.014426282505624435).abs() < 1e-8);
        assert!((pair.dec_hi[8] + 0.7589077294536542).abs() < 1e-8);
        assert_eq!(&pair.dec_hi[14..], &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_high_order_coiflet_pair() {
        let pair = DiscreteWavelet::Coif(MAX_COIFLET_ORDER).filter_pair().unwrap();
        assert_eq!(pair.len(), 6 * MAX_COIFLET_ORDER);
        assert!(pair.dec_hi.iter().sum::<f64>().abs() < 1e-9);
        assert_eq!(pair.kernels()[0].shape(), &[1, 1, 102, 102]);
    }
}
