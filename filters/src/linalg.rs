//! Dense linear algebra needed for filter design and weight synthesis.
//!
//! The decompositions come from nalgebra, callers keep working with ndarray.
//! Matrices are converted at the boundary of every function.
use crate::{FilterError, FilterResult};
use nalgebra::linalg::SVD;
use nalgebra::{DMatrix, DVector, Dyn};
use ndarray::{Array1, Array2};

/// Singular values below this fraction of the largest one are treated as zero.
const RANK_TOLERANCE: f64 = 1e-13;
/// Iteration cap of the singular value decomposition.
const MAX_SVD_ITERATIONS: usize = 10_000;

pub fn to_matrix(a: &Array2<f64>) -> DMatrix<f64> {
    let (m, n) = a.dim();
    DMatrix::from_fn(m, n, |i, j| a[[i, j]])
}

pub fn from_matrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn(m.shape(), |(i, j)| m[(i, j)])
}

/// Reduced QR decomposition: `q` is m x k and `r` is k x n with k = min(m, n).
/// This matches the default ("reduced") mode of numpy and torch.
pub fn qr(a: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let decomposition = to_matrix(a).qr();
    (
        from_matrix(&decomposition.q()),
        from_matrix(&decomposition.r()),
    )
}

fn svd(a: DMatrix<f64>) -> FilterResult<SVD<f64, Dyn, Dyn>> {
    a.try_svd(true, true, f64::EPSILON, MAX_SVD_ITERATIONS)
        .ok_or(FilterError::Decomposition("singular value decomposition did not converge"))
}

/// Cutoff below which singular values count as zero.
fn rank_cutoff(svd: &SVD<f64, Dyn, Dyn>) -> f64 {
    svd.singular_values.max() * RANK_TOLERANCE
}

/// Minimum norm least squares solution of `a x = b`, for tall and wide matrices alike.
pub fn lstsq(a: &Array2<f64>, b: &Array1<f64>) -> FilterResult<Array1<f64>> {
    let decomposition = svd(to_matrix(a))?;
    let rhs = DVector::from_iterator(b.len(), b.iter().copied());
    let x = decomposition
        .solve(&rhs, rank_cutoff(&decomposition))
        .map_err(FilterError::Decomposition)?;
    Ok(x.iter().copied().collect())
}

/// Orthonormal basis of the null space of `a`, one basis vector per column.
pub fn null_space(a: &Array2<f64>) -> FilterResult<Array2<f64>> {
    let (m, n) = a.dim();
    // wide matrices get zero rows so that all n right singular vectors are computed
    let padded = DMatrix::from_fn(m.max(n), n, |i, j| if i < m { a[[i, j]] } else { 0.0 });
    let decomposition = svd(padded)?;
    let v_t = decomposition
        .v_t
        .as_ref()
        .ok_or(FilterError::Decomposition("right singular vectors are missing"))?;
    let cutoff = rank_cutoff(&decomposition);
    let rank = decomposition
        .singular_values
        .iter()
        .filter(|&&s| s > cutoff)
        .count();
    Ok(Array2::from_shape_fn((n, n - rank), |(i, j)| v_t[(rank + j, i)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>, tol: f64) {
        assert_eq!(a.dim(), b.dim());
        assert!(
            a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < tol),
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_reduced_qr_shapes() {
        let a = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let (q, r) = qr(&a);
        assert_eq!(q.dim(), (3, 2));
        assert_eq!(r.dim(), (2, 2));
        assert_close(&q.dot(&r), &a, 1e-12);
        assert_close(&q.t().dot(&q), &Array2::eye(2), 1e-12);
        assert!(r[[1, 0]].abs() < 1e-12);

        let wide = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let (q, r) = qr(&wide);
        assert_eq!(q.dim(), (2, 2));
        assert_eq!(r.dim(), (2, 3));
        assert_close(&q.dot(&r), &wide, 1e-12);
    }

    #[test]
    fn test_qr_of_a_large_matrix() {
        let n = 512;
        let a = Array2::from_shape_fn((n, n), |(i, j)| ((i * 31 + j * 17) % 101) as f64 - 50.0);
        let (q, r) = qr(&a);
        assert_close(&q.t().dot(&q), &Array2::eye(n), 1e-9);
        assert_close(&q.dot(&r), &a, 1e-8);
    }

    #[test]
    fn test_lstsq() {
        // exactly solvable overdetermined system
        let a = array![[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]];
        let x_true = array![3.0, -1.0];
        let b = a.dot(&x_true);
        let x = lstsq(&a, &b).unwrap();
        assert!((x[0] - 3.0).abs() < 1e-12);
        assert!((x[1] + 1.0).abs() < 1e-12);

        // underdetermined, the minimum norm solution splits evenly
        let x = lstsq(&array![[1.0, 1.0]], &array![2.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12 && (x[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lstsq_ignores_dependent_columns() {
        let a = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let x = lstsq(&a, &array![1.0, 2.0, 3.0]).unwrap();
        assert!(x.iter().all(|v| v.is_finite()));
        assert!((x[0] + 2.0 * x[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_null_space() {
        let a = array![[1.0, 1.0, 0.0], [0.0, 1.0, 1.0]];
        let basis = null_space(&a).unwrap();
        assert_eq!(basis.dim(), (3, 1));
        assert_close(&a.dot(&basis), &Array2::zeros((2, 1)), 1e-12);
        assert!((basis.column(0).dot(&basis.column(0)) - 1.0).abs() < 1e-12);

        // rank deficient rows leave a larger null space
        let a = array![[1.0, 2.0, 3.0], [2.0, 4.0, 6.0]];
        let basis = null_space(&a).unwrap();
        assert_eq!(basis.dim(), (3, 2));
        assert_close(&basis.t().dot(&basis), &Array2::eye(2), 1e-12);
        assert_close(&a.dot(&basis), &Array2::zeros((2, 2)), 1e-12);
    }
}
