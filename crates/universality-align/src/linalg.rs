// crates/universality-align/src/linalg.rs
//
// Dense linear-algebra helpers shared by the alignment algorithms.
//
// Rank decisions everywhere use the relative tolerance
// `max(|values|) * n * f64::EPSILON`, so they scale with the input.

use nalgebra::{DMatrix, DVector, SymmetricEigen, SVD};

use universality_core::UniversalityError;

/// Iteration cap handed to nalgebra's SVD and symmetric eigen solvers.
const MAX_DECOMPOSITION_ITERATIONS: usize = 100_000;

/// Relative numerical-zero threshold for a spectrum of `n` values.
pub fn relative_tolerance(max_abs: f64, n: usize) -> f64 {
    max_abs * n as f64 * f64::EPSILON
}

/// Largest absolute value, 0.0 for an empty slice.
pub fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

/// Indices of values whose magnitude exceeds the relative tolerance for a
/// spectrum of length `n`.
pub fn indices_above_tolerance(values: &[f64], n: usize) -> Vec<usize> {
    let tol = relative_tolerance(max_abs(values), n);
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.abs() > tol)
        .map(|(i, _)| i)
        .collect()
}

/// Mean of every column.
pub fn column_means(m: &DMatrix<f64>) -> DVector<f64> {
    let n = m.nrows().max(1) as f64;
    DVector::from_iterator(m.ncols(), m.column_iter().map(|c| c.sum() / n))
}

/// Subtract `mean[j]` from column `j`.
pub fn center(m: &DMatrix<f64>, mean: &DVector<f64>) -> DMatrix<f64> {
    let mut out = m.clone();
    for (j, mut col) in out.column_iter_mut().enumerate() {
        col.add_scalar_mut(-mean[j]);
    }
    out
}

/// Sample covariance of the columns (`N - 1` normalisation).
pub fn covariance(m: &DMatrix<f64>) -> Result<DMatrix<f64>, UniversalityError> {
    let n = m.nrows();
    if n < 2 {
        return Err(UniversalityError::InsufficientSamples { found: n });
    }
    let centered = center(m, &column_means(m));
    Ok((centered.transpose() * &centered) / (n - 1) as f64)
}

/// Concatenate matrices column-wise. All inputs must have the same row count.
pub fn hconcat(blocks: &[DMatrix<f64>]) -> Result<DMatrix<f64>, UniversalityError> {
    let rows = blocks.first().map(|b| b.nrows()).unwrap_or(0);
    if let Some(bad) = blocks.iter().find(|b| b.nrows() != rows) {
        return Err(UniversalityError::DimensionMismatch(format!(
            "cannot concatenate blocks with {} and {} rows",
            rows,
            bad.nrows()
        )));
    }
    let cols: usize = blocks.iter().map(|b| b.ncols()).sum();
    let mut out = DMatrix::zeros(rows, cols);
    let mut offset = 0;
    for block in blocks {
        out.columns_mut(offset, block.ncols()).copy_from(block);
        offset += block.ncols();
    }
    Ok(out)
}

/// Thin SVD `m = U * diag(s) * Vt`.
pub fn svd(
    m: &DMatrix<f64>,
) -> Result<(DMatrix<f64>, DVector<f64>, DMatrix<f64>), UniversalityError> {
    let decomposition = SVD::try_new(
        m.clone(),
        true,
        true,
        f64::EPSILON,
        MAX_DECOMPOSITION_ITERATIONS,
    )
    .ok_or_else(|| UniversalityError::Numerical("SVD did not converge".to_string()))?;
    let u = decomposition
        .u
        .ok_or_else(|| UniversalityError::Numerical("SVD returned no U".to_string()))?;
    let v_t = decomposition
        .v_t
        .ok_or_else(|| UniversalityError::Numerical("SVD returned no V^T".to_string()))?;
    Ok((u, decomposition.singular_values, v_t))
}

/// Eigen-decomposition of a symmetric matrix with eigenvalues sorted ascending.
///
/// The input is symmetrised first so round-off asymmetry does not leak in.
pub fn symmetric_eigen_ascending(
    m: &DMatrix<f64>,
) -> Result<(Vec<f64>, DMatrix<f64>), UniversalityError> {
    if m.nrows() != m.ncols() {
        return Err(UniversalityError::DimensionMismatch(format!(
            "eigen-decomposition needs a square matrix, got {}x{}",
            m.nrows(),
            m.ncols()
        )));
    }
    if m.nrows() == 0 {
        return Ok((Vec::new(), DMatrix::zeros(0, 0)));
    }

    let symmetric = (m + m.transpose()) * 0.5;
    let eigen = SymmetricEigen::try_new(symmetric, f64::EPSILON, MAX_DECOMPOSITION_ITERATIONS)
        .ok_or_else(|| {
            UniversalityError::Numerical("symmetric eigen-decomposition did not converge".to_string())
        })?;

    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let vectors = eigen.eigenvectors.select_columns(order.iter());
    Ok((values, vectors))
}

/// Moore-Penrose pseudo-inverse, dropping singular values under the relative tolerance.
pub fn pinv(m: &DMatrix<f64>) -> Result<DMatrix<f64>, UniversalityError> {
    if m.nrows() == 0 || m.ncols() == 0 {
        return Ok(DMatrix::zeros(m.ncols(), m.nrows()));
    }
    let (u, s, v_t) = svd(m)?;
    let tol = relative_tolerance(s.max(), m.nrows().max(m.ncols()));
    let inv = DVector::from_iterator(s.len(), s.iter().map(|&x| if x > tol { 1.0 / x } else { 0.0 }));
    Ok(v_t.transpose() * DMatrix::from_diagonal(&inv) * u.transpose())
}

/// Orthogonal factor of the Procrustes problem.
///
/// Given the cross-product `trg^T * src = U * S * Vt`, returns `W = V * U^T`,
/// the orthogonal matrix minimising `||src * W - trg||_F`.
pub fn procrustes_rotation(trg_t_src: &DMatrix<f64>) -> Result<DMatrix<f64>, UniversalityError> {
    let (u, _, v_t) = svd(trg_t_src)?;
    Ok(v_t.transpose() * u.transpose())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_scales_with_magnitude() {
        let small = indices_above_tolerance(&[1e-20, 1e-18, 0.0], 3);
        assert_eq!(small, vec![0, 1]);
        let large = indices_above_tolerance(&[1e-20, 1e6, 0.0], 3);
        assert_eq!(large, vec![1]);
    }

    #[test]
    fn exact_zeros_are_discarded() {
        // Four retained values, three exact zeros.
        let spectrum = [-2.0, 0.0, 0.0, 0.5, 0.0, 1.0, 3.0];
        assert_eq!(indices_above_tolerance(&spectrum, spectrum.len()), vec![0, 3, 5, 6]);
        assert!(indices_above_tolerance(&[0.0, 0.0], 2).is_empty());
    }

    #[test]
    fn covariance_matches_hand_computation() {
        let m = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        let cov = covariance(&m).unwrap();
        assert!((cov[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((cov[(0, 1)] - 2.0).abs() < 1e-12);
        assert!((cov[(1, 1)] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn covariance_needs_two_rows() {
        let m = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert!(matches!(
            covariance(&m),
            Err(UniversalityError::InsufficientSamples { found: 1 })
        ));
    }

    #[test]
    fn hconcat_places_blocks_side_by_side() {
        let a = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let b = DMatrix::from_row_slice(2, 2, &[3.0, 4.0, 5.0, 6.0]);
        let c = hconcat(&[a, b]).unwrap();
        assert_eq!(c, DMatrix::from_row_slice(2, 3, &[1.0, 3.0, 4.0, 2.0, 5.0, 6.0]));
        let bad = hconcat(&[DMatrix::zeros(2, 1), DMatrix::zeros(3, 1)]);
        assert!(bad.is_err());
    }

    #[test]
    fn eigenvalues_come_out_ascending() {
        let m = DMatrix::from_row_slice(3, 3, &[3.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 2.0]);
        let (values, vectors) = symmetric_eigen_ascending(&m).unwrap();
        assert_eq!(values.len(), 3);
        assert!((values[0] + 1.0).abs() < 1e-12);
        assert!((values[1] - 2.0).abs() < 1e-12);
        assert!((values[2] - 3.0).abs() < 1e-12);
        // Column 0 belongs to eigenvalue -1, i.e. the second axis.
        assert!((vectors[(1, 0)].abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pinv_of_rank_deficient_matrix() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let p = pinv(&m).unwrap();
        // pinv of the all-ones 2x2 matrix is itself / 4.
        for v in p.iter() {
            assert!((v - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn procrustes_rotation_recovers_swap() {
        let src = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 2.0, 3.0, 1.0]);
        let swap = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let trg = &src * &swap;
        let w = procrustes_rotation(&(trg.transpose() * &src)).unwrap();
        assert!((w - swap).norm() < 1e-10);
    }
}
