// crates/universality-align/src/gcca.rs
//
// Generalized canonical correlation analysis (multiview LSA formulation).
//
// All views are concatenated column-wise into X (N x P, P = sum of view
// dimensions). With Sigma = cov(X) and B the block mask that is 1 inside each
// view's own diagonal block, GCCA solves
//
//     (Sigma o !B) v = lambda (Sigma o B) v
//
// i.e. cross-view covariance relative to within-view covariance. The pencil
// is reduced to a standard symmetric problem by whitening with the
// within-view covariance. Eigenvalues whose magnitude is at most
// `max|lambda| * P * f64::EPSILON` are numerical zeros and their vectors are
// discarded; the same relative tolerance bounds the whitening rank.
//
// Ordering: components are kept in the solver's ascending eigenvalue order,
// and the model says so through `DimensionOrder::Ascending`. Correlation
// vectors measured on GCCA-mapped spaces must be reversed (see
// `CorrelationVector::into_descending`) to read strongest-first.

use nalgebra::{DMatrix, DVector};

use universality_core::{
    AlignmentDiagnostics, AlignmentOutcome, Algorithm, DimensionOrder, SampleMatrix,
    SharedVocabulary, SpaceAligner, SpaceSampler, UniversalityError, VectorSpace,
};

use crate::linalg::{
    center, column_means, covariance, hconcat, indices_above_tolerance, max_abs,
    relative_tolerance, symmetric_eigen_ascending,
};

/// Fitted GCCA transform: the projection basis `theta` (P x K) and the mean
/// of the concatenated views. View `m` owns rows `offset_m .. offset_m + D_m`
/// of both.
#[derive(Debug, Clone)]
pub struct GccaModel {
    mean: DVector<f64>,
    theta: DMatrix<f64>,
    eigenvalues: Vec<f64>,
    view_dims: Vec<usize>,
}

impl GccaModel {
    /// Number of retained components `K`.
    pub fn components(&self) -> usize {
        self.theta.ncols()
    }

    /// Retained eigenvalues, ascending.
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Always `Ascending`: component 0 is the weakest.
    pub fn order(&self) -> DimensionOrder {
        DimensionOrder::Ascending
    }

    pub fn view_dims(&self) -> &[usize] {
        &self.view_dims
    }

    /// The projection basis, one column per retained component.
    pub fn theta(&self) -> &DMatrix<f64> {
        &self.theta
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    fn view_offset(&self, view: usize) -> usize {
        self.view_dims[..view].iter().sum()
    }

    /// Project one view: `(data - mean_m) * theta_m`, using only the rows of
    /// `mean` and `theta` that belong to view `m`.
    pub fn transform_view(
        &self,
        view: usize,
        data: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, UniversalityError> {
        let dim = *self.view_dims.get(view).ok_or_else(|| {
            UniversalityError::InvalidInput(format!(
                "GCCA model has {} views, asked for view {}",
                self.view_dims.len(),
                view
            ))
        })?;
        if data.ncols() != dim {
            return Err(UniversalityError::DimensionMismatch(format!(
                "GCCA view {} has dimension {}, got {} columns",
                view,
                dim,
                data.ncols()
            )));
        }
        let offset = self.view_offset(view);
        let mean_slice: DVector<f64> = self.mean.rows(offset, dim).into_owned();
        let theta_slice = self.theta.rows(offset, dim);
        Ok(center(data, &mean_slice) * theta_slice)
    }

    /// Project every view with its own slice. Views may have different row counts.
    pub fn transform_views(
        &self,
        views: &[DMatrix<f64>],
    ) -> Result<Vec<DMatrix<f64>>, UniversalityError> {
        if views.len() != self.view_dims.len() {
            return Err(UniversalityError::InvalidInput(format!(
                "GCCA model has {} views, got {}",
                self.view_dims.len(),
                views.len()
            )));
        }
        views
            .iter()
            .enumerate()
            .map(|(m, data)| self.transform_view(m, data))
            .collect()
    }

    /// Joint projection of row-aligned views: `(concat - mean) * theta`.
    /// Equals the sum of the per-view projections.
    pub fn transform(&self, views: &[DMatrix<f64>]) -> Result<DMatrix<f64>, UniversalityError> {
        let concat = hconcat(views)?;
        if concat.ncols() != self.mean.len() {
            return Err(UniversalityError::DimensionMismatch(format!(
                "GCCA expects {} concatenated columns, got {}",
                self.mean.len(),
                concat.ncols()
            )));
        }
        Ok(center(&concat, &self.mean) * &self.theta)
    }

    /// Keep only the components with positive eigenvalue (positively
    /// correlated directions), preserving ascending order.
    pub fn positive_components(&self) -> GccaModel {
        let keep: Vec<usize> = self
            .eigenvalues
            .iter()
            .enumerate()
            .filter(|(_, l)| **l > 0.0)
            .map(|(i, _)| i)
            .collect();
        GccaModel {
            mean: self.mean.clone(),
            theta: self.theta.select_columns(keep.iter()),
            eigenvalues: keep.iter().map(|&i| self.eigenvalues[i]).collect(),
            view_dims: self.view_dims.clone(),
        }
    }
}

/// GCCA aligner. With two views it aligns a source and a target space; the
/// fitting API accepts any number of views.
#[derive(Debug, Clone, Default)]
pub struct Gcca;

impl Gcca {
    pub fn new() -> Self {
        Self
    }

    /// Fit the joint basis on `M >= 2` row-aligned views.
    pub fn fit(views: &[SampleMatrix]) -> Result<GccaModel, UniversalityError> {
        if views.len() < 2 {
            return Err(UniversalityError::InvalidInput(format!(
                "GCCA needs at least 2 views, got {}",
                views.len()
            )));
        }
        let view_dims: Vec<usize> = views.iter().map(|v| v.ncols()).collect();
        let concat = hconcat(views)?;
        let total = concat.ncols();

        let mean = column_means(&concat);
        let cov = covariance(&concat)?;

        // Block labels: column -> owning view.
        let mut owner = Vec::with_capacity(total);
        for (m, &d) in view_dims.iter().enumerate() {
            owner.extend(std::iter::repeat(m).take(d));
        }
        let within = DMatrix::from_fn(total, total, |i, j| {
            if owner[i] == owner[j] {
                cov[(i, j)]
            } else {
                0.0
            }
        });
        let cross = DMatrix::from_fn(total, total, |i, j| {
            if owner[i] == owner[j] {
                0.0
            } else {
                cov[(i, j)]
            }
        });

        // Whiten: W^T within W = I on the numerically non-null subspace.
        let (w_vals, w_vecs) = symmetric_eigen_ascending(&within)?;
        let w_tol = relative_tolerance(max_abs(&w_vals), total);
        let support: Vec<usize> = (0..w_vals.len()).filter(|&i| w_vals[i] > w_tol).collect();
        if support.len() < total {
            tracing::warn!(
                "Within-view covariance is rank-deficient ({} of {}); dropping null directions",
                support.len(),
                total
            );
        }
        if support.is_empty() {
            return Ok(GccaModel {
                mean,
                theta: DMatrix::zeros(total, 0),
                eigenvalues: Vec::new(),
                view_dims,
            });
        }
        let scales = DVector::from_iterator(
            support.len(),
            support.iter().map(|&i| 1.0 / w_vals[i].sqrt()),
        );
        let whitener = w_vecs.select_columns(support.iter()) * DMatrix::from_diagonal(&scales);

        let reduced = whitener.transpose() * &cross * &whitener;
        let (eigvals, q) = symmetric_eigen_ascending(&reduced)?;
        let eigvecs = &whitener * q;

        // Rank determination: same length convention as the full pencil (P values).
        let keep = indices_above_tolerance(&eigvals, total);
        tracing::debug!(
            "GCCA retained {} of {} components (views {:?})",
            keep.len(),
            eigvals.len(),
            view_dims
        );

        Ok(GccaModel {
            mean,
            theta: eigvecs.select_columns(keep.iter()),
            eigenvalues: keep.iter().map(|&i| eigvals[i]).collect(),
            view_dims,
        })
    }
}

impl SpaceAligner for Gcca {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Gcca
    }

    fn align(
        &self,
        source: &VectorSpace,
        target: &VectorSpace,
        vocab: &SharedVocabulary,
    ) -> Result<AlignmentOutcome, UniversalityError> {
        tracing::info!("Calculating mapping based on GCCA and applying it to both spaces");
        let (src, trg) = SpaceSampler::sample_pair(source, target, vocab)?;
        let model = Self::fit(&[src, trg])?.positive_components();

        let mapped_source = source.with_vectors(model.transform_view(0, source.vectors())?)?;
        let mapped_target = target.with_vectors(model.transform_view(1, target.vectors())?)?;

        Ok(AlignmentOutcome {
            source: mapped_source,
            target: mapped_target,
            diagnostics: AlignmentDiagnostics {
                order: model.order(),
                eigenvalues: Some(model.eigenvalues().to_vec()),
                ..AlignmentDiagnostics::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::CorrelationScorer;
    use crate::testing::{assert_close, gaussian, rng};

    fn correlated_pair(seed: u64, n: usize, d: usize) -> (DMatrix<f64>, DMatrix<f64>) {
        let mut r = rng(seed);
        let shared = gaussian(&mut r, n, d);
        let x = &shared + gaussian(&mut r, n, d) * 0.5;
        let mix = gaussian(&mut r, d, d);
        let y = &shared * mix + gaussian(&mut r, n, d);
        (x, y)
    }

    #[test]
    fn eigenvalues_are_non_decreasing() {
        let (x, y) = correlated_pair(1, 300, 6);
        let model = Gcca::fit(&[x, y]).unwrap();
        assert_eq!(model.order(), DimensionOrder::Ascending);
        assert!(model.eigenvalues().windows(2).all(|w| w[0] <= w[1]));
        // Two full-rank views: eigenvalues come in +/- pairs.
        assert_eq!(model.components(), 12);
        let ev = model.eigenvalues();
        for k in 0..6 {
            assert_close(ev[k], -ev[11 - k], 1e-8);
        }
    }

    #[test]
    fn reversed_correlations_lead_with_the_maximum() {
        let (x, y) = correlated_pair(2, 300, 6);
        let model = Gcca::fit(&[x.clone(), y.clone()]).unwrap().positive_components();
        assert_eq!(model.components(), 6);

        let mapped = model.transform_views(&[x, y]).unwrap();
        let corr = CorrelationScorer::score(&mapped[0], &mapped[1])
            .unwrap()
            .with_order(model.order());

        // Per-dimension correlations reproduce the eigenvalues.
        for (c, l) in corr.values().iter().zip(model.eigenvalues()) {
            assert_close(*c, *l, 1e-8);
        }

        let descending = corr.clone().into_descending();
        assert_eq!(descending.order(), DimensionOrder::Descending);
        let first = descending.values()[0];
        assert_close(first, corr.max().unwrap(), 0.0);
        assert_close(first, *model.eigenvalues().last().unwrap(), 1e-8);
    }

    #[test]
    fn per_view_slices_sum_to_joint_projection() {
        let (x, y) = correlated_pair(3, 120, 4);
        let model = Gcca::fit(&[x.clone(), y.clone()]).unwrap();
        let parts = model.transform_views(&[x.clone(), y.clone()]).unwrap();
        let joint = model.transform(&[x, y]).unwrap();
        assert!((&parts[0] + &parts[1] - joint).norm() < 1e-9);
    }

    #[test]
    fn views_may_differ_in_width_and_rows() {
        let mut r = rng(4);
        let a = gaussian(&mut r, 80, 3);
        let b = gaussian(&mut r, 80, 5);
        let c = &a * gaussian(&mut r, 3, 2) + gaussian(&mut r, 80, 2) * 0.1;
        let model = Gcca::fit(&[a, b, c]).unwrap();
        assert_eq!(model.view_dims(), &[3, 5, 2]);

        // Full vector tables have more rows than the fitting sample.
        let bigger = gaussian(&mut r, 200, 5);
        let projected = model.transform_view(1, &bigger).unwrap();
        assert_eq!(projected.shape(), (200, model.components()));
        assert!(model.transform_view(1, &gaussian(&mut r, 10, 3)).is_err());
        assert!(model.transform_view(3, &bigger).is_err());
    }

    /// Column `j` of the Sylvester-Hadamard matrix of order `n` (a power of two).
    /// Columns 1.. are exactly zero-mean and exactly orthogonal in floating point.
    fn walsh_column(n: usize, j: usize) -> DVector<f64> {
        DVector::from_fn(n, |i, _| {
            if (i & j).count_ones() % 2 == 0 {
                1.0
            } else {
                -1.0
            }
        })
    }

    #[test]
    fn exact_rank_is_retained() {
        // The views share exactly `r` directions and are otherwise exactly
        // uncorrelated, so the pencil has 2r nonzero eigenvalues (+1 and -1)
        // and 2(d - r) exact zeros in its cross-covariance.
        let (n, d, r) = (256, 6, 2);
        let mut x = DMatrix::zeros(n, d);
        let mut y = DMatrix::zeros(n, d);
        for j in 0..d {
            x.set_column(j, &walsh_column(n, j + 1));
        }
        for j in 0..r {
            y.set_column(j, &walsh_column(n, j + 1));
        }
        for j in r..d {
            y.set_column(j, &walsh_column(n, d + j - r + 1));
        }

        let model = Gcca::fit(&[x, y]).unwrap();
        assert_eq!(model.components(), 2 * r);
        let positive = model.positive_components();
        assert_eq!(positive.components(), r);
        for l in positive.eigenvalues() {
            assert_close(*l, 1.0, 1e-9);
        }
    }

    #[test]
    fn duplicated_column_is_truncated_not_fatal() {
        let (mut x, y) = correlated_pair(7, 200, 5);
        let first = x.column(0).clone_owned();
        x.set_column(4, &first);

        let model = Gcca::fit(&[x.clone(), y.clone()]).unwrap();
        assert!(model.components() < 10);
        assert!(model.eigenvalues().windows(2).all(|w| w[0] <= w[1]));

        let positive = model.positive_components();
        let informative: Vec<usize> = (0..positive.components())
            .filter(|&k| positive.eigenvalues()[k] > 1e-6)
            .collect();
        // The first view only spans four directions.
        assert_eq!(informative.len(), 4);

        let mapped = positive.transform_views(&[x, y]).unwrap();
        let corr = CorrelationScorer::score(&mapped[0], &mapped[1]).unwrap();
        for &k in &informative {
            assert_close(corr.values()[k], positive.eigenvalues()[k], 1e-6);
        }
    }

    #[test]
    fn self_alignment_scores_one() {
        let mut r = rng(6);
        let x = gaussian(&mut r, 150, 5);
        let model = Gcca::fit(&[x.clone(), x.clone()]).unwrap().positive_components();
        assert_eq!(model.components(), 5);
        let mapped = model.transform_views(&[x.clone(), x]).unwrap();
        let corr = CorrelationScorer::score(&mapped[0], &mapped[1]).unwrap();
        assert!(corr.values().iter().all(|&c| (c - 1.0).abs() < 1e-8));
    }

    #[test]
    fn needs_two_views() {
        let mut r = rng(7);
        let x = gaussian(&mut r, 10, 2);
        assert!(matches!(Gcca::fit(&[x]), Err(UniversalityError::InvalidInput(_))));
    }
}
