// crates/universality-align/src/correlation.rs
//
// CorrelationScorer: dimension-wise Pearson correlation between two aligned
// sample matrices.
//
// Dimension `k` of one space is only ever compared with dimension `k` of the
// other. The full cross block is available for inspection, but the score is
// its diagonal, and the CCA measure is the mean of that diagonal.

use nalgebra::DMatrix;

use universality_core::{
    CorrelationVector, DimensionOrder, SampleMatrix, SharedVocabulary, SpaceSampler,
    UniversalityError, VectorSpace,
};

use crate::linalg::{center, column_means};

/// Stateless scorer for aligned sample matrices.
pub struct CorrelationScorer;

impl CorrelationScorer {
    fn check_shapes(a: &SampleMatrix, b: &SampleMatrix) -> Result<(), UniversalityError> {
        if a.shape() != b.shape() {
            return Err(UniversalityError::DimensionMismatch(format!(
                "cannot correlate {}x{} with {}x{}",
                a.nrows(),
                a.ncols(),
                b.nrows(),
                b.ncols()
            )));
        }
        if a.nrows() < 2 {
            return Err(UniversalityError::InsufficientSamples { found: a.nrows() });
        }
        Ok(())
    }

    /// Columns centred and scaled to unit L2 norm. Constant columns become zero.
    fn standardize(m: &SampleMatrix) -> DMatrix<f64> {
        let mut z = center(m, &column_means(m));
        for mut col in z.column_iter_mut() {
            let norm = col.norm();
            if norm > 0.0 {
                col /= norm;
            } else {
                col.fill(0.0);
            }
        }
        z
    }

    /// Per-dimension Pearson correlations between `a` and `b` (both `N x K`).
    ///
    /// A zero-variance dimension yields 0.0 for that entry.
    pub fn score(a: &SampleMatrix, b: &SampleMatrix) -> Result<CorrelationVector, UniversalityError> {
        Self::check_shapes(a, b)?;
        let ca = center(a, &column_means(a));
        let cb = center(b, &column_means(b));

        let values = ca
            .column_iter()
            .zip(cb.column_iter())
            .map(|(x, y)| {
                let denom = (x.norm_squared() * y.norm_squared()).sqrt();
                if denom > 0.0 {
                    (x.dot(&y) / denom).clamp(-1.0, 1.0)
                } else {
                    0.0
                }
            })
            .collect();
        Ok(CorrelationVector::new(values, DimensionOrder::Native))
    }

    /// The `K x K` cross block of the `2K x 2K` correlation matrix of the
    /// column-concatenation `[a | b]`: rows index `b`'s dimensions, columns
    /// index `a`'s.
    pub fn cross_correlation(
        a: &SampleMatrix,
        b: &SampleMatrix,
    ) -> Result<DMatrix<f64>, UniversalityError> {
        Self::check_shapes(a, b)?;
        let za = Self::standardize(a);
        let zb = Self::standardize(b);
        Ok(zb.transpose() * za)
    }

    /// Scalar CCA measure: mean of [`score`](Self::score).
    pub fn measure(a: &SampleMatrix, b: &SampleMatrix) -> Result<f64, UniversalityError> {
        Ok(Self::score(a, b)?.mean())
    }

    /// Sample both spaces on `vocab` and score them, tagging the result with `order`.
    pub fn score_spaces(
        source: &VectorSpace,
        target: &VectorSpace,
        vocab: &SharedVocabulary,
        order: DimensionOrder,
    ) -> Result<CorrelationVector, UniversalityError> {
        tracing::debug!("Calculating correlations on {} shared pairs", vocab.len());
        let (src, trg) = SpaceSampler::sample_pair(source, target, vocab)?;
        Ok(Self::score(&src, &trg)?.with_order(order))
    }
}
