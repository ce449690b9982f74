// crates/universality-align/src/procrustes.rs
//
// Orthogonal Procrustes alignment.
//
// Finds the orthogonal W minimising ||SRC * W - TRG||_F from the SVD of
// TRG^T * SRC = U * S * V^T, W = V * U^T, and rotates the entire source
// vector table. When the cross-covariance is rank-deficient the SVD fills the
// null space with an arbitrary orthogonal completion; the result is still
// orthogonal but not unique, and it is returned as is.

use nalgebra::DMatrix;

use universality_core::{
    AlignmentDiagnostics, AlignmentOutcome, Algorithm, DimensionOrder, SampleMatrix,
    SharedVocabulary, SpaceAligner, SpaceSampler, UniversalityError, VectorSpace,
};

use crate::linalg::procrustes_rotation;

/// Orthogonal Procrustes rotation of the source space onto the target space.
#[derive(Debug, Clone, Default)]
pub struct OrthogonalProcrustes;

impl OrthogonalProcrustes {
    pub fn new() -> Self {
        Self
    }

    /// Fit the `D x D` rotation on paired samples.
    pub fn fit(src: &SampleMatrix, trg: &SampleMatrix) -> Result<DMatrix<f64>, UniversalityError> {
        if src.shape() != trg.shape() {
            return Err(UniversalityError::DimensionMismatch(format!(
                "Procrustes needs equal shapes, got {}x{} and {}x{}",
                src.nrows(),
                src.ncols(),
                trg.nrows(),
                trg.ncols()
            )));
        }
        if src.nrows() == 0 {
            return Err(UniversalityError::InsufficientSamples { found: 0 });
        }
        procrustes_rotation(&(trg.transpose() * src))
    }
}

impl SpaceAligner for OrthogonalProcrustes {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Procrustes
    }

    fn align(
        &self,
        source: &VectorSpace,
        target: &VectorSpace,
        vocab: &SharedVocabulary,
    ) -> Result<AlignmentOutcome, UniversalityError> {
        tracing::info!(
            "Calculating rotation matrix (Procrustes problem) and applying it to {}",
            source.name()
        );
        let (src, trg) = SpaceSampler::sample_pair(source, target, vocab)?;
        let w = Self::fit(&src, &trg)?;
        Ok(AlignmentOutcome {
            source: source.transformed(&w)?,
            target: target.clone(),
            diagnostics: AlignmentDiagnostics {
                order: DimensionOrder::Native,
                ..AlignmentDiagnostics::default()
            },
        })
    }
}
