// crates/universality-core/src/traits.rs

use serde::{Deserialize, Serialize};

use crate::algorithm::Algorithm;
use crate::error::{ConvergenceWarning, UniversalityError};
use crate::scores::DimensionOrder;
use crate::space::VectorSpace;
use crate::vocabulary::SharedVocabulary;

/// Side information produced by an alignment run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignmentDiagnostics {
    /// Ordering of dimensions in the mapped spaces.
    pub order: DimensionOrder,
    /// Estimated inlier fraction (noise-aware Procrustes only).
    pub inlier_fraction: Option<f64>,
    /// Anchor rows judged clean (noise-aware Procrustes only).
    pub clean_indices: Option<Vec<usize>>,
    /// Anchor rows judged noisy (noise-aware Procrustes only).
    pub noisy_indices: Option<Vec<usize>>,
    /// Retained eigenvalues in solver order (GCCA only).
    pub eigenvalues: Option<Vec<f64>>,
    /// Iterative solvers that stopped at their cap.
    pub warnings: Vec<ConvergenceWarning>,
}

/// Mapped snapshots of both spaces. An aligner that only rotates the source
/// returns the target unchanged.
#[derive(Debug, Clone)]
pub struct AlignmentOutcome {
    pub source: VectorSpace,
    pub target: VectorSpace,
    pub diagnostics: AlignmentDiagnostics,
}

/// Trait for alignment strategies.
///
/// Implemented by universality-align (Procrustes, noise-aware Procrustes,
/// CCA and GCCA). Implementations fit on the anchor rows given by `vocab`
/// and apply the fitted transform to the complete vector tables.
pub trait SpaceAligner: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    fn align(
        &self,
        source: &VectorSpace,
        target: &VectorSpace,
        vocab: &SharedVocabulary,
    ) -> Result<AlignmentOutcome, UniversalityError>;
}
