// crates/universality-align/src/lib.rs
//
// universality-align: the alignment engine and correlation scorer.
//
// Four interchangeable strategies implement `SpaceAligner`:
// orthogonal Procrustes, noise-aware Procrustes, pairwise CCA and GCCA.
// `CorrelationScorer` turns two aligned sample matrices into per-dimension
// Pearson correlations and the scalar CCA measure.

pub mod cca;
pub mod correlation;
pub mod engine;
pub mod gcca;
pub mod linalg;
pub mod noise_aware;
pub mod procrustes;

#[cfg(test)]
mod testing;

pub use cca::{Cca, CcaConfig, CcaModel};
pub use correlation::CorrelationScorer;
pub use engine::{build_aligner, compare, Comparison, EngineConfig};
pub use gcca::{Gcca, GccaModel};
pub use noise_aware::{NoiseAwareConfig, NoiseAwareFit, NoiseAwareProcrustes};
pub use procrustes::OrthogonalProcrustes;
