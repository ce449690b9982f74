// crates/universality-align/src/noise_aware.rs
//
// Noise-aware Procrustes alignment.
//
// Anchor pairs from a bilingual dictionary are partly mistranslations. This
// aligner fits the rotation and an inlier/outlier partition jointly with EM:
//
//   clean pair:  trg_i ~ N(src_i * W, sigma^2 I)
//   noisy pair:  trg_i ~ N(mu, tau^2 I)
//
// E-step: posterior probability that each pair is clean.
// M-step: weighted Procrustes for W, then sigma^2, mu, tau^2 and the inlier
// fraction alpha. Iteration stops once alpha moves less than the tolerance
// or the iteration cap is reached; in the latter case the current estimate is
// returned together with a ConvergenceWarning.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use universality_core::{
    AlignmentDiagnostics, AlignmentOutcome, Algorithm, ConvergenceWarning, DimensionOrder,
    SampleMatrix, SharedVocabulary, SpaceAligner, SpaceSampler, UniversalityError, VectorSpace,
};

use crate::linalg::{column_means, procrustes_rotation};

/// Lower bound on variances, relative to the target's overall spread.
const VARIANCE_FLOOR: f64 = 1e-12;
/// Alpha is kept strictly inside (0, 1) so both log-priors stay finite.
const ALPHA_BOUND: f64 = 1e-9;

/// Configuration for the noise-aware EM loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseAwareConfig {
    /// Hard cap on EM iterations. Default: 100.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Convergence threshold on the change of alpha. Default: 1e-6.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Prior inlier fraction used for the first E-step. Default: 0.5.
    #[serde(default = "default_initial_alpha")]
    pub initial_alpha: f64,
}

fn default_max_iterations() -> usize {
    100
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_initial_alpha() -> f64 {
    0.5
}

impl Default for NoiseAwareConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            initial_alpha: default_initial_alpha(),
        }
    }
}

/// Result of a noise-aware fit.
#[derive(Debug, Clone)]
pub struct NoiseAwareFit {
    /// Orthogonal `D x D` rotation for the source space.
    pub rotation: DMatrix<f64>,
    /// Estimated fraction of clean pairs.
    pub alpha: f64,
    /// Rows whose posterior clean probability exceeds 0.5.
    pub clean_indices: Vec<usize>,
    /// All other rows.
    pub noisy_indices: Vec<usize>,
    /// EM iterations performed.
    pub iterations: usize,
    /// Set when the iteration cap was reached.
    pub warning: Option<ConvergenceWarning>,
}

/// Procrustes with joint inlier/outlier estimation.
#[derive(Debug, Clone, Default)]
pub struct NoiseAwareProcrustes {
    pub config: NoiseAwareConfig,
}

fn squared_row_distances(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Vec<f64> {
    (a - b).row_iter().map(|r| r.norm_squared()).collect()
}

/// Rotation for the weighted problem `min_W sum_i p_i ||src_i W - trg_i||^2`.
fn weighted_rotation(
    src: &SampleMatrix,
    trg: &SampleMatrix,
    weights: &[f64],
) -> Result<DMatrix<f64>, UniversalityError> {
    let mut weighted_trg = trg.clone();
    for (mut row, &p) in weighted_trg.row_iter_mut().zip(weights) {
        row *= p;
    }
    procrustes_rotation(&(weighted_trg.transpose() * src))
}

impl NoiseAwareProcrustes {
    pub fn new(config: NoiseAwareConfig) -> Self {
        Self { config }
    }

    /// Fit rotation, inlier fraction and the clean/noisy partition.
    pub fn fit(&self, src: &SampleMatrix, trg: &SampleMatrix) -> Result<NoiseAwareFit, UniversalityError> {
        if src.shape() != trg.shape() {
            return Err(UniversalityError::DimensionMismatch(format!(
                "noise-aware Procrustes needs equal shapes, got {}x{} and {}x{}",
                src.nrows(),
                src.ncols(),
                trg.nrows(),
                trg.ncols()
            )));
        }
        let n = src.nrows();
        if n < 2 {
            return Err(UniversalityError::InsufficientSamples { found: n });
        }
        if self.config.max_iterations == 0 {
            return Err(UniversalityError::InvalidInput(
                "noise-aware max_iterations must be at least 1".to_string(),
            ));
        }
        let dim = src.ncols() as f64;

        // Noise model starts as the spread of the whole target sample.
        let mut mu: DVector<f64> = column_means(trg);
        let mut tau2 = spread(trg, &mu, &vec![1.0; n], dim);
        let floor = (tau2 * VARIANCE_FLOOR).max(f64::MIN_POSITIVE);
        tau2 = tau2.max(floor);

        let mut rotation = weighted_rotation(src, trg, &vec![1.0; n])?;
        let mut sigma2 = {
            let residuals = squared_row_distances(&(src * &rotation), trg);
            (residuals.iter().sum::<f64>() / (n as f64 * dim)).max(floor)
        };

        let mut alpha = self.config.initial_alpha.clamp(ALPHA_BOUND, 1.0 - ALPHA_BOUND);
        let mut posterior = vec![alpha; n];
        let mut iterations = 0;
        let mut last_change = f64::INFINITY;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            iterations += 1;

            // E-step.
            let residuals = squared_row_distances(&(src * &rotation), trg);
            let log_norm_clean = -0.5 * dim * (2.0 * PI * sigma2).ln();
            let log_norm_noisy = -0.5 * dim * (2.0 * PI * tau2).ln();
            for (i, row) in trg.row_iter().enumerate() {
                let deviation = (row.transpose() - &mu).norm_squared();
                let log_clean = alpha.ln() + log_norm_clean - residuals[i] / (2.0 * sigma2);
                let log_noisy = (1.0 - alpha).ln() + log_norm_noisy - deviation / (2.0 * tau2);
                posterior[i] = 1.0 / (1.0 + (log_noisy - log_clean).exp());
            }

            // M-step.
            let new_alpha = (posterior.iter().sum::<f64>() / n as f64)
                .clamp(ALPHA_BOUND, 1.0 - ALPHA_BOUND);
            rotation = weighted_rotation(src, trg, &posterior)?;

            let clean_mass: f64 = posterior.iter().sum();
            if clean_mass > 0.0 {
                let residuals = squared_row_distances(&(src * &rotation), trg);
                let weighted: f64 = residuals.iter().zip(&posterior).map(|(r, p)| r * p).sum();
                sigma2 = (weighted / (clean_mass * dim)).max(floor);
            }

            let noisy_weights: Vec<f64> = posterior.iter().map(|p| 1.0 - p).collect();
            let noisy_mass: f64 = noisy_weights.iter().sum();
            if noisy_mass > ALPHA_BOUND {
                let mut weighted_mean = DVector::zeros(trg.ncols());
                for (row, w) in trg.row_iter().zip(&noisy_weights) {
                    weighted_mean += row.transpose() * *w;
                }
                mu = weighted_mean / noisy_mass;
                tau2 = spread(trg, &mu, &noisy_weights, dim).max(floor);
            }

            last_change = (new_alpha - alpha).abs();
            alpha = new_alpha;
            tracing::debug!(
                "noise-aware iteration {}: alpha={:.4} sigma2={:.3e} tau2={:.3e}",
                iterations,
                alpha,
                sigma2,
                tau2
            );
            if last_change < self.config.tolerance {
                converged = true;
                break;
            }
        }

        let warning = if converged {
            None
        } else {
            let w = ConvergenceWarning::new(
                "noise-aware",
                iterations,
                self.config.max_iterations,
                last_change,
            );
            tracing::warn!("{}", w);
            Some(w)
        };

        let (clean_indices, noisy_indices): (Vec<usize>, Vec<usize>) =
            (0..n).partition(|&i| posterior[i] > 0.5);

        Ok(NoiseAwareFit {
            rotation,
            alpha,
            clean_indices,
            noisy_indices,
            iterations,
            warning,
        })
    }
}

/// Weighted isotropic variance of the rows of `m` around `mu`.
fn spread(m: &DMatrix<f64>, mu: &DVector<f64>, weights: &[f64], dim: f64) -> f64 {
    let mass: f64 = weights.iter().sum();
    if mass <= 0.0 {
        return 0.0;
    }
    let total: f64 = m
        .row_iter()
        .zip(weights)
        .map(|(row, w)| w * (row.transpose() - mu).norm_squared())
        .sum();
    total / (mass * dim)
}

impl SpaceAligner for NoiseAwareProcrustes {
    fn algorithm(&self) -> Algorithm {
        Algorithm::NoiseAware
    }

    fn align(
        &self,
        source: &VectorSpace,
        target: &VectorSpace,
        vocab: &SharedVocabulary,
    ) -> Result<AlignmentOutcome, UniversalityError> {
        tracing::info!(
            "Calculating rotation matrix with noise-aware algorithm and applying it to {}",
            source.name()
        );
        let (src, trg) = SpaceSampler::sample_pair(source, target, vocab)?;
        let fit = self.fit(&src, &trg)?;
        tracing::info!("Percentage of clean indices: {:.4}", fit.alpha);

        Ok(AlignmentOutcome {
            source: source.transformed(&fit.rotation)?,
            target: target.clone(),
            diagnostics: AlignmentDiagnostics {
                order: DimensionOrder::Native,
                inlier_fraction: Some(fit.alpha),
                clean_indices: Some(fit.clean_indices),
                noisy_indices: Some(fit.noisy_indices),
                warnings: fit.warning.into_iter().collect(),
                ..AlignmentDiagnostics::default()
            },
        })
    }
}
