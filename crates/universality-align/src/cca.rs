// crates/universality-align/src/cca.rs
//
// Pairwise canonical correlation analysis.
//
// Components are extracted one at a time with a power iteration on the
// standardised, progressively deflated blocks (NIPALS, CCA mode):
//
//   x_w  <- pinv(X) * y_score,  normalised
//   y_w  <- pinv(Y) * X * x_w,  normalised
//   y_score <- Y * y_w
//
// until the x weights stop moving. Each component's inner loop is capped by
// `max_iterations`; hitting the cap keeps the current weights and records a
// ConvergenceWarning instead of failing. Both full vector tables are then
// projected through the fitted rotations.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use universality_core::{
    AlignmentDiagnostics, AlignmentOutcome, Algorithm, ConvergenceWarning, DimensionOrder,
    SampleMatrix, SharedVocabulary, SpaceAligner, SpaceSampler, UniversalityError, VectorSpace,
};

use crate::linalg::{center, column_means, pinv};

/// Configuration for pairwise CCA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CcaConfig {
    /// Number of canonical components. `None` uses `min(D_src, D_trg)`.
    #[serde(default)]
    pub components: Option<usize>,
    /// Iteration cap for each component's power iteration. Default: 5000.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Convergence threshold on the squared change of the x weights. Default: 1e-6.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Divide each column by its standard deviation before fitting. Default: true.
    #[serde(default = "default_scale")]
    pub scale: bool,
}

fn default_max_iterations() -> usize {
    5000
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_scale() -> bool {
    true
}

impl Default for CcaConfig {
    fn default() -> Self {
        Self {
            components: None,
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            scale: default_scale(),
        }
    }
}

/// Fitted pair of linear maps.
#[derive(Debug, Clone)]
pub struct CcaModel {
    x_mean: DVector<f64>,
    x_std: DVector<f64>,
    y_mean: DVector<f64>,
    y_std: DVector<f64>,
    x_rotations: DMatrix<f64>,
    y_rotations: DMatrix<f64>,
    /// One entry per component whose power iteration hit the cap.
    pub warnings: Vec<ConvergenceWarning>,
}

impl CcaModel {
    pub fn components(&self) -> usize {
        self.x_rotations.ncols()
    }

    fn project(
        data: &DMatrix<f64>,
        mean: &DVector<f64>,
        std: &DVector<f64>,
        rotations: &DMatrix<f64>,
        side: &str,
    ) -> Result<DMatrix<f64>, UniversalityError> {
        if data.ncols() != mean.len() {
            return Err(UniversalityError::DimensionMismatch(format!(
                "CCA {} map expects {} columns, got {}",
                side,
                mean.len(),
                data.ncols()
            )));
        }
        let mut standardized = center(data, mean);
        for (j, mut col) in standardized.column_iter_mut().enumerate() {
            col /= std[j];
        }
        Ok(standardized * rotations)
    }

    /// Project source-space rows onto the canonical components.
    pub fn transform_source(&self, data: &DMatrix<f64>) -> Result<DMatrix<f64>, UniversalityError> {
        Self::project(data, &self.x_mean, &self.x_std, &self.x_rotations, "source")
    }

    /// Project target-space rows onto the canonical components.
    pub fn transform_target(&self, data: &DMatrix<f64>) -> Result<DMatrix<f64>, UniversalityError> {
        Self::project(data, &self.y_mean, &self.y_std, &self.y_rotations, "target")
    }
}

/// Pairwise CCA aligner.
#[derive(Debug, Clone, Default)]
pub struct Cca {
    pub config: CcaConfig,
}

/// Weights of one component plus how the power iteration ended.
struct PowerIteration {
    x_weights: DVector<f64>,
    y_weights: DVector<f64>,
    iterations: usize,
    last_change: f64,
    converged: bool,
}

/// Column standard deviations (`N - 1`), with zero replaced by one.
fn column_stds(m: &DMatrix<f64>, mean: &DVector<f64>) -> DVector<f64> {
    let n = m.nrows();
    let centered = center(m, mean);
    DVector::from_iterator(
        m.ncols(),
        centered.column_iter().map(|c| {
            let sd = (c.norm_squared() / (n - 1) as f64).sqrt();
            if sd > 0.0 {
                sd
            } else {
                1.0
            }
        }),
    )
}

impl Cca {
    pub fn new(config: CcaConfig) -> Self {
        Self { config }
    }

    fn power_iteration(
        &self,
        x: &DMatrix<f64>,
        y: &DMatrix<f64>,
    ) -> Result<PowerIteration, UniversalityError> {
        let eps = f64::EPSILON;

        // Start from the strongest remaining target column.
        let start = y
            .column_iter()
            .enumerate()
            .max_by(|a, b| a.1.norm_squared().total_cmp(&b.1.norm_squared()))
            .map(|(j, _)| j)
            .ok_or_else(|| UniversalityError::InvalidInput("CCA target block is empty".to_string()))?;
        let mut y_score: DVector<f64> = y.column(start).into_owned();

        let x_pinv = pinv(x)?;
        let y_pinv = pinv(y)?;

        let mut x_weights_old = DVector::zeros(x.ncols());
        let mut x_weights = DVector::zeros(x.ncols());
        let mut y_weights = DVector::zeros(y.ncols());
        let mut last_change = f64::INFINITY;

        for i in 0..self.config.max_iterations {
            x_weights = &x_pinv * &y_score;
            x_weights /= x_weights.norm() + eps;
            let x_score = x * &x_weights;

            y_weights = &y_pinv * &x_score;
            y_weights /= y_weights.norm() + eps;
            y_score = (y * &y_weights) / (y_weights.norm_squared() + eps);

            last_change = (&x_weights - &x_weights_old).norm_squared();
            if last_change < self.config.tolerance || y.ncols() == 1 {
                return Ok(PowerIteration {
                    x_weights,
                    y_weights,
                    iterations: i + 1,
                    last_change,
                    converged: true,
                });
            }
            x_weights_old.copy_from(&x_weights);
        }

        Ok(PowerIteration {
            x_weights,
            y_weights,
            iterations: self.config.max_iterations,
            last_change,
            converged: false,
        })
    }

    /// Fit `K` canonical components on paired samples.
    pub fn fit(&self, src: &SampleMatrix, trg: &SampleMatrix) -> Result<CcaModel, UniversalityError> {
        let n = src.nrows();
        if trg.nrows() != n {
            return Err(UniversalityError::DimensionMismatch(format!(
                "CCA needs paired rows, got {} and {}",
                n,
                trg.nrows()
            )));
        }
        if n < 2 {
            return Err(UniversalityError::InsufficientSamples { found: n });
        }
        if self.config.max_iterations == 0 {
            return Err(UniversalityError::InvalidInput(
                "CCA max_iterations must be at least 1".to_string(),
            ));
        }
        let max_k = src.ncols().min(trg.ncols());
        let k = self.config.components.unwrap_or(max_k);
        if k == 0 || k > max_k {
            return Err(UniversalityError::InvalidInput(format!(
                "CCA components must be in 1..={}, got {}",
                max_k, k
            )));
        }

        let x_mean = column_means(src);
        let y_mean = column_means(trg);
        let (x_std, y_std) = if self.config.scale {
            (column_stds(src, &x_mean), column_stds(trg, &y_mean))
        } else {
            (
                DVector::from_element(src.ncols(), 1.0),
                DVector::from_element(trg.ncols(), 1.0),
            )
        };

        let mut xk = center(src, &x_mean);
        for (j, mut col) in xk.column_iter_mut().enumerate() {
            col /= x_std[j];
        }
        let mut yk = center(trg, &y_mean);
        for (j, mut col) in yk.column_iter_mut().enumerate() {
            col /= y_std[j];
        }

        let mut x_w = DMatrix::zeros(src.ncols(), k);
        let mut y_w = DMatrix::zeros(trg.ncols(), k);
        let mut x_load = DMatrix::zeros(src.ncols(), k);
        let mut y_load = DMatrix::zeros(trg.ncols(), k);
        let mut warnings = Vec::new();

        for comp in 0..k {
            let pi = self.power_iteration(&xk, &yk)?;
            if !pi.converged {
                let w = ConvergenceWarning::new(
                    "cca",
                    pi.iterations,
                    self.config.max_iterations,
                    pi.last_change,
                );
                tracing::warn!("component {}: {}", comp, w);
                warnings.push(w);
            }

            let x_scores = &xk * &pi.x_weights;
            let y_scores = &yk * &pi.y_weights;
            let x_ss = x_scores.norm_squared();
            let y_ss = y_scores.norm_squared();

            // Deflate each block by its own scores.
            if x_ss > 0.0 {
                let loading = xk.transpose() * &x_scores / x_ss;
                xk -= &x_scores * loading.transpose();
                x_load.set_column(comp, &loading);
            }
            if y_ss > 0.0 {
                let loading = yk.transpose() * &y_scores / y_ss;
                yk -= &y_scores * loading.transpose();
                y_load.set_column(comp, &loading);
            }
            x_w.set_column(comp, &pi.x_weights);
            y_w.set_column(comp, &pi.y_weights);
        }

        let x_rotations = &x_w * pinv(&(x_load.transpose() * &x_w))?;
        let y_rotations = &y_w * pinv(&(y_load.transpose() * &y_w))?;

        Ok(CcaModel {
            x_mean,
            x_std,
            y_mean,
            y_std,
            x_rotations,
            y_rotations,
            warnings,
        })
    }
}

impl SpaceAligner for Cca {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Cca
    }

    fn align(
        &self,
        source: &VectorSpace,
        target: &VectorSpace,
        vocab: &SharedVocabulary,
    ) -> Result<AlignmentOutcome, UniversalityError> {
        tracing::info!("Calculating mapping based on CCA and applying it to both spaces");
        let (src, trg) = SpaceSampler::sample_pair(source, target, vocab)?;
        let model = self.fit(&src, &trg)?;

        let mapped_source = source.with_vectors(model.transform_source(source.vectors())?)?;
        let mapped_target = target.with_vectors(model.transform_target(target.vectors())?)?;

        Ok(AlignmentOutcome {
            source: mapped_source,
            target: mapped_target,
            diagnostics: AlignmentDiagnostics {
                order: DimensionOrder::Native,
                warnings: model.warnings,
                ..AlignmentDiagnostics::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::CorrelationScorer;
    use crate::testing::{gaussian, rng};

    /// Two views sharing a 2-dimensional latent signal with decreasing strength.
    fn correlated_views() -> (DMatrix<f64>, DMatrix<f64>) {
        let mut r = rng(31);
        let n = 400;
        let latent = gaussian(&mut r, n, 2);
        let mut x = gaussian(&mut r, n, 4);
        let mut y = gaussian(&mut r, n, 3);
        for i in 0..n {
            x[(i, 0)] += 3.0 * latent[(i, 0)];
            y[(i, 1)] += 3.0 * latent[(i, 0)];
            x[(i, 2)] += 1.0 * latent[(i, 1)];
            y[(i, 0)] += 1.0 * latent[(i, 1)];
        }
        (x, y)
    }

    #[test]
    fn first_component_carries_strongest_correlation() {
        let (x, y) = correlated_views();
        let model = Cca::default().fit(&x, &y).unwrap();
        assert_eq!(model.components(), 3);
        assert!(model.warnings.is_empty());

        let xs = model.transform_source(&x).unwrap();
        let ys = model.transform_target(&y).unwrap();
        let corr = CorrelationScorer::score(&xs, &ys).unwrap();
        let v = corr.values();
        assert!(v[0] > 0.85, "first canonical correlation {}", v[0]);
        assert!(v[1] > 0.4, "second canonical correlation {}", v[1]);
        assert!(v[0] >= v[1] && v[1] >= v[2].abs());
    }

    #[test]
    fn self_alignment_scores_one() {
        let mut r = rng(4);
        let x = gaussian(&mut r, 200, 5);
        let model = Cca::default().fit(&x, &x).unwrap();
        let xs = model.transform_source(&x).unwrap();
        let ys = model.transform_target(&x).unwrap();
        let corr = CorrelationScorer::score(&xs, &ys).unwrap();
        assert!(corr.values().iter().all(|&c| (c - 1.0).abs() < 1e-6), "{:?}", corr);
    }

    #[test]
    fn iteration_cap_is_non_fatal() {
        let (x, y) = correlated_views();
        let cca = Cca::new(CcaConfig {
            max_iterations: 1,
            ..CcaConfig::default()
        });
        let model = cca.fit(&x, &y).unwrap();
        assert!(!model.warnings.is_empty());
        assert!(model.warnings.iter().all(|w| w.iterations == 1 && w.algorithm == "cca"));
        // Best-effort maps are still usable.
        let xs = model.transform_source(&x).unwrap();
        assert_eq!(xs.shape(), (400, 3));
    }

    #[test]
    fn too_many_components_rejected() {
        let (x, y) = correlated_views();
        let cca = Cca::new(CcaConfig {
            components: Some(4),
            ..CcaConfig::default()
        });
        assert!(matches!(cca.fit(&x, &y), Err(UniversalityError::InvalidInput(_))));
    }

    #[test]
    fn transform_checks_width() {
        let (x, y) = correlated_views();
        let model = Cca::default().fit(&x, &y).unwrap();
        assert!(model.transform_source(&y).is_err());
    }
}
