// crates/universality-core/src/error.rs
//
// Error taxonomy shared by every crate in the workspace.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workspace-wide error type.
///
/// Every variant is fatal for the comparison that raised it. Iterative
/// solvers that run out of iterations do not produce an error; they attach
/// a [`ConvergenceWarning`] to their result instead.
#[derive(Debug, Error)]
pub enum UniversalityError {
    /// The shared vocabulary is empty or smaller than the configured minimum.
    #[error("Insufficient vocabulary overlap: {found} shared pairs, at least {required} required")]
    InsufficientOverlap { found: usize, required: usize },

    /// A sampler was asked for a token that the vector space does not contain.
    #[error("Token '{token}' is missing from vector space '{space}'")]
    MissingToken { token: String, space: String },

    /// Fewer than two paired rows were supplied for scoring.
    #[error("Insufficient samples: {found} paired rows, at least 2 required")]
    InsufficientSamples { found: usize },

    /// Two matrices that must share a shape do not.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Arguments outside the domain of an operation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A decomposition failed to produce a result.
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// A vocabulary, dictionary or vector file could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid or unreadable configuration.
    #[error("Config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for UniversalityError {
    fn from(e: std::io::Error) -> Self {
        UniversalityError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for UniversalityError {
    fn from(e: serde_json::Error) -> Self {
        UniversalityError::Parse(e.to_string())
    }
}

/// Non-fatal signal that an iterative solver hit its iteration cap.
///
/// The solver still returns the best solution it found; callers log the
/// warning and carry on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceWarning {
    /// Solver that stopped early (e.g. "cca", "noise-aware").
    pub algorithm: String,
    /// Iterations performed before stopping.
    pub iterations: usize,
    /// The configured iteration cap.
    pub max_iterations: usize,
    /// Size of the last update, in the solver's own convergence metric.
    pub last_change: f64,
}

impl ConvergenceWarning {
    pub fn new(algorithm: &str, iterations: usize, max_iterations: usize, last_change: f64) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            iterations,
            max_iterations,
            last_change,
        }
    }
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} did not converge after {}/{} iterations (last change {:.3e}); using best solution found",
            self.algorithm, self.iterations, self.max_iterations, self.last_change
        )
    }
}
