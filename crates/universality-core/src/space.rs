// crates/universality-core/src/space.rs
//
// VectorSpace: an immutable token -> vector table.
//
// Alignment never mutates a space in place. Applying a transform yields a new
// snapshot that shares the token index with its parent; the caller decides
// whether to replace the old reference.

use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::DMatrix;

use crate::error::UniversalityError;

/// A dense `N x D` matrix whose rows are token vectors in a fixed order.
pub type SampleMatrix = DMatrix<f64>;

#[derive(Debug)]
struct TokenIndex {
    tokens: Vec<String>,
    positions: HashMap<String, usize>,
}

/// A named embedding space: a token index plus an `N x D` vector table.
#[derive(Debug, Clone)]
pub struct VectorSpace {
    name: String,
    index: Arc<TokenIndex>,
    vectors: DMatrix<f64>,
}

impl VectorSpace {
    /// Build a space from a token list and a matrix with one row per token.
    ///
    /// Fails if the row count differs from the token count or a token repeats.
    pub fn new(
        name: &str,
        tokens: Vec<String>,
        vectors: DMatrix<f64>,
    ) -> Result<Self, UniversalityError> {
        if tokens.len() != vectors.nrows() {
            return Err(UniversalityError::DimensionMismatch(format!(
                "space '{}' has {} tokens but {} vector rows",
                name,
                tokens.len(),
                vectors.nrows()
            )));
        }

        let mut positions = HashMap::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            if positions.insert(token.clone(), i).is_some() {
                return Err(UniversalityError::InvalidInput(format!(
                    "duplicate token '{}' in space '{}'",
                    token, name
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            index: Arc::new(TokenIndex { tokens, positions }),
            vectors,
        })
    }

    /// Build a space from `(token, vector)` rows. All vectors must share a length.
    pub fn from_rows(name: &str, rows: Vec<(String, Vec<f64>)>) -> Result<Self, UniversalityError> {
        let dim = rows.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut tokens = Vec::with_capacity(rows.len());
        let mut flat = Vec::with_capacity(rows.len() * dim);
        for (token, values) in rows {
            if values.len() != dim {
                return Err(UniversalityError::DimensionMismatch(format!(
                    "token '{}' has {} components, expected {}",
                    token,
                    values.len(),
                    dim
                )));
            }
            tokens.push(token);
            flat.extend(values);
        }
        let vectors = DMatrix::from_row_slice(tokens.len(), dim, &flat);
        Self::new(name, tokens, vectors)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.index.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimensionality `D`.
    pub fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    /// Tokens in row order.
    pub fn tokens(&self) -> &[String] {
        &self.index.tokens
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.positions.contains_key(token)
    }

    /// Row index of `token`, if present.
    pub fn position(&self, token: &str) -> Option<usize> {
        self.index.positions.get(token).copied()
    }

    /// The full vector table.
    pub fn vectors(&self) -> &DMatrix<f64> {
        &self.vectors
    }

    /// Vector for a single token.
    pub fn vector(&self, token: &str) -> Option<Vec<f64>> {
        self.position(token)
            .map(|row| self.vectors.row(row).iter().copied().collect())
    }

    /// Return a new snapshot with the same tokens and a replacement vector table.
    ///
    /// The replacement may have a different width (CCA-family projections change `D`)
    /// but must keep one row per token.
    pub fn with_vectors(&self, vectors: DMatrix<f64>) -> Result<Self, UniversalityError> {
        if vectors.nrows() != self.len() {
            return Err(UniversalityError::DimensionMismatch(format!(
                "replacement table for '{}' has {} rows, expected {}",
                self.name,
                vectors.nrows(),
                self.len()
            )));
        }
        Ok(Self {
            name: self.name.clone(),
            index: Arc::clone(&self.index),
            vectors,
        })
    }

    /// Right-multiply the whole vector table by `w` (`vectors <- vectors * w`).
    pub fn transformed(&self, w: &DMatrix<f64>) -> Result<Self, UniversalityError> {
        if w.nrows() != self.dim() {
            return Err(UniversalityError::DimensionMismatch(format!(
                "transform has {} rows but space '{}' has dimension {}",
                w.nrows(),
                self.name,
                self.dim()
            )));
        }
        self.with_vectors(&self.vectors * w)
    }

    /// Copy of this space with every row scaled to unit L2 norm. Zero rows stay zero.
    pub fn l2_normalized(&self) -> Self {
        let mut vectors = self.vectors.clone();
        for mut row in vectors.row_iter_mut() {
            let norm = row.norm();
            if norm > 0.0 {
                row /= norm;
            }
        }
        Self {
            name: self.name.clone(),
            index: Arc::clone(&self.index),
            vectors,
        }
    }

    /// Same space under a different name.
    pub fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> VectorSpace {
        VectorSpace::from_rows(
            "tiny",
            vec![
                ("a".to_string(), vec![3.0, 4.0]),
                ("b".to_string(), vec![1.0, 0.0]),
                ("c".to_string(), vec![0.0, 0.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn lookup_by_token() {
        let space = tiny();
        assert_eq!(space.len(), 3);
        assert_eq!(space.dim(), 2);
        assert_eq!(space.position("b"), Some(1));
        assert_eq!(space.vector("a"), Some(vec![3.0, 4.0]));
        assert!(!space.contains("z"));
    }

    #[test]
    fn duplicate_tokens_rejected() {
        let result = VectorSpace::from_rows(
            "dup",
            vec![("x".to_string(), vec![1.0]), ("x".to_string(), vec![2.0])],
        );
        assert!(matches!(result, Err(UniversalityError::InvalidInput(_))));
    }

    #[test]
    fn ragged_rows_rejected() {
        let result = VectorSpace::from_rows(
            "ragged",
            vec![("x".to_string(), vec![1.0, 2.0]), ("y".to_string(), vec![2.0])],
        );
        assert!(matches!(result, Err(UniversalityError::DimensionMismatch(_))));
    }

    #[test]
    fn transform_returns_new_snapshot() {
        let space = tiny();
        let swap = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let rotated = space.transformed(&swap).unwrap();
        assert_eq!(rotated.vector("a"), Some(vec![4.0, 3.0]));
        // The original snapshot is untouched.
        assert_eq!(space.vector("a"), Some(vec![3.0, 4.0]));
        assert_eq!(rotated.tokens(), space.tokens());
    }

    #[test]
    fn transform_with_wrong_shape_fails() {
        let space = tiny();
        let w = DMatrix::<f64>::identity(3, 3);
        assert!(space.transformed(&w).is_err());
    }

    #[test]
    fn l2_normalization_keeps_zero_rows() {
        let normed = tiny().l2_normalized();
        assert_eq!(normed.vector("a"), Some(vec![0.6, 0.8]));
        assert_eq!(normed.vector("c"), Some(vec![0.0, 0.0]));
    }

    #[test]
    fn projection_may_change_width() {
        let space = tiny();
        let narrow = space.with_vectors(DMatrix::zeros(3, 1)).unwrap();
        assert_eq!(narrow.dim(), 1);
        assert!(space.with_vectors(DMatrix::zeros(2, 1)).is_err());
    }
}
