// crates/universality-core/src/scores.rs
//
// Per-dimension correlation vectors and their ordering contract.

use serde::{Deserialize, Serialize};

/// How the dimensions of a correlation vector are ordered.
///
/// GCCA produces components in ascending eigenvalue order, so the strongest
/// shared direction is last. Consumers that want "strongest first" call
/// [`CorrelationVector::into_descending`] instead of reversing by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DimensionOrder {
    /// Dimensions in the space's own coordinate order (no ranking implied).
    #[default]
    Native,
    /// Weakest component first (GCCA solver order).
    Ascending,
    /// Strongest component first.
    Descending,
}

/// Pearson correlation of each dimension of one space with the same dimension
/// of another. The arithmetic mean is the "CCA measure".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationVector {
    values: Vec<f64>,
    order: DimensionOrder,
}

impl CorrelationVector {
    pub fn new(values: Vec<f64>, order: DimensionOrder) -> Self {
        Self { values, order }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn order(&self) -> DimensionOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Tag the vector with the ordering of the alignment that produced it.
    pub fn with_order(mut self, order: DimensionOrder) -> Self {
        self.order = order;
        self
    }

    /// The CCA measure: mean correlation over all dimensions (0.0 when empty).
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Largest per-dimension correlation.
    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// Strongest-first view. Only ascending vectors are reversed; native
    /// vectors carry no ranking and are returned as they are.
    pub fn into_descending(self) -> Self {
        match self.order {
            DimensionOrder::Ascending => {
                let mut values = self.values;
                values.reverse();
                Self {
                    values,
                    order: DimensionOrder::Descending,
                }
            }
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_is_cca_measure() {
        let v = CorrelationVector::new(vec![0.2, 0.4, 0.9], DimensionOrder::Native);
        assert!((v.mean() - 0.5).abs() < 1e-12);
        assert_eq!(v.max(), Some(0.9));
    }

    #[test]
    fn ascending_vectors_are_reversed_once() {
        let v = CorrelationVector::new(vec![0.1, 0.5, 0.8], DimensionOrder::Ascending);
        let d = v.into_descending();
        assert_eq!(d.values(), &[0.8, 0.5, 0.1]);
        assert_eq!(d.order(), DimensionOrder::Descending);
        // Already descending: unchanged.
        let again = d.clone().into_descending();
        assert_eq!(again, d);
    }

    #[test]
    fn native_order_is_left_alone() {
        let v = CorrelationVector::new(vec![0.3, 0.1], DimensionOrder::Native);
        assert_eq!(v.clone().into_descending(), v);
    }

    #[test]
    fn empty_vector_mean_is_zero() {
        let v = CorrelationVector::new(Vec::new(), DimensionOrder::Native);
        assert_eq!(v.mean(), 0.0);
        assert!(v.max().is_none());
    }
}
