// crates/universality-core/src/sampler.rs
//
// SpaceSampler: gathers the rows of a vector space in anchor order.

use crate::error::UniversalityError;
use crate::space::{SampleMatrix, VectorSpace};
use crate::vocabulary::SharedVocabulary;

/// Which side of a shared vocabulary to read tokens from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

/// Row-order-preserving lookup of token vectors.
pub struct SpaceSampler;

impl SpaceSampler {
    /// Build an `N x D` matrix whose row `i` is the vector of the `i`-th token.
    ///
    /// A token missing from `space` is a contract breach upstream and fails
    /// with `MissingToken`; rows are never zero-filled.
    pub fn sample<'a, I>(space: &VectorSpace, tokens: I) -> Result<SampleMatrix, UniversalityError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut rows = Vec::new();
        for token in tokens {
            let row = space
                .position(token)
                .ok_or_else(|| UniversalityError::MissingToken {
                    token: token.to_string(),
                    space: space.name().to_string(),
                })?;
            rows.push(row);
        }
        Ok(space.vectors().select_rows(rows.iter()))
    }

    /// Sample one side of a shared vocabulary.
    pub fn sample_side(
        space: &VectorSpace,
        vocab: &SharedVocabulary,
        side: Side,
    ) -> Result<SampleMatrix, UniversalityError> {
        match side {
            Side::Source => Self::sample(space, vocab.source_tokens()),
            Side::Target => Self::sample(space, vocab.target_tokens()),
        }
    }

    /// Sample both spaces on their respective sides of `vocab`.
    pub fn sample_pair(
        source: &VectorSpace,
        target: &VectorSpace,
        vocab: &SharedVocabulary,
    ) -> Result<(SampleMatrix, SampleMatrix), UniversalityError> {
        let src = Self::sample_side(source, vocab, Side::Source)?;
        let trg = Self::sample_side(target, vocab, Side::Target)?;
        Ok((src, trg))
    }
}
