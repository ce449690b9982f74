// crates/universality-core/src/vocabulary.rs
//
// Shared-vocabulary extraction and persistence.
//
// A shared vocabulary is the ordered list of token pairs used as anchors for
// both alignment and scoring. It is shuffled exactly once, written to disk,
// and from then on loaded verbatim so every tool works on the same sample.
//
// File format: UTF-8, one pair per line, `src_token trg_token`, no header.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

use crate::error::UniversalityError;
use crate::space::VectorSpace;

/// One anchor: a token in the source space and its counterpart in the target space.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenPair {
    pub source: String,
    pub target: String,
}

impl TokenPair {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    /// Identity pair used for monolingual comparisons.
    pub fn identity(token: &str) -> Self {
        Self::new(token, token)
    }
}

/// Parse whitespace-separated pairs, one per line. Blank lines are skipped.
fn parse_pairs(text: &str, what: &str) -> Result<Vec<TokenPair>, UniversalityError> {
    let mut pairs = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            [source, target] => pairs.push(TokenPair::new(source, target)),
            _ => {
                return Err(UniversalityError::Parse(format!(
                    "{} line {}: expected 2 tokens, found {}",
                    what,
                    lineno + 1,
                    fields.len()
                )))
            }
        }
    }
    Ok(pairs)
}

/// The frozen, ordered anchor list shared by two vector spaces.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SharedVocabulary {
    pairs: Vec<TokenPair>,
}

impl SharedVocabulary {
    pub fn new(pairs: Vec<TokenPair>) -> Self {
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[TokenPair] {
        &self.pairs
    }

    /// Source-side tokens in anchor order.
    pub fn source_tokens(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|p| p.source.as_str())
    }

    /// Target-side tokens in anchor order.
    pub fn target_tokens(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|p| p.target.as_str())
    }

    /// Pairs at the given row indices, in the order given.
    pub fn subset(&self, indices: &[usize]) -> Result<Self, UniversalityError> {
        let mut pairs = Vec::with_capacity(indices.len());
        for &i in indices {
            let pair = self.pairs.get(i).ok_or_else(|| {
                UniversalityError::InvalidInput(format!(
                    "vocabulary index {} out of range (len {})",
                    i,
                    self.pairs.len()
                ))
            })?;
            pairs.push(pair.clone());
        }
        Ok(Self { pairs })
    }

    /// Parse the persisted text format.
    pub fn parse(text: &str) -> Result<Self, UniversalityError> {
        Ok(Self {
            pairs: parse_pairs(text, "vocabulary")?,
        })
    }

    /// Render in the persisted text format.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for pair in &self.pairs {
            out.push_str(&pair.source);
            out.push(' ');
            out.push_str(&pair.target);
            out.push('\n');
        }
        out
    }

    pub fn load(path: &Path) -> Result<Self, UniversalityError> {
        let text = fs::read_to_string(path).map_err(|e| {
            UniversalityError::Io(format!("Failed to read vocabulary {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    /// Write the vocabulary, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), UniversalityError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_text()).map_err(|e| {
            UniversalityError::Io(format!("Failed to write vocabulary {}: {}", path.display(), e))
        })
    }

    /// Hex SHA-256 of the persisted representation. Equal fingerprints mean
    /// two runs used the same anchors in the same order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_text().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A bilingual dictionary: a set of attested `(source, target)` translations.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: BTreeSet<TokenPair>,
}

impl Dictionary {
    pub fn new(pairs: impl IntoIterator<Item = TokenPair>) -> Self {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    /// Parse whitespace-separated translation pairs. Duplicates collapse.
    pub fn parse(text: &str) -> Result<Self, UniversalityError> {
        Ok(Self::new(parse_pairs(text, "dictionary")?))
    }

    pub fn load(path: &Path) -> Result<Self, UniversalityError> {
        let text = fs::read_to_string(path).map_err(|e| {
            UniversalityError::Io(format!("Failed to read dictionary {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &TokenPair> {
        self.entries.iter()
    }
}

/// Builds, persists and reloads shared vocabularies.
#[derive(Debug, Clone)]
pub struct VocabularyAligner {
    /// Seed for the one-time shuffle. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Smallest acceptable vocabulary. Anything below fails with `InsufficientOverlap`.
    pub min_pairs: usize,
    /// Optional cap applied to freshly extracted vocabularies after shuffling.
    pub max_pairs: Option<usize>,
}

impl VocabularyAligner {
    pub fn new() -> Self {
        Self {
            seed: None,
            min_pairs: 1,
            max_pairs: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_min_pairs(mut self, min_pairs: usize) -> Self {
        self.min_pairs = min_pairs.max(1);
        self
    }

    pub fn with_max_pairs(mut self, max_pairs: Option<usize>) -> Self {
        self.max_pairs = max_pairs;
        self
    }

    /// Return the shared vocabulary for `space_a`/`space_b`.
    ///
    /// If `persisted` exists it is loaded verbatim and nothing is recomputed.
    /// Otherwise the vocabulary is extracted (dictionary pairs present in both
    /// spaces, or the identity pairs of the vocabulary intersection), shuffled
    /// once and written to `persisted`.
    pub fn align(
        &self,
        space_a: &VectorSpace,
        space_b: &VectorSpace,
        persisted: &Path,
        dictionary: Option<&Dictionary>,
    ) -> Result<SharedVocabulary, UniversalityError> {
        if persisted.is_file() {
            tracing::debug!("Loading shared vocabulary from {}", persisted.display());
            let vocab = SharedVocabulary::load(persisted)?;
            self.check_size(&vocab)?;
            return Ok(vocab);
        }

        let vocab = self.extract(space_a, space_b, dictionary)?;
        vocab.save(persisted)?;
        tracing::info!(
            "Stored {} shared pairs in {} (fingerprint {})",
            vocab.len(),
            persisted.display(),
            &vocab.fingerprint()[..12]
        );
        Ok(vocab)
    }

    /// Extract and shuffle a fresh shared vocabulary without touching the filesystem.
    pub fn extract(
        &self,
        space_a: &VectorSpace,
        space_b: &VectorSpace,
        dictionary: Option<&Dictionary>,
    ) -> Result<SharedVocabulary, UniversalityError> {
        let mut pairs: Vec<TokenPair> = match dictionary {
            Some(dict) => {
                tracing::debug!("Extracting shared bilingual vocabulary");
                dict.iter()
                    .filter(|p| space_a.contains(&p.source) && space_b.contains(&p.target))
                    .cloned()
                    .collect()
            }
            None => {
                tracing::debug!("Extracting shared monolingual vocabulary");
                space_a
                    .tokens()
                    .iter()
                    .filter(|t| space_b.contains(t))
                    .map(|t| TokenPair::identity(t))
                    .collect()
            }
        };

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        pairs.shuffle(&mut rng);

        if let Some(cap) = self.max_pairs {
            pairs.truncate(cap);
        }

        let vocab = SharedVocabulary::new(pairs);
        self.check_size(&vocab)?;

        let dim = space_a.dim().max(space_b.dim());
        if vocab.len() < 2 * dim {
            tracing::warn!(
                "Only {} shared pairs for dimension {}; estimates below {} pairs are poorly conditioned",
                vocab.len(),
                dim,
                2 * dim
            );
        }
        Ok(vocab)
    }

    fn check_size(&self, vocab: &SharedVocabulary) -> Result<(), UniversalityError> {
        let required = self.min_pairs.max(1);
        if vocab.len() < required {
            return Err(UniversalityError::InsufficientOverlap {
                found: vocab.len(),
                required,
            });
        }
        Ok(())
    }
}

impl Default for VocabularyAligner {
    fn default() -> Self {
        Self::new()
    }
}
