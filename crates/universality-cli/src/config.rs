// crates/universality-cli/src/config.rs
//
// Runtime configuration for the universality CLI.
// Loaded from a TOML file or populated with sensible defaults.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use universality_align::{CcaConfig, EngineConfig, NoiseAwareConfig};
use universality_core::{Algorithm, UniversalityError, VocabularyAligner};

/// One corpus in the batch similarity sweep.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CorpusEntry {
    /// Short label used in table headers and vocabulary file names.
    pub name: String,
    /// Embedding file name, relative to the sweep's embedding directory.
    pub file: String,
}

/// Runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UniversalityConfig {
    /// Alignment algorithm: "procrustes", "noise", "cca" or "gcca".
    #[serde(default)]
    pub algorithm: Algorithm,

    /// Seed for the one-time vocabulary shuffle. Unset draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// L2-normalise every vector after loading.
    #[serde(default)]
    pub normalize: bool,

    /// Smallest usable shared vocabulary.
    #[serde(default = "default_min_shared_pairs")]
    pub min_shared_pairs: usize,

    /// Optional cap on freshly extracted shared vocabularies.
    #[serde(default)]
    pub max_shared_pairs: Option<usize>,

    /// Root directory for mapped spaces, logs and CSV exports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Decimal places for exported correlation coefficients.
    #[serde(default = "default_precision")]
    pub precision: usize,

    /// Pairwise CCA settings.
    #[serde(default)]
    pub cca: CcaConfig,

    /// Noise-aware Procrustes settings.
    #[serde(default)]
    pub noise_aware: NoiseAwareConfig,

    /// Pairs the similarity sweep aligns at once. Each pair holds two full
    /// vector spaces in memory.
    #[serde(default = "default_max_parallel_pairs")]
    pub max_parallel_pairs: usize,

    /// Corpora compared by the similarity sweep.
    #[serde(default = "default_corpora")]
    pub corpora: Vec<CorpusEntry>,
}

fn default_min_shared_pairs() -> usize {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_precision() -> usize {
    6
}

fn default_max_parallel_pairs() -> usize {
    1
}

fn default_corpora() -> Vec<CorpusEntry> {
    ["books", "dvd", "electronics", "kitchen"]
        .iter()
        .map(|name| CorpusEntry {
            name: name.to_string(),
            file: format!("{}.en.emb", name),
        })
        .collect()
}

impl Default for UniversalityConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            seed: None,
            normalize: false,
            min_shared_pairs: default_min_shared_pairs(),
            max_shared_pairs: None,
            output_dir: default_output_dir(),
            log_level: default_log_level(),
            precision: default_precision(),
            cca: CcaConfig::default(),
            noise_aware: NoiseAwareConfig::default(),
            max_parallel_pairs: default_max_parallel_pairs(),
            corpora: default_corpora(),
        }
    }
}

impl UniversalityConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, UniversalityError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| UniversalityError::Config(format!("cannot read {}: {}", path, e)))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, UniversalityError> {
        toml::from_str(contents).map_err(|e| UniversalityError::Config(e.to_string()))
    }

    /// Settings for the iterative aligners.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            cca: self.cca.clone(),
            noise_aware: self.noise_aware.clone(),
        }
    }

    /// Vocabulary aligner configured with seed and size bounds.
    pub fn vocabulary_aligner(&self) -> VocabularyAligner {
        let aligner = VocabularyAligner::new()
            .with_min_pairs(self.min_shared_pairs)
            .with_max_pairs(self.max_shared_pairs);
        match self.seed {
            Some(seed) => aligner.with_seed(seed),
            None => aligner,
        }
    }
}
