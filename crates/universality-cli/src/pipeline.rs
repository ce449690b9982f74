// crates/universality-cli/src/pipeline.rs
//
// One source/target comparison from files on disk: load both spaces, settle
// the shared vocabulary, align, score and store the mapped snapshots.

use std::path::{Path, PathBuf};

use universality_align::{build_aligner, compare, Comparison};
use universality_core::{
    load_word2vec, mapped_path, save_word2vec, Algorithm, Dictionary, SharedVocabulary,
    UniversalityError, VectorSpace,
};

use crate::config::UniversalityConfig;

/// File name of the denoised vocabulary written after noise-aware alignment.
pub const CLEAN_VOCAB_FILE: &str = "vocab.clean.txt";

/// Inputs of a single comparison.
#[derive(Debug, Clone)]
pub struct PairRequest {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Persisted shared vocabulary; created on first use.
    pub vocab: PathBuf,
    pub dictionary: Option<PathBuf>,
    /// Root for mapped snapshots and the clean vocabulary.
    pub output_dir: PathBuf,
}

/// Everything one comparison produced.
#[derive(Debug, Clone)]
pub struct PairResult {
    pub comparison: Comparison,
    pub vocabulary: SharedVocabulary,
    pub mapped_source: PathBuf,
    pub mapped_target: Option<PathBuf>,
    pub clean_vocab: Option<PathBuf>,
}

/// Load a word2vec text file, L2-normalising rows when requested.
pub fn load_space(path: &Path, normalize: bool) -> Result<VectorSpace, UniversalityError> {
    let space = load_word2vec(path)?;
    tracing::debug!(
        "Loaded {} ({} tokens, {} dims)",
        space.name(),
        space.len(),
        space.dim()
    );
    Ok(if normalize { space.l2_normalized() } else { space })
}

fn load_dictionary(path: Option<&Path>) -> Result<Option<Dictionary>, UniversalityError> {
    match path {
        Some(p) => {
            let dict = Dictionary::load(p)?;
            tracing::info!("Loaded {} dictionary pairs from {}", dict.len(), p.display());
            Ok(Some(dict))
        }
        None => Ok(None),
    }
}

/// Build or reload the shared vocabulary for `request` without aligning.
pub fn shared_vocabulary(
    config: &UniversalityConfig,
    request: &PairRequest,
) -> Result<SharedVocabulary, UniversalityError> {
    let source = load_space(&request.source, config.normalize)?;
    let target = load_space(&request.target, config.normalize)?;
    let dictionary = load_dictionary(request.dictionary.as_deref())?;
    config
        .vocabulary_aligner()
        .align(&source, &target, &request.vocab, dictionary.as_ref())
}

/// Run one full comparison with `algorithm`.
pub fn run_pair(
    config: &UniversalityConfig,
    algorithm: Algorithm,
    request: &PairRequest,
) -> Result<PairResult, UniversalityError> {
    let source = load_space(&request.source, config.normalize)?;
    let target = load_space(&request.target, config.normalize)?;
    let dictionary = load_dictionary(request.dictionary.as_deref())?;
    let vocabulary = config.vocabulary_aligner().align(
        &source,
        &target,
        &request.vocab,
        dictionary.as_ref(),
    )?;

    tracing::info!(
        "Aligning {} onto {} with {} ({} shared pairs)",
        source.name(),
        target.name(),
        algorithm,
        vocabulary.len()
    );
    let aligner = build_aligner(algorithm, &config.engine());
    let comparison = compare(aligner.as_ref(), &source, &target, &vocabulary)?;

    let mapped_source = mapped_path(&request.output_dir, algorithm, "mapped_src", &request.source);
    save_word2vec(&comparison.outcome.source, &mapped_source)?;

    let mapped_target = if algorithm.maps_target() {
        let path = mapped_path(&request.output_dir, algorithm, "mapped_trg", &request.target);
        save_word2vec(&comparison.outcome.target, &path)?;
        Some(path)
    } else {
        None
    };

    let clean_vocab = match &comparison.outcome.diagnostics.clean_indices {
        Some(clean) => {
            let path = request
                .output_dir
                .join(algorithm.as_str())
                .join(CLEAN_VOCAB_FILE);
            vocabulary.subset(clean)?.save(&path)?;
            Some(path)
        }
        None => None,
    };

    Ok(PairResult {
        comparison,
        vocabulary,
        mapped_source,
        mapped_target,
        clean_vocab,
    })
}
