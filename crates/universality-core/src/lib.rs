// crates/universality-core/src/lib.rs
//
// universality-core: Core types, vocabulary alignment, sampling and storage
// for embedding universality tests.
//
// This is the leaf crate of the workspace. It owns the data model (vector
// spaces, shared vocabularies, sample matrices, correlation vectors), the
// error taxonomy and the `SpaceAligner` trait implemented by
// universality-align.

pub mod algorithm;
pub mod error;
pub mod sampler;
pub mod scores;
pub mod space;
pub mod storage;
pub mod traits;
pub mod vocabulary;

// Re-export key types for ergonomic access from downstream crates.
pub use algorithm::Algorithm;
pub use error::{ConvergenceWarning, UniversalityError};
pub use sampler::{Side, SpaceSampler};
pub use scores::{CorrelationVector, DimensionOrder};
pub use space::{SampleMatrix, VectorSpace};
pub use storage::{load_word2vec, mapped_path, save_word2vec};
pub use traits::{AlignmentDiagnostics, AlignmentOutcome, SpaceAligner};
pub use vocabulary::{Dictionary, SharedVocabulary, TokenPair, VocabularyAligner};
