// crates/universality-cli/src/lib.rs
//
// Orchestration for the universality CLI: configuration, the pair pipeline,
// report writers and the subcommands built on them.

pub mod commands;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod report;

#[cfg(test)]
mod testing;

pub use config::{CorpusEntry, UniversalityConfig};
pub use pipeline::{run_pair, shared_vocabulary, PairRequest, PairResult};
pub use report::{CorrelationLog, CsvExport, SimilarityMatrix};
