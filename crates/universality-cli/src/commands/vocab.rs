// crates/universality-cli/src/commands/vocab.rs
//
// `universality vocab <src> <trg> <vocab> [dict]`: build or reload the
// shared vocabulary without aligning anything.

use std::path::PathBuf;

use clap::Args;

use crate::config::UniversalityConfig;
use crate::output::{format_json, format_table, OutputFormat, VocabRow};
use crate::pipeline::{shared_vocabulary, PairRequest};

/// Shared vocabulary inspection.
#[derive(Debug, Args)]
pub struct VocabCmd {
    /// Source embedding file.
    pub source: PathBuf,

    /// Target embedding file.
    pub target: PathBuf,

    /// Shared vocabulary file to create or reload.
    pub vocab: PathBuf,

    /// Optional bilingual dictionary.
    pub dictionary: Option<PathBuf>,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Run the vocab command.
pub async fn run(cmd: &VocabCmd, config: &UniversalityConfig) -> Result<(), Box<dyn std::error::Error>> {
    let request = PairRequest {
        source: cmd.source.clone(),
        target: cmd.target.clone(),
        vocab: cmd.vocab.clone(),
        dictionary: cmd.dictionary.clone(),
        output_dir: config.output_dir.clone(),
    };
    let worker_config = config.clone();
    let vocabulary =
        tokio::task::spawn_blocking(move || shared_vocabulary(&worker_config, &request)).await??;

    let rows = vec![VocabRow {
        file: cmd.vocab.display().to_string(),
        pairs: vocabulary.len(),
        fingerprint: vocabulary.fingerprint(),
    }];
    match OutputFormat::from_flag(cmd.json) {
        OutputFormat::Json => println!("{}", format_json(&rows)),
        OutputFormat::Table => println!("{}", format_table(&rows)),
    }
    Ok(())
}
