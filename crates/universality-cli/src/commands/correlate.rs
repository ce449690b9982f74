// crates/universality-cli/src/commands/correlate.rs
//
// `universality correlate <src> <trg> <vocab> [dict]`: align one pair of
// spaces, report pre- and post-mapping CCA measure and store the mapped
// snapshots.

use std::path::PathBuf;

use clap::Args;

use universality_core::Algorithm;

use super::{default_report_name, report_path};
use crate::config::UniversalityConfig;
use crate::output::{format_json, format_table, score_rows, OutputFormat};
use crate::pipeline::{run_pair, PairRequest};
use crate::report::{CorrelationLog, CsvExport};

/// Single-pair comparison.
#[derive(Debug, Args)]
pub struct CorrelateCmd {
    /// Source embedding file (word2vec text format).
    pub source: PathBuf,

    /// Target embedding file.
    pub target: PathBuf,

    /// Shared vocabulary file; created on first run, reused afterwards.
    pub vocab: PathBuf,

    /// Optional bilingual dictionary ("source target" per line).
    pub dictionary: Option<PathBuf>,

    /// Alignment algorithm (overrides the config file).
    #[arg(long)]
    pub algorithm: Option<Algorithm>,

    /// Output directory (overrides the config file).
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Base name of the .log and .csv reports (default: current directory name).
    #[arg(long)]
    pub name: Option<String>,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Run the correlate command.
pub async fn run(
    cmd: &CorrelateCmd,
    config: &UniversalityConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config.clone();
    if let Some(dir) = &cmd.output_dir {
        config.output_dir = dir.clone();
    }
    let algorithm = cmd.algorithm.unwrap_or(config.algorithm);
    let name = cmd.name.clone().unwrap_or_else(default_report_name);

    let request = PairRequest {
        source: cmd.source.clone(),
        target: cmd.target.clone(),
        vocab: cmd.vocab.clone(),
        dictionary: cmd.dictionary.clone(),
        output_dir: config.output_dir.clone(),
    };
    let worker_config = config.clone();
    let result =
        tokio::task::spawn_blocking(move || run_pair(&worker_config, algorithm, &request)).await??;

    let log = CorrelationLog::new(report_path(&config.output_dir, &name, "log"));
    log.write(&result.comparison)?;
    let csv = CsvExport::new(report_path(&config.output_dir, &name, "csv"), config.precision);
    csv.append(&result.comparison.post)?;
    tracing::info!(
        "Wrote {} and {}",
        log.path().display(),
        csv.path().display()
    );

    let rows = score_rows(&result.comparison);
    match OutputFormat::from_flag(cmd.json) {
        OutputFormat::Json => println!("{}", format_json(&rows)),
        OutputFormat::Table => {
            println!("{} vs {} ({})", cmd.source.display(), cmd.target.display(), algorithm);
            println!("{}", format_table(&rows));
            println!("Mapped source: {}", result.mapped_source.display());
            if let Some(path) = &result.mapped_target {
                println!("Mapped target: {}", path.display());
            }
            if let Some(path) = &result.clean_vocab {
                println!("Clean vocabulary: {}", path.display());
            }
        }
    }

    Ok(())
}
