// crates/universality-cli/src/commands/similarity.rs
//
// `universality similarity <emb_dir> <work_dir>`: compare every ordered pair
// of configured corpora, each corpus with itself included, and render the CCA
// measures as a matrix.
//
// Pairs run on blocking worker tasks, at most `max_parallel_pairs` at a time.
// A failed pair is logged and left as "n/a"; it never stops the sweep.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use tokio::sync::Semaphore;

use universality_core::{Algorithm, UniversalityError};

use crate::config::UniversalityConfig;
use crate::output::{format_json, OutputFormat};
use crate::pipeline::{run_pair, PairRequest};
use crate::report::{CsvExport, SimilarityMatrix};

/// File the rendered matrix is written to inside the work directory.
pub const TABLE_FILE: &str = "similarity_table.txt";

/// Decimal places in the typeset table.
pub const TABLE_PRECISION: usize = 2;

/// CSV of every successful pair's correlation vector.
pub const CSV_FILE: &str = "similarity.csv";

/// Batch similarity sweep.
#[derive(Debug, Args)]
pub struct SimilarityCmd {
    /// Directory holding the corpus embedding files listed in the config.
    pub emb_dir: PathBuf,

    /// Directory for vocabularies, mapped spaces and reports.
    pub work_dir: PathBuf,

    /// Alignment algorithm (overrides the config file).
    #[arg(long)]
    pub algorithm: Option<Algorithm>,

    /// Print the matrix as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Run the similarity command.
pub async fn run(
    cmd: &SimilarityCmd,
    config: &UniversalityConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let algorithm = cmd.algorithm.unwrap_or(config.algorithm);
    let matrix = sweep(
        Arc::new(config.clone()),
        algorithm,
        &cmd.emb_dir,
        &cmd.work_dir,
    )
    .await?;

    let table_path = cmd.work_dir.join(TABLE_FILE);
    matrix.write_latex(&table_path, TABLE_PRECISION)?;
    match OutputFormat::from_flag(cmd.json) {
        OutputFormat::Json => println!("{}", format_json(&matrix)),
        OutputFormat::Table => println!("{}", matrix.render(config.precision)),
    }
    if matrix.failures() > 0 {
        tracing::warn!("{} comparisons failed; see log for details", matrix.failures());
    }
    tracing::info!("Similarity table written to {}", table_path.display());
    Ok(())
}

fn pair_request(
    config: &UniversalityConfig,
    emb_dir: &Path,
    work_dir: &Path,
    i: usize,
    j: usize,
) -> (String, PairRequest) {
    let (a, b) = (&config.corpora[i], &config.corpora[j]);
    let label = format!("{}-{}", a.name, b.name);
    let request = PairRequest {
        source: emb_dir.join(&a.file),
        target: emb_dir.join(&b.file),
        vocab: work_dir.join("vocab").join(format!("{}.txt", label)),
        dictionary: None,
        output_dir: work_dir.join(&label),
    };
    (label, request)
}

/// Compare all ordered pairs of `config.corpora`.
///
/// Only I/O on the work directory itself is fatal; per-pair errors become
/// empty cells.
pub async fn sweep(
    config: Arc<UniversalityConfig>,
    algorithm: Algorithm,
    emb_dir: &Path,
    work_dir: &Path,
) -> Result<SimilarityMatrix, UniversalityError> {
    std::fs::create_dir_all(work_dir)?;
    let labels: Vec<String> = config.corpora.iter().map(|c| c.name.clone()).collect();
    let mut matrix = SimilarityMatrix::new(labels);
    let csv = Arc::new(CsvExport::new(work_dir.join(CSV_FILE), config.precision));

    let n = config.corpora.len();
    let permits = Arc::new(Semaphore::new(config.max_parallel_pairs.max(1)));
    let mut handles = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let (label, request) = pair_request(&config, emb_dir, work_dir, i, j);
            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .map_err(|e| UniversalityError::InvalidInput(e.to_string()))?;
            let config = Arc::clone(&config);
            let csv = Arc::clone(&csv);
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let result = run_pair(&config, algorithm, &request)?;
                csv.append_labeled(&label, &result.comparison.post)?;
                Ok::<f64, UniversalityError>(result.comparison.post_measure())
            });
            handles.push((i, j, handle));
        }
    }

    for (i, j, handle) in handles {
        let pair = format!("{} vs {}", matrix.labels()[i], matrix.labels()[j]);
        match handle.await {
            Ok(Ok(measure)) => {
                tracing::info!("{}: CCA measure {:.4}", pair, measure);
                matrix.set(i, j, Some(measure));
            }
            Ok(Err(e)) => tracing::warn!("{} failed: {}", pair, e),
            Err(e) => tracing::warn!("{} worker aborted: {}", pair, e),
        }
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorpusEntry;
    use crate::testing::write_rotated_files;

    fn corpus(name: &str) -> CorpusEntry {
        CorpusEntry {
            name: name.to_string(),
            file: format!("{}.emb", name),
        }
    }

    #[tokio::test]
    async fn sweep_fills_matrix_and_isolates_failures() {
        let emb = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write_rotated_files(emb.path(), &["books.emb", "dvd.emb"], 40, 4, 11);

        let config = UniversalityConfig {
            seed: Some(5),
            max_parallel_pairs: 2,
            corpora: vec![corpus("books"), corpus("dvd"), corpus("missing")],
            ..UniversalityConfig::default()
        };
        let matrix = sweep(
            Arc::new(config),
            Algorithm::Procrustes,
            emb.path(),
            work.path(),
        )
        .await
        .unwrap();

        assert!(matrix.get(0, 1).unwrap() > 0.99);
        assert!(matrix.get(1, 0).unwrap() > 0.99);
        assert!((matrix.get(0, 0).unwrap() - 1.0).abs() < 1e-6);
        assert!((matrix.get(1, 1).unwrap() - 1.0).abs() < 1e-6);
        assert!(matrix.get(0, 2).is_none());
        assert!(matrix.get(2, 1).is_none());
        assert!(matrix.get(2, 2).is_none());
        assert_eq!(matrix.failures(), 5);

        let csv = std::fs::read_to_string(work.path().join(CSV_FILE)).unwrap();
        let mut labels: Vec<&str> = csv
            .lines()
            .map(|l| l.split(',').next().unwrap())
            .collect();
        labels.sort();
        assert_eq!(labels, vec!["books-books", "books-dvd", "dvd-books", "dvd-dvd"]);
        assert!(work.path().join("vocab").join("books-dvd.txt").is_file());
        assert!(work
            .path()
            .join("books-dvd")
            .join("procrustes")
            .join("mapped_src_books.emb")
            .is_file());
    }

    #[tokio::test]
    async fn zero_parallel_pairs_still_runs_one_at_a_time() {
        let emb = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write_rotated_files(emb.path(), &["books.emb", "dvd.emb"], 30, 3, 8);

        let config = UniversalityConfig {
            seed: Some(6),
            max_parallel_pairs: 0,
            corpora: vec![corpus("books"), corpus("dvd")],
            ..UniversalityConfig::default()
        };
        let matrix = sweep(
            Arc::new(config),
            Algorithm::Procrustes,
            emb.path(),
            work.path(),
        )
        .await
        .unwrap();
        assert_eq!(matrix.failures(), 0);
    }

    #[tokio::test]
    async fn command_writes_typeset_table() {
        let emb = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write_rotated_files(emb.path(), &["books.emb", "dvd.emb"], 30, 3, 12);
        let config = UniversalityConfig {
            seed: Some(9),
            corpora: vec![corpus("books"), corpus("dvd")],
            ..UniversalityConfig::default()
        };
        let cmd = SimilarityCmd {
            emb_dir: emb.path().to_path_buf(),
            work_dir: work.path().to_path_buf(),
            algorithm: Some(Algorithm::Procrustes),
            json: true,
        };
        run(&cmd, &config).await.unwrap();

        let table = std::fs::read_to_string(work.path().join(TABLE_FILE)).unwrap();
        assert!(table.starts_with("\\begin{tabular}{lrr}\n"));
        assert!(table.contains("books & 1.00 & "));
        assert!(table.ends_with("\\end{tabular}\n"));
    }

    #[tokio::test]
    async fn empty_corpus_list_gives_empty_matrix() {
        let work = tempfile::tempdir().unwrap();
        let config = UniversalityConfig {
            corpora: Vec::new(),
            ..UniversalityConfig::default()
        };
        let matrix = sweep(Arc::new(config), Algorithm::Gcca, work.path(), work.path())
            .await
            .unwrap();
        assert!(matrix.labels().is_empty());
        assert_eq!(matrix.failures(), 0);
    }
}
