// crates/universality-cli/src/report.rs
//
// Report writers: the per-run correlation log, the appendable CSV export of
// correlation vectors and the similarity matrix rendered for the sweep.
//
// Every writer receives its destination and formatting explicitly at
// construction; nothing here reads process-wide state.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::builder::Builder;

use universality_align::Comparison;
use universality_core::{CorrelationVector, UniversalityError};

fn ensure_parent(path: &Path) -> Result<(), UniversalityError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn format_measure(measure: Option<f64>) -> String {
    match measure {
        Some(m) => m.to_string(),
        None => "n/a".to_string(),
    }
}

/// Plain-text log of one comparison's pre- and post-mapping CCA measure.
#[derive(Debug, Clone)]
pub struct CorrelationLog {
    path: PathBuf,
}

impl CorrelationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn render(comparison: &Comparison, generated: DateTime<Utc>) -> String {
        format!(
            "Algorithm: {}\nGenerated: {}\nPre-map scores\nCCA measure: {}\nPost-map scores\nCCA measure: {}\n",
            comparison.algorithm,
            generated.to_rfc3339(),
            format_measure(comparison.pre_measure()),
            comparison.post_measure(),
        )
    }

    /// Overwrite the log with the scores of `comparison`.
    pub fn write(&self, comparison: &Comparison) -> Result<(), UniversalityError> {
        ensure_parent(&self.path)?;
        fs::write(&self.path, Self::render(comparison, Utc::now()))?;
        Ok(())
    }
}

/// Append-only CSV of correlation vectors, one row per comparison.
///
/// Rows are written in descending dimension order so ascending GCCA output
/// reads the same way as every other algorithm. Concurrent writers share one
/// export; the lock is held only while a row is appended.
#[derive(Debug)]
pub struct CsvExport {
    path: PathBuf,
    precision: usize,
    lock: Mutex<()>,
}

impl CsvExport {
    pub fn new(path: impl Into<PathBuf>, precision: usize) -> Self {
        Self {
            path: path.into(),
            precision,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format_row(&self, scores: &CorrelationVector) -> String {
        scores
            .clone()
            .into_descending()
            .values()
            .iter()
            .map(|v| format!("{:.*}", self.precision, v))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn append(&self, scores: &CorrelationVector) -> Result<(), UniversalityError> {
        self.write_row(&self.format_row(scores))
    }

    /// Append a row whose first column names the comparison.
    pub fn append_labeled(
        &self,
        label: &str,
        scores: &CorrelationVector,
    ) -> Result<(), UniversalityError> {
        self.write_row(&format!("{},{}", label, self.format_row(scores)))
    }

    fn write_row(&self, row: &str) -> Result<(), UniversalityError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ensure_parent(&self.path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", row)?;
        Ok(())
    }
}

/// Pairwise CCA measures between labelled corpora.
///
/// `cells[i][j]` holds the measure of corpus `i` mapped onto corpus `j`;
/// `None` marks a failed or skipped comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatrix {
    labels: Vec<String>,
    cells: Vec<Vec<Option<f64>>>,
}

impl SimilarityMatrix {
    pub fn new(labels: Vec<String>) -> Self {
        let n = labels.len();
        Self {
            labels,
            cells: vec![vec![None; n]; n],
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn set(&mut self, row: usize, col: usize, value: Option<f64>) {
        if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Number of comparisons that produced no score.
    pub fn failures(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_none()).count()
    }

    fn cell(&self, row: usize, col: usize, precision: usize) -> String {
        match self.get(row, col) {
            Some(v) => format!("{:.*}", precision, v),
            None => "n/a".to_string(),
        }
    }

    /// Console grid.
    pub fn render(&self, precision: usize) -> String {
        let mut builder = Builder::default();
        let mut header = vec![String::new()];
        header.extend(self.labels.iter().cloned());
        builder.push_record(header);

        for (i, label) in self.labels.iter().enumerate() {
            let mut record = vec![label.clone()];
            record.extend((0..self.labels.len()).map(|j| self.cell(i, j, precision)));
            builder.push_record(record);
        }
        builder.build().to_string()
    }

    /// LaTeX `tabular` with one row per source corpus, ready to paste into a paper.
    pub fn render_latex(&self, precision: usize) -> String {
        let mut out = format!("\\begin{{tabular}}{{l{}}}\n\\hline\n", "r".repeat(self.labels.len()));
        let header: Vec<String> = self.labels.iter().map(|l| escape_latex(l)).collect();
        out.push_str(&format!(" & {} \\\\\n\\hline\n", header.join(" & ")));
        for (i, label) in self.labels.iter().enumerate() {
            let cells: Vec<String> = (0..self.labels.len())
                .map(|j| self.cell(i, j, precision))
                .collect();
            out.push_str(&format!(
                "{} & {} \\\\\n",
                escape_latex(label),
                cells.join(" & ")
            ));
        }
        out.push_str("\\hline\n\\end{tabular}\n");
        out
    }

    pub fn write_latex(&self, path: &Path, precision: usize) -> Result<(), UniversalityError> {
        ensure_parent(path)?;
        fs::write(path, self.render_latex(precision))?;
        Ok(())
    }
}

fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '_' | '&' | '%' | '#' | '$' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}
