// crates/universality-cli/src/output.rs
//
// Console output for the universality CLI.
// Supports table and JSON output modes.

use serde::Serialize;
use tabled::{Table, Tabled};

use universality_align::Comparison;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    Table,
    /// JSON output for machine consumption.
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }
}

/// One line of a comparison summary.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ScoreRow {
    #[tabled(rename = "Stage")]
    pub stage: String,
    #[tabled(rename = "CCA measure")]
    pub measure: String,
    #[tabled(rename = "Dimensions")]
    pub dimensions: usize,
    #[tabled(rename = "Best")]
    pub best: String,
}

/// Pre/post rows for `comparison`. The pre row is omitted when it was skipped.
pub fn score_rows(comparison: &Comparison) -> Vec<ScoreRow> {
    let mut rows = Vec::with_capacity(2);
    let stages = [("pre-map", comparison.pre.as_ref()), ("post-map", Some(&comparison.post))];
    for (stage, scores) in stages {
        if let Some(scores) = scores {
            rows.push(ScoreRow {
                stage: stage.to_string(),
                measure: format!("{:.4}", scores.mean()),
                dimensions: scores.len(),
                best: scores
                    .max()
                    .map(|m| format!("{:.4}", m))
                    .unwrap_or_else(|| "n/a".to_string()),
            });
        }
    }
    rows
}

/// Size and digest of a shared vocabulary.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct VocabRow {
    #[tabled(rename = "File")]
    pub file: String,
    #[tabled(rename = "Pairs")]
    pub pairs: usize,
    #[tabled(rename = "SHA-256")]
    pub fingerprint: String,
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}
