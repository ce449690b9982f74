// crates/universality-cli/src/commands/mod.rs
//
// Command module declarations for the universality CLI.

pub mod correlate;
pub mod similarity;
pub mod vocab;

use std::path::PathBuf;

/// Base name for reports: the current working directory's name.
pub(crate) fn default_report_name() -> String {
    std::env::current_dir()
        .ok()
        .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "universality".to_string())
}

pub(crate) fn report_path(dir: &std::path::Path, name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, extension))
}
