// crates/universality-core/src/storage.rs
//
// Word2vec text storage for vector spaces.
//
// Format:
//   <token_count> <dimension>
//   <token> <v1> <v2> ... <vD>
//
// Mapped snapshots are written to `{output_dir}/{algorithm}/{prefix}_{filename}`.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use nalgebra::DMatrix;

use crate::algorithm::Algorithm;
use crate::error::UniversalityError;
use crate::space::VectorSpace;

const PREALLOC_ROWS: usize = 1 << 16;
const PREALLOC_DIM: usize = 1 << 10;

fn parse_err(path: &Path, lineno: usize, msg: impl std::fmt::Display) -> UniversalityError {
    UniversalityError::Parse(format!("{}:{}: {}", path.display(), lineno, msg))
}

/// Load a vector space from word2vec text format. The space is named after
/// the file name.
pub fn load_word2vec(path: &Path) -> Result<VectorSpace, UniversalityError> {
    let file = File::open(path).map_err(|e| {
        UniversalityError::Io(format!("Failed to open vectors {}: {}", path.display(), e))
    })?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .ok_or_else(|| parse_err(path, 1, "missing header"))??;
    let mut fields = header.split_whitespace();
    let count: usize = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| parse_err(path, 1, "bad token count"))?;
    let dim: usize = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| parse_err(path, 1, "bad dimension"))?;

    if count.checked_mul(dim).is_none() {
        return Err(parse_err(
            path,
            1,
            format!("header size {} x {} overflows", count, dim),
        ));
    }

    // The header is untrusted; rows grow as they are read.
    let mut tokens = Vec::with_capacity(count.min(PREALLOC_ROWS));
    let mut flat = Vec::with_capacity(count.min(PREALLOC_ROWS).saturating_mul(dim.min(PREALLOC_DIM)));
    for (i, line) in lines.enumerate() {
        let line = line?;
        let lineno = i + 2;
        let mut fields = line.split_whitespace();
        let token = match fields.next() {
            Some(t) => t,
            None => continue,
        };
        let before = flat.len();
        for field in fields {
            let value: f64 = field
                .parse()
                .map_err(|e| parse_err(path, lineno, format!("bad component '{}': {}", field, e)))?;
            flat.push(value);
        }
        if flat.len() - before != dim {
            return Err(parse_err(
                path,
                lineno,
                format!("expected {} components, found {}", dim, flat.len() - before),
            ));
        }
        tokens.push(token.to_string());
    }

    if tokens.len() != count {
        return Err(parse_err(
            path,
            1,
            format!("header declares {} tokens, file has {}", count, tokens.len()),
        ));
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let vectors = DMatrix::from_row_slice(tokens.len(), dim, &flat);
    tracing::debug!("Loaded {} vectors of dimension {} from {}", count, dim, path.display());
    VectorSpace::new(&name, tokens, vectors)
}

/// Save a vector space in word2vec text format, creating parent directories.
pub fn save_word2vec(space: &VectorSpace, path: &Path) -> Result<(), UniversalityError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path).map_err(|e| {
        UniversalityError::Io(format!("Failed to create {}: {}", path.display(), e))
    })?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{} {}", space.len(), space.dim())?;
    for (token, row) in space.tokens().iter().zip(space.vectors().row_iter()) {
        write!(out, "{}", token)?;
        for value in row.iter() {
            write!(out, " {}", value)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Path of a mapped snapshot: `{output_dir}/{algorithm}/{prefix}_{file name of original}`.
pub fn mapped_path(output_dir: &Path, algorithm: Algorithm, prefix: &str, original: &Path) -> PathBuf {
    let file_name = original
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "vectors.txt".to_string());
    output_dir
        .join(algorithm.as_str())
        .join(format!("{}_{}", prefix, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.en.txt");
        let space = VectorSpace::from_rows(
            "books",
            vec![
                ("read".to_string(), vec![0.5, -1.25, 3.0]),
                ("page".to_string(), vec![1e-3, 0.0, -7.5]),
            ],
        )
        .unwrap();

        save_word2vec(&space, &path).unwrap();
        let loaded = load_word2vec(&path).unwrap();

        assert_eq!(loaded.name(), "books.en.txt");
        assert_eq!(loaded.tokens(), space.tokens());
        assert_eq!(loaded.vectors(), space.vectors());
    }

    #[test]
    fn header_count_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, "3 2\na 1 2\nb 3 4\n").unwrap();
        assert!(matches!(load_word2vec(&path), Err(UniversalityError::Parse(_))));
    }

    #[test]
    fn oversized_header_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.txt");
        fs::write(&path, "4000000000000000000 100\na 1 2\n").unwrap();
        assert!(matches!(load_word2vec(&path), Err(UniversalityError::Parse(_))));

        fs::write(&path, "4000000000000000000 1\na 1\n").unwrap();
        let err = load_word2vec(&path).unwrap_err();
        assert!(err.to_string().contains("declares"));
    }

    #[test]
    fn short_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.txt");
        fs::write(&path, "2 2\na 1 2\nb 3\n").unwrap();
        let err = load_word2vec(&path).unwrap_err();
        assert!(err.to_string().contains(":3:"));
    }

    #[test]
    fn mapped_path_layout() {
        let p = mapped_path(
            Path::new("out"),
            Algorithm::Gcca,
            "mapped_src",
            Path::new("/data/emb/books.en.emb"),
        );
        assert_eq!(p, PathBuf::from("out/gcca/mapped_src_books.en.emb"));
    }
}
