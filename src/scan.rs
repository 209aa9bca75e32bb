//! Input directory scanning

use std::fs;
use std::path::{Path, PathBuf};
use crate::error::{Error, Result};

/// Extensions accepted by the DOCX footer/PDF pipeline
pub const OFFICE_EXTENSIONS: &[&str] = &["doc", "docx"];

/// Extensions accepted by the stamping and SQL pipelines
pub const PDF_EXTENSIONS: &[&str] = &["pdf"];

/// Lowercased extension of a path, if it has one
pub fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// List the regular files in `dir` whose extension (case-insensitive) is one of `extensions`.
///
/// Entries are returned sorted by file name so batches run in a stable order.
/// An empty result is not an error; a missing directory is.
pub fn scan_directory(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::DirectoryNotFound(dir.to_path_buf()));
    }

    let dir = dir.canonicalize()?;
    let mut paths = Vec::new();

    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        // Follows symlinks; dangling links are skipped
        if !path.is_file() {
            continue;
        }

        let matches = extension_lowercase(&path)
            .map(|ext| extensions.iter().any(|accepted| *accepted == ext))
            .unwrap_or(false);

        if matches {
            paths.push(path);
        }
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(paths)
}
