// File utilities for document processing

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
///
/// The output never contains a path separator, so it cannot escape the
/// directory it is joined onto.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A sanitized name that is safe to use as a single path component.
/// Empty names and the `.`/`..` style names made only of dots are refused.
pub fn safe_component(name: &str) -> Option<String> {
    let sanitized = sanitize_name(name);
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        None
    } else {
        Some(sanitized)
    }
}

/// File name without its final extension: `report.v2.pdf` -> `report.v2`.
pub fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Find all files with one of the given extensions directly inside a directory
pub fn find_files_by_extension(base_dir: impl AsRef<Path>, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let base_dir = base_dir.as_ref();
    let mut files = Vec::new();

    if !base_dir.exists() {
        return Ok(files);
    }

    for entry in WalkDir::new(base_dir)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() {
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(&ext)) {
                    files.push(path.to_path_buf());
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Create directory if it doesn't exist
pub fn ensure_dir_exists(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    Ok(())
}
