//! Input store: uploads that clients asked to keep, so later requests can
//! reference them by file name.
//!
//! Transient extraction scratch files are created in the same directory with
//! a `temp_` prefix and never outlive the request that created them.

use anyhow::Context;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::schemas::{Artifact, MediaType, StoredInput};
use super::utils::{ensure_dir_exists, find_files_by_extension, safe_component};
use crate::Error;

pub struct InputStore {
    base_path: PathBuf,
}

impl InputStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Write `bytes` to a scratch file that is deleted when the guard drops.
    pub fn scratch_file(&self, name: &str, bytes: &[u8]) -> crate::Result<NamedTempFile> {
        ensure_dir_exists(&self.base_path)?;
        let suffix = format!("_{}", safe_component(name).unwrap_or_else(|| "upload".to_string()));
        let mut file = tempfile::Builder::new()
            .prefix("temp_")
            .suffix(&suffix)
            .tempfile_in(&self.base_path)?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(file)
    }

    /// Map a client-supplied file name onto a stored file.
    pub fn resolve(&self, file_name: &str) -> crate::Result<(PathBuf, MediaType)> {
        let safe = safe_component(file_name)
            .ok_or_else(|| Error::bad_request(format!("Invalid file name: {:?}", file_name)))?;
        let path = self.base_path.join(&safe);
        if !path.is_file() {
            return Err(Error::NotFound(file_name.to_string()));
        }
        let media_type = MediaType::from_extension(&path)
            .ok_or_else(|| Error::UnsupportedMediaType(file_name.to_string()))?;
        Ok((path, media_type))
    }

    /// Retain an upload under its sanitized name. Same name overwrites.
    pub fn save(&self, artifact: &Artifact) -> crate::Result<StoredInput> {
        let media_type = MediaType::resolve(&artifact.name, artifact.content_type.as_deref())?;
        let safe = safe_component(&artifact.name)
            .ok_or_else(|| Error::bad_request(format!("Invalid file name: {:?}", artifact.name)))?;
        if MediaType::from_extension(&safe) != Some(media_type) {
            // Stored files are re-identified by extension, so it has to agree
            // with what was declared.
            return Err(Error::UnsupportedMediaType(artifact.name.clone()));
        }

        ensure_dir_exists(&self.base_path)?;
        let path = self.base_path.join(&safe);
        fs::write(&path, &artifact.bytes)
            .with_context(|| format!("Failed to write input file {:?}", path))?;

        let mut stored = Self::describe(&path, media_type)?;
        stored.sha256 = Some(hex::encode(Sha256::digest(&artifact.bytes)));
        Ok(stored)
    }

    pub fn list(&self) -> crate::Result<Vec<StoredInput>> {
        let mut inputs = Vec::new();
        for path in find_files_by_extension(&self.base_path, &["pdf", "txt"])? {
            let is_scratch = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("temp_"))
                .unwrap_or(false);
            if is_scratch {
                continue;
            }
            if let Some(media_type) = MediaType::from_extension(&path) {
                inputs.push(Self::describe(&path, media_type)?);
            }
        }
        Ok(inputs)
    }

    fn describe(path: &Path, media_type: MediaType) -> crate::Result<StoredInput> {
        let metadata = fs::metadata(path)?;
        let modified_at: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(StoredInput {
            name,
            media_type,
            size_bytes: metadata.len(),
            modified_at,
            sha256: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .map(|rd| {
                rd.filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn scratch_file_is_removed_on_drop() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = InputStore::new(dir.path());
        let path = {
            let scratch = store.scratch_file("notes.txt", b"hello")?;
            let path = scratch.path().to_path_buf();
            assert!(path.exists());
            assert!(path.file_name().unwrap().to_string_lossy().starts_with("temp_"));
            path
        };
        assert!(!path.exists());
        assert!(entries(dir.path()).is_empty());
        Ok(())
    }

    #[test]
    fn save_then_resolve_round_trip() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = InputStore::new(dir.path());
        let stored = store.save(&Artifact::new(
            "my notes.txt",
            Some("text/plain".into()),
            b"Body.".to_vec(),
        ))?;

        assert_eq!(stored.name, "my_notes.txt");
        assert_eq!(stored.size_bytes, 5);
        assert_eq!(stored.sha256.as_deref().map(str::len), Some(64));

        let (path, media_type) = store.resolve("my notes.txt")?;
        assert_eq!(media_type, MediaType::Plaintext);
        assert_eq!(fs::read_to_string(path)?, "Body.");
        Ok(())
    }

    #[test]
    fn resolve_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = InputStore::new(dir.path());
        let err = store.resolve("missing.pdf").unwrap_err();
        assert!(matches!(err, Error::NotFound(ref name) if name == "missing.pdf"));
    }

    #[test]
    fn resolve_cannot_escape_the_store() {
        let dir = TempDir::new().unwrap();
        let store = InputStore::new(dir.path().join("input"));
        fs::write(dir.path().join("secret.txt"), "nope").unwrap();

        assert!(matches!(store.resolve("../secret.txt"), Err(Error::NotFound(_))));
        assert!(matches!(store.resolve(".."), Err(Error::BadRequest(_))));
    }

    #[test]
    fn save_rejects_unsupported_types() {
        let dir = TempDir::new().unwrap();
        let store = InputStore::new(dir.path());
        let err = store
            .save(&Artifact::new("deck.pptx", None, vec![1, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMediaType(_)));
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn list_skips_scratch_and_foreign_files() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("a.txt"), "a")?;
        fs::write(dir.path().join("b.pdf"), "b")?;
        fs::write(dir.path().join("c.docx"), "c")?;
        fs::write(dir.path().join("temp_xyz_d.txt"), "d")?;

        let names: Vec<String> = InputStore::new(dir.path())
            .list()?
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.pdf"]);
        Ok(())
    }
}
