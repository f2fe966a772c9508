// Document Processing Module
//
// Turns uploaded artifacts (PDF, plain text) into plain text for the
// summarization pipeline.
//
// Main components:
// - schemas: media types, artifacts and extracted documents
// - extractors: PDF and plain-text extraction
// - input_store: retained uploads and transient scratch files
// - utils: name sanitizing and file helpers

pub mod extractors;
pub mod input_store;
pub mod schemas;
pub mod utils;

pub use extractors::{PdfExtractor, TxtExtractor};
pub use input_store::InputStore;
pub use schemas::{Artifact, MediaType, SourceDocument, StoredInput};
pub use utils::{ensure_dir_exists, file_stem, safe_component, sanitize_name};

use std::path::Path;
use tracing::debug;

use crate::Error;

/// Extract text from an uploaded artifact.
///
/// The media type is checked before anything touches the disk. The upload is
/// then staged as a `temp_*` file in the input store and read back; the
/// staged file is removed whether extraction succeeds or fails.
pub fn extract(artifact: &Artifact, store: &InputStore) -> crate::Result<SourceDocument> {
    let media_type = MediaType::resolve(&artifact.name, artifact.content_type.as_deref())?;

    let scratch = store.scratch_file(&artifact.name, &artifact.bytes)?;
    let extracted_text = read_text(scratch.path(), media_type, &artifact.name);
    drop(scratch);

    let extracted_text = extracted_text?;
    debug!(
        name = %artifact.name,
        media_type = media_type.as_str(),
        chars = extracted_text.len(),
        "artifact extracted"
    );

    Ok(SourceDocument {
        name: artifact.name.clone(),
        media_type,
        extracted_text,
    })
}

/// Extract text from a file already retained in the input store.
pub fn extract_stored(file_name: &str, store: &InputStore) -> crate::Result<SourceDocument> {
    let (path, media_type) = store.resolve(file_name)?;
    let extracted_text = read_text(&path, media_type, file_name)?;

    Ok(SourceDocument {
        name: file_name.to_string(),
        media_type,
        extracted_text,
    })
}

fn read_text(path: &Path, media_type: MediaType, display_name: &str) -> crate::Result<String> {
    match media_type {
        MediaType::Pdf => PdfExtractor::extract(path).map_err(|e| {
            Error::bad_request(format!("Could not read PDF {}: {:#}", display_name, e))
        }),
        MediaType::Plaintext => TxtExtractor::extract(path, display_name),
    }
}
