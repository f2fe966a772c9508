// Request-scoped document types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The two artifact kinds the service can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Plaintext,
}

impl MediaType {
    /// Map a declared MIME type (parameters such as `charset` are ignored).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(MediaType::Pdf),
            "text/plain" => Some(MediaType::Plaintext),
            _ => None,
        }
    }

    pub fn from_extension(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => Some(MediaType::Pdf),
            Some("txt") => Some(MediaType::Plaintext),
            _ => None,
        }
    }

    /// Resolve an upload's media type. The declared MIME type wins; the file
    /// extension is only consulted when nothing useful was declared.
    pub fn resolve(file_name: &str, declared: Option<&str>) -> crate::Result<Self> {
        let declared = declared
            .map(str::trim)
            .filter(|m| !m.is_empty() && !m.eq_ignore_ascii_case("application/octet-stream"));

        let resolved = match declared {
            Some(mime) => Self::from_mime(mime),
            None => Self::from_extension(file_name),
        };

        resolved.ok_or_else(|| crate::Error::UnsupportedMediaType(file_name.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Plaintext => "plaintext",
        }
    }
}

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes,
        }
    }
}

/// An artifact after text extraction. Lives only as long as the request.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub media_type: MediaType,
    pub extracted_text: String,
}

/// A file retained in the input store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredInput {
    pub name: String,
    pub media_type: MediaType,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}
