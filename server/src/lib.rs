// server/src/lib.rs

use serde::Serialize;

// The service-wide error type. Every variant maps onto one HTTP status in `api`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    BadRequest(String),
    #[error("Unsupported file type: {0}")]
    UnsupportedMediaType(String),
    #[error("File {0} not found in input store")]
    NotFound(String),
    #[error("File {0} is not valid UTF-8 text")]
    DecodeError(String),
    #[error("Summarization model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("Generation failed: {0}")]
    Generation(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest(message.into())
    }

    /// Short machine-readable tag, used in logs and per-item batch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::BadRequest(_) => "bad_request",
            Error::UnsupportedMediaType(_) => "unsupported_media_type",
            Error::NotFound(_) => "not_found",
            Error::DecodeError(_) => "decode_error",
            Error::ModelUnavailable(_) => "model_unavailable",
            Error::Generation(_) => "generation",
            Error::Io(_) => "io",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(format!("{:#}", err))
    }
}

impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub mod abstractive;
pub mod api;
pub mod chunk;
pub mod config;
pub mod document_processing;
pub mod extractive;
pub mod model_adapters;
pub mod orchestrator;
pub mod persistence;
pub mod scoring;
pub mod sentences;

pub use config::ServiceConfig;
pub use scoring::{ScoreReport, ScoringTarget, ScoringUnavailable};

/// Ordered summary sentences, rendered as one `- ` bullet per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulletList(pub Vec<String>);

impl BulletList {
    pub fn from_sentences<I, S>(sentences: I, max_bullets: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BulletList(
            sentences
                .into_iter()
                .take(max_bullets)
                .map(Into::into)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sentences(&self) -> &[String] {
        &self.0
    }

    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Serialize for BulletList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.render())
    }
}

/// Both summaries for one piece of source text.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    pub abstractive: BulletList,
    pub extractive: BulletList,
}

#[cfg(test)]
mod tests;
