// server/src/config.rs
//!
//! Service configuration: a TOML file (`config/docsum.toml` by default) whose
//! every key has a default, then CLI overrides applied on top in `main`.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chunk::DEFAULT_MAX_INPUT_TOKENS;
use crate::model_adapters::{GenerationParams, STUB_MODEL_ID};
use crate::scoring::ScoringTarget;

pub const DEFAULT_CONFIG_PATH: &str = "config/docsum.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub model: ModelConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Origins allowed by CORS. Nothing else is accepted.
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Retained uploads, and scratch space for transient ones.
    pub input_dir: PathBuf,
    /// Persisted summary files.
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    HuggingFace,
    Ollama,
    Stub,
}

impl std::str::FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(ModelProvider::HuggingFace),
            "ollama" => Ok(ModelProvider::Ollama),
            "stub" => Ok(ModelProvider::Stub),
            other => Err(format!("unknown model provider: {}", other)),
        }
    }
}

pub const HF_INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models";
pub const OLLAMA_DEFAULT_HOST: &str = "http://127.0.0.1:11434";

impl ModelProvider {
    pub fn default_model_id(&self) -> &'static str {
        match self {
            ModelProvider::HuggingFace => "facebook/bart-large-cnn",
            ModelProvider::Ollama => "llama3.2:1b",
            ModelProvider::Stub => STUB_MODEL_ID,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    /// Unset means the provider's default model.
    pub model_id: Option<String>,
    /// Inference URL for `huggingface`, daemon base URL for `ollama`. Unset
    /// means the provider's default location.
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API token.
    pub api_key_env: String,
    pub max_input_tokens: usize,
    pub num_beams: u32,
    pub max_length: u32,
    pub min_length: u32,
    /// Per-call generation timeout.
    pub timeout_secs: u64,
    /// Route every generation through a single shared slot.
    pub serialize_inference: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::HuggingFace,
            model_id: None,
            endpoint: None,
            api_key_env: "HF_API_TOKEN".to_string(),
            max_input_tokens: DEFAULT_MAX_INPUT_TOKENS,
            num_beams: 4,
            max_length: 150,
            min_length: 50,
            timeout_secs: 120,
            serialize_inference: true,
        }
    }
}

impl ModelConfig {
    pub fn model_id(&self) -> &str {
        self.model_id
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model_id())
    }

    pub fn endpoint(&self) -> String {
        if let Some(endpoint) = &self.endpoint {
            return endpoint.clone();
        }
        match self.provider {
            ModelProvider::HuggingFace => format!("{}/{}", HF_INFERENCE_BASE, self.model_id()),
            ModelProvider::Ollama => OLLAMA_DEFAULT_HOST.to_string(),
            ModelProvider::Stub => String::new(),
        }
    }

    /// Switch runtimes. A model or endpoint chosen for the previous provider
    /// does not carry over.
    pub fn set_provider(&mut self, provider: ModelProvider) {
        if provider != self.provider {
            self.model_id = None;
            self.endpoint = None;
        }
        self.provider = provider;
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            num_beams: self.num_beams,
            max_length: self.max_length,
            min_length: self.min_length,
            early_stopping: true,
        }
    }
}

/// What happens to a multi-item request when one item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFailure {
    /// Fail the whole request on the first item error.
    #[default]
    Abort,
    /// Report the item's error in its result slot and keep going.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Used when a request does not pick a scoring target itself.
    pub scoring_target: ScoringTarget,
    /// Default for `merge` on multi-file requests.
    pub merge_files: bool,
    pub max_bullets: usize,
    pub extractive_sentences: usize,
    pub score_in_filename: bool,
    pub batch_failure: BatchFailure,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scoring_target: ScoringTarget::Source,
            merge_files: false,
            max_bullets: 5,
            extractive_sentences: 5,
            score_in_filename: false,
            batch_failure: BatchFailure::Abort,
        }
    }
}

impl ServiceConfig {
    /// Load from `path`, or from the default location if it exists, or fall
    /// back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load_from_path(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let toml_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::load_from_str(&toml_str)
            .with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("Failed to parse config TOML")
    }

    pub fn validate(&self) -> Result<()> {
        let pipeline = &self.pipeline;
        if pipeline.max_bullets == 0 {
            bail!("pipeline.max_bullets must be at least 1");
        }
        let floor = 3.min(pipeline.max_bullets);
        if pipeline.extractive_sentences < floor || pipeline.extractive_sentences > pipeline.max_bullets {
            return Err(anyhow!(
                "pipeline.extractive_sentences must be between {} and {} (got {})",
                floor,
                pipeline.max_bullets,
                pipeline.extractive_sentences
            ));
        }
        if self.model.min_length > self.model.max_length {
            bail!(
                "model.min_length ({}) exceeds model.max_length ({})",
                self.model.min_length,
                self.model.max_length
            );
        }
        if self.model.max_input_tokens == 0 {
            bail!("model.max_input_tokens must be positive");
        }
        if self.model.num_beams == 0 {
            bail!("model.num_beams must be at least 1");
        }
        Ok(())
    }
}
