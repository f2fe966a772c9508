// server/src/model_adapters.rs
//!
//! Model Adapters: one interface over the runtimes that can serve a
//! sequence-to-sequence summarization model.
//!
//! Architecture:
//! - SummaryModel trait: common interface for every runtime
//! - HuggingFaceAdapter: HF Inference API (or a compatible self-hosted server)
//! - OllamaAdapter: local Ollama daemon, prompt-driven
//! - StubAdapter: deterministic offline model for development and tests
//! - build_adapter: picks the adapter named in the model config

use crate::config::{ModelConfig, ModelProvider};
use crate::sentences::split_sentences;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Decoding settings handed to the model for every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub num_beams: u32,
    pub max_length: u32,
    pub min_length: u32,
    pub early_stopping: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            num_beams: 4,
            max_length: 150,
            min_length: 50,
            early_stopping: true,
        }
    }
}

/// Model adapter trait - common interface for all summarization runtimes
pub trait SummaryModel: Send + Sync {
    /// Summarize one chunk of input text
    fn generate(&self, chunk: &str, params: &GenerationParams) -> Result<String>;

    /// Confirm the model can serve requests. Called once at startup.
    fn probe(&self) -> Result<()>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    fn model_id(&self) -> &str;
}

fn agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

/// Pull a readable message out of a failed response.
fn status_error(provider: &str, code: u16, resp: ureq::Response) -> anyhow::Error {
    let error_body: Result<serde_json::Value, _> = resp.into_json();
    let error_msg = match error_body {
        Ok(json) => json["error"]
            .as_str()
            .or_else(|| json["error"]["message"].as_str())
            .unwrap_or("Unknown API error")
            .to_string(),
        Err(_) => format!("HTTP {} error", code),
    };
    anyhow!("{} API error (HTTP {}): {}", provider, code, error_msg)
}

// ============================================================================
// Hugging Face Adapter
// ============================================================================

pub struct HuggingFaceAdapter {
    agent: ureq::Agent,
    endpoint: String,
    model_id: String,
    api_key: Option<String>,
}

impl HuggingFaceAdapter {
    pub fn new(endpoint: String, model_id: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            agent: agent(timeout),
            endpoint,
            model_id,
            api_key,
        }
    }

    fn post(&self, payload: &serde_json::Value) -> Result<serde_json::Value> {
        let mut request = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.set("Authorization", &format!("Bearer {}", key));
        }

        let response = match request.send_json(payload) {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, resp)) => {
                return Err(status_error(self.provider_name(), code, resp));
            }
            Err(e) => {
                return Err(anyhow!("Failed to connect to {}: {}", self.endpoint, e));
            }
        };

        response
            .into_json()
            .context("Failed to parse Hugging Face response")
    }

    /// The hosted API answers with `[{"summary_text": ..}]`; some
    /// self-hosted servers drop the array.
    fn summary_text(json: &serde_json::Value) -> Option<&str> {
        json.get(0)
            .and_then(|first| first["summary_text"].as_str())
            .or_else(|| json["summary_text"].as_str())
    }
}

impl SummaryModel for HuggingFaceAdapter {
    fn generate(&self, chunk: &str, params: &GenerationParams) -> Result<String> {
        let payload = serde_json::json!({
            "inputs": chunk,
            "parameters": {
                "num_beams": params.num_beams,
                "max_length": params.max_length,
                "min_length": params.min_length,
                "early_stopping": params.early_stopping,
            },
            "options": { "wait_for_model": true }
        });

        let json = self.post(&payload)?;
        Self::summary_text(&json)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| anyhow!("No summary_text in Hugging Face response"))
    }

    fn probe(&self) -> Result<()> {
        let params = GenerationParams {
            num_beams: 1,
            max_length: 16,
            min_length: 1,
            early_stopping: true,
        };
        self.generate("The service is starting up and checking the model.", &params)
            .with_context(|| format!("Model {} did not answer at {}", self.model_id, self.endpoint))?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "HuggingFace"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Ollama Adapter (Local Models)
// ============================================================================

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModelEntry>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelEntry {
    name: String,
}

pub struct OllamaAdapter {
    agent: ureq::Agent,
    host: String,
    model_id: String,
}

impl OllamaAdapter {
    pub fn new(host: String, model_id: String, timeout: Duration) -> Self {
        Self {
            agent: agent(timeout),
            host: host.trim_end_matches('/').to_string(),
            model_id,
        }
    }

    fn prompt(chunk: &str, params: &GenerationParams) -> String {
        format!(
            "Summarize the following text in plain prose, between {} and {} words. \
             Reply with the summary only.\n\n{}",
            params.min_length, params.max_length, chunk
        )
    }
}

impl SummaryModel for OllamaAdapter {
    // Ollama decodes by sampling; beam settings have no equivalent there.
    fn generate(&self, chunk: &str, params: &GenerationParams) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.model_id,
            "prompt": Self::prompt(chunk, params),
            "stream": false,
            "options": {
                "num_predict": params.max_length,
                "temperature": 0,
            }
        });

        let url = format!("{}/api/generate", self.host);
        let response = match self.agent.post(&url).send_json(&payload) {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, resp)) => {
                return Err(status_error(self.provider_name(), code, resp));
            }
            Err(e) => return Err(anyhow!("Failed to connect to Ollama at {}: {}", self.host, e)),
        };

        let json: serde_json::Value = response
            .into_json()
            .context("Failed to parse Ollama response")?;
        json["response"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| anyhow!("No response text from Ollama"))
    }

    fn probe(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.host);
        let tags: OllamaTagsResponse = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| anyhow!("Failed to reach Ollama at {}: {}", self.host, e))?
            .into_json()
            .context("Failed to parse Ollama tags response")?;

        if tags.models.iter().any(|m| m.name == self.model_id) {
            Ok(())
        } else {
            Err(anyhow!(
                "Model '{}' is not pulled in Ollama at {}",
                self.model_id,
                self.host
            ))
        }
    }

    fn provider_name(&self) -> &'static str {
        "Ollama"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Stub Adapter (offline)
// ============================================================================

pub const STUB_MODEL_ID: &str = "stub-model";

/// Returns the chunk's leading sentences, up to `max_length` words but never
/// fewer than one sentence.
pub struct StubAdapter;

impl SummaryModel for StubAdapter {
    fn generate(&self, chunk: &str, params: &GenerationParams) -> Result<String> {
        let mut kept: Vec<String> = Vec::new();
        let mut words = 0usize;
        for sentence in split_sentences(chunk) {
            let sentence_words = sentence.split_whitespace().count();
            if !kept.is_empty() && words + sentence_words > params.max_length as usize {
                break;
            }
            words += sentence_words;
            kept.push(sentence);
        }
        Ok(kept.join(" "))
    }

    fn probe(&self) -> Result<()> {
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "Stub"
    }

    fn model_id(&self) -> &str {
        STUB_MODEL_ID
    }
}

// ============================================================================
// Adapter selection
// ============================================================================

pub fn build_adapter(config: &ModelConfig) -> Result<Box<dyn SummaryModel>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let adapter: Box<dyn SummaryModel> = match config.provider {
        ModelProvider::HuggingFace => {
            let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
            Box::new(HuggingFaceAdapter::new(
                config.endpoint(),
                config.model_id().to_string(),
                api_key,
                timeout,
            ))
        }
        ModelProvider::Ollama => Box::new(OllamaAdapter::new(
            config.endpoint(),
            config.model_id().to_string(),
            timeout,
        )),
        ModelProvider::Stub => Box::new(StubAdapter),
    };
    Ok(adapter)
}
