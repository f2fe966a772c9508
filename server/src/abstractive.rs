//! Abstractive summarization: chunk the source to the model's input window,
//! summarize each chunk, then re-split the joined output into bullets.

use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::chunk::Chunker;
use crate::config::ModelConfig;
use crate::model_adapters::{build_adapter, GenerationParams, SummaryModel};
use crate::sentences::split_sentences;
use crate::{BulletList, Error};

pub struct AbstractiveSummarizer {
    model: Arc<dyn SummaryModel>,
    chunker: Chunker,
    /// Present when every generation must go through a single slot.
    gate: Option<Mutex<()>>,
    params: GenerationParams,
    max_bullets: usize,
}

impl AbstractiveSummarizer {
    /// Build the configured adapter and probe it. Any failure here is fatal
    /// for the service.
    pub fn load(config: &ModelConfig, max_bullets: usize) -> crate::Result<Self> {
        let model = build_adapter(config).map_err(|e| Error::ModelUnavailable(format!("{:#}", e)))?;
        Self::with_model(Arc::from(model), config, max_bullets)
    }

    pub fn with_model(
        model: Arc<dyn SummaryModel>,
        config: &ModelConfig,
        max_bullets: usize,
    ) -> crate::Result<Self> {
        let chunker = Chunker::new(config.max_input_tokens)
            .map_err(|e| Error::ModelUnavailable(format!("tokenizer: {:#}", e)))?;
        model
            .probe()
            .map_err(|e| Error::ModelUnavailable(format!("{:#}", e)))?;

        info!(
            provider = model.provider_name(),
            model = model.model_id(),
            max_input_tokens = config.max_input_tokens,
            "summarization model ready"
        );

        Ok(Self {
            model,
            chunker,
            gate: config.serialize_inference.then(|| Mutex::new(())),
            params: config.generation_params(),
            max_bullets,
        })
    }

    pub fn default_lengths(&self) -> (u32, u32) {
        (self.params.max_length, self.params.min_length)
    }

    pub fn summarize(&self, text: &str, max_length: u32, min_length: u32) -> crate::Result<BulletList> {
        if min_length > max_length {
            return Err(Error::bad_request(format!(
                "min_length ({}) exceeds max_length ({})",
                min_length, max_length
            )));
        }
        let params = GenerationParams {
            max_length,
            min_length,
            ..self.params
        };

        let chunks = self.chunker.chunk_text(text);
        debug!(chunks = chunks.len(), "abstractive input chunked");

        let mut pieces = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let chunk = self.chunker.truncate_to_budget(chunk)?;
            pieces.push(self.generate(&chunk, &params)?);
        }

        let joined = pieces.join(" ");
        let bullets = BulletList::from_sentences(split_sentences(&joined), self.max_bullets);
        debug!(bullets = bullets.len(), "abstractive summary ready");
        Ok(bullets)
    }

    fn generate(&self, chunk: &str, params: &GenerationParams) -> crate::Result<String> {
        // A panic inside a previous generation does not invalidate the slot.
        let _slot = self
            .gate
            .as_ref()
            .map(|gate| gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));

        self.model.generate(chunk, params).map_err(|e| {
            Error::Generation(format!("{} ({}): {:#}", self.model.provider_name(), self.model.model_id(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelProvider;
    use crate::model_adapters::StubAdapter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stub_config() -> ModelConfig {
        ModelConfig {
            provider: ModelProvider::Stub,
            ..ModelConfig::default()
        }
    }

    struct CountingModel {
        calls: AtomicUsize,
    }

    impl SummaryModel for CountingModel {
        fn generate(&self, chunk: &str, _params: &GenerationParams) -> anyhow::Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("Chunk {} had {} words.", n, chunk.split_whitespace().count()))
        }
        fn probe(&self) -> anyhow::Result<()> {
            Ok(())
        }
        fn provider_name(&self) -> &'static str {
            "Counting"
        }
        fn model_id(&self) -> &str {
            "counting"
        }
    }

    struct BrokenModel {
        probe_ok: bool,
    }

    impl SummaryModel for BrokenModel {
        fn generate(&self, _chunk: &str, _params: &GenerationParams) -> anyhow::Result<String> {
            Err(anyhow::anyhow!("connection reset"))
        }
        fn probe(&self) -> anyhow::Result<()> {
            if self.probe_ok {
                Ok(())
            } else {
                Err(anyhow::anyhow!("model not loaded"))
            }
        }
        fn provider_name(&self) -> &'static str {
            "Broken"
        }
        fn model_id(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn stub_summary_is_bulleted_sentences() -> crate::Result<()> {
        let summarizer = AbstractiveSummarizer::load(&stub_config(), 5)?;
        let bullets = summarizer.summarize("The cat sat. The dog ran. The bird flew. The fish swam.", 150, 50)?;
        assert_eq!(bullets.len(), 4);
        assert_eq!(bullets.sentences()[0], "The cat sat.");
        Ok(())
    }

    #[test]
    fn bullets_are_capped() -> crate::Result<()> {
        let summarizer = AbstractiveSummarizer::load(&stub_config(), 5)?;
        let text = (1..=12).map(|i| format!("Sentence {i}.")).collect::<Vec<_>>().join(" ");
        assert_eq!(summarizer.summarize(&text, 150, 50)?.len(), 5);
        Ok(())
    }

    #[test]
    fn each_chunk_is_generated_once() -> crate::Result<()> {
        let model = Arc::new(CountingModel { calls: AtomicUsize::new(0) });
        let config = ModelConfig {
            max_input_tokens: 8,
            ..stub_config()
        };
        let summarizer = AbstractiveSummarizer::with_model(model.clone(), &config, 5)?;

        let bullets = summarizer.summarize("One two three. Four five six. Seven eight nine.", 150, 50)?;

        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
        assert_eq!(bullets.sentences()[0], "Chunk 0 had 6 words.");
        Ok(())
    }

    #[test]
    fn failed_probe_is_model_unavailable() {
        let result = AbstractiveSummarizer::with_model(
            Arc::new(BrokenModel { probe_ok: false }),
            &stub_config(),
            5,
        );
        assert!(matches!(result, Err(Error::ModelUnavailable(_))));
    }

    #[test]
    fn generation_failure_is_typed() -> crate::Result<()> {
        let summarizer =
            AbstractiveSummarizer::with_model(Arc::new(BrokenModel { probe_ok: true }), &stub_config(), 5)?;
        let err = summarizer.summarize("Some text here.", 150, 50).unwrap_err();
        assert!(matches!(err, Error::Generation(ref msg) if msg.contains("connection reset")));
        Ok(())
    }

    #[test]
    fn inverted_lengths_are_rejected() -> crate::Result<()> {
        let summarizer = AbstractiveSummarizer::with_model(Arc::new(StubAdapter), &stub_config(), 5)?;
        assert!(matches!(summarizer.summarize("Text.", 10, 20), Err(Error::BadRequest(_))));
        Ok(())
    }

    #[test]
    fn empty_text_gives_empty_list() -> crate::Result<()> {
        let summarizer = AbstractiveSummarizer::with_model(Arc::new(StubAdapter), &stub_config(), 5)?;
        assert!(summarizer.summarize("", 150, 50)?.is_empty());
        Ok(())
    }
}
