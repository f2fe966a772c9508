use anyhow::Result;
use tiktoken_rs::{r50k_base, CoreBPE};

use crate::sentences::split_sentences;

/// Input budget of the default summarization model (BART-large-CNN).
pub const DEFAULT_MAX_INPUT_TOKENS: usize = 1024;

/// Decode attempts before a truncated chunk is given up on. A cut inside a
/// multi-byte character leaves at most three byte tokens dangling.
const MAX_CUT_BACKOFF: usize = 4;

/// Packs sentences into chunks that fit the model's input window. Counts use
/// the GPT-2 byte-level BPE vocabulary that BART shares.
pub struct Chunker {
    bpe: CoreBPE,
    max_input_tokens: usize,
}

impl Chunker {
    pub fn new(max_input_tokens: usize) -> Result<Self> {
        let bpe = r50k_base()?;
        Ok(Self {
            bpe,
            max_input_tokens,
        })
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// A chunk grows while `current + sentence` encodes within budget. The
    /// sentence that overflows closes the chunk and opens the next one.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in split_sentences(text) {
            let candidate = if current.is_empty() {
                sentence.clone()
            } else {
                format!("{} {}", current, sentence)
            };

            if self.count_tokens(&candidate) <= self.max_input_tokens {
                current = candidate;
            } else {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                current = sentence;
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    /// Cut a chunk down to the input budget. Only a single oversized sentence
    /// can exceed it. The cut moves back until it no longer splits a UTF-8
    /// character.
    pub fn truncate_to_budget(&self, chunk: &str) -> Result<String> {
        let tokens = self.bpe.encode_with_special_tokens(chunk);
        if tokens.len() <= self.max_input_tokens {
            return Ok(chunk.to_string());
        }

        let mut end = self.max_input_tokens;
        let floor = end.saturating_sub(MAX_CUT_BACKOFF);
        loop {
            match self.bpe.decode(tokens[..end].to_vec()) {
                Ok(head) => return Ok(head),
                Err(err) if end == floor || end == 0 => return Err(err),
                Err(_) => end -= 1,
            }
        }
    }
}
