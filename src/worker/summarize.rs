#![allow(clippy::missing_errors_doc)]
use tracing::{debug, info};

use crate::ai::chunking::{chunk_ids, dynamic_lengths};
use crate::ai::{LengthLimits, LoadedModel, ModelHub, load_from_hub};
use crate::core::config::SummarizeConfig;
use crate::errors::SummarizeError;

/// Chunked summarizer over a loaded model.
///
/// Long input is split into overlapping token windows, each window is
/// summarized on its own, and when there is more than one window the partial
/// summaries are joined and summarized once more.
#[derive(Clone)]
pub struct TextSummarizer {
    config: SummarizeConfig,
    loaded: LoadedModel,
}

impl TextSummarizer {
    #[must_use]
    pub fn new(config: SummarizeConfig, loaded: LoadedModel) -> Self {
        Self { config, loaded }
    }

    /// Load `config.model_name` from the hub and wrap it.
    pub fn load(config: SummarizeConfig, hub: &ModelHub) -> Result<Self, SummarizeError> {
        let loaded = load_from_hub(hub, &config.model_name, config.device)?;
        Ok(Self::new(config, loaded))
    }

    #[must_use]
    pub fn config(&self) -> &SummarizeConfig {
        &self.config
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.loaded.model_id
    }

    pub fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(String::new());
        }

        let tokenizer = &self.loaded.tokenizer;
        let model = &self.loaded.model;

        let ids = tokenizer.encode(text)?;
        let chunks = chunk_ids(&ids, model.max_input_len(), self.config.chunk_overlap);
        info!(
            model = %self.loaded.model_id,
            tokens = ids.len(),
            chunks = chunks.len(),
            "Summarizing text"
        );

        let mut partials = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let chunk_text = tokenizer.decode(chunk)?;
            #[cfg(feature = "debug-logs")]
            debug!(chunk = index, text = %chunk_text, "Chunk text");
            let summary = model.generate(&chunk_text, self.limits_for(chunk.len()))?;
            debug!(chunk = index, tokens = chunk.len(), "Chunk summarized");
            partials.push(summary);
        }

        if partials.len() == 1 {
            return Ok(partials.swap_remove(0));
        }

        let joined = partials.join(" ");
        let joined_tokens = tokenizer.encode(&joined)?.len();
        debug!(tokens = joined_tokens, "Summarizing joined partial summaries");
        model.generate(&joined, self.limits_for(joined_tokens))
    }

    fn limits_for(&self, token_count: usize) -> LengthLimits {
        let (max_length, min_length) = dynamic_lengths(
            token_count,
            self.config.max_summary_tokens,
            self.config.min_summary_tokens,
        );
        LengthLimits {
            max_length,
            min_length,
        }
    }
}
