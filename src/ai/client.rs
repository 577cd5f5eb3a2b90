//! Local seq2seq client
//!
//! Wraps tokenizer + BART weights behind [`SummaryModel`], the single call
//! the summarizer makes per chunk.

use std::sync::Arc;

use candle_core::Device;
use tracing::{debug, info};

use super::bart::{BartModel, ModelConfig};
use super::chunking::max_input_len;
use super::generation::beam_search;
use super::hub::ModelHub;
use super::tokenizer::{HubTokenizer, TokenCodec};
use crate::errors::SummarizeError;

/// Length budget for one generation call, in decoder tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthLimits {
    pub max_length: usize,
    pub min_length: usize,
}

impl LengthLimits {
    /// Fit within a decoder of `max_positions` positions, keeping
    /// `min_length` strictly below `max_length`.
    #[must_use]
    pub fn capped(self, max_positions: usize) -> Self {
        let max_length = self.max_length.min(max_positions).max(1);
        Self {
            max_length,
            min_length: self.min_length.min(max_length - 1),
        }
    }
}

/// Maps one input span to its summary.
pub trait SummaryModel: Send + Sync {
    /// Encoder input length the chunker must stay under.
    fn max_input_len(&self) -> usize;

    fn generate(&self, text: &str, limits: LengthLimits) -> Result<String, SummarizeError>;
}

/// A tokenizer and model pair ready to summarize.
#[derive(Clone)]
pub struct LoadedModel {
    pub model_id: String,
    pub tokenizer: Arc<dyn TokenCodec>,
    pub model: Arc<dyn SummaryModel>,
}

/// Select the inference device: CPU unless an accelerator ordinal is given.
pub fn select_device(ordinal: Option<usize>) -> Result<Device, SummarizeError> {
    match ordinal {
        None => Ok(Device::Cpu),
        Some(ordinal) => Ok(Device::cuda_if_available(ordinal)?),
    }
}

/// Fetch (or reuse from the hub cache) and load `model_id`.
pub fn load_from_hub(
    hub: &ModelHub,
    model_id: &str,
    device: Option<usize>,
) -> Result<LoadedModel, SummarizeError> {
    let files = hub.resolve(model_id)?;
    let device = select_device(device)?;

    let tokenizer = Arc::new(HubTokenizer::load(&files.tokenizer)?);
    let config = ModelConfig::from_file(&files.config)?;
    let model = BartModel::load(config, &files.weights, &device)?;
    info!(model = model_id, device = ?device, "Model loaded");

    let client = BartClient {
        tokenizer: tokenizer.clone(),
        model,
    };
    Ok(LoadedModel {
        model_id: model_id.to_string(),
        tokenizer,
        model: Arc::new(client),
    })
}

pub struct BartClient {
    tokenizer: Arc<HubTokenizer>,
    model: BartModel,
}

impl SummaryModel for BartClient {
    fn max_input_len(&self) -> usize {
        max_input_len(Some(self.model.config().max_position_embeddings))
    }

    fn generate(&self, text: &str, limits: LengthLimits) -> Result<String, SummarizeError> {
        let input_ids = self.tokenizer.encode_for_model(text, self.max_input_len())?;
        let limits = limits.capped(self.max_input_len());
        let generation = self
            .model
            .config()
            .generation_config(limits.max_length, limits.min_length);
        debug!(
            input_tokens = input_ids.len(),
            max_length = generation.max_length,
            min_length = generation.min_length,
            num_beams = generation.num_beams,
            "Generating summary"
        );

        let encoder_states = self.model.encode(&input_ids)?;
        let mut decoder = self.model.step_decoder(encoder_states);
        let output_ids = beam_search(&mut decoder, &generation)?;

        let summary = self.tokenizer.decode(&output_ids)?;
        #[cfg(feature = "debug-logs")]
        debug!(summary = %summary, "Raw generation");
        Ok(summary.trim().to_string())
    }
}
