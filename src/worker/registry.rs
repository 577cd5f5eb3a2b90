#![allow(clippy::missing_errors_doc)]
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use super::summarize::TextSummarizer;
use crate::ai::{LoadedModel, ModelHub, load_from_hub};
use crate::core::config::SummarizeConfig;
use crate::errors::SummarizeError;

/// Loads model weights for a model id.
pub trait ModelLoader: Send + Sync {
    fn load(&self, model_name: &str, device: Option<usize>) -> Result<LoadedModel, SummarizeError>;
}

/// Loader backed by the Hugging Face hub cache.
pub struct HubModelLoader {
    hub: ModelHub,
}

impl HubModelLoader {
    #[must_use]
    pub fn new(hub: ModelHub) -> Self {
        Self { hub }
    }
}

impl ModelLoader for HubModelLoader {
    fn load(&self, model_name: &str, device: Option<usize>) -> Result<LoadedModel, SummarizeError> {
        load_from_hub(&self.hub, model_name, device)
    }
}

type CacheKey = (String, Option<usize>);

/// One model's cache entry. Its lock is held while that model loads.
type Slot = Arc<Mutex<Option<LoadedModel>>>;

fn poisoned<T>(_: T) -> SummarizeError {
    SummarizeError::ModelError("model cache lock poisoned".to_string())
}

/// Process-wide cache of loaded models.
///
/// Weights are keyed by model id and device only, so changing the length
/// sliders reuses the same weights. Each model has its own slot: a second
/// request for a model that is still loading waits on that slot and then
/// hits the cache, while requests for other models go straight through.
pub struct ModelRegistry {
    loader: Arc<dyn ModelLoader>,
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl ModelRegistry {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Summarizer for `config`, loading the model on first use.
    pub fn get_summarizer(&self, config: &SummarizeConfig) -> Result<TextSummarizer, SummarizeError> {
        let loaded = self.get_model(&config.model_name, config.device)?;
        Ok(TextSummarizer::new(config.clone(), loaded))
    }

    pub fn get_model(
        &self,
        model_name: &str,
        device: Option<usize>,
    ) -> Result<LoadedModel, SummarizeError> {
        let slot = {
            let mut slots = self.slots.lock().map_err(poisoned)?;
            slots
                .entry((model_name.to_string(), device))
                .or_default()
                .clone()
        };

        let mut entry = slot.lock().map_err(poisoned)?;
        if let Some(loaded) = entry.as_ref() {
            return Ok(loaded.clone());
        }

        info!(model = model_name, device = ?device, "Loading model");
        let loaded = self.loader.load(model_name, device)?;
        *entry = Some(loaded.clone());
        Ok(loaded)
    }

    /// Number of distinct models held in memory. Models still loading are
    /// not counted.
    pub fn cached_models(&self) -> usize {
        let Ok(slots) = self.slots.lock() else {
            return 0;
        };
        slots
            .values()
            .filter(|slot| slot.try_lock().is_ok_and(|entry| entry.is_some()))
            .count()
    }
}
