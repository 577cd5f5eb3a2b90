#![allow(clippy::missing_errors_doc)]
use std::sync::Arc;

use tracing::{error, info, warn};

use super::registry::ModelRegistry;
use crate::clients::PageFetcher;
use crate::core::config::SummarizeConfig;
use crate::core::models::{
    MIN_ARTICLE_WORDS, NO_USABLE_TEXT_WEB, SAFE_DEFAULT, SummarizeOutcome, SummarizeRequest,
};
use crate::errors::SummarizeError;
use crate::extract::fetch_if_url;
use crate::utils::text::word_count;

/// Map a model choice to a hub model id.
#[must_use]
pub fn resolve_model(name: &str) -> String {
    name.to_string()
}

/// Request orchestration shared by the web front-end.
#[derive(Clone)]
pub struct SummarizeService {
    registry: Arc<ModelRegistry>,
    fetcher: Arc<dyn PageFetcher>,
    defaults: SummarizeConfig,
}

impl SummarizeService {
    pub fn new(
        registry: Arc<ModelRegistry>,
        fetcher: Arc<dyn PageFetcher>,
        defaults: SummarizeConfig,
    ) -> Self {
        Self {
            registry,
            fetcher,
            defaults,
        }
    }

    #[must_use]
    pub fn defaults(&self) -> &SummarizeConfig {
        &self.defaults
    }

    /// Summarize pasted text or the article behind a URL.
    ///
    /// Never fails: problems come back in the notice as
    /// `Error: <kind>: <message>` with an empty summary.
    pub async fn do_summarize(&self, request: &SummarizeRequest) -> SummarizeOutcome {
        match self.try_summarize(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Summarization failed");
                SummarizeOutcome::error(format!("Error: {}: {}", e.kind(), e))
            }
        }
    }

    async fn try_summarize(
        &self,
        request: &SummarizeRequest,
    ) -> Result<SummarizeOutcome, SummarizeError> {
        let article = fetch_if_url(self.fetcher.as_ref(), &request.text).await?;
        let words = word_count(&article);
        if words < MIN_ARTICLE_WORDS {
            info!(words, "Input too short to summarize");
            return Ok(SummarizeOutcome::summary(NO_USABLE_TEXT_WEB));
        }

        let config = self.request_config(request);
        let registry = self.registry.clone();
        tokio::task::spawn_blocking(move || summarize_with_fallback(&registry, config, &article))
            .await
            .map_err(|e| SummarizeError::ModelError(format!("Summarization task failed: {e}")))?
    }

    fn request_config(&self, request: &SummarizeRequest) -> SummarizeConfig {
        let model_name = if request.model.trim().is_empty() {
            self.defaults.model_name.clone()
        } else {
            resolve_model(request.model.trim())
        };
        SummarizeConfig {
            model_name,
            max_summary_tokens: request.max_tokens,
            min_summary_tokens: request.min_tokens.min(request.max_tokens.saturating_sub(1)),
            ..self.defaults.clone()
        }
    }
}

/// Summarize `text` with `config`, switching to [`SAFE_DEFAULT`] when the
/// chosen model has no safetensors weights.
pub fn summarize_with_fallback(
    registry: &ModelRegistry,
    mut config: SummarizeConfig,
    text: &str,
) -> Result<SummarizeOutcome, SummarizeError> {
    match registry.get_summarizer(&config) {
        Ok(summarizer) => Ok(SummarizeOutcome::summary(summarizer.summarize(text)?)),
        Err(SummarizeError::MissingSafetensors { model }) => {
            warn!(model = %model, fallback = SAFE_DEFAULT, "Model has no safetensors, falling back");
            config.model_name = SAFE_DEFAULT.to_string();
            let summarizer = registry.get_summarizer(&config)?;
            Ok(SummarizeOutcome::with_notice(
                summarizer.summarize(text)?,
                format!("Notice: '{model}' has no safetensors. Fell back to {SAFE_DEFAULT}."),
            ))
        }
        Err(e) => Err(e),
    }
}
