//! Model hub access and the on-disk model cache
//!
//! Files are fetched through `hf-hub`, which stores them under the hub cache
//! directory and serves later requests from disk without touching the network.

use std::path::PathBuf;

use hf_hub::api::sync::{Api, ApiBuilder, ApiRepo};
use tracing::{info, warn};

use crate::core::config::AppConfig;
use crate::errors::SummarizeError;

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const VOCAB_FILE: &str = "vocab.json";
pub const MERGES_FILE: &str = "merges.txt";
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Where the tokenizer comes from. Older repos ship only the GPT-2 style
/// `vocab.json` and `merges.txt` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerFiles {
    Json(PathBuf),
    VocabMerges { vocab: PathBuf, merges: PathBuf },
}

/// Local paths of everything needed to run a model.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: TokenizerFiles,
    pub weights: PathBuf,
}

pub struct ModelHub {
    api: Api,
}

impl ModelHub {
    pub fn new(config: &AppConfig) -> Result<Self, SummarizeError> {
        let mut builder = ApiBuilder::new().with_progress(false);
        // Leave the token cached by `huggingface-cli login` alone unless one
        // is configured explicitly.
        if let Some(token) = token_override(config) {
            builder = builder.with_token(Some(token));
        }
        if let Some(dir) = &config.hub_cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder.build()?;
        Ok(Self { api })
    }

    /// Download (or reuse from cache) the config, tokenizer and safetensors
    /// weights for `model_id`.
    ///
    /// # Errors
    ///
    /// `MissingSafetensors` when the repo exists but only ships pickled
    /// weights; `HubError` for anything else (unknown repo, network, disk).
    pub fn resolve(&self, model_id: &str) -> Result<ModelFiles, SummarizeError> {
        info!(model = model_id, "Resolving model files");
        let repo = self.api.model(model_id.to_string());

        let config = repo
            .get(CONFIG_FILE)
            .map_err(|e| SummarizeError::HubError(format!("{model_id}/{CONFIG_FILE}: {e}")))?;
        let tokenizer = resolve_tokenizer(&repo, model_id)?;
        let weights = match repo.get(WEIGHTS_FILE) {
            Ok(path) => path,
            Err(e) => return Err(classify_weights_error(&repo, model_id, &e.to_string())),
        };

        info!(model = model_id, weights = %weights.display(), "Model files ready");
        Ok(ModelFiles {
            config,
            tokenizer,
            weights,
        })
    }
}

fn token_override(config: &AppConfig) -> Option<String> {
    config
        .hub_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn resolve_tokenizer(repo: &ApiRepo, model_id: &str) -> Result<TokenizerFiles, SummarizeError> {
    let json_err = match repo.get(TOKENIZER_FILE) {
        Ok(path) => return Ok(TokenizerFiles::Json(path)),
        Err(e) => e,
    };
    warn!(model = model_id, error = %json_err, "No tokenizer.json, trying vocab.json and merges.txt");

    let pair = repo
        .get(VOCAB_FILE)
        .and_then(|vocab| repo.get(MERGES_FILE).map(|merges| (vocab, merges)));
    match pair {
        Ok((vocab, merges)) => Ok(TokenizerFiles::VocabMerges { vocab, merges }),
        Err(e) => Err(SummarizeError::HubError(format!(
            "{model_id}/{TOKENIZER_FILE}: {json_err}; {VOCAB_FILE}/{MERGES_FILE}: {e}"
        ))),
    }
}

// A failed weights download is only reported as "no safetensors" when the
// repo listing confirms the file is absent.
fn classify_weights_error(repo: &ApiRepo, model_id: &str, reason: &str) -> SummarizeError {
    match repo.info() {
        Ok(info) => {
            let files: Vec<&str> = info.siblings.iter().map(|s| s.rfilename.as_str()).collect();
            if has_safetensors(&files) {
                SummarizeError::HubError(format!("{model_id}/{WEIGHTS_FILE}: {reason}"))
            } else {
                warn!(model = model_id, "Repository has no safetensors weights");
                SummarizeError::MissingSafetensors {
                    model: model_id.to_string(),
                }
            }
        }
        Err(info_err) => SummarizeError::HubError(format!(
            "{model_id}/{WEIGHTS_FILE}: {reason} (listing failed: {info_err})"
        )),
    }
}

#[must_use]
fn has_safetensors(files: &[&str]) -> bool {
    files.iter().any(|f| *f == WEIGHTS_FILE)
}
