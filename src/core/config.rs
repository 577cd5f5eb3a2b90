use std::env;
use std::path::PathBuf;

/// Model used when neither the caller nor `SUMM_MODEL` names one.
pub const DEFAULT_MODEL: &str = "facebook/bart-large-cnn";

pub const DEFAULT_MAX_SUMMARY_TOKENS: usize = 160;
pub const DEFAULT_MIN_SUMMARY_TOKENS: usize = 40;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub default_model: String,
    pub host: String,
    pub port: u16,
    pub hub_cache_dir: Option<PathBuf>,
    pub hub_token: Option<String>,
    pub device: Option<usize>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| format!("PORT: {}", e))?,
            Err(_) => 7860,
        };

        let device = match env::var("SUMM_DEVICE") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<usize>()
                    .map_err(|e| format!("SUMM_DEVICE: {}", e))?,
            ),
            _ => None,
        };

        Ok(Self {
            default_model: env::var("SUMM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            host: env::var("GRADIO_SERVER_NAME")
                .or_else(|_| env::var("HOST"))
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            hub_cache_dir: hub_cache_dir_from_env(),
            hub_token: env::var("HF_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            device,
        })
    }

    /// Per-request defaults derived from process configuration.
    #[must_use]
    pub fn summarize_defaults(&self) -> SummarizeConfig {
        SummarizeConfig {
            model_name: self.default_model.clone(),
            device: self.device,
            ..SummarizeConfig::default()
        }
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            host: "0.0.0.0".to_string(),
            port: 7860,
            hub_cache_dir: None,
            hub_token: None,
            device: None,
        }
    }
}

// HF_HUB_CACHE points straight at the repo cache; HF_HOME is its parent.
fn hub_cache_dir_from_env() -> Option<PathBuf> {
    if let Ok(dir) = env::var("HF_HUB_CACHE")
        && !dir.trim().is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    env::var("HF_HOME")
        .ok()
        .filter(|d| !d.trim().is_empty())
        .map(|home| PathBuf::from(home).join("hub"))
}

/// Tuning for a single summarization run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SummarizeConfig {
    pub model_name: String,
    pub max_summary_tokens: usize,
    pub min_summary_tokens: usize,
    pub chunk_overlap: usize,
    /// Accelerator ordinal; `None` runs on CPU.
    pub device: Option<usize>,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            model_name: env::var("SUMM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_summary_tokens: DEFAULT_MAX_SUMMARY_TOKENS,
            min_summary_tokens: DEFAULT_MIN_SUMMARY_TOKENS,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            device: None,
        }
    }
}
