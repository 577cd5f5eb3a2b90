use serde::{Deserialize, Serialize};

use super::config::{DEFAULT_MAX_SUMMARY_TOKENS, DEFAULT_MIN_SUMMARY_TOKENS};

/// Models offered in the web form. All of them ship safetensors weights.
pub const MODELS: [&str; 3] = [
    "facebook/bart-large-cnn",
    "facebook/bart-large-xsum",
    "philschmid/bart-large-cnn-samsum",
];

/// Model used when the requested one cannot be loaded from safetensors.
pub const SAFE_DEFAULT: &str = "facebook/bart-large-cnn";

/// Inputs with fewer words than this are not worth summarizing.
pub const MIN_ARTICLE_WORDS: usize = 50;

pub const NO_USABLE_TEXT_WEB: &str = "No usable article text extracted (page may be JS-rendered, logged-in, or paywalled). Copy the article text and paste it here or use the CLI with --file.";

pub const NO_USABLE_TEXT_CLI: &str = "No usable article text extracted (page may be JS-rendered, logged-in, or paywalled). Open the page in your browser, copy the visible article text to a file, and use --file.";

/// A single summarization request as submitted by the web form or API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeRequest {
    /// Article text, or an `http(s)://` URL to fetch.
    pub text: String,
    /// Blank means the configured default model.
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,
}

fn default_model() -> String {
    MODELS[0].to_string()
}

const fn default_max_tokens() -> usize {
    DEFAULT_MAX_SUMMARY_TOKENS
}

const fn default_min_tokens() -> usize {
    DEFAULT_MIN_SUMMARY_TOKENS
}

impl Default for SummarizeRequest {
    fn default() -> Self {
        Self {
            text: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            min_tokens: default_min_tokens(),
        }
    }
}

/// What the user sees: the summary box and the errors/notices box.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeOutcome {
    pub summary: String,
    pub notice: String,
}

impl SummarizeOutcome {
    #[must_use]
    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            notice: String::new(),
        }
    }

    #[must_use]
    pub fn with_notice(summary: impl Into<String>, notice: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            notice: notice.into(),
        }
    }

    #[must_use]
    pub fn error(notice: impl Into<String>) -> Self {
        Self {
            summary: String::new(),
            notice: notice.into(),
        }
    }
}
