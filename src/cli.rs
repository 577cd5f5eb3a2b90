//! Command-line summarizer
//!
//! Reads article text from `--url`, `--file`, or piped stdin and prints the
//! summary (or `{"summary": ...}` with `--json`).

#![allow(clippy::missing_errors_doc)]
use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use tracing::info;

use crate::clients::PageFetcher;
use crate::core::config::{
    AppConfig, DEFAULT_MAX_SUMMARY_TOKENS, DEFAULT_MIN_SUMMARY_TOKENS, DEFAULT_MODEL,
    SummarizeConfig,
};
use crate::core::models::{MIN_ARTICLE_WORDS, NO_USABLE_TEXT_CLI};
use crate::errors::SummarizeError;
use crate::extract::fetch_article;
use crate::utils::text::word_count;
use crate::worker::ModelRegistry;

pub const NO_INPUT_MESSAGE: &str = "Provide --url or --file or pipe text via stdin.";

#[derive(Debug, Parser)]
#[command(name = "brief")]
#[command(about = "Summarize an article from a URL, a file, or stdin", long_about = None)]
pub struct Args {
    /// Article URL to fetch
    #[arg(long)]
    pub url: Option<String>,

    /// UTF-8 text file to summarize
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Hub model id
    #[arg(long, env = "SUMM_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Upper bound on summary length, in tokens
    #[arg(long, alias = "max_tokens", default_value_t = DEFAULT_MAX_SUMMARY_TOKENS)]
    pub max_tokens: usize,

    /// Lower bound on summary length, in tokens
    #[arg(long, alias = "min_tokens", default_value_t = DEFAULT_MIN_SUMMARY_TOKENS)]
    pub min_tokens: usize,

    /// Print JSON instead of plain text
    #[arg(long)]
    pub json: bool,
}

impl Args {
    #[must_use]
    pub fn summarize_config(&self, app: &AppConfig) -> SummarizeConfig {
        SummarizeConfig {
            model_name: self.model.clone(),
            max_summary_tokens: self.max_tokens,
            min_summary_tokens: self.min_tokens,
            device: app.device,
            ..SummarizeConfig::default()
        }
    }
}

/// Run one CLI invocation and return what should be printed.
///
/// `stdin` is `None` when standard input is a terminal. The model is loaded
/// before any input is read so a bad model id fails fast.
pub async fn execute(
    args: &Args,
    app: &AppConfig,
    registry: &ModelRegistry,
    fetcher: &dyn PageFetcher,
    stdin: Option<&mut dyn Read>,
) -> Result<String, SummarizeError> {
    let summarizer = registry.get_summarizer(&args.summarize_config(app))?;

    let text = read_input(args, fetcher, stdin).await?;
    let words = word_count(&text);
    if words < MIN_ARTICLE_WORDS {
        info!(words, "Input too short to summarize");
        return Ok(if args.json {
            json!({ "error": NO_USABLE_TEXT_CLI }).to_string()
        } else {
            NO_USABLE_TEXT_CLI.to_string()
        });
    }

    let summary = summarizer.summarize(&text)?;
    Ok(if args.json {
        json!({ "summary": summary }).to_string()
    } else {
        summary
    })
}

/// Input text from the first available source: URL, file, then stdin.
pub async fn read_input(
    args: &Args,
    fetcher: &dyn PageFetcher,
    stdin: Option<&mut dyn Read>,
) -> Result<String, SummarizeError> {
    if let Some(url) = &args.url {
        return fetch_article(fetcher, url).await;
    }
    if let Some(path) = &args.file {
        return Ok(std::fs::read_to_string(path)?);
    }
    if let Some(reader) = stdin {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        return Ok(text);
    }
    Err(SummarizeError::InputError(NO_INPUT_MESSAGE.to_string()))
}

/// Message printed to stderr when a run fails.
#[must_use]
pub fn error_message(error: &SummarizeError) -> String {
    match error {
        SummarizeError::InputError(msg) => msg.clone(),
        other => format!("Error: {}: {}", other.kind(), other),
    }
}
