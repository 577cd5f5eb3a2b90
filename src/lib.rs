/// brief - a local article summarizer built on BART seq2seq models.
///
/// Text (pasted, read from a file, or extracted from a fetched web page) is
/// split into overlapping token windows that fit the encoder, each window is
/// summarized, and the partial summaries are summarized once more.
///
/// # Architecture
///
/// The crate uses:
/// - candle for BART inference on CPU (or CUDA with the `cuda` feature)
/// - hf-hub and tokenizers for model files and tokenization
/// - reqwest, readability, html2text and scraper for article extraction
/// - axum for the web page and JSON API, clap for the CLI
///
/// # Example
///
/// ```no_run
/// use brief::ai::ModelHub;
/// use brief::core::config::AppConfig;
/// use brief::worker::TextSummarizer;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     brief::setup_logging();
///
///     let config = AppConfig::from_env()?;
///     let hub = ModelHub::new(&config)?;
///     let summarizer = TextSummarizer::load(config.summarize_defaults(), &hub)?;
///     println!("{}", summarizer.summarize("Long article text ...")?);
///     Ok(())
/// }
/// ```
// Module declarations
pub mod ai;
pub mod api;
pub mod cli;
pub mod clients;
pub mod core;
pub mod errors;
pub mod extract;
pub mod utils;
pub mod views;
pub mod worker;

/// Configure structured JSON logging on stderr at `info` unless `RUST_LOG`
/// says otherwise.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
///
/// # Example
///
/// ```
/// brief::setup_logging();
/// ```
pub fn setup_logging() {
    init_logging("info");
}

/// Like [`setup_logging`] with a different default level.
pub fn init_logging(default_level: &str) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
