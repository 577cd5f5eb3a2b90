use std::io::{IsTerminal, Read};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use brief::ai::ModelHub;
use brief::cli::{self, Args};
use brief::clients::HttpFetcher;
use brief::core::config::AppConfig;
use brief::errors::SummarizeError;
use brief::worker::{HubModelLoader, ModelRegistry};

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the summary; keep logs quiet unless asked for
    brief::init_logging("warn");
    let args = Args::parse();

    match run(&args).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", cli::error_message(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<String, SummarizeError> {
    let config = AppConfig::from_env().map_err(SummarizeError::ConfigError)?;
    let registry = ModelRegistry::new(Arc::new(HubModelLoader::new(ModelHub::new(&config)?)));
    let fetcher = HttpFetcher::new()?;

    let mut stdin = std::io::stdin().lock();
    let piped: Option<&mut dyn Read> = if stdin.is_terminal() {
        None
    } else {
        Some(&mut stdin)
    };
    cli::execute(args, &config, &registry, &fetcher, piped).await
}
