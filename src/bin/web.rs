use std::sync::Arc;

use brief::ai::ModelHub;
use brief::clients::HttpFetcher;
use brief::core::config::AppConfig;
use brief::errors::SummarizeError;
use brief::worker::{HubModelLoader, ModelRegistry, SummarizeService};

#[tokio::main]
async fn main() -> Result<(), SummarizeError> {
    brief::setup_logging();

    let config = AppConfig::from_env().map_err(SummarizeError::ConfigError)?;
    let registry = Arc::new(ModelRegistry::new(Arc::new(HubModelLoader::new(
        ModelHub::new(&config)?,
    ))));
    let service = SummarizeService::new(
        registry,
        Arc::new(HttpFetcher::new()?),
        config.summarize_defaults(),
    );

    brief::api::serve(&config, service).await
}
