use hf_hub::api::sync::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Failed to fetch URL: {0}")]
    HttpError(String),

    #[error("Failed to extract article text: {0}")]
    ExtractionError(String),

    #[error("Failed to access model hub: {0}")]
    HubError(String),

    #[error("{model} does not appear to have a file named model.safetensors")]
    MissingSafetensors { model: String },

    #[error("Tokenizer failure: {0}")]
    TokenizerError(String),

    #[error("Model failure: {0}")]
    ModelError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("{0}")]
    InputError(String),

    #[error("I/O failure: {0}")]
    IoError(String),
}

impl SummarizeError {
    /// Short variant name used when surfacing an error in the UI
    /// (`Error: <kind>: <message>`).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::HttpError(_) => "HttpError",
            Self::ExtractionError(_) => "ExtractionError",
            Self::HubError(_) => "HubError",
            Self::MissingSafetensors { .. } => "MissingSafetensors",
            Self::TokenizerError(_) => "TokenizerError",
            Self::ModelError(_) => "ModelError",
            Self::ConfigError(_) => "ConfigError",
            Self::InputError(_) => "InputError",
            Self::IoError(_) => "IoError",
        }
    }
}

impl From<reqwest::Error> for SummarizeError {
    fn from(error: reqwest::Error) -> Self {
        SummarizeError::HttpError(error.to_string())
    }
}

impl From<std::io::Error> for SummarizeError {
    fn from(error: std::io::Error) -> Self {
        SummarizeError::IoError(error.to_string())
    }
}

impl From<candle_core::Error> for SummarizeError {
    fn from(error: candle_core::Error) -> Self {
        SummarizeError::ModelError(error.to_string())
    }
}

impl From<ApiError> for SummarizeError {
    fn from(error: ApiError) -> Self {
        SummarizeError::HubError(error.to_string())
    }
}

impl From<anyhow::Error> for SummarizeError {
    fn from(error: anyhow::Error) -> Self {
        SummarizeError::ModelError(error.to_string())
    }
}
