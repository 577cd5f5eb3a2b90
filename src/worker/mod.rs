//! Model registry, chunked summarizer, and request orchestration

pub mod handler;
pub mod registry;
pub mod summarize;

pub use handler::{SummarizeService, resolve_model};
pub use registry::{HubModelLoader, ModelLoader, ModelRegistry};
pub use summarize::TextSummarizer;
