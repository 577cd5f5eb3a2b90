//! All model functionality: hub access, tokenization, chunking, inference

pub mod bart;
pub mod chunking;
pub mod client;
pub mod generation;
pub mod hub;
pub mod tokenizer;

// Re-export main types for convenience
pub use client::{LengthLimits, LoadedModel, SummaryModel, load_from_hub};
pub use hub::{ModelFiles, ModelHub, TokenizerFiles};
pub use tokenizer::{HubTokenizer, TokenCodec};
