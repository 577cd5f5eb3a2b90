//! Offline fakes for the model loader and page fetcher.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use brief::ai::{LengthLimits, LoadedModel, SummaryModel, TokenCodec};
use brief::clients::PageFetcher;
use brief::errors::SummarizeError;
use brief::worker::{ModelLoader, ModelRegistry};

/// One token per whitespace-separated word.
#[derive(Default)]
pub struct WordCodec {
    vocab: Mutex<Vec<String>>,
}

impl TokenCodec for WordCodec {
    fn encode(&self, text: &str) -> Result<Vec<u32>, SummarizeError> {
        let mut vocab = self.vocab.lock().unwrap();
        Ok(text
            .split_whitespace()
            .map(|w| match vocab.iter().position(|v| v == w) {
                Some(i) => i as u32,
                None => {
                    vocab.push(w.to_string());
                    (vocab.len() - 1) as u32
                }
            })
            .collect())
    }

    fn encode_for_model(&self, text: &str, max_len: usize) -> Result<Vec<u32>, SummarizeError> {
        let mut ids = self.encode(text)?;
        ids.truncate(max_len);
        Ok(ids)
    }

    fn decode(&self, ids: &[u32]) -> Result<String, SummarizeError> {
        let vocab = self.vocab.lock().unwrap();
        Ok(ids
            .iter()
            .map(|&i| vocab[i as usize].clone())
            .collect::<Vec<_>>()
            .join(" "))
    }
}

/// Summarizes to `[<model>] <first three words>`.
pub struct EchoModel {
    pub model_id: String,
    pub calls: Mutex<Vec<LengthLimits>>,
}

impl SummaryModel for EchoModel {
    fn max_input_len(&self) -> usize {
        1024
    }

    fn generate(&self, text: &str, limits: LengthLimits) -> Result<String, SummarizeError> {
        self.calls.lock().unwrap().push(limits);
        let head: Vec<&str> = text.split_whitespace().take(3).collect();
        Ok(format!("[{}] {}", self.model_id, head.join(" ")))
    }
}

/// Loader that builds [`EchoModel`]s and records what it loaded.
#[derive(Default)]
pub struct FakeLoader {
    pub without_safetensors: Vec<String>,
    pub loads: Mutex<Vec<String>>,
    pub models: Mutex<HashMap<String, Arc<EchoModel>>>,
}

impl FakeLoader {
    pub fn without_safetensors(models: &[&str]) -> Self {
        Self {
            without_safetensors: models.iter().map(|m| (*m).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().unwrap().clone()
    }

    pub fn limits_for(&self, model: &str) -> Vec<LengthLimits> {
        self.models
            .lock()
            .unwrap()
            .get(model)
            .map(|m| m.calls.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

impl ModelLoader for FakeLoader {
    fn load(&self, model_name: &str, _device: Option<usize>) -> Result<LoadedModel, SummarizeError> {
        if self.without_safetensors.iter().any(|m| m == model_name) {
            return Err(SummarizeError::MissingSafetensors {
                model: model_name.to_string(),
            });
        }
        if !model_name.contains('/') {
            return Err(SummarizeError::HubError(format!(
                "{model_name} is not a valid model id"
            )));
        }
        self.loads.lock().unwrap().push(model_name.to_string());
        let model = Arc::new(EchoModel {
            model_id: model_name.to_string(),
            calls: Mutex::new(Vec::new()),
        });
        self.models
            .lock()
            .unwrap()
            .insert(model_name.to_string(), model.clone());
        Ok(LoadedModel {
            model_id: model_name.to_string(),
            tokenizer: Arc::new(WordCodec::default()),
            model,
        })
    }
}

/// Serves canned pages; unknown URLs get a 404.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    pub requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String, SummarizeError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| SummarizeError::HttpError(format!("GET {url} returned 404 Not Found")))
    }
}

pub fn registry(loader: Arc<FakeLoader>) -> Arc<ModelRegistry> {
    Arc::new(ModelRegistry::new(loader))
}

/// `n` distinct words.
pub fn article(n: usize) -> String {
    (0..n)
        .map(|i| format!("word{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// An HTML page whose `<article>` holds `n` words.
pub fn article_page(n: usize) -> String {
    format!(
        "<html><head><title>T</title></head><body><nav>Home News</nav><article><p>{}</p></article><footer>(c)</footer></body></html>",
        article(n)
    )
}
