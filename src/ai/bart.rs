//! BART encoder-decoder on candle
//!
//! Handles:
//! - Parsing `config.json`, generation defaults included
//! - Loading safetensors weights through a memory-mapped `VarBuilder`
//! - Encoder forward pass and per-step decoder logits
//!
//! The decoder re-runs over the whole prefix each step instead of keeping a
//! key/value cache; summaries are short enough that this stays cheap next to
//! the encoder pass.

use std::path::Path;

use candle_core::{DType, Device, IndexOp, Module, Tensor};
use candle_nn::{Embedding, LayerNorm, Linear, VarBuilder, layer_norm, linear, ops::softmax_last_dim};
use serde::Deserialize;
use serde_json::Value;

use super::generation::{GenerationConfig, StepDecoder};
use crate::errors::SummarizeError;

/// Learned position embeddings are stored with two leading padding slots.
const POSITION_OFFSET: usize = 2;

const LAYER_NORM_EPS: f64 = 1e-5;

const fn default_max_positions() -> usize {
    1024
}

const fn default_pad() -> u32 {
    1
}

const fn default_bos() -> u32 {
    0
}

const fn default_eos() -> u32 {
    2
}

fn default_activation() -> String {
    "gelu".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub vocab_size: usize,
    pub d_model: usize,
    pub encoder_layers: usize,
    pub decoder_layers: usize,
    pub encoder_attention_heads: usize,
    pub decoder_attention_heads: usize,
    pub encoder_ffn_dim: usize,
    pub decoder_ffn_dim: usize,
    #[serde(default = "default_max_positions")]
    pub max_position_embeddings: usize,
    #[serde(default)]
    pub scale_embedding: bool,
    #[serde(default)]
    pub normalize_before: bool,
    #[serde(default = "default_activation")]
    pub activation_function: String,
    #[serde(default = "default_pad")]
    pub pad_token_id: u32,
    #[serde(default = "default_bos")]
    pub bos_token_id: u32,
    #[serde(default = "default_eos")]
    pub eos_token_id: u32,
    #[serde(default = "default_eos")]
    pub decoder_start_token_id: u32,
    #[serde(default)]
    pub forced_bos_token_id: Option<u32>,
    #[serde(default)]
    pub forced_eos_token_id: Option<u32>,
    #[serde(default)]
    pub num_beams: Option<usize>,
    #[serde(default)]
    pub length_penalty: Option<f32>,
    #[serde(default)]
    pub no_repeat_ngram_size: Option<usize>,
    /// `true`, `false` or the string `"never"` depending on the checkpoint.
    #[serde(default)]
    pub early_stopping: Option<Value>,
}

impl ModelConfig {
    pub fn from_file(path: &Path) -> Result<Self, SummarizeError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, SummarizeError> {
        serde_json::from_str(raw)
            .map_err(|e| SummarizeError::ModelError(format!("invalid model config: {e}")))
    }

    /// Generation settings the checkpoint ships with, for the given length
    /// budget.
    #[must_use]
    pub fn generation_config(&self, max_length: usize, min_length: usize) -> GenerationConfig {
        GenerationConfig {
            num_beams: self.num_beams.unwrap_or(1).max(1),
            length_penalty: self.length_penalty.unwrap_or(1.0),
            no_repeat_ngram_size: self.no_repeat_ngram_size.unwrap_or(0),
            early_stopping: matches!(self.early_stopping, Some(Value::Bool(true))),
            decoder_start_token_id: self.decoder_start_token_id,
            eos_token_id: self.eos_token_id,
            forced_bos_token_id: self.forced_bos_token_id,
            forced_eos_token_id: self.forced_eos_token_id,
            max_length,
            min_length,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Activation {
    Gelu,
    GeluTanh,
    Relu,
}

impl Activation {
    fn parse(name: &str) -> Result<Self, SummarizeError> {
        match name {
            "gelu" => Ok(Self::Gelu),
            "gelu_new" | "gelu_fast" | "gelu_pytorch_tanh" => Ok(Self::GeluTanh),
            "relu" => Ok(Self::Relu),
            other => Err(SummarizeError::ModelError(format!(
                "unsupported activation function: {other}"
            ))),
        }
    }

    fn apply(self, xs: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Self::Gelu => xs.gelu_erf(),
            Self::GeluTanh => xs.gelu(),
            Self::Relu => xs.relu(),
        }
    }
}

struct Attention {
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    out_proj: Linear,
    num_heads: usize,
    head_dim: usize,
    scaling: f64,
}

impl Attention {
    fn load(d_model: usize, num_heads: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        let head_dim = d_model / num_heads;
        Ok(Self {
            q_proj: linear(d_model, d_model, vb.pp("q_proj"))?,
            k_proj: linear(d_model, d_model, vb.pp("k_proj"))?,
            v_proj: linear(d_model, d_model, vb.pp("v_proj"))?,
            out_proj: linear(d_model, d_model, vb.pp("out_proj"))?,
            num_heads,
            head_dim,
            scaling: (head_dim as f64).powf(-0.5),
        })
    }

    fn split_heads(&self, xs: &Tensor, batch: usize) -> candle_core::Result<Tensor> {
        xs.reshape((batch, (), self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    /// Self-attention when `key_value` is `None`, cross-attention otherwise.
    fn forward(
        &self,
        xs: &Tensor,
        key_value: Option<&Tensor>,
        mask: Option<&Tensor>,
    ) -> candle_core::Result<Tensor> {
        let (batch, tgt_len, _) = xs.dims3()?;
        let source = key_value.unwrap_or(xs);

        let q = self.split_heads(&self.q_proj.forward(xs)?.affine(self.scaling, 0.0)?, batch)?;
        let k = self.split_heads(&self.k_proj.forward(source)?, batch)?;
        let v = self.split_heads(&self.v_proj.forward(source)?, batch)?;

        let mut scores = q.matmul(&k.t()?)?;
        if let Some(mask) = mask {
            scores = scores.broadcast_add(mask)?;
        }
        let probs = softmax_last_dim(&scores)?;

        let context = probs
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, tgt_len, self.num_heads * self.head_dim))?;
        self.out_proj.forward(&context)
    }
}

struct FeedForward {
    fc1: Linear,
    fc2: Linear,
    activation: Activation,
}

impl FeedForward {
    fn load(
        d_model: usize,
        ffn_dim: usize,
        activation: Activation,
        vb: &VarBuilder,
    ) -> candle_core::Result<Self> {
        Ok(Self {
            fc1: linear(d_model, ffn_dim, vb.pp("fc1"))?,
            fc2: linear(ffn_dim, d_model, vb.pp("fc2"))?,
            activation,
        })
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let hidden = self.activation.apply(&self.fc1.forward(xs)?)?;
        self.fc2.forward(&hidden)
    }
}

struct EncoderLayer {
    self_attn: Attention,
    self_attn_layer_norm: LayerNorm,
    ffn: FeedForward,
    final_layer_norm: LayerNorm,
}

impl EncoderLayer {
    fn load(cfg: &ModelConfig, activation: Activation, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            self_attn: Attention::load(cfg.d_model, cfg.encoder_attention_heads, vb.pp("self_attn"))?,
            self_attn_layer_norm: layer_norm(cfg.d_model, LAYER_NORM_EPS, vb.pp("self_attn_layer_norm"))?,
            ffn: FeedForward::load(cfg.d_model, cfg.encoder_ffn_dim, activation, &vb)?,
            final_layer_norm: layer_norm(cfg.d_model, LAYER_NORM_EPS, vb.pp("final_layer_norm"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let attended = self.self_attn.forward(xs, None, None)?;
        let xs = self.self_attn_layer_norm.forward(&(attended + xs)?)?;
        let fed = self.ffn.forward(&xs)?;
        self.final_layer_norm.forward(&(fed + xs)?)
    }
}

struct DecoderLayer {
    self_attn: Attention,
    self_attn_layer_norm: LayerNorm,
    encoder_attn: Attention,
    encoder_attn_layer_norm: LayerNorm,
    ffn: FeedForward,
    final_layer_norm: LayerNorm,
}

impl DecoderLayer {
    fn load(cfg: &ModelConfig, activation: Activation, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            self_attn: Attention::load(cfg.d_model, cfg.decoder_attention_heads, vb.pp("self_attn"))?,
            self_attn_layer_norm: layer_norm(cfg.d_model, LAYER_NORM_EPS, vb.pp("self_attn_layer_norm"))?,
            encoder_attn: Attention::load(cfg.d_model, cfg.decoder_attention_heads, vb.pp("encoder_attn"))?,
            encoder_attn_layer_norm: layer_norm(
                cfg.d_model,
                LAYER_NORM_EPS,
                vb.pp("encoder_attn_layer_norm"),
            )?,
            ffn: FeedForward::load(cfg.d_model, cfg.decoder_ffn_dim, activation, &vb)?,
            final_layer_norm: layer_norm(cfg.d_model, LAYER_NORM_EPS, vb.pp("final_layer_norm"))?,
        })
    }

    fn forward(
        &self,
        xs: &Tensor,
        encoder_states: &Tensor,
        causal_mask: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let attended = self.self_attn.forward(xs, None, Some(causal_mask))?;
        let xs = self.self_attn_layer_norm.forward(&(attended + xs)?)?;
        let crossed = self.encoder_attn.forward(&xs, Some(encoder_states), None)?;
        let xs = self.encoder_attn_layer_norm.forward(&(crossed + xs)?)?;
        let fed = self.ffn.forward(&xs)?;
        self.final_layer_norm.forward(&(fed + xs)?)
    }
}

/// Token + learned position embeddings followed by the embedding layer norm.
struct Embeddings {
    positions: Embedding,
    layernorm: LayerNorm,
    scale: f64,
}

impl Embeddings {
    fn load(cfg: &ModelConfig, vb: &VarBuilder) -> candle_core::Result<Self> {
        let positions = candle_nn::embedding(
            cfg.max_position_embeddings + POSITION_OFFSET,
            cfg.d_model,
            vb.pp("embed_positions"),
        )?;
        Ok(Self {
            positions,
            layernorm: layer_norm(cfg.d_model, LAYER_NORM_EPS, vb.pp("layernorm_embedding"))?,
            scale: if cfg.scale_embedding {
                (cfg.d_model as f64).sqrt()
            } else {
                1.0
            },
        })
    }

    fn forward(&self, ids: &Tensor, shared: &Embedding) -> candle_core::Result<Tensor> {
        let (_, seq_len) = ids.dims2()?;
        let tokens = shared.forward(ids)?.affine(self.scale, 0.0)?;
        let position_ids = Tensor::arange(
            POSITION_OFFSET as u32,
            (seq_len + POSITION_OFFSET) as u32,
            ids.device(),
        )?;
        let positions = self.positions.forward(&position_ids)?;
        self.layernorm.forward(&tokens.broadcast_add(&positions)?)
    }
}

pub struct BartModel {
    shared: Embedding,
    encoder_embeddings: Embeddings,
    encoder_layers: Vec<EncoderLayer>,
    decoder_embeddings: Embeddings,
    decoder_layers: Vec<DecoderLayer>,
    final_logits_bias: Tensor,
    config: ModelConfig,
    device: Device,
}

impl BartModel {
    /// Memory-map `weights` (safetensors) onto `device`.
    pub fn load(config: ModelConfig, weights: &Path, device: &Device) -> Result<Self, SummarizeError> {
        if config.normalize_before {
            return Err(SummarizeError::ModelError(
                "pre-layer-norm BART variants are not supported".to_string(),
            ));
        }
        if config.encoder_attention_heads == 0
            || config.decoder_attention_heads == 0
            || config.d_model % config.encoder_attention_heads != 0
            || config.d_model % config.decoder_attention_heads != 0
        {
            return Err(SummarizeError::ModelError(format!(
                "d_model {} is not divisible by the attention head count",
                config.d_model
            )));
        }
        let activation = Activation::parse(&config.activation_function)?;

        // SAFETY: the weights file lives in the hub cache and is not modified
        // while mapped.
        let root = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, device)? };
        let vb = if root.contains_tensor("model.shared.weight") {
            root.pp("model")
        } else {
            root.clone()
        };

        let shared_weight = vb.get((config.vocab_size, config.d_model), "shared.weight")?;
        let shared = Embedding::new(shared_weight, config.d_model);

        let encoder_vb = vb.pp("encoder");
        let encoder_embeddings = Embeddings::load(&config, &encoder_vb)?;
        let encoder_layers = (0..config.encoder_layers)
            .map(|i| EncoderLayer::load(&config, activation, encoder_vb.pp(format!("layers.{i}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let decoder_vb = vb.pp("decoder");
        let decoder_embeddings = Embeddings::load(&config, &decoder_vb)?;
        let decoder_layers = (0..config.decoder_layers)
            .map(|i| DecoderLayer::load(&config, activation, decoder_vb.pp(format!("layers.{i}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let final_logits_bias = if root.contains_tensor("final_logits_bias") {
            root.get((1, config.vocab_size), "final_logits_bias")?
        } else {
            Tensor::zeros((1, config.vocab_size), DType::F32, device)?
        };

        Ok(Self {
            shared,
            encoder_embeddings,
            encoder_layers,
            decoder_embeddings,
            decoder_layers,
            final_logits_bias,
            config,
            device: device.clone(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Encoder hidden states for a single input sequence: `(1, len, d_model)`.
    pub fn encode(&self, input_ids: &[u32]) -> Result<Tensor, SummarizeError> {
        let ids = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let mut xs = self.encoder_embeddings.forward(&ids, &self.shared)?;
        for layer in &self.encoder_layers {
            xs = layer.forward(&xs)?;
        }
        Ok(xs)
    }

    /// Logits for the token following each prefix: `(batch, vocab)`.
    pub fn decode_step(&self, prefixes: &Tensor, encoder_states: &Tensor) -> Result<Tensor, SummarizeError> {
        let (_, seq_len) = prefixes.dims2()?;
        let mask = causal_mask(seq_len, &self.device)?;

        let mut xs = self.decoder_embeddings.forward(prefixes, &self.shared)?;
        for layer in &self.decoder_layers {
            xs = layer.forward(&xs, encoder_states, &mask)?;
        }

        let last = xs.i((.., seq_len - 1, ..))?.contiguous()?;
        let logits = last
            .matmul(&self.shared.embeddings().t()?)?
            .broadcast_add(&self.final_logits_bias)?;
        Ok(logits)
    }

    /// Pair this model with encoded input for step-wise generation.
    #[must_use]
    pub fn step_decoder<'a>(&'a self, encoder_states: Tensor) -> EncodedInput<'a> {
        EncodedInput {
            model: self,
            encoder_states,
            expanded: None,
        }
    }
}

fn causal_mask(seq_len: usize, device: &Device) -> candle_core::Result<Tensor> {
    let mask: Vec<f32> = (0..seq_len)
        .flat_map(|i| (0..seq_len).map(move |j| if j > i { f32::NEG_INFINITY } else { 0.0 }))
        .collect();
    Tensor::from_slice(&mask, (seq_len, seq_len), device)
}

/// Encoder output bound to the model; implements one decoding step per call.
pub struct EncodedInput<'a> {
    model: &'a BartModel,
    encoder_states: Tensor,
    // Encoder states repeated for the current beam count.
    expanded: Option<(usize, Tensor)>,
}

impl EncodedInput<'_> {
    fn states_for(&mut self, batch: usize) -> candle_core::Result<Tensor> {
        if batch == 1 {
            return Ok(self.encoder_states.clone());
        }
        if let Some((cached, states)) = &self.expanded
            && *cached == batch
        {
            return Ok(states.clone());
        }
        let states = self.encoder_states.repeat((batch, 1, 1))?;
        self.expanded = Some((batch, states.clone()));
        Ok(states)
    }
}

impl StepDecoder for EncodedInput<'_> {
    fn next_token_logits(&mut self, prefixes: &[Vec<u32>]) -> Result<Vec<Vec<f32>>, SummarizeError> {
        let batch = prefixes.len();
        let seq_len = prefixes.first().map_or(0, Vec::len);
        if batch == 0 || seq_len == 0 {
            return Ok(Vec::new());
        }
        let flat: Vec<u32> = prefixes.iter().flatten().copied().collect();
        let ids = Tensor::from_vec(flat, (batch, seq_len), &self.model.device)?;
        let states = self.states_for(batch)?;
        let logits = self.model.decode_step(&ids, &states)?;
        Ok(logits.to_dtype(DType::F32)?.to_vec2::<f32>()?)
    }
}
