//! Model resources backed by ONNX Runtime.
//!
//! This module requires the `onnx` feature.
//!
//! Models are exported directories, one per model identifier, under a models
//! root (`<models_dir>/facebook/bart-large-cnn/...`):
//!
//! - summarizers: `tokenizer.json`, `config.json`, `encoder_model.onnx`,
//!   `decoder_model.onnx`
//! - the language classifier: `tokenizer.json`, `config.json` (with
//!   `id2label`), `model.onnx`
//!
//! The decoder is run without a key/value cache: each step re-feeds the whole
//! decoded prefix.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{Array2, Array3};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use parking_lot::Mutex;
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};

use crate::detector::{LabelScore, TextClassifier};
use crate::error::{Result, SummarizeError};
use crate::generation::{EncoderOutput, Seq2SeqModel, SpecialTokens};
use crate::language::LanguageCode;
use crate::resource::{
    DetectorResource, DetectorSpec, ResourceLoader, SummarizerResource, SummarizerSpec,
};
use crate::tokenize::EncodedInput;

/// Longest sequence the classifier session accepts.
const CLASSIFIER_MAX_TOKENS: usize = 512;

/// The subset of a Hugging Face `config.json` used here.
#[derive(Debug, Default, Deserialize)]
struct ModelConfig {
    decoder_start_token_id: Option<u32>,
    eos_token_id: Option<u32>,
    pad_token_id: Option<u32>,
    forced_bos_token_id: Option<u32>,
    #[serde(default)]
    id2label: HashMap<String, String>,
}

impl ModelConfig {
    fn load(dir: &Path) -> Result<Self> {
        let path = dir.join("config.json");
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            SummarizeError::ModelLoad(format!("Failed to read {:?}: {}", path, e))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn special_tokens(&self) -> Result<SpecialTokens> {
        let eos = self
            .eos_token_id
            .ok_or_else(|| SummarizeError::ModelLoad("config.json has no eos_token_id".to_string()))?;
        Ok(SpecialTokens {
            decoder_start: self.decoder_start_token_id.unwrap_or(eos),
            eos,
            pad: self.pad_token_id.unwrap_or(0),
            forced_bos: self.forced_bos_token_id,
        })
    }

    /// Labels ordered by class index; gaps stay `None`.
    fn labels(&self) -> Vec<Option<String>> {
        let mut indexed: Vec<(usize, &String)> = self
            .id2label
            .iter()
            .filter_map(|(id, label)| id.parse::<usize>().ok().map(|id| (id, label)))
            .collect();
        indexed.sort_by_key(|(id, _)| *id);
        let len = indexed.last().map(|(id, _)| id + 1).unwrap_or(0);
        let mut labels = vec![None; len];
        for (id, label) in indexed {
            labels[id] = Some(label.clone());
        }
        labels
    }
}

fn load_session(path: &Path) -> Result<Session> {
    Session::builder()
        .map_err(|e| SummarizeError::ModelLoad(format!("Failed to create ONNX session: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| {
            SummarizeError::ModelLoad(format!("Failed to set optimization level: {}", e))
        })?
        .commit_from_file(path)
        .map_err(|e| {
            SummarizeError::ModelLoad(format!("Failed to load ONNX model from {:?}: {}", path, e))
        })
}

fn load_tokenizer(dir: &Path) -> Result<Tokenizer> {
    let path = dir.join("tokenizer.json");
    Tokenizer::from_file(&path).map_err(|e| {
        SummarizeError::ModelLoad(format!("Failed to load tokenizer from {:?}: {}", path, e))
    })
}

/// A `[1, len]` int64 tensor, the layout every session here takes for ids
/// and masks.
fn ids_tensor(values: impl Iterator<Item = u32>, len: usize) -> Result<Tensor<i64>> {
    let array = Array2::from_shape_vec((1, len), values.map(i64::from).collect())
        .map_err(|e| SummarizeError::Inference(format!("Array error: {}", e)))?;
    Tensor::from_array(array).map_err(|e| SummarizeError::Inference(format!("Input error: {}", e)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoder/decoder
// ─────────────────────────────────────────────────────────────────────────────

/// An exported encoder/decoder pair (BART, mBART).
pub struct OnnxSeq2Seq {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    special: SpecialTokens,
}

impl OnnxSeq2Seq {
    /// Load `encoder_model.onnx`, `decoder_model.onnx` and `config.json`
    /// from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let special = ModelConfig::load(dir)?.special_tokens()?;
        Ok(Self {
            encoder: Mutex::new(load_session(&dir.join("encoder_model.onnx"))?),
            decoder: Mutex::new(load_session(&dir.join("decoder_model.onnx"))?),
            special,
        })
    }
}

impl Seq2SeqModel for OnnxSeq2Seq {
    fn encode(&self, input: &EncodedInput) -> Result<EncoderOutput> {
        let len = input.len();
        let input_ids = ids_tensor(input.ids.iter().copied(), len)?;
        let attention_mask = ids_tensor(input.attention_mask.iter().copied(), len)?;

        let mut session = self.encoder.lock();
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
            ])
            .map_err(|e| SummarizeError::Inference(format!("ONNX encoder failed: {}", e)))?;

        let (shape, data) = outputs["last_hidden_state"]
            .try_extract_tensor::<f32>()
            .map_err(|e| SummarizeError::Inference(format!("Output extraction failed: {}", e)))?;

        Ok(EncoderOutput {
            hidden: data.to_vec(),
            shape: shape.iter().map(|d| *d as usize).collect(),
        })
    }

    fn next_token_logits(
        &self,
        encoder: &EncoderOutput,
        input: &EncodedInput,
        decoded: &[u32],
    ) -> Result<Vec<f32>> {
        let [batch, seq_len, hidden] = encoder.shape[..] else {
            return Err(SummarizeError::Inference(format!(
                "unexpected encoder output shape {:?}",
                encoder.shape
            )));
        };
        let steps = decoded.len();
        let decoder_ids = ids_tensor(decoded.iter().copied(), steps)?;
        let encoder_mask = ids_tensor(input.attention_mask.iter().copied(), input.len())?;
        let hidden_states = Array3::from_shape_vec((batch, seq_len, hidden), encoder.hidden.clone())
            .map_err(|e| SummarizeError::Inference(format!("Array error: {}", e)))?;
        let hidden_states = Tensor::from_array(hidden_states)
            .map_err(|e| SummarizeError::Inference(format!("Input error: {}", e)))?;

        let mut session = self.decoder.lock();
        let outputs = session
            .run(ort::inputs![
                "input_ids" => decoder_ids,
                "encoder_attention_mask" => encoder_mask,
                "encoder_hidden_states" => hidden_states,
            ])
            .map_err(|e| SummarizeError::Inference(format!("ONNX decoder failed: {}", e)))?;

        let (shape, data) = outputs["logits"]
            .try_extract_tensor::<f32>()
            .map_err(|e| SummarizeError::Inference(format!("Output extraction failed: {}", e)))?;

        // logits: [1, steps, vocab]; keep the last position
        let vocab = shape.last().map(|v| *v as usize).unwrap_or(0);
        let start = (steps - 1) * vocab;
        data.get(start..start + vocab)
            .map(<[f32]>::to_vec)
            .ok_or_else(|| {
                SummarizeError::Inference(format!("unexpected decoder output shape {:?}", shape))
            })
    }

    fn special_tokens(&self) -> SpecialTokens {
        self.special
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classifier
// ─────────────────────────────────────────────────────────────────────────────

/// A sequence classification model (XLM-RoBERTa language detection).
pub struct OnnxClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    labels: Vec<Option<String>>,
}

impl OnnxClassifier {
    /// Load `model.onnx`, `tokenizer.json` and `config.json` from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let labels = ModelConfig::load(dir)?.labels();
        if labels.is_empty() {
            return Err(SummarizeError::ModelLoad(format!(
                "{:?} config.json has no id2label mapping",
                dir
            )));
        }

        let mut tokenizer = load_tokenizer(dir)?;
        tokenizer.with_truncation(Some(TruncationParams {
            max_length: CLASSIFIER_MAX_TOKENS,
            ..Default::default()
        }))?;
        tokenizer.with_padding(None);

        Ok(Self {
            session: Mutex::new(load_session(&dir.join("model.onnx"))?),
            tokenizer,
            labels,
        })
    }
}

impl TextClassifier for OnnxClassifier {
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let encoding = self.tokenizer.encode(text, true)?;
        let len = encoding.get_ids().len();
        let input_ids = ids_tensor(encoding.get_ids().iter().copied(), len)?;
        let attention_mask = ids_tensor(encoding.get_attention_mask().iter().copied(), len)?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
            ])
            .map_err(|e| SummarizeError::Inference(format!("ONNX classifier failed: {}", e)))?;

        let (_, logits) = outputs["logits"]
            .try_extract_tensor::<f32>()
            .map_err(|e| SummarizeError::Inference(format!("Output extraction failed: {}", e)))?;

        Ok(softmax(logits)
            .into_iter()
            .enumerate()
            .map(|(index, score)| LabelScore {
                label: self.labels.get(index).cloned().flatten(),
                score,
            })
            .collect())
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.into_iter().map(|v| v / sum).collect()
    } else {
        exps
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loader
// ─────────────────────────────────────────────────────────────────────────────

/// Loads models from exported directories under a models root.
#[derive(Debug, Clone)]
pub struct OnnxLoader {
    models_dir: PathBuf,
}

impl OnnxLoader {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Directory for a model: the explicit path if set, else the identifier
    /// under the models root.
    pub fn model_dir(&self, model: &str, path: Option<&Path>) -> PathBuf {
        match path {
            Some(path) => path.to_path_buf(),
            None => self.models_dir.join(model),
        }
    }

    fn existing_dir(&self, model: &str, path: Option<&Path>) -> Result<PathBuf> {
        let dir = self.model_dir(model, path);
        if !dir.is_dir() {
            return Err(SummarizeError::ModelLoad(format!(
                "Model '{}' not found at {:?}. Export it to ONNX and place the files there.",
                model, dir
            )));
        }
        Ok(dir)
    }
}

impl ResourceLoader for OnnxLoader {
    fn load_detector(&self, spec: &DetectorSpec) -> Result<DetectorResource> {
        let dir = self.existing_dir(&spec.model, spec.path.as_deref())?;
        let classifier = OnnxClassifier::load(&dir)?;
        Ok(DetectorResource {
            tokenizer: load_tokenizer(&dir)?,
            classifier: Arc::new(classifier),
        })
    }

    fn load_summarizer(
        &self,
        lang: &LanguageCode,
        spec: &SummarizerSpec,
    ) -> Result<SummarizerResource> {
        let dir = self.existing_dir(&spec.model, spec.path.as_deref())?;
        tracing::debug!(language = %lang, dir = ?dir, "Loading ONNX summarizer");
        Ok(SummarizerResource {
            tokenizer: load_tokenizer(&dir)?,
            model: Arc::new(OnnxSeq2Seq::load(&dir)?),
        })
    }
}
