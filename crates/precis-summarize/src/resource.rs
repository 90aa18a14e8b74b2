//! Model resources and the loader seam.
//!
//! A resource is the heavyweight part of a detector or summarizer: the
//! tokenizer plus the model it feeds. Loading is expensive, so it is
//! delegated to a [`ResourceLoader`] and performed at most once per detector
//! and once per language (see [`crate::registry`]).

use std::path::PathBuf;
use std::sync::Arc;

use tokenizers::Tokenizer;

use crate::detector::TextClassifier;
use crate::error::Result;
use crate::generation::Seq2SeqModel;
use crate::language::LanguageCode;
use crate::summarizer::Strategy;

/// Default detection model identifier.
pub const DEFAULT_DETECTION_MODEL: &str = "papluca/xlm-roberta-base-language-detection";
/// Default English summarization model identifier.
pub const DEFAULT_SUMMARIZER_MODEL_EN: &str = "facebook/bart-large-cnn";
/// Default Russian summarization model identifier.
pub const DEFAULT_SUMMARIZER_MODEL_RU: &str = "IlyaGusev/mbart_ru_sum_gazeta";

/// Tokenizer and classifier for language detection.
#[derive(Clone)]
pub struct DetectorResource {
    pub tokenizer: Tokenizer,
    pub classifier: Arc<dyn TextClassifier>,
}

/// Tokenizer and encoder/decoder model for one summarization language.
#[derive(Clone)]
pub struct SummarizerResource {
    pub tokenizer: Tokenizer,
    pub model: Arc<dyn Seq2SeqModel>,
}

/// What to load for the language detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorSpec {
    /// Model identifier (directory name under the models dir).
    pub model: String,
    /// Explicit model directory, overriding the identifier lookup.
    pub path: Option<PathBuf>,
    /// Fixed encoding length fed to the classifier.
    pub max_tokens: usize,
}

impl Default for DetectorSpec {
    fn default() -> Self {
        Self {
            model: DEFAULT_DETECTION_MODEL.to_string(),
            path: None,
            max_tokens: 256,
        }
    }
}

impl DetectorSpec {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// What to load for one summarization language, and how to run it.
///
/// Unset bounds fall back to the defaults of the selected strategy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SummarizerSpec {
    /// Model identifier (directory name under the models dir).
    pub model: String,
    /// Explicit model directory, overriding the identifier lookup.
    pub path: Option<PathBuf>,
    /// Strategy override; `None` selects by language.
    pub strategy: Option<Strategy>,
    pub max_input_tokens: Option<usize>,
    pub max_length: Option<usize>,
    pub min_length: Option<usize>,
    pub no_repeat_ngram_size: Option<usize>,
}

impl SummarizerSpec {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Loads model resources from wherever they live.
pub trait ResourceLoader: Send + Sync {
    /// Load the language detection tokenizer and classifier.
    fn load_detector(&self, spec: &DetectorSpec) -> Result<DetectorResource>;

    /// Load the tokenizer and model for one summarization language.
    fn load_summarizer(
        &self,
        lang: &LanguageCode,
        spec: &SummarizerSpec,
    ) -> Result<SummarizerResource>;
}
