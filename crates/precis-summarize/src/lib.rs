//! Language detection and per-language summarization.
//!
//! This crate turns article text into a summary:
//!
//! 1. [`LanguageDetector`] classifies the text's language.
//! 2. [`SummarizerRegistry`] hands out the cached summarizer for that
//!    language, loading its model on first use.
//! 3. The summarizer ([`PipelineSummarizer`], [`GenerativeSummarizer`] or
//!    [`ExtractiveSummarizer`]) bounds the input to the model's token budget,
//!    decodes greedily and returns the summary text.
//!
//! Model files are loaded through a [`ResourceLoader`]. The `onnx` feature
//! provides one backed by ONNX Runtime; the `testing` feature provides
//! deterministic fixtures.

pub mod detector;
pub mod error;
pub mod generation;
pub mod language;
pub mod registry;
pub mod resource;
pub mod summarizer;
pub mod tokenize;

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use detector::{LabelScore, LanguageDetector, TextClassifier};
pub use error::{Result, SummarizeError};
pub use generation::{generate, EncoderOutput, GenerationConfig, Seq2SeqModel, SpecialTokens};
pub use language::LanguageCode;
pub use registry::{default_table, SummarizerRegistry};
pub use resource::{
    DetectorResource, DetectorSpec, ResourceLoader, SummarizerResource,
    SummarizerSpec, DEFAULT_DETECTION_MODEL, DEFAULT_SUMMARIZER_MODEL_EN,
    DEFAULT_SUMMARIZER_MODEL_RU,
};
pub use summarizer::{
    strategy_for, ExtractiveSummarizer, GenerativeOptions, GenerativeSummarizer,
    PipelineOptions, PipelineSummarizer, SharedSummarizer, Strategy, Summarize,
};
pub use tokenize::{BoundedTokenizer, EncodedInput, TokenBudget};

#[cfg(feature = "onnx")]
pub use onnx::{OnnxClassifier, OnnxLoader, OnnxSeq2Seq};
