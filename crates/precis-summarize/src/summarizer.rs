//! Summarization strategies.
//!
//! Every strategy implements [`Summarize`]. Two are model-backed and differ
//! only in how input is bounded and which decoding constraints apply:
//!
//! | Strategy | Input budget | Decoding |
//! |---|---|---|
//! | [`PipelineSummarizer`] | truncate to 1024 | `max_length` 200, `min_length` 50 |
//! | [`GenerativeSummarizer`] | truncate + pad to 600 | `max_length` 200, no repeated 4-grams |
//!
//! [`ExtractiveSummarizer`] needs no model: it picks the highest-scoring
//! sentences of the input.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SummarizeError};
use crate::generation::{generate, GenerationConfig, Seq2SeqModel};
use crate::language::LanguageCode;
use crate::resource::{SummarizerResource, SummarizerSpec};
use crate::tokenize::{BoundedTokenizer, TokenBudget};

/// A summarizer shared across tasks.
pub type SharedSummarizer = Arc<dyn Summarize>;

/// Produces a summary of article text.
pub trait Summarize: Send + Sync {
    /// Summarize `text`. Fails on empty input and never returns an empty
    /// summary.
    fn summarize(&self, text: &str) -> Result<String>;

    /// Which strategy this is.
    fn strategy(&self) -> Strategy;
}

/// Summarization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Truncate input and decode with length bounds.
    Pipeline,
    /// Fixed-length input and n-gram repetition blocking.
    Generative,
    /// Sentence extraction without a model.
    Extractive,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Pipeline => "pipeline",
            Strategy::Generative => "generative",
            Strategy::Extractive => "extractive",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = SummarizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pipeline" => Ok(Strategy::Pipeline),
            "generative" => Ok(Strategy::Generative),
            "extractive" => Ok(Strategy::Extractive),
            other => Err(SummarizeError::Config(format!(
                "Unknown summarization strategy '{}'. Valid: pipeline, generative, extractive",
                other
            ))),
        }
    }
}

/// Default strategy for a language: Russian uses the generative strategy,
/// everything else the pipeline strategy.
pub fn strategy_for(lang: &LanguageCode) -> Strategy {
    match lang.as_str() {
        "ru" => Strategy::Generative,
        _ => Strategy::Pipeline,
    }
}

fn reject_empty(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(SummarizeError::InvalidInput(
            "cannot summarize empty text".to_string(),
        ));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Model-backed strategies
// ─────────────────────────────────────────────────────────────────────────────

struct ModelSlot {
    tokenizer: BoundedTokenizer,
    model: Arc<dyn Seq2SeqModel>,
}

impl ModelSlot {
    fn run(&self, text: &str, config: &GenerationConfig) -> Result<String> {
        let input = self.tokenizer.encode(text)?;
        let output = generate(self.model.as_ref(), &input, config)?;
        let summary = self.tokenizer.decode(&output)?;
        if summary.is_empty() {
            return Err(SummarizeError::Inference(
                "model generated an empty summary".to_string(),
            ));
        }
        Ok(summary)
    }
}

fn install_slot(
    slot: &OnceLock<ModelSlot>,
    resource: SummarizerResource,
    budget: TokenBudget,
) -> Result<()> {
    let tokenizer = BoundedTokenizer::new(resource.tokenizer, budget)?;
    slot.set(ModelSlot {
        tokenizer,
        model: resource.model,
    })
    .map_err(|_| SummarizeError::Config("model resource already installed".to_string()))
}

fn installed<'a>(slot: &'a OnceLock<ModelSlot>, strategy: Strategy) -> Result<&'a ModelSlot> {
    slot.get().ok_or_else(|| {
        SummarizeError::ResourceNotReady(format!("{} summarizer has no model loaded", strategy))
    })
}

/// Bounds for [`PipelineSummarizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub max_input_tokens: usize,
    pub max_length: usize,
    pub min_length: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_input_tokens: 1024,
            max_length: 200,
            min_length: 50,
        }
    }
}

impl PipelineOptions {
    /// Defaults overridden by whatever `spec` sets.
    pub fn from_spec(spec: &SummarizerSpec) -> Self {
        let defaults = Self::default();
        Self {
            max_input_tokens: spec.max_input_tokens.unwrap_or(defaults.max_input_tokens),
            max_length: spec.max_length.unwrap_or(defaults.max_length),
            min_length: spec.min_length.unwrap_or(defaults.min_length),
        }
    }
}

/// Truncates input to the model's capacity and decodes greedily within
/// length bounds.
pub struct PipelineSummarizer {
    options: PipelineOptions,
    slot: OnceLock<ModelSlot>,
}

impl PipelineSummarizer {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            slot: OnceLock::new(),
        }
    }

    /// Install the tokenizer and model. Can be done once.
    pub fn install(&self, resource: SummarizerResource) -> Result<()> {
        install_slot(
            &self.slot,
            resource,
            TokenBudget::truncate(self.options.max_input_tokens),
        )
    }

    pub fn is_ready(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl Summarize for PipelineSummarizer {
    fn summarize(&self, text: &str) -> Result<String> {
        reject_empty(text)?;
        let slot = installed(&self.slot, self.strategy())?;
        let config = GenerationConfig::default()
            .with_max_length(self.options.max_length)
            .with_min_length(self.options.min_length);
        slot.run(text, &config)
    }

    fn strategy(&self) -> Strategy {
        Strategy::Pipeline
    }
}

/// Bounds for [`GenerativeSummarizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerativeOptions {
    pub max_input_tokens: usize,
    pub max_length: usize,
    pub no_repeat_ngram_size: usize,
}

impl Default for GenerativeOptions {
    fn default() -> Self {
        Self {
            max_input_tokens: 600,
            max_length: 200,
            no_repeat_ngram_size: 4,
        }
    }
}

impl GenerativeOptions {
    /// Defaults overridden by whatever `spec` sets.
    pub fn from_spec(spec: &SummarizerSpec) -> Self {
        let defaults = Self::default();
        Self {
            max_input_tokens: spec.max_input_tokens.unwrap_or(defaults.max_input_tokens),
            max_length: spec.max_length.unwrap_or(defaults.max_length),
            no_repeat_ngram_size: spec
                .no_repeat_ngram_size
                .unwrap_or(defaults.no_repeat_ngram_size),
        }
    }
}

/// Encodes input to a fixed length and decodes greedily without repeating
/// n-grams.
pub struct GenerativeSummarizer {
    options: GenerativeOptions,
    slot: OnceLock<ModelSlot>,
}

impl GenerativeSummarizer {
    pub fn new(options: GenerativeOptions) -> Self {
        Self {
            options,
            slot: OnceLock::new(),
        }
    }

    /// Install the tokenizer and model. Can be done once.
    pub fn install(&self, resource: SummarizerResource) -> Result<()> {
        install_slot(
            &self.slot,
            resource,
            TokenBudget::fixed(self.options.max_input_tokens),
        )
    }

    pub fn is_ready(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl Summarize for GenerativeSummarizer {
    fn summarize(&self, text: &str) -> Result<String> {
        reject_empty(text)?;
        let slot = installed(&self.slot, self.strategy())?;
        let config = GenerationConfig::default()
            .with_max_length(self.options.max_length)
            .with_no_repeat_ngram_size(self.options.no_repeat_ngram_size);
        slot.run(text, &config)
    }

    fn strategy(&self) -> Strategy {
        Strategy::Generative
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extractive strategy
// ─────────────────────────────────────────────────────────────────────────────

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "had", "has", "have",
    "he", "her", "his", "in", "is", "it", "its", "of", "on", "or", "she", "that", "the", "their",
    "they", "this", "to", "was", "were", "will", "with", "would", "в", "во", "и", "на", "не",
    "что", "по", "с", "со", "к", "о", "об", "от", "за", "из", "для", "как", "а", "но", "это",
    "он", "она", "они", "его", "её", "их",
];

/// Weight added to a sentence's score for appearing early in the text.
const LEAD_BONUS: f32 = 0.2;

/// Picks the highest-scoring sentences of the input.
///
/// Sentences are scored by the normalized frequency of their keywords plus a
/// bonus that decays with position. The selected sentences are returned in
/// document order.
#[derive(Debug, Clone, Copy)]
pub struct ExtractiveSummarizer {
    max_sentences: usize,
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self { max_sentences: 5 }
    }
}

impl ExtractiveSummarizer {
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
        }
    }
}

impl Summarize for ExtractiveSummarizer {
    fn summarize(&self, text: &str) -> Result<String> {
        reject_empty(text)?;
        let sentences = split_sentences(text);
        if sentences.len() <= self.max_sentences {
            return Ok(sentences.join(" "));
        }

        let frequencies = keyword_frequencies(&sentences);
        let max_frequency = frequencies.values().copied().max().unwrap_or(1) as f32;
        let count = sentences.len() as f32;

        let mut scored: Vec<(usize, f32)> = sentences
            .iter()
            .enumerate()
            .map(|(index, sentence)| {
                let words = keywords(sentence);
                let keyword_score = if words.is_empty() {
                    0.0
                } else {
                    words
                        .iter()
                        .map(|w| frequencies.get(w).copied().unwrap_or(0) as f32 / max_frequency)
                        .sum::<f32>()
                        / words.len() as f32
                };
                let lead = LEAD_BONUS * (1.0 - index as f32 / count);
                (index, keyword_score + lead)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut chosen: Vec<usize> = scored
            .into_iter()
            .take(self.max_sentences)
            .map(|(index, _)| index)
            .collect();
        chosen.sort_unstable();

        Ok(chosen
            .into_iter()
            .map(|index| sentences[index].as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn strategy(&self) -> Strategy {
        Strategy::Extractive
    }
}

/// Split text after `.`, `!`, `?` or `…` followed by whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        current.push(ch);
        let terminal = matches!(ch, '.' | '!' | '?' | '…');
        let boundary = chars.peek().is_none_or(|next| next.is_whitespace());
        if terminal && boundary {
            let sentence = current.split_whitespace().collect::<Vec<_>>().join(" ");
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }
    let rest = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

fn keywords(sentence: &str) -> Vec<String> {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

fn keyword_frequencies(sentences: &[String]) -> HashMap<String, usize> {
    let mut frequencies = HashMap::new();
    for sentence in sentences {
        for word in keywords(sentence) {
            *frequencies.entry(word).or_insert(0) += 1;
        }
    }
    frequencies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        fixture_raw_tokenizer, LeadModel, ENGLISH_ARTICLE, LOREM_IPSUM, RUSSIAN_ARTICLE,
    };

    fn resource(summary_tokens: usize) -> SummarizerResource {
        SummarizerResource {
            tokenizer: fixture_raw_tokenizer(),
            model: Arc::new(LeadModel::new(summary_tokens)),
        }
    }

    #[test]
    fn test_strategy_for() {
        assert_eq!(strategy_for(&LanguageCode::new("ru")), Strategy::Generative);
        assert_eq!(strategy_for(&LanguageCode::new("en")), Strategy::Pipeline);
        assert_eq!(strategy_for(&LanguageCode::new("de")), Strategy::Pipeline);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("Generative".parse::<Strategy>().unwrap(), Strategy::Generative);
        assert_eq!(Strategy::Pipeline.to_string(), "pipeline");
        assert!(matches!(
            "abstractive".parse::<Strategy>(),
            Err(SummarizeError::Config(_))
        ));
    }

    #[test]
    fn test_pipeline_not_ready() {
        let summarizer = PipelineSummarizer::new(PipelineOptions::default());
        assert!(!summarizer.is_ready());
        assert!(matches!(
            summarizer.summarize(ENGLISH_ARTICLE),
            Err(SummarizeError::ResourceNotReady(_))
        ));
    }

    #[test]
    fn test_generative_not_ready() {
        let summarizer = GenerativeSummarizer::new(GenerativeOptions::default());
        assert!(matches!(
            summarizer.summarize(RUSSIAN_ARTICLE),
            Err(SummarizeError::ResourceNotReady(_))
        ));
    }

    #[test]
    fn test_install_twice_rejected() {
        let summarizer = PipelineSummarizer::new(PipelineOptions::default());
        summarizer.install(resource(4)).unwrap();
        assert!(summarizer.install(resource(4)).is_err());
    }

    #[test]
    fn test_pipeline_summarizes_lead() {
        let summarizer = PipelineSummarizer::new(PipelineOptions::default());
        summarizer.install(resource(5)).unwrap();
        let summary = summarizer.summarize(ENGLISH_ARTICLE).unwrap();
        assert_eq!(summary, "the city council approved a");
    }

    #[test]
    fn test_generative_summarizes_lead() {
        let summarizer = GenerativeSummarizer::new(GenerativeOptions::default());
        summarizer.install(resource(3)).unwrap();
        let summary = summarizer.summarize(RUSSIAN_ARTICLE).unwrap();
        assert_eq!(summary, "городской совет во");
    }

    #[test]
    fn test_deterministic() {
        let model = LeadModel::new(10);
        let summarizer = GenerativeSummarizer::new(GenerativeOptions::default());
        summarizer
            .install(SummarizerResource {
                tokenizer: fixture_raw_tokenizer(),
                model: Arc::new(model.clone()),
            })
            .unwrap();

        assert!(summarizer.summarize("   ").is_err());
        assert_eq!(model.encode_calls(), 0);

        let first = summarizer.summarize(LOREM_IPSUM).unwrap();
        let second = summarizer.summarize(LOREM_IPSUM).unwrap();
        assert_eq!(first, second);
        // one encoder pass per summary
        assert_eq!(model.encode_calls(), 2);
    }

    #[test]
    fn test_empty_input_rejected() {
        let summarizer = PipelineSummarizer::new(PipelineOptions::default());
        summarizer.install(resource(5)).unwrap();
        assert!(matches!(
            summarizer.summarize(" \t"),
            Err(SummarizeError::InvalidInput(_))
        ));
        assert!(matches!(
            ExtractiveSummarizer::default().summarize(""),
            Err(SummarizeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_generation_is_inference_error() {
        let summarizer = PipelineSummarizer::new(PipelineOptions {
            min_length: 0,
            ..PipelineOptions::default()
        });
        summarizer.install(resource(0)).unwrap();
        assert!(matches!(
            summarizer.summarize(ENGLISH_ARTICLE),
            Err(SummarizeError::Inference(_))
        ));
    }

    #[test]
    fn test_options_from_spec() {
        let spec = SummarizerSpec {
            max_length: Some(120),
            ..SummarizerSpec::new("m")
        };
        let options = PipelineOptions::from_spec(&spec);
        assert_eq!(options.max_length, 120);
        assert_eq!(options.max_input_tokens, 1024);
        assert_eq!(options.min_length, 50);

        let options = GenerativeOptions::from_spec(&SummarizerSpec::new("m"));
        assert_eq!(options, GenerativeOptions::default());
    }

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("One. Two!  Three? 3.5 stays\nwhole… Tail");
        assert_eq!(
            sentences,
            vec!["One.", "Two!", "Three?", "3.5 stays whole…", "Tail"]
        );
    }

    #[test]
    fn test_extractive_keeps_document_order() {
        let summarizer = ExtractiveSummarizer::new(3);
        let summary = summarizer.summarize(ENGLISH_ARTICLE).unwrap();

        let sentences = split_sentences(ENGLISH_ARTICLE);
        let picked = split_sentences(&summary);
        assert_eq!(picked.len(), 3);

        let positions: Vec<usize> = picked
            .iter()
            .map(|s| sentences.iter().position(|o| o == s).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_extractive_prefers_recurring_keywords() {
        let text = "Talks resumed on Monday. Weather was mild. The budget vote passed the budget \
                    committee. Lunch was served. Budget critics objected to the budget.";
        let summary = ExtractiveSummarizer::new(2).summarize(text).unwrap();
        assert_eq!(
            summary,
            "The budget vote passed the budget committee. Budget critics objected to the budget."
        );
    }

    #[test]
    fn test_extractive_short_text_returned_whole() {
        let summary = ExtractiveSummarizer::default()
            .summarize("Only one sentence here.")
            .unwrap();
        assert_eq!(summary, "Only one sentence here.");
    }
}
