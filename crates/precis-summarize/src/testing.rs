//! Deterministic test doubles for tokenizers, models and loaders.
//!
//! Available to this crate's tests and, through the `testing` feature, to
//! downstream crates' tests. Nothing here touches the filesystem or a model
//! runtime.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokenizers::Tokenizer;

use crate::detector::{LabelScore, TextClassifier};
use crate::error::{Result, SummarizeError};
use crate::generation::{EncoderOutput, Seq2SeqModel, SpecialTokens};
use crate::language::LanguageCode;
use crate::resource::{
    DetectorResource, DetectorSpec, ResourceLoader, SummarizerResource, SummarizerSpec,
};
use crate::tokenize::{BoundedTokenizer, EncodedInput, TokenBudget};

pub const PAD_ID: u32 = 0;
pub const BOS_ID: u32 = 1;
pub const EOS_ID: u32 = 2;
pub const UNK_ID: u32 = 3;
const SPECIAL_TOKENS: [&str; 4] = ["<pad>", "<s>", "</s>", "<unk>"];

pub const LOREM_IPSUM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, \
    sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim \
    veniam, quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.";

pub const ENGLISH_ARTICLE: &str = "The city council approved a new budget on Tuesday after \
    months of debate. The plan raises spending on public transport and road repairs. Several \
    members argued that the tax increase would hurt small businesses. The mayor said the \
    investment was overdue and would create jobs. Residents will see the first new bus routes \
    next spring. Officials expect the repairs to take three years. Critics promised to \
    challenge the budget in court. The council meets again next month to review the schedule.";

pub const RUSSIAN_ARTICLE: &str = "Городской совет во вторник утвердил новый бюджет после \
    долгих споров. План увеличивает расходы на общественный транспорт и ремонт дорог. \
    Несколько депутатов заявили, что рост налогов ударит по малому бизнесу. Мэр сообщил, \
    что вложения давно назрели и создадут рабочие места. Первые новые автобусные маршруты \
    появятся следующей весной. Чиновники ожидают, что ремонт займёт три года.";

// ─────────────────────────────────────────────────────────────────────────────
// Fixture tokenizer
// ─────────────────────────────────────────────────────────────────────────────

/// Split text the way the fixture tokenizer's pre-tokenizer does: runs of word
/// characters, and runs of other non-space characters.
fn pre_tokenize(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_is_word = false;
    for ch in text.to_lowercase().chars() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            continue;
        }
        let is_word = ch.is_alphanumeric() || ch == '_';
        if !current.is_empty() && is_word != current_is_word {
            pieces.push(std::mem::take(&mut current));
        }
        current_is_word = is_word;
        current.push(ch);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn fixture_vocab() -> Vec<String> {
    let mut seen = HashSet::new();
    let mut vocab: Vec<String> = SPECIAL_TOKENS.iter().map(|t| t.to_string()).collect();
    seen.extend(vocab.iter().cloned());
    for text in [LOREM_IPSUM, ENGLISH_ARTICLE, RUSSIAN_ARTICLE, "hello world"] {
        for piece in pre_tokenize(text) {
            if seen.insert(piece.clone()) {
                vocab.push(piece);
            }
        }
    }
    vocab
}

/// Vocabulary size of the fixture tokenizer.
pub fn fixture_vocab_size() -> usize {
    fixture_vocab().len()
}

/// A word-level tokenizer covering every fixture text, with BART-style
/// `<s> ... </s>` wrapping.
pub fn fixture_raw_tokenizer() -> Tokenizer {
    let vocab: serde_json::Map<String, serde_json::Value> = fixture_vocab()
        .into_iter()
        .enumerate()
        .map(|(id, token)| (token, json!(id)))
        .collect();
    let added_tokens: Vec<_> = SPECIAL_TOKENS
        .iter()
        .enumerate()
        .map(|(id, token)| {
            json!({
                "id": id,
                "content": token,
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": false,
                "special": true
            })
        })
        .collect();

    let spec = json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": { "type": "Lowercase" },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": {
            "type": "TemplateProcessing",
            "single": [
                { "SpecialToken": { "id": "<s>", "type_id": 0 } },
                { "Sequence": { "id": "A", "type_id": 0 } },
                { "SpecialToken": { "id": "</s>", "type_id": 0 } }
            ],
            "pair": [
                { "SpecialToken": { "id": "<s>", "type_id": 0 } },
                { "Sequence": { "id": "A", "type_id": 0 } },
                { "SpecialToken": { "id": "</s>", "type_id": 0 } },
                { "Sequence": { "id": "B", "type_id": 1 } },
                { "SpecialToken": { "id": "</s>", "type_id": 1 } }
            ],
            "special_tokens": {
                "<s>": { "id": "<s>", "ids": [BOS_ID], "tokens": ["<s>"] },
                "</s>": { "id": "</s>", "ids": [EOS_ID], "tokens": ["</s>"] }
            }
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "<unk>"
        }
    });

    spec.to_string()
        .parse::<Tokenizer>()
        .expect("fixture tokenizer definition is valid")
}

/// The fixture tokenizer wrapped with a budget.
pub fn fixture_tokenizer(budget: TokenBudget) -> BoundedTokenizer {
    BoundedTokenizer::new(fixture_raw_tokenizer(), budget)
        .expect("fixture tokenizer accepts the budget")
}

// ─────────────────────────────────────────────────────────────────────────────
// Models
// ─────────────────────────────────────────────────────────────────────────────

fn fixture_special_tokens() -> SpecialTokens {
    SpecialTokens {
        decoder_start: BOS_ID,
        eos: EOS_ID,
        pad: PAD_ID,
        forced_bos: None,
    }
}

/// "Summarizes" by copying the leading content tokens of the input.
///
/// Output is fully determined by the input, which makes end-to-end tests
/// predictable: the summary of a text is its first `max_tokens` tokens.
#[derive(Debug, Clone)]
pub struct LeadModel {
    vocab_size: usize,
    max_tokens: usize,
    encode_calls: Arc<AtomicUsize>,
}

impl LeadModel {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            vocab_size: fixture_vocab_size(),
            max_tokens,
            encode_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of encoder runs so far.
    pub fn encode_calls(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }
}

impl Seq2SeqModel for LeadModel {
    fn encode(&self, input: &EncodedInput) -> Result<EncoderOutput> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        let hidden: Vec<f32> = input
            .content_ids()
            .filter(|id| *id > UNK_ID)
            .map(|id| id as f32)
            .collect();
        let len = hidden.len();
        Ok(EncoderOutput {
            hidden,
            shape: vec![1, len, 1],
        })
    }

    fn next_token_logits(
        &self,
        encoder: &EncoderOutput,
        _input: &EncodedInput,
        decoded: &[u32],
    ) -> Result<Vec<f32>> {
        let mut logits = vec![0.0; self.vocab_size];
        logits[EOS_ID as usize] = 0.5;
        let step = decoded.len() - 1;
        if step < self.max_tokens
            && let Some(token) = encoder.hidden.get(step)
        {
            logits[*token as usize] = 1.0;
        }
        Ok(logits)
    }

    fn special_tokens(&self) -> SpecialTokens {
        fixture_special_tokens()
    }
}

/// Emits a fixed script of tokens, then optionally a repeating token, then
/// end-of-sequence.
///
/// Scripted tokens score 3.0, the fallback 2.0, end-of-sequence 1.0 and
/// everything else 0.0, so constraints that ban a token let the next one
/// through predictably.
#[derive(Debug, Clone)]
pub struct ScriptedModel {
    vocab_size: usize,
    script: Vec<u32>,
    repeat: Option<u32>,
    fallback: Option<u32>,
    forced_bos: Option<u32>,
}

impl ScriptedModel {
    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            script: Vec::new(),
            repeat: None,
            fallback: None,
            forced_bos: None,
        }
    }

    pub fn then(mut self, tokens: &[u32]) -> Self {
        self.script.extend_from_slice(tokens);
        self
    }

    pub fn repeating(mut self, token: u32) -> Self {
        self.repeat = Some(token);
        self
    }

    pub fn with_fallback(mut self, token: u32) -> Self {
        self.fallback = Some(token);
        self
    }

    pub fn with_forced_bos(mut self, token: u32) -> Self {
        self.forced_bos = Some(token);
        self
    }

    fn set(logits: &mut [f32], token: u32, score: f32) {
        if let Some(slot) = logits.get_mut(token as usize) {
            *slot = score;
        }
    }
}

impl Seq2SeqModel for ScriptedModel {
    fn encode(&self, _input: &EncodedInput) -> Result<EncoderOutput> {
        Ok(EncoderOutput::default())
    }

    fn next_token_logits(
        &self,
        _encoder: &EncoderOutput,
        _input: &EncodedInput,
        decoded: &[u32],
    ) -> Result<Vec<f32>> {
        let mut logits = vec![0.0; self.vocab_size];
        let prefix = 1 + usize::from(self.forced_bos.is_some());
        let step = decoded.len().saturating_sub(prefix);

        Self::set(&mut logits, EOS_ID, 1.0);
        if let Some(fallback) = self.fallback {
            Self::set(&mut logits, fallback, 2.0);
        }
        if let Some(token) = self.script.get(step).copied().or(self.repeat) {
            Self::set(&mut logits, token, 3.0);
        }
        Ok(logits)
    }

    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens {
            forced_bos: self.forced_bos,
            ..fixture_special_tokens()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Labels Cyrillic text `ru` and everything else `en`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptClassifier;

impl TextClassifier for ScriptClassifier {
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let letters = text.chars().filter(|c| c.is_alphabetic()).count().max(1);
        let cyrillic = text
            .chars()
            .filter(|c| ('\u{0400}'..='\u{04FF}').contains(c))
            .count();
        let ru = cyrillic as f32 / letters as f32;
        Ok(vec![LabelScore::new("en", 1.0 - ru), LabelScore::new("ru", ru)])
    }
}

/// Returns the same predictions for every input and remembers the last input.
#[derive(Debug, Default)]
pub struct FixedClassifier {
    predictions: Vec<LabelScore>,
    last_input: Mutex<Option<String>>,
}

impl FixedClassifier {
    pub fn new(predictions: Vec<LabelScore>) -> Self {
        Self {
            predictions,
            last_input: Mutex::new(None),
        }
    }

    pub fn last_input(&self) -> Option<String> {
        self.last_input.lock().clone()
    }
}

impl TextClassifier for FixedClassifier {
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        *self.last_input.lock() = Some(text.to_string());
        Ok(self.predictions.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loader
// ─────────────────────────────────────────────────────────────────────────────

/// A [`ResourceLoader`] serving fixture resources and counting loads.
#[derive(Debug, Default)]
pub struct FixtureLoader {
    detector_loads: AtomicUsize,
    summarizer_loads: AtomicUsize,
    delay: Duration,
    summary_tokens: Option<usize>,
    failing: Mutex<HashSet<LanguageCode>>,
}

impl FixtureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every load, widening race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Summaries copy this many leading tokens (default 12).
    pub fn with_summary_tokens(mut self, tokens: usize) -> Self {
        self.summary_tokens = Some(tokens);
        self
    }

    /// Make the next summarizer load for `lang` fail.
    pub fn fail_once(self, lang: impl Into<LanguageCode>) -> Self {
        self.failing.lock().insert(lang.into());
        self
    }

    pub fn detector_loads(&self) -> usize {
        self.detector_loads.load(Ordering::SeqCst)
    }

    pub fn summarizer_loads(&self) -> usize {
        self.summarizer_loads.load(Ordering::SeqCst)
    }
}

impl ResourceLoader for FixtureLoader {
    fn load_detector(&self, _spec: &DetectorSpec) -> Result<DetectorResource> {
        std::thread::sleep(self.delay);
        self.detector_loads.fetch_add(1, Ordering::SeqCst);
        Ok(DetectorResource {
            tokenizer: fixture_raw_tokenizer(),
            classifier: Arc::new(ScriptClassifier),
        })
    }

    fn load_summarizer(
        &self,
        lang: &LanguageCode,
        spec: &SummarizerSpec,
    ) -> Result<SummarizerResource> {
        std::thread::sleep(self.delay);
        if self.failing.lock().remove(lang) {
            return Err(SummarizeError::ModelLoad(format!(
                "fixture model '{}' unavailable",
                spec.model
            )));
        }
        self.summarizer_loads.fetch_add(1, Ordering::SeqCst);
        Ok(SummarizerResource {
            tokenizer: fixture_raw_tokenizer(),
            model: Arc::new(LeadModel::new(self.summary_tokens.unwrap_or(12))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_tokenize_matches_whitespace_rule() {
        assert_eq!(
            pre_tokenize("Hello, world... Привет!"),
            vec!["hello", ",", "world", "...", "привет", "!"]
        );
    }

    #[test]
    fn test_fixture_texts_have_no_unknown_tokens() {
        let tokenizer = fixture_tokenizer(TokenBudget::truncate(4096));
        for text in [LOREM_IPSUM, ENGLISH_ARTICLE, RUSSIAN_ARTICLE] {
            let input = tokenizer.encode(text).unwrap();
            assert!(!input.ids.contains(&UNK_ID), "unknown token in {text:?}");
        }
    }

    #[test]
    fn test_script_classifier() {
        let en = ScriptClassifier.classify(ENGLISH_ARTICLE).unwrap();
        assert!(en[0].score > en[1].score);
        let ru = ScriptClassifier.classify(RUSSIAN_ARTICLE).unwrap();
        assert!(ru[1].score > ru[0].score);
    }
}
