//! Greedy sequence-to-sequence generation.
//!
//! The decoding loop is model-agnostic: anything implementing
//! [`Seq2SeqModel`] (an ONNX encoder/decoder pair, or a scripted test model)
//! can be driven by [`generate`]. Decoding never samples. At each step the
//! highest-scoring token is taken after applying the length and repetition
//! constraints in [`GenerationConfig`], so the same input always yields the
//! same output.

use std::collections::HashSet;

use crate::error::{Result, SummarizeError};
use crate::tokenize::EncodedInput;

/// Token ids that drive the decoding loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    /// First token fed to the decoder.
    pub decoder_start: u32,
    /// End-of-sequence token.
    pub eos: u32,
    /// Padding token.
    pub pad: u32,
    /// Token forced at the first generated position (language tag for
    /// multilingual models).
    pub forced_bos: Option<u32>,
}

/// Encoder hidden states for one input sequence.
#[derive(Debug, Clone, Default)]
pub struct EncoderOutput {
    /// Flattened `[batch, seq_len, hidden]` values.
    pub hidden: Vec<f32>,
    /// Shape of `hidden`.
    pub shape: Vec<usize>,
}

/// An encoder/decoder language model.
///
/// Implementations must be deterministic: the same inputs produce the same
/// logits.
pub trait Seq2SeqModel: Send + Sync {
    /// Run the encoder over the input sequence.
    fn encode(&self, input: &EncodedInput) -> Result<EncoderOutput>;

    /// Logits over the vocabulary for the token following `decoded`.
    fn next_token_logits(
        &self,
        encoder: &EncoderOutput,
        input: &EncodedInput,
        decoded: &[u32],
    ) -> Result<Vec<f32>>;

    /// Special token ids used by the decoding loop.
    fn special_tokens(&self) -> SpecialTokens;
}

/// Decoding constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Maximum number of generated tokens, decoder start included.
    pub max_length: usize,
    /// End-of-sequence is suppressed until this many tokens exist.
    pub min_length: usize,
    /// Forbid repeating any n-gram of this size.
    pub no_repeat_ngram_size: Option<usize>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: 200,
            min_length: 0,
            no_repeat_ngram_size: None,
        }
    }
}

impl GenerationConfig {
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn with_no_repeat_ngram_size(mut self, size: usize) -> Self {
        self.no_repeat_ngram_size = Some(size).filter(|n| *n > 0);
        self
    }
}

/// Greedily generate one output sequence.
///
/// The returned ids start with the decoder start token and end with the
/// end-of-sequence token unless `max_length` was reached first.
pub fn generate(
    model: &dyn Seq2SeqModel,
    input: &EncodedInput,
    config: &GenerationConfig,
) -> Result<Vec<u32>> {
    if input.content_len() == 0 {
        return Err(SummarizeError::InvalidInput(
            "cannot generate from an empty sequence".to_string(),
        ));
    }

    let special = model.special_tokens();
    let encoder = model.encode(input)?;
    let mut decoded = vec![special.decoder_start];

    if let Some(forced) = special.forced_bos {
        decoded.push(forced);
    }

    while decoded.len() < config.max_length {
        let mut logits = model.next_token_logits(&encoder, input, &decoded)?;
        if logits.is_empty() {
            return Err(SummarizeError::Inference(
                "model returned empty logits".to_string(),
            ));
        }

        if decoded.len() < config.min_length {
            ban(&mut logits, special.eos);
        }
        if let Some(n) = config.no_repeat_ngram_size {
            for token in banned_ngram_tokens(&decoded, n) {
                ban(&mut logits, token);
            }
        }

        let next = argmax(&logits).ok_or_else(|| {
            SummarizeError::Inference("every candidate token was suppressed".to_string())
        })?;
        decoded.push(next);
        if next == special.eos {
            break;
        }
    }

    tracing::debug!(
        input_tokens = input.content_len(),
        output_tokens = decoded.len(),
        "Generation finished"
    );
    Ok(decoded)
}

fn ban(logits: &mut [f32], token: u32) {
    if let Some(slot) = logits.get_mut(token as usize) {
        *slot = f32::NEG_INFINITY;
    }
}

/// Index of the largest finite logit; ties resolve to the lowest index.
fn argmax(logits: &[f32]) -> Option<u32> {
    let mut best: Option<(usize, f32)> = None;
    for (index, value) in logits.iter().copied().enumerate() {
        if !value.is_finite() {
            continue;
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index as u32)
}

/// Tokens that would complete an n-gram already present in `decoded`.
fn banned_ngram_tokens(decoded: &[u32], n: usize) -> HashSet<u32> {
    let mut banned = HashSet::new();
    if n == 0 || decoded.len() + 1 < n {
        return banned;
    }
    let prefix = &decoded[decoded.len() + 1 - n..];
    for window in decoded.windows(n) {
        if window[..n - 1] == *prefix {
            banned.insert(window[n - 1]);
        }
    }
    banned
}
