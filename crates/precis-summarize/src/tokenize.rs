//! Token-budget enforcement on top of a sub-word tokenizer.
//!
//! Every model in this crate has a fixed positional capacity. A
//! [`BoundedTokenizer`] is configured once with a [`TokenBudget`] and from then
//! on never produces a sequence longer than the budget: longer inputs are
//! truncated (special tokens preserved), and fixed-shape models additionally
//! get every sequence padded to exactly the budget.

use tokenizers::{
    PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationDirection,
    TruncationParams, TruncationStrategy,
};

use crate::error::{Result, SummarizeError};

/// Padding tokens looked up when the tokenizer file carries no padding config.
const PAD_TOKEN_CANDIDATES: [&str; 2] = ["<pad>", "[PAD]"];

/// Maximum sequence length for one model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    /// Maximum number of tokens, special tokens included.
    pub max_length: usize,
    /// Pad shorter sequences up to `max_length`.
    pub pad_to_max: bool,
}

impl TokenBudget {
    /// Truncate to `max_length` without padding.
    pub fn truncate(max_length: usize) -> Self {
        Self {
            max_length,
            pad_to_max: false,
        }
    }

    /// Truncate and pad to exactly `max_length`.
    pub fn fixed(max_length: usize) -> Self {
        Self {
            max_length,
            pad_to_max: true,
        }
    }
}

/// Token ids and attention mask for one sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedInput {
    /// Token ids, padding included.
    pub ids: Vec<u32>,
    /// 1 for real tokens, 0 for padding.
    pub attention_mask: Vec<u32>,
}

impl EncodedInput {
    /// Sequence length including padding.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if the sequence has no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids of real (non-padding) tokens, in order.
    pub fn content_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids
            .iter()
            .zip(self.attention_mask.iter())
            .filter(|(_, mask)| **mask > 0)
            .map(|(id, _)| *id)
    }

    /// Number of real (non-padding) tokens.
    pub fn content_len(&self) -> usize {
        self.attention_mask.iter().filter(|m| **m > 0).count()
    }
}

/// A tokenizer that enforces a fixed [`TokenBudget`].
#[derive(Clone)]
pub struct BoundedTokenizer {
    inner: Tokenizer,
    budget: TokenBudget,
}

impl std::fmt::Debug for BoundedTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedTokenizer")
            .field("budget", &self.budget)
            .field("vocab_size", &self.inner.get_vocab_size(true))
            .finish()
    }
}

impl BoundedTokenizer {
    /// Wrap a tokenizer, replacing its truncation and padding settings.
    pub fn new(mut tokenizer: Tokenizer, budget: TokenBudget) -> Result<Self> {
        if budget.max_length == 0 {
            return Err(SummarizeError::Config(
                "token budget must be at least 1".to_string(),
            ));
        }

        tokenizer.with_truncation(Some(TruncationParams {
            direction: TruncationDirection::Right,
            max_length: budget.max_length,
            strategy: TruncationStrategy::LongestFirst,
            stride: 0,
        }))?;

        if budget.pad_to_max {
            let (pad_id, pad_token) = resolve_pad_token(&tokenizer)?;
            tokenizer.with_padding(Some(PaddingParams {
                strategy: PaddingStrategy::Fixed(budget.max_length),
                direction: PaddingDirection::Right,
                pad_to_multiple_of: None,
                pad_id,
                pad_type_id: 0,
                pad_token,
            }));
        } else {
            tokenizer.with_padding(None);
        }

        Ok(Self {
            inner: tokenizer,
            budget,
        })
    }

    /// The budget this tokenizer enforces.
    pub fn budget(&self) -> TokenBudget {
        self.budget
    }

    /// Look up the id of a token.
    pub fn token_id(&self, token: &str) -> Option<u32> {
        self.inner.token_to_id(token)
    }

    /// Encode text with special tokens, truncated (and padded) to the budget.
    pub fn encode(&self, text: &str) -> Result<EncodedInput> {
        let encoding = self.inner.encode(text, true)?;
        let input = EncodedInput {
            ids: encoding.get_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
        };
        debug_assert!(input.len() <= self.budget.max_length);
        Ok(input)
    }

    /// Decode ids to text, dropping special tokens and collapsing whitespace.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        let text = self.inner.decode(ids, true)?;
        Ok(collapse_whitespace(&text))
    }
}

/// Find the padding token for fixed-length encoding.
fn resolve_pad_token(tokenizer: &Tokenizer) -> Result<(u32, String)> {
    if let Some(params) = tokenizer.get_padding() {
        return Ok((params.pad_id, params.pad_token.clone()));
    }
    PAD_TOKEN_CANDIDATES
        .iter()
        .find_map(|token| tokenizer.token_to_id(token).map(|id| (id, token.to_string())))
        .ok_or_else(|| {
            SummarizeError::Tokenizer(
                "tokenizer has no padding token; cannot pad to a fixed length".to_string(),
            )
        })
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
