use std::path::Path;

use tokenizers::{Tokenizer, TruncationDirection, TruncationParams, TruncationStrategy};

use crate::error::{EngineError, Result};

/// Special token ids, looked up by name in the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub pad: u32,
    pub bos: u32,
    pub eos: u32,
}

/// `tokenizer.json` wrapper with the pair encoding the chat endpoint needs.
pub struct ChatTokenizer {
    inner: Tokenizer,
    special: SpecialTokens,
}

impl std::fmt::Debug for ChatTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatTokenizer")
            .field("special", &self.special)
            .finish_non_exhaustive()
    }
}

impl ChatTokenizer {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let inner = Tokenizer::from_file(path.as_ref())?;
        Self::from_tokenizer(inner)
    }

    pub fn from_tokenizer(inner: Tokenizer) -> Result<Self> {
        let lookup = |name: &str| {
            inner
                .token_to_id(name)
                .ok_or_else(|| EngineError::Tokenizer(format!("vocabulary has no {name} token")))
        };
        let special = SpecialTokens {
            pad: lookup("<pad>")?,
            bos: lookup("<s>")?,
            eos: lookup("</s>")?,
        };
        Ok(Self { inner, special })
    }

    pub fn special_tokens(&self) -> SpecialTokens {
        self.special
    }

    /// Encode `(first, second)` as a sequence pair with special tokens,
    /// truncating the longer side first until it fits in `max_len`.
    pub fn encode_pair(&self, first: &str, second: &str, max_len: usize) -> Result<Vec<u32>> {
        let mut tokenizer = self.inner.clone();
        tokenizer.with_truncation(Some(TruncationParams {
            max_length: max_len,
            strategy: TruncationStrategy::LongestFirst,
            stride: 0,
            direction: TruncationDirection::Right,
        }))?;
        let encoding = tokenizer.encode((first, second), true)?;
        Ok(encoding.get_ids().to_vec())
    }

    pub fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String> {
        Ok(self.inner.decode(ids, skip_special_tokens)?)
    }
}
