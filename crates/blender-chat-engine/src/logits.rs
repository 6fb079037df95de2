//! Score-row transforms applied before each beam step.
//!
//! Every function works on one beam's score row (`vocab_size` entries) and
//! the tokens that beam has produced so far, start token included.

use std::collections::HashMap;

use crate::config::GenerationConfig;

pub fn log_softmax_in_place(row: &mut [f32]) {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return;
    }
    let sum: f32 = row.iter().map(|x| (x - max).exp()).sum();
    let log_sum = sum.ln() + max;
    for x in row.iter_mut() {
        *x -= log_sum;
    }
}

/// Tokens that would complete an n-gram already present in `tokens`.
pub fn banned_ngram_tokens(tokens: &[u32], n: usize) -> Vec<u32> {
    if n == 0 || tokens.len() + 1 < n {
        return Vec::new();
    }
    let prefix = &tokens[tokens.len() + 1 - n..];
    let mut seen: HashMap<&[u32], Vec<u32>> = HashMap::new();
    for window in tokens.windows(n) {
        seen.entry(&window[..n - 1]).or_default().push(window[n - 1]);
    }
    seen.remove(prefix).unwrap_or_default()
}

/// Tokens that would make the decoder copy an n-gram from the encoder input.
pub fn banned_encoder_ngram_tokens(encoder_ids: &[u32], tokens: &[u32], n: usize) -> Vec<u32> {
    if n == 0 || tokens.len() + 1 < n {
        return Vec::new();
    }
    let prefix = &tokens[tokens.len() + 1 - n..];
    encoder_ids
        .windows(n)
        .filter(|window| &window[..n - 1] == prefix)
        .map(|window| window[n - 1])
        .collect()
}

fn ban(row: &mut [f32], tokens: impl IntoIterator<Item = u32>) {
    for token in tokens {
        if let Some(score) = row.get_mut(token as usize) {
            *score = f32::NEG_INFINITY;
        }
    }
}

/// The fixed processor chain: min length, no-repeat n-gram, encoder
/// no-repeat n-gram, forced EOS.
#[derive(Debug, Clone)]
pub struct LogitsProcessors {
    min_length: usize,
    max_length: usize,
    no_repeat_ngram_size: usize,
    encoder_no_repeat_ngram_size: usize,
    forced_eos: bool,
    eos_token_id: u32,
    encoder_ids: Vec<u32>,
}

impl LogitsProcessors {
    pub fn new(config: &GenerationConfig, encoder_ids: &[u32]) -> Self {
        Self {
            min_length: config.min_length,
            max_length: config.max_length,
            no_repeat_ngram_size: config.no_repeat_ngram_size,
            encoder_no_repeat_ngram_size: config.encoder_no_repeat_ngram_size,
            forced_eos: config.forced_eos,
            eos_token_id: config.eos_token_id,
            encoder_ids: encoder_ids.to_vec(),
        }
    }

    pub fn process(&self, beam_tokens: &[u32], row: &mut [f32]) {
        let cur_len = beam_tokens.len();

        if cur_len < self.min_length {
            ban(row, [self.eos_token_id]);
        }

        ban(row, banned_ngram_tokens(beam_tokens, self.no_repeat_ngram_size));
        ban(
            row,
            banned_encoder_ngram_tokens(&self.encoder_ids, beam_tokens, self.encoder_no_repeat_ngram_size),
        );

        if self.forced_eos && cur_len + 1 == self.max_length {
            let eos = self.eos_token_id as usize;
            for (token, score) in row.iter_mut().enumerate() {
                if token != eos {
                    *score = f32::NEG_INFINITY;
                }
            }
            if let Some(score) = row.get_mut(eos) {
                *score = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_softmax_normalizes() {
        let mut row = vec![1.0, 2.0, 3.0];
        log_softmax_in_place(&mut row);
        let total: f32 = row.iter().map(|x| x.exp()).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(row[2] > row[1] && row[1] > row[0]);
    }

    #[test]
    fn test_banned_ngram_tokens() {
        // "1 5 6 1 5" -> the bigram prefix "1 5" was followed by 6 before.
        assert_eq!(banned_ngram_tokens(&[1, 5, 6, 1, 5], 3), vec![6]);
        assert!(banned_ngram_tokens(&[1, 5], 3).is_empty());
        assert!(banned_ngram_tokens(&[1, 5, 6, 1, 5], 0).is_empty());
    }

    #[test]
    fn test_banned_encoder_ngram_tokens() {
        let encoder = [10, 11, 12, 13];
        assert_eq!(banned_encoder_ngram_tokens(&encoder, &[1, 10, 11], 3), vec![12]);
        assert!(banned_encoder_ngram_tokens(&encoder, &[1, 11, 10], 3).is_empty());
    }

    #[test]
    fn test_min_length_masks_eos() {
        let config = GenerationConfig { min_length: 3, ..Default::default() };
        let processors = LogitsProcessors::new(&config, &[]);
        let mut row = vec![0.0; 8];
        processors.process(&[1, 4], &mut row);
        assert_eq!(row[2], f32::NEG_INFINITY);

        let mut row = vec![0.0; 8];
        processors.process(&[1, 4, 5], &mut row);
        assert_eq!(row[2], 0.0);
    }

    #[test]
    fn test_forced_eos_at_last_position() {
        let config = GenerationConfig { max_length: 4, min_length: 0, ..Default::default() };
        let processors = LogitsProcessors::new(&config, &[]);
        let mut row = vec![-1.0; 8];
        processors.process(&[1, 4, 5], &mut row);
        for (token, score) in row.iter().enumerate() {
            if token == 2 {
                assert_eq!(*score, 0.0);
            } else {
                assert_eq!(*score, f32::NEG_INFINITY);
            }
        }
    }
}
