//! Beam search with optional sampling over an encoder-decoder model.

use rand::Rng;

use crate::beam::BeamHypotheses;
use crate::config::GenerationConfig;
use crate::error::{EngineError, Result};
use crate::logits::{log_softmax_in_place, LogitsProcessors};

/// An encoder-decoder language model, seen one decoding step at a time.
pub trait Seq2SeqLm {
    type Encoded;

    /// Run the encoder once over the prompt.
    fn encode(&mut self, input_ids: &[u32]) -> Result<Self::Encoded>;

    /// Raw logits for the next token of every sequence in `decoder_ids`.
    /// All sequences have the same length; the result has one row per sequence.
    fn next_token_logits(
        &mut self,
        encoded: &Self::Encoded,
        decoder_ids: &[Vec<u32>],
    ) -> Result<Vec<Vec<f32>>>;
}

// Beams other than the first start out of reach so step one expands a single beam.
const INACTIVE_BEAM_SCORE: f32 = -1e9;

/// Generate a decoder sequence for `input_ids`.
///
/// The result starts with the decoder start token and ends with EOS unless it
/// hit `max_length`.
pub fn generate<M, R>(
    model: &mut M,
    input_ids: &[u32],
    config: &GenerationConfig,
    rng: &mut R,
) -> Result<Vec<u32>>
where
    M: Seq2SeqLm,
    R: Rng,
{
    config.validate()?;

    let num_beams = config.num_beams;
    let encoded = model.encode(input_ids)?;
    let processors = LogitsProcessors::new(config, input_ids);

    let mut beams = vec![vec![config.decoder_start_token_id]; num_beams];
    let mut beam_scores: Vec<f32> = (0..num_beams)
        .map(|i| if i == 0 { 0.0 } else { INACTIVE_BEAM_SCORE })
        .collect();
    let mut finished = BeamHypotheses::new(num_beams, config.length_penalty);
    let mut done = false;
    let mut cur_len = 1;

    while cur_len < config.max_length {
        let logits = model.next_token_logits(&encoded, &beams)?;
        if logits.len() != num_beams {
            return Err(EngineError::Shape(format!(
                "expected {} logit rows, got {}",
                num_beams,
                logits.len()
            )));
        }
        let vocab_size = logits[0].len();
        if vocab_size == 0 {
            return Err(EngineError::Shape("empty logit row".into()));
        }

        let mut scores = Vec::with_capacity(num_beams * vocab_size);
        for (beam_idx, mut row) in logits.into_iter().enumerate() {
            if row.len() != vocab_size {
                return Err(EngineError::Shape(format!(
                    "logit row {} has {} entries, expected {}",
                    beam_idx,
                    row.len(),
                    vocab_size
                )));
            }
            log_softmax_in_place(&mut row);
            processors.process(&beams[beam_idx], &mut row);
            for score in row.iter_mut() {
                *score += beam_scores[beam_idx];
                if config.do_sample {
                    *score /= config.temperature;
                }
            }
            scores.extend(row);
        }

        let wanted = 2 * num_beams;
        let candidates = if config.do_sample {
            sample_candidates(&scores, wanted, rng)
        } else {
            top_candidates(&scores, wanted)
        };

        let mut next_beams = Vec::with_capacity(num_beams);
        let mut next_scores = Vec::with_capacity(num_beams);
        for (rank, &(flat_idx, score)) in candidates.iter().enumerate() {
            let beam_idx = flat_idx / vocab_size;
            let token = (flat_idx % vocab_size) as u32;
            if token == config.eos_token_id {
                if rank < num_beams {
                    finished.add(beams[beam_idx].clone(), score);
                }
            } else {
                let mut sequence = beams[beam_idx].clone();
                sequence.push(token);
                next_beams.push(sequence);
                next_scores.push(score);
            }
            if next_beams.len() == num_beams {
                break;
            }
        }

        if let Some(&(_, best)) = candidates.first() {
            if finished.is_done(best, cur_len) {
                done = true;
            }
        }

        cur_len += 1;

        if next_beams.is_empty() {
            done = true;
            break;
        }
        // Too few live candidates: pad with dead copies so the batch shape holds.
        while next_beams.len() < num_beams {
            next_beams.push(next_beams[0].clone());
            next_scores.push(f32::NEG_INFINITY);
        }
        beams = next_beams;
        beam_scores = next_scores;

        if done {
            break;
        }
    }

    if !done {
        for (tokens, score) in beams.iter().zip(&beam_scores) {
            if score.is_finite() {
                finished.add(tokens.clone(), *score);
            }
        }
    }

    let mut best = match finished.best() {
        Some((_, tokens)) => tokens.clone(),
        None => beams.swap_remove(0),
    };
    if best.len() < config.max_length {
        best.push(config.eos_token_id);
    }
    Ok(best)
}

/// Draw up to `k` distinct indices with probability `softmax(scores)`, without
/// replacement, returned best score first.
fn sample_candidates<R: Rng>(scores: &[f32], k: usize, rng: &mut R) -> Vec<(usize, f32)> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return Vec::new();
    }

    // Exponential-race keys: the k largest of ln(u) / p are a weighted sample.
    let mut keyed: Vec<(f64, usize)> = scores
        .iter()
        .enumerate()
        .filter_map(|(idx, &score)| {
            let weight = f64::from(score - max).exp();
            if weight > 0.0 {
                let u: f64 = 1.0 - rng.gen::<f64>();
                Some((u.ln() / weight, idx))
            } else {
                None
            }
        })
        .collect();
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
    keyed.truncate(k);

    let mut picked: Vec<(usize, f32)> = keyed.into_iter().map(|(_, idx)| (idx, scores[idx])).collect();
    picked.sort_by(|a, b| b.1.total_cmp(&a.1));
    picked
}

fn top_candidates(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| score.is_finite())
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logits::banned_ngram_tokens;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const VOCAB: usize = 12;
    const EOS: u32 = 2;

    /// Prefers the token after the last one (cycling over 3..VOCAB) and gives
    /// EOS a moderate score.
    struct CyclingLm {
        encode_calls: usize,
    }

    impl Seq2SeqLm for CyclingLm {
        type Encoded = usize;

        fn encode(&mut self, input_ids: &[u32]) -> Result<usize> {
            self.encode_calls += 1;
            Ok(input_ids.len())
        }

        fn next_token_logits(&mut self, _encoded: &usize, decoder_ids: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
            Ok(decoder_ids
                .iter()
                .map(|seq| {
                    let last = *seq.last().unwrap() as usize;
                    let next = if last < 3 { 3 } else { 3 + (last - 2) % (VOCAB - 3) };
                    let mut row = vec![0.0; VOCAB];
                    row[next] = 4.0;
                    row[EOS as usize] = 2.0;
                    row
                })
                .collect())
        }
    }

    /// Deterministic chain: start -> 5 -> EOS.
    struct TableLm;

    impl Seq2SeqLm for TableLm {
        type Encoded = ();

        fn encode(&mut self, _input_ids: &[u32]) -> Result<()> {
            Ok(())
        }

        fn next_token_logits(&mut self, _encoded: &(), decoder_ids: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
            Ok(decoder_ids
                .iter()
                .map(|seq| {
                    let mut row = vec![0.0; VOCAB];
                    match seq.last() {
                        Some(1) => row[5] = 10.0,
                        _ => row[EOS as usize] = 10.0,
                    }
                    row
                })
                .collect())
        }
    }

    fn plain(num_beams: usize) -> GenerationConfig {
        GenerationConfig {
            max_length: 10,
            min_length: 0,
            num_beams,
            do_sample: false,
            no_repeat_ngram_size: 0,
            encoder_no_repeat_ngram_size: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_greedy_follows_table() {
        let mut rng = StdRng::seed_from_u64(0);
        let output = generate(&mut TableLm, &[7, 8], &plain(1), &mut rng).unwrap();
        assert_eq!(output, vec![1, 5, EOS]);
    }

    #[test]
    fn test_beam_search_follows_table() {
        let mut rng = StdRng::seed_from_u64(0);
        let output = generate(&mut TableLm, &[7, 8], &plain(2), &mut rng).unwrap();
        assert_eq!(output, vec![1, 5, EOS]);
    }

    #[test]
    fn test_encoder_runs_once() {
        let mut model = CyclingLm { encode_calls: 0 };
        let mut rng = StdRng::seed_from_u64(1);
        generate(&mut model, &[4, 5], &GenerationConfig::default(), &mut rng).unwrap();
        assert_eq!(model.encode_calls, 1);
    }

    #[test]
    fn test_sampled_output_respects_constraints() {
        let config = GenerationConfig {
            max_length: 16,
            min_length: 6,
            no_repeat_ngram_size: 3,
            encoder_no_repeat_ngram_size: 0,
            ..Default::default()
        };
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut model = CyclingLm { encode_calls: 0 };
            let output = generate(&mut model, &[4, 5, 6], &config, &mut rng).unwrap();

            assert_eq!(output[0], config.decoder_start_token_id);
            assert!(output.len() <= config.max_length, "seed {seed}: {output:?}");
            if let Some(pos) = output.iter().position(|&t| t == EOS) {
                assert!(pos >= config.min_length, "seed {seed}: early EOS in {output:?}");
                assert_eq!(pos, output.len() - 1);
            }
            for end in 1..output.len() {
                let banned = banned_ngram_tokens(&output[..end], 3);
                assert!(!banned.contains(&output[end]), "seed {seed}: repeated trigram in {output:?}");
            }
        }
    }

    #[test]
    fn test_forced_eos_caps_length() {
        let config = GenerationConfig {
            max_length: 5,
            min_length: 0,
            no_repeat_ngram_size: 0,
            encoder_no_repeat_ngram_size: 0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = CyclingLm { encode_calls: 0 };
        let output = generate(&mut model, &[4], &config, &mut rng).unwrap();
        assert!(output.len() <= 5);
        assert_eq!(*output.last().unwrap(), EOS);
    }

    #[test]
    fn test_rejects_wrong_row_count() {
        struct Broken;
        impl Seq2SeqLm for Broken {
            type Encoded = ();
            fn encode(&mut self, _: &[u32]) -> Result<()> {
                Ok(())
            }
            fn next_token_logits(&mut self, _: &(), _: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
                Ok(vec![vec![0.0; VOCAB]])
            }
        }
        let mut rng = StdRng::seed_from_u64(0);
        let err = generate(&mut Broken, &[4], &plain(2), &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::Shape(_)));
    }

    #[test]
    fn test_sample_candidates_skips_impossible_tokens() {
        let mut rng = StdRng::seed_from_u64(9);
        let scores = [0.0, f32::NEG_INFINITY, -1.0, f32::NEG_INFINITY];
        let picked = sample_candidates(&scores, 4, &mut rng);
        let indices: Vec<usize> = picked.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 2]);
    }
}
