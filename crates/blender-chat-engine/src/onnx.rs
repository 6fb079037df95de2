//! ONNX Runtime encoder/decoder pair (optimum-style export without past key values).

use std::path::Path;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{onnx_err, EngineError, Result};
use crate::generation::Seq2SeqLm;

/// Encoder output kept for the whole decoding loop.
#[derive(Debug, Clone)]
pub struct EncoderOutput {
    hidden: Vec<f32>,
    seq_len: usize,
    hidden_size: usize,
}

pub struct OnnxSeq2Seq {
    encoder: Session,
    decoder: Session,
}

impl std::fmt::Debug for OnnxSeq2Seq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSeq2Seq").finish_non_exhaustive()
    }
}

fn open_session(path: &Path, intra_threads: usize) -> Result<Session> {
    if !path.exists() {
        return Err(EngineError::MissingFile(path.display().to_string()));
    }
    Session::builder()
        .map_err(onnx_err)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(onnx_err)?
        .with_intra_threads(intra_threads)
        .map_err(onnx_err)?
        .commit_from_file(path)
        .map_err(onnx_err)
}

impl OnnxSeq2Seq {
    pub fn load(encoder_path: &Path, decoder_path: &Path, intra_threads: usize) -> Result<Self> {
        let threads = intra_threads.max(1);
        log::debug!("Opening encoder graph {}", encoder_path.display());
        let encoder = open_session(encoder_path, threads)?;
        log::debug!("Opening decoder graph {}", decoder_path.display());
        let decoder = open_session(decoder_path, threads)?;
        Ok(Self { encoder, decoder })
    }
}

impl Seq2SeqLm for OnnxSeq2Seq {
    type Encoded = EncoderOutput;

    fn encode(&mut self, input_ids: &[u32]) -> Result<EncoderOutput> {
        let seq_len = input_ids.len();
        if seq_len == 0 {
            return Err(EngineError::Shape("encoder input is empty".into()));
        }
        let ids: Vec<i64> = input_ids.iter().map(|&id| i64::from(id)).collect();
        let mask = vec![1i64; seq_len];

        let ids = Tensor::from_array(([1usize, seq_len], ids)).map_err(onnx_err)?;
        let mask = Tensor::from_array(([1usize, seq_len], mask)).map_err(onnx_err)?;
        let outputs = self
            .encoder
            .run(ort::inputs!["input_ids" => ids, "attention_mask" => mask])
            .map_err(onnx_err)?;

        let (shape, data) = outputs["last_hidden_state"]
            .try_extract_tensor::<f32>()
            .map_err(onnx_err)?;
        if shape.len() != 3 || shape[1] as usize != seq_len {
            return Err(EngineError::Shape(format!(
                "encoder returned {shape:?} for {seq_len} input tokens"
            )));
        }
        Ok(EncoderOutput {
            hidden: data.to_vec(),
            seq_len,
            hidden_size: shape[2] as usize,
        })
    }

    fn next_token_logits(
        &mut self,
        encoded: &EncoderOutput,
        decoder_ids: &[Vec<u32>],
    ) -> Result<Vec<Vec<f32>>> {
        let batch = decoder_ids.len();
        let step_len = decoder_ids.first().map(Vec::len).unwrap_or(0);
        if batch == 0 || step_len == 0 {
            return Err(EngineError::Shape("decoder input is empty".into()));
        }
        if decoder_ids.iter().any(|seq| seq.len() != step_len) {
            return Err(EngineError::Shape("decoder sequences differ in length".into()));
        }

        let ids: Vec<i64> = decoder_ids
            .iter()
            .flat_map(|seq| seq.iter().map(|&id| i64::from(id)))
            .collect();
        let hidden: Vec<f32> = std::iter::repeat(encoded.hidden.as_slice())
            .take(batch)
            .flatten()
            .copied()
            .collect();
        let mask = vec![1i64; batch * encoded.seq_len];

        let ids = Tensor::from_array(([batch, step_len], ids)).map_err(onnx_err)?;
        let hidden = Tensor::from_array(([batch, encoded.seq_len, encoded.hidden_size], hidden))
            .map_err(onnx_err)?;
        let mask = Tensor::from_array(([batch, encoded.seq_len], mask)).map_err(onnx_err)?;

        let outputs = self
            .decoder
            .run(ort::inputs![
                "input_ids" => ids,
                "encoder_hidden_states" => hidden,
                "encoder_attention_mask" => mask
            ])
            .map_err(onnx_err)?;

        let (shape, data) = outputs["logits"].try_extract_tensor::<f32>().map_err(onnx_err)?;
        if shape.len() != 3 || shape[0] as usize != batch || shape[1] as usize != step_len {
            return Err(EngineError::Shape(format!(
                "decoder returned {shape:?} for batch {batch} x {step_len}"
            )));
        }
        last_position_logits(data, batch, step_len, shape[2] as usize)
    }
}

/// Split a flat `[batch, step_len, vocab_size]` logits buffer into the final
/// position's row for each beam.
fn last_position_logits(
    data: &[f32],
    batch: usize,
    step_len: usize,
    vocab_size: usize,
) -> Result<Vec<Vec<f32>>> {
    if step_len == 0 || vocab_size == 0 || data.len() != batch * step_len * vocab_size {
        return Err(EngineError::Shape(format!(
            "{} logits do not fill [{batch}, {step_len}, {vocab_size}]",
            data.len()
        )));
    }
    let per_beam = step_len * vocab_size;
    Ok(data
        .chunks_exact(per_beam)
        .map(|beam| beam[per_beam - vocab_size..].to_vec())
        .collect())
}
