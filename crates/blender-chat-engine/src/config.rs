use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Parameters for one `generate` call.
///
/// Defaults are the BlenderBot-400M-distill generation config with the
/// chat endpoint's overrides applied (beam width 2, sampling on,
/// temperature 0.9, 100 token cap).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum decoder sequence length, including the start token.
    pub max_length: usize,
    /// EOS is masked until the sequence reaches this length.
    pub min_length: usize,
    pub num_beams: usize,
    pub do_sample: bool,
    pub temperature: f32,
    /// Exponent applied to hypothesis length when ranking finished beams.
    pub length_penalty: f32,
    /// 0 disables.
    pub no_repeat_ngram_size: usize,
    /// 0 disables. Bans n-grams that already occur in the encoder input.
    pub encoder_no_repeat_ngram_size: usize,
    /// Force EOS at the last position when the cap is reached.
    pub forced_eos: bool,
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
    pub pad_token_id: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: 100,
            min_length: 20,
            num_beams: 2,
            do_sample: true,
            temperature: 0.9,
            length_penalty: 0.65,
            no_repeat_ngram_size: 3,
            encoder_no_repeat_ngram_size: 3,
            forced_eos: true,
            decoder_start_token_id: 1,
            eos_token_id: 2,
            pad_token_id: 0,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_beams == 0 {
            return Err(EngineError::InvalidConfig("num_beams must be at least 1".into()));
        }
        if self.max_length < 2 {
            return Err(EngineError::InvalidConfig("max_length must be at least 2".into()));
        }
        if self.do_sample && !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "temperature must be a positive number, got {}",
                self.temperature
            )));
        }
        if !self.length_penalty.is_finite() {
            return Err(EngineError::InvalidConfig("length_penalty must be finite".into()));
        }
        Ok(())
    }
}
