use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::GenerationConfig;
use crate::error::Result;
use crate::files::ModelFiles;
use crate::generation::{generate, Seq2SeqLm};
use crate::onnx::OnnxSeq2Seq;
use crate::tokenizer::ChatTokenizer;

/// Anything that can answer an utterance given the prior conversation.
pub trait ChatModel: Send {
    /// `context` is the newline-joined recent history, possibly empty.
    fn reply(&mut self, context: &str, utterance: &str) -> Result<String>;
}

/// Tokenizer + seq2seq model + generation settings.
#[derive(Debug)]
pub struct Chatbot<M> {
    tokenizer: ChatTokenizer,
    model: M,
    generation: GenerationConfig,
    max_input_tokens: usize,
    rng: StdRng,
}

impl<M: Seq2SeqLm> Chatbot<M> {
    pub fn new(
        tokenizer: ChatTokenizer,
        model: M,
        mut generation: GenerationConfig,
        max_input_tokens: usize,
        seed: Option<u64>,
    ) -> Self {
        // Token ids come from the vocabulary, not from configuration.
        let special = tokenizer.special_tokens();
        generation.decoder_start_token_id = special.bos;
        generation.eos_token_id = special.eos;
        generation.pad_token_id = special.pad;

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            tokenizer,
            model,
            generation,
            max_input_tokens,
            rng,
        }
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.generation
    }
}

impl Chatbot<OnnxSeq2Seq> {
    pub fn from_files(
        files: &ModelFiles,
        generation: GenerationConfig,
        max_input_tokens: usize,
        seed: Option<u64>,
        intra_threads: usize,
    ) -> Result<Self> {
        generation.validate()?;
        let tokenizer = ChatTokenizer::from_file(&files.tokenizer)?;
        let model = OnnxSeq2Seq::load(&files.encoder, &files.decoder, intra_threads)?;
        Ok(Self::new(tokenizer, model, generation, max_input_tokens, seed))
    }
}

impl<M> ChatModel for Chatbot<M>
where
    M: Seq2SeqLm + Send,
{
    fn reply(&mut self, context: &str, utterance: &str) -> Result<String> {
        let input_ids = self
            .tokenizer
            .encode_pair(context, utterance, self.max_input_tokens)?;
        log::debug!("Encoded prompt into {} tokens", input_ids.len());

        let output = generate(&mut self.model, &input_ids, &self.generation, &mut self.rng)?;
        let text = self.tokenizer.decode(&output, true)?;
        Ok(text.trim().to_string())
    }
}
