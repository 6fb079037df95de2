//! Seq2seq chat generation: tokenizer, ONNX encoder/decoder, beam-sample search.

pub mod beam;
pub mod chatbot;
pub mod config;
pub mod error;
pub mod files;
pub mod generation;
pub mod logits;
pub mod onnx;
pub mod tokenizer;

pub use chatbot::{ChatModel, Chatbot};
pub use config::GenerationConfig;
pub use error::{EngineError, Result};
pub use files::{ModelFiles, ModelSource};
pub use generation::{generate, Seq2SeqLm};
pub use onnx::OnnxSeq2Seq;
pub use tokenizer::ChatTokenizer;
