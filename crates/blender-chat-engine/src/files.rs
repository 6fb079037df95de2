use std::path::{Path, PathBuf};

use hf_hub::api::sync::Api;

use crate::error::{EngineError, Result};

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const ENCODER_FILE: &str = "encoder_model.onnx";
pub const DECODER_FILE: &str = "decoder_model.onnx";

/// Where to find the tokenizer and the two ONNX graphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A local directory, files at the top level or under `onnx/`.
    Local(PathBuf),
    /// A HuggingFace hub repository with the optimum export layout.
    Hub(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub tokenizer: PathBuf,
    pub encoder: PathBuf,
    pub decoder: PathBuf,
}

fn find_local(dir: &Path, name: &str) -> Result<PathBuf> {
    [dir.join(name), dir.join("onnx").join(name)]
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| EngineError::MissingFile(dir.join(name).display().to_string()))
}

impl ModelSource {
    /// Resolve every file, downloading into the hub cache when needed.
    pub fn resolve(&self) -> Result<ModelFiles> {
        match self {
            ModelSource::Local(dir) => Ok(ModelFiles {
                tokenizer: find_local(dir, TOKENIZER_FILE)?,
                encoder: find_local(dir, ENCODER_FILE)?,
                decoder: find_local(dir, DECODER_FILE)?,
            }),
            ModelSource::Hub(repo_id) => {
                let api = Api::new()?;
                let repo = api.model(repo_id.clone());
                log::info!("Fetching model files from {repo_id}");
                Ok(ModelFiles {
                    tokenizer: repo.get(TOKENIZER_FILE)?,
                    encoder: repo.get(&format!("onnx/{ENCODER_FILE}"))?,
                    decoder: repo.get(&format!("onnx/{DECODER_FILE}"))?,
                })
            }
        }
    }
}
