use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HuggingFace hub error: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("ONNX runtime error: {0}")]
    Onnx(String),

    #[error("Model file not found: {0}")]
    MissingFile(String),

    #[error("Unexpected tensor shape: {0}")]
    Shape(String),

    #[error("Invalid generation config: {0}")]
    InvalidConfig(String),
}

// The tokenizers crate's error is a boxed trait object, so it is carried as text.
impl From<tokenizers::Error> for EngineError {
    fn from(err: tokenizers::Error) -> Self {
        EngineError::Tokenizer(err.to_string())
    }
}

/// ort's builder and run calls return slightly different error types between
/// releases; all of them display cleanly.
pub(crate) fn onnx_err(err: impl std::fmt::Display) -> EngineError {
    EngineError::Onnx(err.to_string())
}

pub type Result<T> = std::result::Result<T, EngineError>;
