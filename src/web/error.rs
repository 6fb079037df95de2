// Request-boundary error taxonomy for /chatbot

use hyper::StatusCode;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("Model is still loading. Please wait a moment and try again.")]
    ModelNotReady,

    #[error("Invalid request. Please provide a \"prompt\" field.")]
    InvalidRequestShape,

    #[error("Prompt cannot be empty.")]
    EmptyPrompt,

    #[error("Invalid JSON in request body.")]
    MalformedJson,

    #[error("Error processing your request: {0}")]
    Generation(String),
}

impl ChatError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatError::ModelNotReady => StatusCode::SERVICE_UNAVAILABLE,
            ChatError::InvalidRequestShape | ChatError::EmptyPrompt | ChatError::MalformedJson => {
                StatusCode::BAD_REQUEST
            }
            ChatError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<blender_chat_engine::EngineError> for ChatError {
    fn from(err: blender_chat_engine::EngineError) -> Self {
        ChatError::Generation(err.to_string())
    }
}
