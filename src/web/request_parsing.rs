// Request parsing utilities for HTTP handlers

use hyper::Body;
use serde_json::Value;

use super::error::ChatError;
use super::models::ChatRequest;

/// Read the whole request body.
///
/// A body that cannot be read counts as a missing body.
pub async fn read_body(body: Body) -> Result<hyper::body::Bytes, ChatError> {
    hyper::body::to_bytes(body).await.map_err(|e| {
        log::warn!("[REQUEST] Failed to read request body: {e}");
        ChatError::InvalidRequestShape
    })
}

/// Validate a `/chatbot` body and return the trimmed prompt.
///
/// Order: empty body, JSON syntax, shape (object with a string `prompt`),
/// then emptiness after trimming.
pub fn parse_prompt(body: &[u8]) -> Result<String, ChatError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ChatError::InvalidRequestShape);
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| {
        log::warn!("[REQUEST] JSON parsing error: {e}");
        ChatError::MalformedJson
    })?;

    if !value.is_object() {
        return Err(ChatError::InvalidRequestShape);
    }
    let request: ChatRequest =
        serde_json::from_value(value).map_err(|_| ChatError::InvalidRequestShape)?;

    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(ChatError::EmptyPrompt);
    }
    Ok(prompt.to_string())
}
