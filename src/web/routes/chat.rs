// Chat route handler

use hyper::{Body, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::PoisonError;
use std::time::Instant;
use tokio::task::spawn_blocking;

use crate::web::{
    error::ChatError,
    models::{AppState, ChatResponse},
    request_parsing::{parse_prompt, read_body},
    response_helpers::json_response,
};

pub async fn handle_post_chat(req: Request<Body>, state: AppState) -> Result<Response<Body>, Infallible> {
    match process_chat(req, &state).await {
        Ok(reply) => Ok(json_response(StatusCode::OK, &ChatResponse::reply(reply))),
        Err(e) => {
            match &e {
                ChatError::Generation(cause) => log::error!("Error processing request: {cause}"),
                other => log::warn!("[API_CHAT] Rejected request: {other}"),
            }
            Ok(json_response(e.status_code(), &ChatResponse::failure(e.to_string())))
        }
    }
}

async fn process_chat(req: Request<Body>, state: &AppState) -> Result<String, ChatError> {
    let model = state.model.current().ok_or(ChatError::ModelNotReady)?;

    let body = read_body(req.into_body()).await?;
    let prompt = parse_prompt(&body)?;

    let context = state
        .history
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .context(state.config.history_window);

    let started = Instant::now();
    let utterance = prompt.clone();
    let reply = spawn_blocking(move || {
        let mut model = model
            .lock()
            .map_err(|_| ChatError::Generation("model lock poisoned".to_string()))?;
        model.reply(&context, &utterance).map_err(ChatError::from)
    })
    .await
    .map_err(|e| ChatError::Generation(format!("generation task failed: {e}")))??;

    log::info!(
        "[API_CHAT] Generated {} chars in {} ms",
        reply.len(),
        started.elapsed().as_millis()
    );

    state
        .history
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .record_exchange(prompt, reply.clone());

    Ok(reply)
}
