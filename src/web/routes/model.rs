// Model management route handlers

use hyper::{Body, Response, StatusCode};
use std::convert::Infallible;
use tokio::task::spawn_blocking;

use crate::web::model_manager::load_into;
use crate::web::models::{AppState, ReloadResponse};
use crate::web::response_helpers::json_response;

pub async fn handle_post_model_reload(state: AppState) -> Result<Response<Body>, Infallible> {
    let worker_state = state.clone();
    let outcome = spawn_blocking(move || {
        load_into(
            &worker_state.model,
            worker_state.loader.as_ref(),
            &worker_state.config.model_name,
        )
        .map_err(|e| e.to_string())
    })
    .await
    .unwrap_or_else(|e| Err(format!("model load task failed: {e}")));

    let model_loaded = state.model.is_loaded();
    let (status, body) = match outcome {
        Ok(()) => (
            StatusCode::OK,
            ReloadResponse {
                success: true,
                message: format!("Model {} loaded", state.config.model_name),
                model_loaded,
            },
        ),
        Err(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ReloadResponse {
                success: false,
                message,
                model_loaded,
            },
        ),
    };
    Ok(json_response(status, &body))
}
