// Health check route handler

use hyper::{Body, Response, StatusCode};
use std::convert::Infallible;

use crate::web::models::{AppState, HealthResponse};
use crate::web::response_helpers::json_response;

pub async fn handle(state: AppState) -> Result<Response<Body>, Infallible> {
    let health = HealthResponse {
        status: "running".to_string(),
        model_loaded: state.model.is_loaded(),
        model_name: state.config.model_name.clone(),
    };
    Ok(json_response(StatusCode::OK, &health))
}
