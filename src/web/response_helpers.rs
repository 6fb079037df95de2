// HTTP response helper functions to reduce duplication across route handlers

use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Body, Response, StatusCode};
use serde::Serialize;

/// Standard CORS headers
const CORS_ORIGIN: &str = "*";
const CORS_METHODS: &str = "GET, POST, OPTIONS";
const CORS_HEADERS: &str = "content-type";

fn with_cors(mut response: Response<Body>) -> Response<Body> {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(CORS_ORIGIN));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(CORS_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(CORS_HEADERS));
    response
}

fn build(status: StatusCode, content_type: &'static str, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    with_cors(response)
}

/// Build a JSON response with CORS headers
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    match serde_json::to_string(body) {
        Ok(json) => build(status, "application/json", Body::from(json)),
        Err(e) => {
            log::error!("Failed to serialize response: {e}");
            build(
                StatusCode::INTERNAL_SERVER_ERROR,
                "application/json",
                Body::from(r#"{"error":"Serialization failed"}"#),
            )
        }
    }
}

/// Build a JSON error response
pub fn json_error(status: StatusCode, message: &str) -> Response<Body> {
    json_response(status, &serde_json::json!({ "error": message }))
}

/// Create an HTML response with CORS headers
pub fn html_response(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    build(status, "text/html; charset=utf-8", body.into())
}

/// Static asset response with a long cache lifetime
pub fn asset_response(content_type: &'static str, body: Vec<u8>) -> Response<Body> {
    let mut response = build(StatusCode::OK, content_type, Body::from(body));
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600"));
    response
}

/// CORS preflight response
pub fn cors_preflight() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    with_cors(response)
}
