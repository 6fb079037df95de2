// Route handler modules

pub mod chat;
pub mod health;
pub mod model;
pub mod static_files;

use hyper::{Body, Method, Request, Response, StatusCode};
use std::convert::Infallible;

use super::models::AppState;
use super::response_helpers::{cors_preflight, json_error};

/// Dispatch one request. Every branch produces a response; nothing here fails.
pub async fn handle_request(req: Request<Body>, state: AppState) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    log::debug!("{method} {path}");

    match (&method, path.as_str()) {
        (&Method::GET, "/") => static_files::handle_index(state).await,
        (&Method::GET, p) if p.starts_with("/static/") => {
            static_files::handle_static_asset(&p["/static/".len()..], state).await
        }
        (&Method::POST, "/chatbot") => chat::handle_post_chat(req, state).await,
        (&Method::GET, "/health") => health::handle(state).await,
        (&Method::POST, "/model/reload") => model::handle_post_model_reload(state).await,
        (&Method::OPTIONS, _) => Ok(cors_preflight()),
        _ => Ok(json_error(StatusCode::NOT_FOUND, "Not Found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::config::ServerConfig;
    use crate::web::model_manager::ModelLoader;
    use crate::web::models::{HealthResponse, ReloadResponse};
    use blender_chat_engine::{ChatModel, EngineError};
    use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct Canned(&'static str);

    impl ChatModel for Canned {
        fn reply(&mut self, _: &str, _: &str) -> blender_chat_engine::Result<String> {
            Ok(self.0.to_string())
        }
    }

    /// Fails until `ready` is flipped, then hands out a canned model.
    struct Toggle {
        ready: AtomicBool,
    }

    impl ModelLoader for Toggle {
        fn load(&self) -> Result<Box<dyn ChatModel>, EngineError> {
            if self.ready.load(Ordering::SeqCst) {
                Ok(Box::new(Canned("fresh")))
            } else {
                Err(EngineError::MissingFile("decoder_model.onnx".into()))
            }
        }
    }

    fn state(static_dir: &std::path::Path) -> (AppState, Arc<Toggle>) {
        let loader = Arc::new(Toggle { ready: AtomicBool::new(false) });
        let config = ServerConfig {
            static_dir: static_dir.to_path_buf(),
            ..Default::default()
        };
        (AppState::new(config, loader.clone()), loader)
    }

    async fn send(state: &AppState, method: Method, uri: &str, body: &str) -> (StatusCode, Response<Body>) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_owned()))
            .unwrap();
        let response = handle_request(req, state.clone()).await.unwrap();
        (response.status(), response)
    }

    async fn json(response: Response<Body>) -> Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_load_state() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state(dir.path());

        let (status, response) = send(&state, Method::GET, "/health", "").await;
        assert_eq!(status, StatusCode::OK);
        let health: HealthResponse = serde_json::from_value(json(response).await).unwrap();
        assert_eq!(
            health,
            HealthResponse {
                status: "running".into(),
                model_loaded: false,
                model_name: "facebook/blenderbot-400M-distill".into(),
            }
        );

        state.model.install(Box::new(Canned("hi")));
        let (_, response) = send(&state, Method::GET, "/health", "").await;
        assert_eq!(json(response).await["model_loaded"], true);
    }

    #[tokio::test]
    async fn test_chat_through_router() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state(dir.path());

        let (status, _) = send(&state, Method::POST, "/chatbot", r#"{"prompt":"hi"}"#).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        state.model.install(Box::new(Canned("hello there")));
        let (status, response) = send(&state, Method::POST, "/chatbot", r#"{"prompt":"hi"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            json(response).await,
            serde_json::json!({"response": "hello there", "error": null})
        );
        assert_eq!(state.history.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reload_failure_then_success() {
        let dir = tempfile::tempdir().unwrap();
        let (state, loader) = state(dir.path());

        let (status, response) = send(&state, Method::POST, "/model/reload", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: ReloadResponse = serde_json::from_value(json(response).await).unwrap();
        assert!(!body.success);
        assert!(!body.model_loaded);
        assert!(body.message.contains("decoder_model.onnx"));

        loader.ready.store(true, Ordering::SeqCst);
        let (status, response) = send(&state, Method::POST, "/model/reload", "").await;
        assert_eq!(status, StatusCode::OK);
        let body: ReloadResponse = serde_json::from_value(json(response).await).unwrap();
        assert!(body.success);
        assert!(body.model_loaded);

        let (_, response) = send(&state, Method::POST, "/chatbot", r#"{"prompt":"hi"}"#).await;
        assert_eq!(json(response).await["response"], "fresh");
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_serving() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state(dir.path());
        state.model.install(Box::new(Canned("old")));

        let (status, response) = send(&state, Method::POST, "/model/reload", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(response).await["model_loaded"], true);

        let (_, response) = send(&state, Method::POST, "/chatbot", r#"{"prompt":"hi"}"#).await;
        assert_eq!(json(response).await["response"], "old");
    }

    #[tokio::test]
    async fn test_index_falls_back_to_builtin_page() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state(dir.path());

        let (status, response) = send(&state, Method::GET, "/", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/chatbot"));
    }

    #[tokio::test]
    async fn test_index_and_assets_from_static_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<p>custom</p>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        let (state, _) = state(dir.path());

        let (_, response) = send(&state, Method::GET, "/", "").await;
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&bytes[..], b"<p>custom</p>");

        let (status, response) = send(&state, Method::GET, "/static/app.js", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/javascript");

        let (status, _) = send(&state, Method::GET, "/static/missing.css", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_parent_segments_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().join("static");
        std::fs::create_dir(&static_dir).unwrap();
        std::fs::write(dir.path().join("secret.txt"), "no").unwrap();
        let (state, _) = state(&static_dir);

        let (status, _) = send(&state, Method::GET, "/static/../secret.txt", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_absolute_asset_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().join("static");
        std::fs::create_dir(&static_dir).unwrap();
        let secret = dir.path().join("secret.txt");
        std::fs::write(&secret, "no").unwrap();
        let (state, _) = state(&static_dir);

        // `//` keeps the leading slash, so the remainder is an absolute path.
        let uri = format!("/static/{}", secret.display());
        assert!(uri.starts_with("/static//"));
        let (status, response) = send(&state, Method::GET, &uri, "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(response).await, serde_json::json!({"error": "Not Found"}));

        let (status, _) = send(&state, Method::GET, "/static/./index.html", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_and_preflight() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state(dir.path());

        let (status, response) = send(&state, Method::GET, "/nope", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(response).await, serde_json::json!({"error": "Not Found"}));

        let (status, _) = send(&state, Method::GET, "/chatbot", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, response) = send(&state, Method::OPTIONS, "/chatbot", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
