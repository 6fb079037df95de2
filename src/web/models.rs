use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use blender_chat_engine::ChatModel;

use super::config::ServerConfig;
use super::conversation::{ConversationHistory, SharedHistory};
use super::model_manager::ModelLoader;

// Request/Response structures
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

/// Exactly one of `response` / `error` is set; both keys are always serialized.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub response: Option<String>,
    pub error: Option<String>,
}

impl ChatResponse {
    pub fn reply(text: String) -> Self {
        Self { response: Some(text), error: None }
    }

    pub fn failure(message: String) -> Self {
        Self { response: None, error: Some(message) }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ReloadResponse {
    pub success: bool,
    pub message: String,
    pub model_loaded: bool,
}

pub type SharedModel = Arc<Mutex<Box<dyn ChatModel>>>;

/// Holds the loaded model, or nothing while loading failed.
///
/// Readers clone the inner `Arc` and release the slot lock right away, so
/// `/health` never waits behind a running generation.
#[derive(Default)]
pub struct ModelSlot {
    inner: RwLock<Option<SharedModel>>,
}

impl ModelSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<SharedModel> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn install(&self, model: Box<dyn ChatModel>) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::new(Mutex::new(model)));
    }
}

pub type SharedModelSlot = Arc<ModelSlot>;

/// Everything a handler needs, cloned into each service call.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub model: SharedModelSlot,
    pub history: SharedHistory,
    pub loader: Arc<dyn ModelLoader>,
}

impl AppState {
    pub fn new(config: ServerConfig, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            config: Arc::new(config),
            model: Arc::new(ModelSlot::empty()),
            history: Arc::new(Mutex::new(ConversationHistory::new())),
            loader,
        }
    }
}
