use std::time::Instant;

use blender_chat_engine::{ChatModel, Chatbot, EngineError};

use super::config::ServerConfig;
use super::models::{AppState, ModelSlot};

/// Produces a ready model or the reason it could not.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Box<dyn ChatModel>, EngineError>;
}

/// Loads the tokenizer and ONNX graphs named by a `ServerConfig`.
pub struct OnnxModelLoader {
    config: ServerConfig,
}

impl OnnxModelLoader {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self) -> Result<Box<dyn ChatModel>, EngineError> {
        let files = self.config.model_source().resolve()?;
        let chatbot = Chatbot::from_files(
            &files,
            self.config.generation.clone(),
            self.config.max_input_tokens,
            self.config.seed,
            self.config.intra_threads,
        )?;
        Ok(Box::new(chatbot))
    }
}

/// Run `loader` and store the result in `slot`. Failures are logged and
/// leave the slot as it was.
pub fn load_into(slot: &ModelSlot, loader: &dyn ModelLoader, model_name: &str) -> Result<(), EngineError> {
    log::info!("Loading model: {model_name}");
    let started = Instant::now();
    match loader.load() {
        Ok(model) => {
            slot.install(model);
            log::info!(
                "Model loaded successfully in {:.1}s",
                started.elapsed().as_secs_f32()
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Error loading model: {e}");
            Err(e)
        }
    }
}

/// Startup load: blocks until the model is ready or has failed. A failure
/// leaves the server running in degraded mode.
pub fn load_at_startup(state: &AppState) {
    if load_into(&state.model, state.loader.as_ref(), &state.config.model_name).is_err() {
        log::warn!("Model failed to load. API will return errors until model loads.");
    }
}
