// Web server modules for BlenderBot Chat

pub mod config;
pub mod conversation;
pub mod error;
pub mod logger;
pub mod model_manager;
pub mod models;
pub mod request_parsing;
pub mod response_helpers;
pub mod routes;

// Re-export commonly used types
pub use config::{Cli, ConfigError, ServerConfig};
pub use conversation::{ConversationHistory, SharedHistory, DEFAULT_HISTORY_WINDOW};
pub use error::ChatError;
pub use model_manager::{load_at_startup, load_into, ModelLoader, OnnxModelLoader};
pub use models::{AppState, ModelSlot, SharedModel, SharedModelSlot};
pub use routes::handle_request;
