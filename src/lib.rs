//! HTTP front end for a BlenderBot chat model.
//!
//! The model itself lives in `blender_chat_engine`; this crate wires it to a
//! hyper server with a shared conversation history.

pub mod web;

pub use blender_chat_engine::{ChatModel, GenerationConfig};
pub use web::{AppState, ServerConfig};
