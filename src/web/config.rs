use std::fs;
use std::path::{Path, PathBuf};

use blender_chat_engine::{GenerationConfig, ModelSource};
use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::conversation::DEFAULT_HISTORY_WINDOW;

pub const DEFAULT_MODEL_NAME: &str = "facebook/blenderbot-400M-distill";
pub const DEFAULT_WEIGHTS_REPO: &str = "Xenova/blenderbot-400M-distill";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}

// Configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Reported by /health.
    pub model_name: String,
    /// Hub repo holding the ONNX export of `model_name`.
    pub weights_repo: String,
    /// Local directory that replaces the hub download when set.
    pub model_dir: Option<PathBuf>,
    pub static_dir: PathBuf,
    /// Console only when unset.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub history_window: usize,
    pub max_input_tokens: usize,
    pub generation: GenerationConfig,
    /// Fixed sampling seed; entropy-seeded when unset.
    pub seed: Option<u64>,
    pub intra_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            weights_repo: DEFAULT_WEIGHTS_REPO.to_string(),
            model_dir: None,
            static_dir: PathBuf::from("static"),
            log_dir: None,
            log_level: "info".to_string(),
            history_window: DEFAULT_HISTORY_WINDOW,
            max_input_tokens: 256,
            generation: GenerationConfig::default(),
            seed: None,
            intra_threads: 4,
        }
    }
}

/// Command line flags for `blender_chat_web`.
#[derive(Debug, Default, Parser)]
#[command(name = "blender_chat_web", about = "BlenderBot chat server")]
pub struct Cli {
    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Directory with tokenizer.json and the ONNX graphs
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    #[arg(long)]
    pub log_level: Option<String>,
}

impl ServerConfig {
    /// Defaults, overlaid with the file at `path` when one is given.
    pub fn from_file(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `BLENDER_CHAT_*` overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("BLENDER_CHAT_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("BLENDER_CHAT_PORT") {
            self.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "BLENDER_CHAT_PORT".to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(dir) = lookup("BLENDER_CHAT_MODEL_DIR") {
            self.model_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup("BLENDER_CHAT_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(dir) = &cli.model_dir {
            self.model_dir = Some(dir.clone());
        }
        if let Some(level) = &cli.log_level {
            self.log_level = level.clone();
        }
    }

    /// File, then environment, then flags.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(cli.config.as_deref())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_cli(cli);
        Ok(config)
    }

    pub fn model_source(&self) -> ModelSource {
        match &self.model_dir {
            Some(dir) => ModelSource::Local(dir.clone()),
            None => ModelSource::Hub(self.weights_repo.clone()),
        }
    }
}
