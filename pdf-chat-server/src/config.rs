use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use pdf_chat_rag::gemini::{
    DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
};
use pdf_chat_rag::{RagConfig, RetryConfig};
use thiserror::Error;

/// Errors raised while reading the server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid bind address '{0}'")]
    BindAddr(String),

    #[error("invalid pipeline settings: {0}")]
    Pipeline(#[from] pdf_chat_rag::RagError),
}

/// Gemini endpoint and model selection.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub chat_model: String,
}

/// Everything the server needs at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to listen on
    pub bind_addr: String,
    pub port: u16,
    pub gemini: GeminiSettings,
    /// Qdrant gRPC endpoint
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    /// Chunking, retrieval and call policy for both pipelines
    pub rag: RagConfig,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
    /// Where uploads are spooled while being parsed; system temp dir when unset
    pub upload_tmp_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub const DEFAULT_PORT: u16 = 3000;
    pub const DEFAULT_QDRANT_URL: &'static str = "http://localhost:6334";
    pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

    /// Read the configuration from process environment variables.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to
    /// its value. Unparseable numbers fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = var("GEMINI_API_KEY").ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;
        let gemini = GeminiSettings {
            api_key,
            base_url: var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            embedding_model: var("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dim: parse_or(var("EMBEDDING_DIM"), DEFAULT_EMBEDDING_DIMENSIONS),
            chat_model: var("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
        };

        let defaults = RagConfig::default();
        let retry_defaults = RetryConfig::default();
        let retry = RetryConfig {
            enabled: parse_or(var("RETRY_ENABLED"), retry_defaults.enabled),
            max_attempts: parse_or(var("RETRY_MAX_ATTEMPTS"), retry_defaults.max_attempts),
            initial_backoff_ms: parse_or(
                var("RETRY_BACKOFF_MS"),
                retry_defaults.initial_backoff_ms,
            ),
        };
        let rag = RagConfig::builder()
            .chunk_size(parse_or(var("CHUNK_SIZE"), defaults.chunk_size))
            .chunk_overlap(parse_or(var("CHUNK_OVERLAP"), defaults.chunk_overlap))
            .top_k(parse_or(var("TOP_K"), defaults.top_k))
            .timeout_secs(parse_or(var("REQUEST_TIMEOUT_SECS"), defaults.call.timeout_secs))
            .retry(retry)
            .build()?;

        let config = Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(var("PORT"), Self::DEFAULT_PORT),
            gemini,
            qdrant_url: var("QDRANT_URL").unwrap_or_else(|| Self::DEFAULT_QDRANT_URL.to_string()),
            qdrant_api_key: var("QDRANT_API_KEY"),
            rag,
            max_upload_bytes: parse_or(var("MAX_UPLOAD_BYTES"), Self::DEFAULT_MAX_UPLOAD_BYTES),
            upload_tmp_dir: var("UPLOAD_TMP_DIR").map(PathBuf::from),
        };
        config.socket_addr()?;
        Ok(config)
    }

    /// Read the configuration from a fixed set of variables.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// The address the listener binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_addr, self.port);
        addr.parse().map_err(|_| ConfigError::BindAddr(addr))
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
