//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! server, gateway, and streaming sections. Every section defaults sensibly
//! so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Default chunk size used by transcoding workers when assembling output.
pub const DEFAULT_CHUNK_SIZE: u64 = 1_048_576;

/// Default number of chunk fetches kept in flight per request.
pub const DEFAULT_PREFETCH_WINDOW: usize = 8;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub streaming: StreamingConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string and reject unusable values.
    pub fn from_json(json_str: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))?;
        config.check()?;
        Ok(config)
    }

    /// Load configuration from a file, failing if it cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Hard errors: values the streaming engine cannot run with.
    fn check(&self) -> Result<()> {
        if self.streaming.chunk_size == 0 {
            return Err(Error::Validation("streaming.chunk_size must be > 0".into()));
        }
        if self.streaming.prefetch_window == 0 {
            return Err(Error::Validation(
                "streaming.prefetch_window must be >= 1".into(),
            ));
        }
        if self.streaming.max_ranges == 0 {
            return Err(Error::Validation("streaming.max_ranges must be >= 1".into()));
        }
        Ok(())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if !self.gateway.url.starts_with("http://") && !self.gateway.url.starts_with("https://")
        {
            warnings.push(format!(
                "gateway.url '{}' is not an http(s) URL",
                self.gateway.url
            ));
        }

        if self.gateway.request_timeout_secs == 0 {
            warnings.push("gateway.request_timeout_secs is 0; requests never time out".into());
        }

        if self.streaming.prefetch_window > 64 {
            warnings.push(format!(
                "streaming.prefetch_window {} buffers up to {} bytes per request",
                self.streaming.prefetch_window,
                self.streaming.prefetch_window as u64 * self.streaming.chunk_size
            ));
        }

        if self.streaming.chunk_size != DEFAULT_CHUNK_SIZE {
            warnings.push(format!(
                "streaming.chunk_size {} differs from the worker default {}; \
                 it must match the size chunks were assembled with",
                self.streaming.chunk_size, DEFAULT_CHUNK_SIZE
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            db_path: PathBuf::from("/data/shardcast.db"),
        }
    }
}

/// Content-addressable chunk store gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the gateway, e.g. `http://127.0.0.1:8080`.
    pub url: String,
    /// Path segment placed between the base URL and the CID.
    pub path_prefix: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".into(),
            path_prefix: "ipfs".into(),
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

/// Range streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Size of every chunk except possibly the last.
    pub chunk_size: u64,
    /// Maximum chunk fetches started but not yet written, per request.
    pub prefetch_window: usize,
    /// Maximum number of ranges accepted in one `Range` header.
    pub max_ranges: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            prefetch_window: DEFAULT_PREFETCH_WINDOW,
            max_ranges: 16,
        }
    }
}
