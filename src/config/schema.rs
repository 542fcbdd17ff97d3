//! Configuration schema definitions.
//!
//! Typed view of the settings the server needs at startup. All types derive Serde traits
//! and default every field, so an empty file is a valid configuration. The `ssl` section
//! is intentionally absent here: it is resolved from the raw tree by `SslOptions`.

use serde::{Deserialize, Serialize};

/// Root configuration for the application server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and request handling settings.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path prefix every route lives under. Response cookies default to it.
    pub context_path: String,

    /// Maximum request body size buffered before the handler runs, in bytes.
    pub max_request_size: usize,

    /// Clear response headers before writing an error response.
    pub reset_headers_on_error: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            context_path: "/".to_string(),
            max_request_size: 10 * 1024 * 1024, // 10MB
            reset_headers_on_error: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
