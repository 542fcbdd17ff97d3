//! Configuration loading from disk.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::tree::ConfigTree;

/// Error type for configuration loading and lookups.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Missing(String),
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    Invalid {
        path: String,
        reason: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Missing(path) => write!(f, "Missing required key: {}", path),
            ConfigError::WrongType { path, expected, found } => {
                write!(f, "Key {} has type {}, expected {}", path, found, expected)
            }
            ConfigError::Invalid { path, reason } => write!(f, "Invalid value for {}: {}", path, reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

/// A parsed configuration file: the typed settings plus the raw tree.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub app: AppConfig,
    pub tree: ConfigTree,
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let loaded = parse_config(&content)?;

    tracing::debug!(path = %path.display(), "Configuration file parsed");
    Ok(loaded)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<LoadedConfig, ConfigError> {
    let tree = ConfigTree::parse(content)?;
    let mut app: AppConfig = toml::Value::Table(tree.root().clone())
        .try_into()
        .map_err(ConfigError::Parse)?;

    validate(&mut app)?;

    Ok(LoadedConfig { app, tree })
}

fn validate(app: &mut AppConfig) -> Result<(), ConfigError> {
    app.server
        .bind_address
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::Invalid {
            path: "server.bind_address".to_string(),
            reason: e.to_string(),
        })?;

    let context_path = app.server.context_path.trim();
    if !context_path.starts_with('/') {
        return Err(ConfigError::Invalid {
            path: "server.context_path".to_string(),
            reason: format!("must start with '/': {}", context_path),
        });
    }
    // "/app/" and "/app" address the same routes
    let normalized = match context_path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    app.server.context_path = normalized.to_string();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let loaded = parse_config("").unwrap();
        assert_eq!(loaded.app.server.bind_address, "127.0.0.1:8080");
        assert_eq!(loaded.app.server.context_path, "/");
        assert_eq!(loaded.app.observability.log_level, "info");
        assert!(loaded.app.server.reset_headers_on_error);
    }

    #[test]
    fn ssl_section_is_left_to_the_tree() {
        let loaded = parse_config(
            r#"
            [server]
            bind_address = "0.0.0.0:8443"
            context_path = "/app/"

            [server.ssl]
            type = "self-signed"
            "#,
        )
        .unwrap();
        assert_eq!(loaded.app.server.bind_address, "0.0.0.0:8443");
        assert_eq!(loaded.app.server.context_path, "/app");
        assert_eq!(loaded.tree.get_string("server.ssl.type").unwrap(), "self-signed");
    }

    #[test]
    fn rejects_bad_bind_address() {
        let err = parse_config("[server]\nbind_address = \"nowhere\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref path, .. } if path == "server.bind_address"));
    }

    #[test]
    fn rejects_relative_context_path() {
        let err = parse_config("[server]\ncontext_path = \"app\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn reports_syntax_errors() {
        assert!(matches!(parse_config("[server"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
