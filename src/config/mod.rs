//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & parse once)
//!     → schema.rs (typed AppConfig, every field defaulted)
//!     → tree.rs (dotted-path lookups for optional sections such as `server.ssl`)
//!     → LoadedConfig (immutable, built once at startup)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All typed fields have defaults to allow minimal configs
//! - Sections with "either/or" shapes (string or list, optional nested tables) are read
//!   through `ConfigTree` instead of serde

pub mod loader;
pub mod schema;
pub mod tree;

pub use loader::{load_config, parse_config, ConfigError, LoadedConfig};
pub use schema::{AppConfig, ObservabilityConfig, ServerConfig};
pub use tree::ConfigTree;
