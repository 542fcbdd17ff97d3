//! HTTP application server with configurable TLS and a transport-neutral request context.

pub mod config;
pub mod context;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod ssl;

pub use config::{AppConfig, LoadedConfig};
pub use context::{Context, ContextError};
pub use http::AppServer;
pub use lifecycle::Shutdown;
pub use routing::Router;
pub use ssl::{SslError, SslOptions};
