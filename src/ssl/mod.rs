//! TLS configuration subsystem.
//!
//! # Data Flow
//! ```text
//! ConfigTree (`server.ssl` or `ssl`)
//!     → options.rs (SslOptions: type, suppliers, passwords, clientAuth, protocols)
//!     → [server startup]
//!     → tls.rs (suppliers invoked, PEM/PKCS12 decoded, rustls::ServerConfig built)
//!
//! Certificate paths:
//!     resource.rs tries: path as given → working directory → embedded table
//! ```
//!
//! # Design Decisions
//! - Resource lookups are deferred: a missing file fails when the TLS engine is
//!   built, not while the configuration is parsed
//! - Each supplier call opens a fresh handle that is dropped right after reading
//! - The development certificate for `localhost` is compiled into the binary
//! - JKS keystores are not supported; PKCS12 or PEM only

pub mod builtin;
pub mod error;
pub mod options;
pub mod resource;
pub mod tls;

pub use error::SslError;
pub use options::{CertificateType, ClientAuth, PeerCertificateProvider, SslOptions, TLS_V1_2, TLS_V1_3};
pub use resource::{ResourceLoader, ResourceSupplier};
pub use tls::server_config;
