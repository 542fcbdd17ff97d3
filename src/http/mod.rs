//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection ──────────────┐
//! TLS connection               │
//!     → acceptor.rs (rustls handshake, record client certificates)
//!                              ▼
//!     → server.rs (axum, buffer body)
//!     → exchange.rs (HyperExchange: Exchange over hyper parts + body channel)
//!     → routing (Context dispatched to the worker)
//!     → response head via oneshot, body chunks via channel → client
//! ```

pub mod acceptor;
pub mod exchange;
pub mod server;

pub use acceptor::TlsInfoAcceptor;
pub use exchange::{HyperExchange, TlsConnectionInfo};
pub use server::AppServer;
