//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!     → logging.rs (subscriber: env filter + fmt layer)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - Lost connections log at debug, other I/O failures at error

pub mod logging;

pub use logging::{init_logging, log_filter};
