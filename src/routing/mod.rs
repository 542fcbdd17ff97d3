//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Context (method, request path)
//!     → router.rs (strip context path, exact lookup)
//!     → matched: dispatch handler to worker executor
//!     → no match: 404
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - Exact matching only, no patterns in the hot path
//! - Deterministic: same input always matches same route

pub mod router;

pub use router::{Handler, Route, Router};
