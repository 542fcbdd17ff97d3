//! Request context subsystem.
//!
//! # Data Flow
//! ```text
//! Transport (HyperExchange, or any Exchange impl)
//!     → adapter.rs (Context: cached request views, staged response)
//!     → handler code (possibly after dispatch to a worker)
//!     → send_* / response_stream → Exchange::write
//!     → teardown: completion.rs listeners → session.rs save → Exchange::end
//! ```
//!
//! # Design Decisions
//! - Transports implement a narrow capability trait (`Exchange`)
//! - Request views parse once and are shared by reference afterwards
//! - Response cookies are kept by name and re-emitted as a whole on each change

pub mod adapter;
pub mod charset;
pub mod completion;
pub mod cookie;
pub mod error;
pub mod exchange;
pub mod headers;
pub mod query;
pub mod range;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{Context, ResponseStream, ResponseWriter};
pub use charset::Charset;
pub use completion::CompletionListener;
pub use cookie::{Cookie, SameSite};
pub use error::{is_connection_lost, ContextError};
pub use exchange::{BlockingExecutor, Exchange, Executor, SameThreadExecutor, Task};
pub use headers::{CookieMap, Headers};
pub use query::{ParamMap, QueryString};
pub use range::ByteRange;
pub use session::{MemorySessionStore, Session, SessionStore, SESSION_ATTRIBUTE};
