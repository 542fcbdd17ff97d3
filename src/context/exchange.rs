//! Transport capabilities consumed by [`Context`](crate::context::Context).
//!
//! # Responsibilities
//! - Describe the request/response primitives a concrete server must provide
//! - Describe how work is moved off the I/O thread
//!
//! # Design Decisions
//! - Synchronous trait: writes are handed to the connection task without awaiting;
//!   in blocking mode a write may park the worker until the connection catches up
//! - One exchange per request, owned by exactly one context
//! - The transport reports broken connections as `io::Error`; the context decides
//!   how loudly to log them

use std::io;
use std::net::SocketAddr;

use axum::http::{HeaderMap, Method, StatusCode, Version};
use bytes::Bytes;
use rustls::pki_types::CertificateDer;

use crate::ssl::SslError;

/// One request/response pair as seen by a concrete transport.
pub trait Exchange: Send {
    // Request side.
    fn method(&self) -> &Method;
    fn request_path(&self) -> &str;
    fn query_string(&self) -> Option<&str>;
    fn request_headers(&self) -> &HeaderMap;
    /// The buffered request body.
    fn request_body(&self) -> &Bytes;
    fn remote_addr(&self) -> SocketAddr;
    /// `"https"` when the connection is encrypted, `"http"` otherwise.
    fn scheme(&self) -> &str;
    fn protocol(&self) -> Version;
    /// Certificates the client presented during the TLS handshake.
    ///
    /// Fails with [`SslError::PeerUnverified`] on an encrypted connection whose peer
    /// sent none.
    fn peer_certificates(&self) -> Result<Vec<CertificateDer<'static>>, SslError>;

    // Response side.
    fn status(&self) -> StatusCode;
    fn set_status(&mut self, status: StatusCode);
    fn response_headers(&self) -> &HeaderMap;
    fn response_headers_mut(&mut self) -> &mut HeaderMap;
    /// True once the status line and headers went out.
    fn is_response_started(&self) -> bool;
    /// Send a body chunk. The first call commits status and headers.
    ///
    /// Outside blocking mode a transport that cannot take the chunk right away fails
    /// with `WouldBlock` instead of waiting.
    fn write(&mut self, chunk: Bytes) -> io::Result<()>;
    /// Finish the response and release the connection. Must be idempotent.
    fn end(&mut self);

    // Execution mode.
    fn is_blocking(&self) -> bool;
    fn start_blocking(&mut self);
    fn is_in_io_thread(&self) -> bool;
    /// Mark that processing continues away from the I/O thread.
    fn leave_io_thread(&mut self);
}

/// A unit of work handed to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks somewhere else.
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task);
}

/// Runs tasks on the tokio blocking pool, or inline when no runtime is around.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingExecutor;

impl Executor for BlockingExecutor {
    fn execute(&self, task: Task) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(task);
            }
            Err(_) => task(),
        }
    }
}

/// Runs tasks on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SameThreadExecutor;

impl Executor for SameThreadExecutor {
    fn execute(&self, task: Task) {
        task()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn same_thread_runs_inline() {
        let caller = std::thread::current().id();
        let (tx, rx) = mpsc::channel();
        SameThreadExecutor.execute(Box::new(move || tx.send(std::thread::current().id()).unwrap()));
        assert_eq!(rx.recv().unwrap(), caller);
    }

    #[test]
    fn blocking_without_runtime_runs_inline() {
        let (tx, rx) = mpsc::channel();
        BlockingExecutor.execute(Box::new(move || tx.send(42).unwrap()));
        assert_eq!(rx.try_recv().unwrap(), 42);
    }

    #[tokio::test]
    async fn blocking_uses_the_runtime_pool() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let caller = std::thread::current().id();
        BlockingExecutor.execute(Box::new(move || {
            let _ = tx.send(std::thread::current().id());
        }));
        assert_ne!(rx.await.unwrap(), caller);
    }
}
