//! Errors raised while handling a request.

use std::io;

use axum::http::StatusCode;
use thiserror::Error;

use crate::ssl::SslError;

/// Errors surfaced to handler code by [`Context`](crate::context::Context) operations.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("response already started")]
    ResponseStarted,

    #[error("range not satisfiable: {range} (length {length})")]
    RangeNotSatisfiable { range: String, length: u64 },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("unsupported charset: {0}")]
    UnsupportedCharset(String),

    #[error("{0}")]
    Ssl(#[from] SslError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("handler failed: {0}")]
    Handler(String),
}

impl ContextError {
    /// Status code of the error response.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ContextError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            ContextError::BadRequest(_) | ContextError::UnsupportedCharset(_) => StatusCode::BAD_REQUEST,
            ContextError::Ssl(SslError::PeerUnverified(_)) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Whether `err` means the peer went away. These are expected and logged quietly.
pub fn is_connection_lost(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}
