//! `Exchange` over a hyper request.
//!
//! # Data Flow
//! ```text
//! axum handler (async)                     worker thread (sync)
//!     buffered body + Parts ─────────────▶ HyperExchange
//!     await head  ◀── oneshot ──────────── first write / end
//!     stream body ◀── bounded channel ──── write(chunk)
//!                                          end() drops the sender
//! ```
//!
//! # Design Decisions
//! - At most `BODY_CHANNEL_CAPACITY` chunks wait for the connection
//! - In blocking mode a write off the I/O thread waits for room; otherwise a full
//!   channel is reported as `WouldBlock`
//! - Blocking mode must only be entered from a thread that is not driving the
//!   runtime (the worker pool)
//! - A dropped receiver (client gone) surfaces as `BrokenPipe`
//! - TLS details arrive as a request extension set by the TLS acceptor

use std::io;
use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{request, HeaderMap, Method, Response, StatusCode, Version};
use bytes::Bytes;
use rustls::pki_types::CertificateDer;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::context::Exchange;
use crate::ssl::SslError;

/// Chunks queued ahead of the connection before writers wait.
pub const BODY_CHANNEL_CAPACITY: usize = 16;

/// Per-connection TLS facts, attached to every request on that connection.
#[derive(Debug, Clone, Default)]
pub struct TlsConnectionInfo {
    /// Chain the client presented, if any.
    pub peer_certificates: Option<Vec<CertificateDer<'static>>>,
}

pub struct HyperExchange {
    parts: request::Parts,
    body: Bytes,
    remote_addr: SocketAddr,
    tls: Option<TlsConnectionInfo>,

    status: StatusCode,
    headers: HeaderMap,
    head: Option<oneshot::Sender<Response<Body>>>,
    body_tx: Option<mpsc::Sender<Bytes>>,
    started: bool,

    blocking: bool,
    in_io_thread: bool,
}

impl HyperExchange {
    /// Wrap a buffered request. The receiver yields the response once the head is
    /// committed.
    pub fn new(
        parts: request::Parts,
        body: Bytes,
        remote_addr: SocketAddr,
    ) -> (Self, oneshot::Receiver<Response<Body>>) {
        let (head, response) = oneshot::channel();
        let tls = parts.extensions.get::<TlsConnectionInfo>().cloned();
        let exchange = Self {
            parts,
            body,
            remote_addr,
            tls,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            head: Some(head),
            body_tx: None,
            started: false,
            blocking: false,
            in_io_thread: true,
        };
        (exchange, response)
    }

    fn commit(&mut self, body: Body) -> io::Result<()> {
        let head = self
            .head
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "response head already sent"))?;
        self.started = true;

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        head.send(response)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "connection closed before response"))
    }

    fn open_body(&mut self) -> io::Result<()> {
        let (tx, rx) = mpsc::channel::<Bytes>(BODY_CHANNEL_CAPACITY);
        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (Ok::<_, io::Error>(chunk), rx))
        });
        self.body_tx = Some(tx);
        self.commit(Body::from_stream(stream))
    }
}

impl Exchange for HyperExchange {
    fn method(&self) -> &Method {
        &self.parts.method
    }

    fn request_path(&self) -> &str {
        self.parts.uri.path()
    }

    fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    fn request_headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    fn request_body(&self) -> &Bytes {
        &self.body
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    fn scheme(&self) -> &str {
        if self.tls.is_some() {
            "https"
        } else {
            "http"
        }
    }

    fn protocol(&self) -> Version {
        self.parts.version
    }

    fn peer_certificates(&self) -> Result<Vec<CertificateDer<'static>>, SslError> {
        let Some(tls) = &self.tls else {
            return Ok(Vec::new());
        };
        match &tls.peer_certificates {
            Some(chain) if !chain.is_empty() => Ok(chain.clone()),
            _ => Err(SslError::PeerUnverified("peer not authenticated".to_string())),
        }
    }

    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn response_headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn is_response_started(&self) -> bool {
        self.started
    }

    fn write(&mut self, chunk: Bytes) -> io::Result<()> {
        if !self.started {
            self.open_body()?;
        }
        let tx = self
            .body_tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "response already ended"))?;
        if self.blocking && !self.in_io_thread {
            return tx
                .blocking_send(chunk)
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"));
        }
        tx.try_send(chunk).map_err(|e| match e {
            TrySendError::Full(_) => io::Error::new(io::ErrorKind::WouldBlock, "response body queue is full"),
            TrySendError::Closed(_) => io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"),
        })
    }

    fn end(&mut self) {
        if !self.started {
            // Nothing was written: a plain response with an empty body.
            if let Err(e) = self.commit(Body::empty()) {
                tracing::debug!(error = %e, "Response dropped before it was sent");
            }
        }
        self.body_tx = None;
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn start_blocking(&mut self) {
        self.blocking = true;
    }

    fn is_in_io_thread(&self) -> bool {
        self.in_io_thread
    }

    fn leave_io_thread(&mut self) {
        self.in_io_thread = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn exchange(request: Request<()>) -> (HyperExchange, oneshot::Receiver<Response<Body>>) {
        let (parts, ()) = request.into_parts();
        HyperExchange::new(parts, Bytes::from_static(b"payload"), "10.1.2.3:4567".parse().unwrap())
    }

    #[tokio::test]
    async fn exposes_request_parts() {
        let request = Request::post("/app/items?sort=asc").header("x-a", "1").body(()).unwrap();
        let (ex, _rx) = exchange(request);

        assert_eq!(ex.method(), &Method::POST);
        assert_eq!(ex.request_path(), "/app/items");
        assert_eq!(ex.query_string(), Some("sort=asc"));
        assert_eq!(ex.request_headers()["x-a"], "1");
        assert_eq!(ex.request_body().as_ref(), b"payload");
        assert_eq!(ex.remote_addr().port(), 4567);
        assert_eq!(ex.scheme(), "http");
        assert!(ex.peer_certificates().unwrap().is_empty());
    }

    #[tokio::test]
    async fn streams_written_chunks() {
        let (mut ex, rx) = exchange(Request::get("/").body(()).unwrap());
        ex.set_status(StatusCode::CREATED);
        ex.write(Bytes::from_static(b"hello ")).unwrap();
        assert!(ex.is_response_started());
        ex.write(Bytes::from_static(b"world")).unwrap();
        ex.end();

        let response = rx.await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hello world");
    }

    #[tokio::test]
    async fn end_without_writes_sends_empty_response() {
        let (mut ex, rx) = exchange(Request::get("/").body(()).unwrap());
        ex.set_status(StatusCode::NO_CONTENT);
        ex.end();
        ex.end();

        let response = rx.await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn closed_connection_is_broken_pipe() {
        let (mut ex, rx) = exchange(Request::get("/").body(()).unwrap());
        drop(rx);
        let err = ex.write(Bytes::from_static(b"x")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    fn chunk() -> Bytes {
        Bytes::from(vec![b'x'; 16 * 1024])
    }

    #[test]
    fn full_queue_reports_would_block_outside_blocking_mode() {
        let (mut ex, _rx) = exchange(Request::get("/").body(()).unwrap());
        for _ in 0..BODY_CHANNEL_CAPACITY {
            ex.write(chunk()).unwrap();
        }
        let err = ex.write(chunk()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn blocking_writes_wait_for_the_connection() {
        let (mut ex, rx) = exchange(Request::get("/").body(()).unwrap());
        ex.leave_io_thread();
        ex.start_blocking();
        for _ in 0..BODY_CHANNEL_CAPACITY {
            ex.write(chunk()).unwrap();
        }
        let response = rx.blocking_recv().unwrap();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let writer = std::thread::spawn(move || {
            let result = ex.write(chunk());
            let _ = done_tx.send(());
            result
        });
        assert!(done_rx.recv_timeout(std::time::Duration::from_millis(200)).is_err());

        drop(response);
        let err = writer.join().unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn blocking_writes_flow_while_the_body_is_consumed() {
        let (mut ex, rx) = exchange(Request::get("/").body(()).unwrap());
        let total = BODY_CHANNEL_CAPACITY * 4;
        let writer = std::thread::spawn(move || {
            ex.leave_io_thread();
            ex.start_blocking();
            for _ in 0..total {
                ex.write(chunk())?;
            }
            ex.end();
            Ok::<_, io::Error>(())
        });

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let body = runtime.block_on(async move {
            let response = rx.await.unwrap();
            axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
        });
        writer.join().unwrap().unwrap();
        assert_eq!(body.len(), total * 16 * 1024);
    }

    #[tokio::test]
    async fn tls_extension_switches_scheme_and_certificates() {
        let mut request = Request::get("/").body(()).unwrap();
        request.extensions_mut().insert(TlsConnectionInfo::default());
        let (ex, _rx) = exchange(request);
        assert_eq!(ex.scheme(), "https");
        assert!(matches!(ex.peer_certificates(), Err(SslError::PeerUnverified(_))));

        let mut request = Request::get("/").body(()).unwrap();
        request.extensions_mut().insert(TlsConnectionInfo {
            peer_certificates: Some(vec![CertificateDer::from(vec![1u8, 2, 3])]),
        });
        let (ex, _rx) = exchange(request);
        assert_eq!(ex.peer_certificates().unwrap().len(), 1);
    }
}
