//! In-memory exchange for unit tests.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Version};
use bytes::Bytes;
use rustls::pki_types::CertificateDer;

use crate::context::exchange::Exchange;
use crate::ssl::SslError;

#[derive(Debug)]
struct Recorded {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    end_calls: usize,
    blocking: bool,
    in_io_thread: bool,
    fail_writes: Option<io::ErrorKind>,
}

/// What the client would have received. Headers are captured when the response
/// head is committed.
#[derive(Debug, Clone)]
pub struct MockState {
    inner: Arc<Mutex<Recorded>>,
}

impl MockState {
    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self) -> StatusCode {
        self.lock().status
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.header_values(name).into_iter().next()
    }

    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.lock()
            .headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    pub fn body(&self) -> Vec<u8> {
        self.lock().body.clone()
    }

    pub fn ended(&self) -> bool {
        self.lock().end_calls > 0
    }

    pub fn end_calls(&self) -> usize {
        self.lock().end_calls
    }

    pub fn was_blocking(&self) -> bool {
        self.lock().blocking
    }

    pub fn in_io_thread(&self) -> bool {
        self.lock().in_io_thread
    }

    /// Make every following write fail with `kind`.
    pub fn fail_writes(&self, kind: io::ErrorKind) {
        self.lock().fail_writes = Some(kind);
    }
}

pub struct MockBuilder {
    method: Method,
    target: String,
    headers: HeaderMap,
    body: Bytes,
}

impl MockBuilder {
    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers
            .append(HeaderName::from_static(name), HeaderValue::from_static(value));
        self
    }

    pub fn build(self) -> (MockExchange, MockState) {
        let (path, query) = match self.target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (self.target, None),
        };
        let state = MockState {
            inner: Arc::new(Mutex::new(Recorded {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Vec::new(),
                end_calls: 0,
                blocking: false,
                in_io_thread: true,
                fail_writes: None,
            })),
        };
        let exchange = MockExchange {
            method: self.method,
            path,
            query,
            request_headers: self.headers,
            body: self.body,
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            started: false,
            blocking: false,
            in_io_thread: true,
            state: state.clone(),
        };
        (exchange, state)
    }
}

pub struct MockExchange {
    method: Method,
    path: String,
    query: Option<String>,
    request_headers: HeaderMap,
    body: Bytes,
    status: StatusCode,
    response_headers: HeaderMap,
    started: bool,
    blocking: bool,
    in_io_thread: bool,
    state: MockState,
}

impl MockExchange {
    pub fn get(target: &str) -> MockBuilder {
        MockBuilder {
            method: Method::GET,
            target: target.to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn post(target: &str, body: &'static str) -> MockBuilder {
        MockBuilder {
            method: Method::POST,
            target: target.to_string(),
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    fn commit(&mut self) {
        let mut recorded = self.state.lock();
        recorded.status = self.status;
        recorded.headers = self.response_headers.clone();
        self.started = true;
    }
}

impl Exchange for MockExchange {
    fn method(&self) -> &Method {
        &self.method
    }

    fn request_path(&self) -> &str {
        &self.path
    }

    fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    fn request_body(&self) -> &Bytes {
        &self.body
    }

    fn remote_addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 50000))
    }

    fn scheme(&self) -> &str {
        "http"
    }

    fn protocol(&self) -> Version {
        Version::HTTP_11
    }

    fn peer_certificates(&self) -> Result<Vec<CertificateDer<'static>>, SslError> {
        Ok(Vec::new())
    }

    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    fn is_response_started(&self) -> bool {
        self.started
    }

    fn write(&mut self, chunk: Bytes) -> io::Result<()> {
        if let Some(kind) = self.state.lock().fail_writes {
            return Err(io::Error::new(kind, "injected write failure"));
        }
        if !self.started {
            self.commit();
        }
        self.state.lock().body.extend_from_slice(&chunk);
        Ok(())
    }

    fn end(&mut self) {
        if !self.started {
            self.commit();
        }
        self.state.lock().end_calls += 1;
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn start_blocking(&mut self) {
        self.blocking = true;
        self.state.lock().blocking = true;
    }

    fn is_in_io_thread(&self) -> bool {
        self.in_io_thread
    }

    fn leave_io_thread(&mut self) {
        self.in_io_thread = false;
        self.state.lock().in_io_thread = false;
    }
}
