//! The request context.
//!
//! # Responsibilities
//! - Lazily parse and cache headers, cookies, query and form parameters
//! - Stage the response (status, headers, cookies, content type) until the first byte
//! - Send bytes, text, streams and files, honoring `Range` for sized bodies
//! - Run teardown exactly once: listeners, session save, exchange release
//!
//! # State Machine
//! ```text
//! Created → Accessed (cached, repeatable) → Writing (headers mutable)
//!     → Started (headers frozen) → Completed
//! ```
//!
//! # Design Decisions
//! - The context owns its exchange; moving the context is the hand-off between threads
//! - Write failures after the response started are logged and end the exchange; they
//!   never reach handler code
//! - Dropping an unfinished context completes it, with a 500 if a panic is unwinding

use std::any::Any;
use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use indexmap::IndexMap;
use mime::Mime;
use rustls::pki_types::CertificateDer;

use crate::context::charset::Charset;
use crate::context::completion::{CompletionListener, CompletionListeners};
use crate::context::cookie::Cookie;
use crate::context::error::{is_connection_lost, ContextError};
use crate::context::exchange::{Exchange, Executor};
use crate::context::headers::{parse_cookies, CookieMap, Headers};
use crate::context::query::{ParamMap, QueryString};
use crate::context::range::ByteRange;
use crate::context::session::{Session, SESSION_ATTRIBUTE};
use crate::routing::{Route, Router};
use crate::ssl::SslError;

const BUFFER_SIZE: usize = 16 * 1024;

/// Per-request state over one [`Exchange`].
pub struct Context {
    exchange: Box<dyn Exchange>,
    router: Arc<Router>,
    route: Option<Arc<Route>>,

    method: Method,
    request_path: String,
    host: Option<String>,
    port: Option<u16>,
    scheme: Option<String>,
    remote_address: Option<String>,

    headers: OnceCell<Headers>,
    cookies: OnceCell<CookieMap>,
    query: OnceCell<QueryString>,
    form: OnceCell<ParamMap>,
    attributes: HashMap<String, Box<dyn Any + Send>>,

    response_type: Option<Mime>,
    response_charset: Option<Charset>,
    response_length: Option<u64>,
    response_cookies: IndexMap<String, String>,
    reset_headers_on_error: bool,

    completion: Option<CompletionListeners>,
    completed: bool,
}

impl Context {
    pub fn new(exchange: Box<dyn Exchange>, router: Arc<Router>) -> Self {
        let method = exchange.method().clone();
        let request_path = exchange.request_path().to_string();
        let reset_headers_on_error = router.reset_headers_on_error();
        Self {
            exchange,
            router,
            route: None,
            method,
            request_path,
            host: None,
            port: None,
            scheme: None,
            remote_address: None,
            headers: OnceCell::new(),
            cookies: OnceCell::new(),
            query: OnceCell::new(),
            form: OnceCell::new(),
            attributes: HashMap::new(),
            response_type: None,
            response_charset: None,
            response_length: None,
            response_cookies: IndexMap::new(),
            reset_headers_on_error,
            completion: None,
            completed: false,
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_deref()
    }

    pub fn set_route(&mut self, route: Arc<Route>) -> &mut Self {
        self.route = Some(route);
        self
    }

    // ---------------------------------------------------------------------
    // Request
    // ---------------------------------------------------------------------

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    /// Path as received, including the context path.
    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    pub fn set_request_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.request_path = path.into();
        self
    }

    pub fn context_path(&self) -> &str {
        self.router.context_path()
    }

    /// All request headers, parsed on first use.
    pub fn header(&self) -> &Headers {
        self.headers
            .get_or_init(|| Headers::from_map(self.exchange.request_headers()))
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.header().get(name)
    }

    /// Request cookies, parsed on first use.
    pub fn cookie_map(&self) -> &CookieMap {
        self.cookies
            .get_or_init(|| parse_cookies(self.exchange.request_headers()))
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookie_map().get(name).map(String::as_str)
    }

    /// Raw query string, without the `?`.
    pub fn query_string(&self) -> &str {
        self.query().raw()
    }

    pub fn query(&self) -> &QueryString {
        self.query
            .get_or_init(|| QueryString::parse(self.exchange.query_string().unwrap_or_default()))
    }

    /// URL-encoded form fields. Empty for any other content type.
    pub fn form(&self) -> &ParamMap {
        self.form.get_or_init(|| {
            let urlencoded = self
                .header_value("content-type")
                .and_then(|value| value.parse::<Mime>().ok())
                .is_some_and(|mime| mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str());
            if urlencoded {
                ParamMap::parse(self.exchange.request_body())
            } else {
                ParamMap::default()
            }
        })
    }

    pub fn body(&self) -> &Bytes {
        self.exchange.request_body()
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.exchange.request_body())
    }

    pub fn remote_address(&self) -> String {
        self.remote_address
            .clone()
            .unwrap_or_else(|| self.exchange.remote_addr().ip().to_string())
    }

    pub fn set_remote_address(&mut self, address: impl Into<String>) -> &mut Self {
        self.remote_address = Some(address.into());
        self
    }

    /// Host name from the override or the `Host` header, without the port.
    pub fn host(&self) -> String {
        if let Some(host) = &self.host {
            return host.clone();
        }
        self.header_value("host")
            .map(|value| split_host(value).0.to_string())
            .unwrap_or_else(|| "localhost".to_string())
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = Some(host.into());
        self
    }

    /// Port from the override, the `Host` header, or the scheme default.
    pub fn port(&self) -> u16 {
        if let Some(port) = self.port {
            return port;
        }
        self.header_value("host")
            .and_then(|value| split_host(value).1)
            .unwrap_or(if self.is_secure() { 443 } else { 80 })
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.port = Some(port);
        self
    }

    pub fn scheme(&self) -> &str {
        self.scheme.as_deref().unwrap_or_else(|| self.exchange.scheme())
    }

    pub fn set_scheme(&mut self, scheme: impl Into<String>) -> &mut Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn is_secure(&self) -> bool {
        self.scheme() == "https"
    }

    /// Protocol version, e.g. `HTTP/1.1`.
    pub fn protocol(&self) -> String {
        format!("{:?}", self.exchange.protocol())
    }

    /// Client certificates, filtered through the server's client-auth policy.
    pub fn client_certificates(&self) -> Result<Vec<CertificateDer<'static>>, SslError> {
        let exchange = &self.exchange;
        let provider = || exchange.peer_certificates();
        match self.router.ssl_options() {
            Some(options) => options.client_certificates(&provider),
            None => provider(),
        }
    }

    // ---------------------------------------------------------------------
    // Attributes and session
    // ---------------------------------------------------------------------

    pub fn attribute<T: Any>(&self, key: &str) -> Option<&T> {
        self.attributes.get(key).and_then(|value| value.downcast_ref::<T>())
    }

    pub fn attribute_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.attributes
            .get_mut(key)
            .and_then(|value| value.downcast_mut::<T>())
    }

    pub fn set_attribute<T: Any + Send>(&mut self, key: impl Into<String>, value: T) -> &mut Self {
        self.attributes.insert(key.into(), Box::new(value));
        self
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<Box<dyn Any + Send>> {
        self.attributes.remove(key)
    }

    pub fn session(&self) -> Option<&Session> {
        self.attribute::<Session>(SESSION_ATTRIBUTE)
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.attribute_mut::<Session>(SESSION_ATTRIBUTE)
    }

    pub fn set_session(&mut self, session: Session) -> &mut Self {
        self.set_attribute(SESSION_ATTRIBUTE, session)
    }

    // ---------------------------------------------------------------------
    // Response staging
    // ---------------------------------------------------------------------

    pub fn is_response_started(&self) -> bool {
        self.completed || self.exchange.is_response_started()
    }

    fn ensure_not_started(&self) -> Result<(), ContextError> {
        if self.is_response_started() {
            return Err(ContextError::ResponseStarted);
        }
        Ok(())
    }

    pub fn status(&self) -> StatusCode {
        self.exchange.status()
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<&mut Self, ContextError> {
        self.ensure_not_started()?;
        self.exchange.set_status(status);
        Ok(self)
    }

    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.exchange
            .response_headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    pub fn set_response_header(&mut self, name: &str, value: &str) -> Result<&mut Self, ContextError> {
        self.ensure_not_started()?;
        let name = HeaderName::try_from(name).map_err(|_| ContextError::InvalidHeader(name.to_string()))?;
        let value = HeaderValue::try_from(value).map_err(|_| ContextError::InvalidHeader(name.as_str().to_string()))?;
        if name == header::CONTENT_LENGTH {
            self.response_length = value.to_str().ok().and_then(|v| v.parse().ok());
        }
        self.exchange.response_headers_mut().insert(name, value);
        Ok(self)
    }

    pub fn remove_response_header(&mut self, name: &str) -> Result<&mut Self, ContextError> {
        self.ensure_not_started()?;
        if name.eq_ignore_ascii_case(header::CONTENT_LENGTH.as_str()) {
            self.response_length = None;
        }
        self.exchange.response_headers_mut().remove(name);
        Ok(self)
    }

    /// Drop every staged response header, including cookies.
    pub fn clear_response_headers(&mut self) -> Result<&mut Self, ContextError> {
        self.ensure_not_started()?;
        self.exchange.response_headers_mut().clear();
        self.response_cookies.clear();
        self.response_length = None;
        Ok(self)
    }

    /// Content type of the response. Defaults to `text/plain` until set.
    pub fn response_type(&self) -> Mime {
        self.response_type.clone().unwrap_or(mime::TEXT_PLAIN)
    }

    /// Set the content type. A `charset` parameter on `mime` is honored for text.
    pub fn set_response_type(&mut self, mime: Mime) -> Result<&mut Self, ContextError> {
        self.ensure_not_started()?;
        let charset = match mime.get_param(mime::CHARSET) {
            Some(name) => Some(name.as_str().parse::<Charset>()?),
            None => None,
        };
        self.response_type = Some(mime);
        self.response_charset = charset;
        Ok(self)
    }

    pub fn set_response_type_with_charset(&mut self, mime: Mime, charset: Charset) -> Result<&mut Self, ContextError> {
        self.set_response_type(mime)?;
        self.response_charset = Some(charset);
        Ok(self)
    }

    /// Set the content type only if nothing was set before.
    pub fn set_default_response_type(&mut self, mime: Mime) -> Result<&mut Self, ContextError> {
        if self.response_type.is_none() {
            self.set_response_type(mime)?;
        }
        Ok(self)
    }

    pub fn response_charset(&self) -> Charset {
        self.response_charset.unwrap_or_default()
    }

    pub fn response_length(&self) -> Option<u64> {
        self.response_length
    }

    pub fn set_response_length(&mut self, length: u64) -> Result<&mut Self, ContextError> {
        self.ensure_not_started()?;
        self.exchange
            .response_headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        self.response_length = Some(length);
        Ok(self)
    }

    /// Add or replace a response cookie.
    ///
    /// The cookie path defaults to the context path. Every call rewrites the whole
    /// `Set-Cookie` set, so a cookie name appears once.
    pub fn set_response_cookie(&mut self, mut cookie: Cookie) -> Result<&mut Self, ContextError> {
        self.ensure_not_started()?;
        cookie.validate()?;
        cookie.set_path_if_absent(self.router.context_path());
        let rendered = cookie.to_string();
        HeaderValue::try_from(rendered.as_str())
            .map_err(|_| ContextError::InvalidHeader(format!("Set-Cookie {}", cookie.name())))?;
        self.response_cookies.insert(cookie.name().to_string(), rendered);

        let headers = self.exchange.response_headers_mut();
        headers.remove(header::SET_COOKIE);
        for value in self.response_cookies.values() {
            if let Ok(value) = HeaderValue::try_from(value.as_str()) {
                headers.append(header::SET_COOKIE, value);
            }
        }
        Ok(self)
    }

    pub fn reset_headers_on_error(&self) -> bool {
        self.reset_headers_on_error
    }

    pub fn set_reset_headers_on_error(&mut self, reset: bool) -> &mut Self {
        self.reset_headers_on_error = reset;
        self
    }

    // ---------------------------------------------------------------------
    // Sending
    // ---------------------------------------------------------------------

    /// Send `data` and complete the response.
    pub fn send(&mut self, data: impl Into<Bytes>) -> Result<(), ContextError> {
        self.ensure_not_started()?;
        let data = data.into();
        self.set_default_response_type(mime::APPLICATION_OCTET_STREAM)?;
        self.prepare_headers(Some(data.len() as u64));
        if !data.is_empty() {
            if let Err(e) = self.exchange.write(data) {
                self.on_io_error(e);
                return Ok(());
            }
        }
        self.complete();
        Ok(())
    }

    /// Send text in the response charset (UTF-8 unless set).
    pub fn send_string(&mut self, text: &str) -> Result<(), ContextError> {
        let charset = self.response_charset();
        self.send_string_with(text, charset)
    }

    pub fn send_string_with(&mut self, text: &str, charset: Charset) -> Result<(), ContextError> {
        self.ensure_not_started()?;
        self.set_default_response_type(mime::TEXT_PLAIN)?;
        self.response_charset = Some(charset);
        self.send(charset.encode(text))
    }

    /// Copy `reader` to the response. With a known `length`, a `Range` request is
    /// answered with the requested slice only.
    pub fn send_stream<R: Read>(&mut self, mut reader: R, length: Option<u64>) -> Result<(), ContextError> {
        self.ensure_not_started()?;
        self.set_default_response_type(mime::APPLICATION_OCTET_STREAM)?;
        let length = match self.byte_range(length)? {
            Some(range) => {
                io::copy(&mut (&mut reader).take(range.start()), &mut io::sink())?;
                self.apply_range(&range);
                Some(range.len())
            }
            None => length,
        };
        self.write_body(reader.take(length.unwrap_or(u64::MAX)), length)
    }

    /// Send a file, honoring `Range`.
    pub fn send_file(&mut self, path: impl AsRef<Path>) -> Result<(), ContextError> {
        self.ensure_not_started()?;
        let mut file = File::open(path.as_ref())?;
        let total = file.metadata()?.len();
        self.set_default_response_type(mime::APPLICATION_OCTET_STREAM)?;
        let length = match self.byte_range(Some(total))? {
            Some(range) => {
                file.seek(SeekFrom::Start(range.start()))?;
                self.apply_range(&range);
                range.len()
            }
            None => total,
        };
        self.write_body(file.take(length), Some(length))
    }

    /// Send an empty response with `status`.
    pub fn send_status(&mut self, status: StatusCode) -> Result<(), ContextError> {
        self.ensure_not_started()?;
        self.exchange.set_status(status);
        self.exchange
            .response_headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(0u64));
        self.complete();
        Ok(())
    }

    /// Answer with an error page for `error`. Once the response started, the error is
    /// only logged and the exchange is ended.
    pub fn send_error(&mut self, error: &ContextError) {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!(method = %self.method, path = %self.request_path, error = %error, "Request failed");
        } else {
            tracing::debug!(method = %self.method, path = %self.request_path, status = status.as_u16(), error = %error, "Request rejected");
        }

        if self.is_response_started() {
            self.complete();
            return;
        }

        if self.reset_headers_on_error {
            self.exchange.response_headers_mut().clear();
            self.response_cookies.clear();
        }
        let headers = self.exchange.response_headers_mut();
        for stale in [header::CONTENT_LENGTH, header::TRANSFER_ENCODING, header::CONTENT_RANGE, header::CONTENT_TYPE] {
            headers.remove(stale);
        }
        self.response_length = None;
        if let ContextError::RangeNotSatisfiable { length, .. } = error {
            if let Ok(value) = HeaderValue::try_from(format!("bytes */{}", length)) {
                self.exchange.response_headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }
        self.exchange.set_status(status);
        self.response_type = Some(mime::TEXT_PLAIN);
        self.response_charset = Some(Charset::Utf8);

        let body = format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Error")
        );
        let _ = self.send(body.into_bytes());
    }

    /// A writer over the response body. The response completes when it is dropped.
    pub fn response_stream(&mut self) -> Result<ResponseStream<'_>, ContextError> {
        self.ensure_not_started()?;
        self.ensure_blocking();
        Ok(ResponseStream { ctx: self })
    }

    /// A text writer encoding with `charset`.
    pub fn response_writer(&mut self, charset: Charset) -> Result<ResponseWriter<'_>, ContextError> {
        self.set_default_response_type(mime::TEXT_PLAIN)?;
        self.response_charset = Some(charset);
        Ok(ResponseWriter {
            stream: self.response_stream()?,
            charset,
        })
    }

    fn byte_range(&self, length: Option<u64>) -> Result<Option<ByteRange>, ContextError> {
        ByteRange::parse(self.header_value("range"), length)
    }

    fn apply_range(&mut self, range: &ByteRange) {
        self.exchange.set_status(StatusCode::PARTIAL_CONTENT);
        let headers = self.exchange.response_headers_mut();
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        if let Ok(value) = HeaderValue::try_from(range.content_range()) {
            headers.insert(header::CONTENT_RANGE, value);
        }
    }

    fn ensure_blocking(&mut self) {
        if !self.exchange.is_blocking() {
            self.exchange.start_blocking();
        }
    }

    /// Final headers before the first byte: content type, then either a length or
    /// chunked framing.
    fn prepare_headers(&mut self, length: Option<u64>) {
        let content_type = self.content_type_header();
        let headers = self.exchange.response_headers_mut();
        if !headers.contains_key(header::CONTENT_TYPE) {
            if let Ok(value) = HeaderValue::try_from(content_type) {
                headers.insert(header::CONTENT_TYPE, value);
            }
        }
        if let Some(length) = length {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
            self.response_length = Some(length);
        }
        self.if_set_chunked();
    }

    fn content_type_header(&self) -> String {
        let mime = self.response_type();
        match self.response_charset {
            Some(charset) if mime.type_() == mime::TEXT || mime.get_param(mime::CHARSET).is_some() => {
                format!("{}; charset={}", mime.essence_str(), charset.name())
            }
            _ => mime.to_string(),
        }
    }

    fn if_set_chunked(&mut self) {
        let headers = self.exchange.response_headers_mut();
        if !headers.contains_key(header::CONTENT_LENGTH) {
            headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        }
    }

    fn write_body<R: Read>(&mut self, mut reader: R, length: Option<u64>) -> Result<(), ContextError> {
        self.ensure_blocking();
        self.prepare_headers(length);

        let mut buf = vec![0u8; BUFFER_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if !self.exchange.is_response_started() => return Err(e.into()),
                Err(e) => {
                    self.on_io_error(e);
                    return Ok(());
                }
            };
            if let Err(e) = self.exchange.write(Bytes::copy_from_slice(&buf[..n])) {
                self.on_io_error(e);
                return Ok(());
            }
        }
        self.complete();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Register a callback for when the response completes. Listeners run in
    /// registration order.
    pub fn on_complete<F>(&mut self, listener: F) -> &mut Self
    where
        F: FnOnce(&Context) -> Result<(), ContextError> + Send + 'static,
    {
        self.completion
            .get_or_insert_with(CompletionListeners::new)
            .push(Box::new(listener) as CompletionListener);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// True until the context is handed off the transport's I/O thread.
    pub fn is_in_io_thread(&self) -> bool {
        self.exchange.is_in_io_thread()
    }

    /// Continue on the router's worker executor.
    pub fn dispatch<F>(self, task: F)
    where
        F: FnOnce(&mut Context) -> Result<(), ContextError> + Send + 'static,
    {
        let worker = self.router.worker();
        self.dispatch_to(worker.as_ref(), task)
    }

    /// Continue on `executor`. Everything set on the context so far is visible to
    /// `task`.
    pub fn dispatch_to<F>(mut self, executor: &dyn Executor, task: F)
    where
        F: FnOnce(&mut Context) -> Result<(), ContextError> + Send + 'static,
    {
        self.exchange.leave_io_thread();
        executor.execute(Box::new(move || {
            let mut ctx = self;
            ctx.run(task);
        }));
    }

    /// Run handler code. An error becomes an error response; a handler that returns
    /// without sending completes with whatever was staged.
    pub fn run<F>(&mut self, task: F)
    where
        F: FnOnce(&mut Context) -> Result<(), ContextError>,
    {
        match task(self) {
            Ok(()) => self.complete(),
            Err(e) => self.send_error(&e),
        }
    }

    fn on_io_error(&mut self, error: io::Error) {
        if is_connection_lost(&error) {
            tracing::debug!(method = %self.method, path = %self.request_path, error = %error, "Connection lost");
        } else {
            tracing::error!(method = %self.method, path = %self.request_path, error = %error, "Response write failed");
        }
        self.complete();
    }

    /// Teardown. Runs once.
    fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;

        if let Some(listeners) = self.completion.take() {
            listeners.run(self);
        }
        self.save_session();
        self.exchange.end();
    }

    fn save_session(&self) {
        let Some(session) = self.session() else {
            return;
        };
        if !session.needs_save() {
            return;
        }
        if let Err(e) = self.router.session_store().save(session) {
            tracing::error!(session = %session.id(), error = %e, "Session save failed");
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if std::thread::panicking() && !self.exchange.is_response_started() {
            self.exchange.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
        self.complete();
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.method)
            .field("request_path", &self.request_path)
            .field("completed", &self.completed)
            .finish()
    }
}

/// Split `host[:port]`, tolerating bracketed IPv6 literals.
fn split_host(value: &str) -> (&str, Option<u16>) {
    let value = value.trim();
    if let Some(rest) = value.strip_prefix('[') {
        if let Some((addr, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (addr, port);
        }
    }
    match value.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => (host, port.parse().ok()),
        _ => (value, None),
    }
}

/// Body writer returned by [`Context::response_stream`].
///
/// Status and headers are committed on the first write. Dropping the stream (or
/// calling [`finish`](Self::finish)) completes the response.
pub struct ResponseStream<'a> {
    ctx: &'a mut Context,
}

impl ResponseStream<'_> {
    pub fn finish(self) {}
}

impl io::Write for ResponseStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.ctx.completed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "response already completed"));
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.ctx.exchange.is_response_started() {
            let length = self.ctx.response_length;
            self.ctx.prepare_headers(length);
        }
        match self.ctx.exchange.write(Bytes::copy_from_slice(buf)) {
            Ok(()) => Ok(buf.len()),
            Err(e) => {
                let surfaced = io::Error::new(e.kind(), e.to_string());
                self.ctx.on_io_error(e);
                Err(surfaced)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ResponseStream<'_> {
    fn drop(&mut self) {
        self.ctx.complete();
    }
}

/// Text writer returned by [`Context::response_writer`].
pub struct ResponseWriter<'a> {
    stream: ResponseStream<'a>,
    charset: Charset,
}

impl ResponseWriter<'_> {
    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        io::Write::write_all(&mut self.stream, &self.charset.encode(text))
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn finish(self) {}
}

impl std::fmt::Write for ResponseWriter<'_> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        ResponseWriter::write_str(self, s).map_err(|_| std::fmt::Error)
    }
}
