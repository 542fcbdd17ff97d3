//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store routes keyed by method and path
//! - Strip the context path before lookup
//! - Hand matched requests to the worker executor, answer the rest with 404
//! - Carry server-wide request settings (session store, TLS policy, error reset)
//!
//! # Design Decisions
//! - Immutable after construction (shared through `Arc` without locks)
//! - O(1) exact lookup via HashMap
//! - Explicit NoMatch rather than silent default

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::config::ServerConfig;
use crate::context::{BlockingExecutor, Context, ContextError, Executor, MemorySessionStore, SessionStore};
use crate::ssl::SslOptions;

/// Request handler.
pub type Handler = Arc<dyn Fn(&mut Context) -> Result<(), ContextError> + Send + Sync>;

/// A registered route.
pub struct Route {
    method: Method,
    path: String,
    handler: Handler,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the context path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish()
    }
}

/// Route table plus the settings every request context reads.
pub struct Router {
    context_path: String,
    routes: HashMap<(Method, String), Arc<Route>>,
    worker: Arc<dyn Executor>,
    session_store: Arc<dyn SessionStore>,
    ssl_options: Option<SslOptions>,
    reset_headers_on_error: bool,
}

impl Router {
    pub fn new() -> Self {
        Self {
            context_path: "/".to_string(),
            routes: HashMap::new(),
            worker: Arc::new(BlockingExecutor),
            session_store: Arc::new(MemorySessionStore::new()),
            ssl_options: None,
            reset_headers_on_error: true,
        }
    }

    /// Router with the context path and error policy from `config`.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new()
            .with_context_path(&config.context_path)
            .with_reset_headers_on_error(config.reset_headers_on_error)
    }

    pub fn with_context_path(mut self, context_path: &str) -> Self {
        let trimmed = context_path.trim().trim_end_matches('/');
        self.context_path = if trimmed.is_empty() {
            "/".to_string()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };
        self
    }

    pub fn with_worker(mut self, worker: Arc<dyn Executor>) -> Self {
        self.worker = worker;
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = store;
        self
    }

    /// Client-certificate policy applied by [`Context::client_certificates`].
    pub fn with_ssl_options(mut self, options: SslOptions) -> Self {
        self.ssl_options = Some(options);
        self
    }

    pub fn with_reset_headers_on_error(mut self, reset: bool) -> Self {
        self.reset_headers_on_error = reset;
        self
    }

    /// Register `handler` for `method` and `path` (relative to the context path).
    /// A later registration for the same pair replaces the earlier one.
    pub fn route<F>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Context) -> Result<(), ContextError> + Send + Sync + 'static,
    {
        let path = normalize(path);
        let route = Route {
            method: method.clone(),
            path: path.clone(),
            handler: Arc::new(handler),
        };
        if self.routes.insert((method, path), Arc::new(route)).is_some() {
            tracing::warn!("Route registered twice, keeping the latest");
        }
        self
    }

    pub fn get<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Context) -> Result<(), ContextError> + Send + Sync + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    pub fn post<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Context) -> Result<(), ContextError> + Send + Sync + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn worker(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.worker)
    }

    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.session_store
    }

    pub fn ssl_options(&self) -> Option<&SslOptions> {
        self.ssl_options.as_ref()
    }

    pub fn reset_headers_on_error(&self) -> bool {
        self.reset_headers_on_error
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route for a full request path.
    pub fn find(&self, method: &Method, request_path: &str) -> Option<Arc<Route>> {
        let relative = if self.context_path == "/" {
            request_path
        } else {
            let rest = request_path.strip_prefix(self.context_path.as_str())?;
            if !rest.is_empty() && !rest.starts_with('/') {
                // "/application" does not live under "/app"
                return None;
            }
            rest
        };
        self.routes
            .get(&(method.clone(), normalize(relative)))
            .cloned()
    }

    /// Route `ctx` and run its handler on the worker executor.
    pub fn handle(&self, mut ctx: Context) {
        match self.find(ctx.method(), ctx.request_path()) {
            Some(route) => {
                tracing::debug!(method = %route.method, path = %route.path, "Route matched");
                let handler = Arc::clone(&route.handler);
                ctx.set_route(route);
                ctx.dispatch(move |ctx| handler(ctx));
            }
            None => {
                tracing::debug!(method = %ctx.method(), path = %ctx.request_path(), "No route matched");
                if let Err(e) = ctx.send_status(StatusCode::NOT_FOUND) {
                    tracing::debug!(error = %e, "Could not send 404");
                }
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("context_path", &self.context_path)
            .field("routes", &self.routes.len())
            .field("tls", &self.ssl_options.is_some())
            .finish()
    }
}

/// "" and "/" are the same route; a trailing slash is ignored.
fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
