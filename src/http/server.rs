//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum app with one catch-all handler
//! - Buffer the request body (bounded by `max_request_size`)
//! - Wrap each request in a `HyperExchange` + `Context` and hand it to the router
//! - Serve plain TCP through `axum::serve`, or TLS through `axum-server` + rustls
//! - Stop accepting on shutdown and drain in-flight requests

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::context::Context;
use crate::http::acceptor::TlsInfoAcceptor;
use crate::http::exchange::HyperExchange;
use crate::routing::Router;
use crate::ssl::{self, SslError, SslOptions};

/// How long TLS connections get to finish after shutdown is signalled.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into the handler.
#[derive(Clone)]
struct AppState {
    router: Arc<Router>,
    max_request_size: usize,
}

/// HTTP(S) front end for a [`Router`].
pub struct AppServer {
    router: Router,
    max_request_size: usize,
    tls: Option<rustls::ServerConfig>,
}

impl AppServer {
    pub fn new(router: Router, config: &ServerConfig) -> Self {
        Self {
            router,
            max_request_size: config.max_request_size,
            tls: None,
        }
    }

    /// Serve over TLS. Certificate material is loaded here, so a missing or broken
    /// file fails now rather than on the first connection.
    pub fn with_tls(mut self, options: &SslOptions) -> Result<Self, SslError> {
        self.tls = Some(ssl::server_config(options)?);
        self.router = self.router.with_ssl_options(options.clone());
        Ok(self)
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Run until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        let addr = listener.local_addr()?;
        let state = AppState {
            router: Arc::new(self.router),
            max_request_size: self.max_request_size,
        };
        let app = axum::Router::new()
            .fallback(handle_request)
            .with_state(state)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .into_make_service_with_connect_info::<SocketAddr>();

        match self.tls {
            None => {
                tracing::info!(address = %addr, tls = false, "HTTP server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await?;
            }
            Some(config) => {
                tracing::info!(address = %addr, tls = true, "HTTP server starting");
                let handle = axum_server::Handle::new();
                let drain = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
                });

                axum_server::from_tcp(listener.into_std()?)
                    .acceptor(TlsInfoAcceptor::from_server_config(config))
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!(address = %addr, "HTTP server stopped");
        Ok(())
    }
}

/// The one handler: every request goes through the router.
async fn handle_request(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_request_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                path = %parts.uri.path(),
                limit = state.max_request_size,
                error = %e,
                "Request body rejected"
            );
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let (exchange, response) = HyperExchange::new(parts, body, remote);
    let ctx = Context::new(Box::new(exchange), Arc::clone(&state.router));
    state.router.handle(ctx);

    match response.await {
        Ok(response) => response,
        Err(_) => {
            tracing::error!(remote = %remote, "Request finished without a response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
