//! TLS acceptor that records the client's certificate chain.

use std::io;
use std::sync::Arc;

use axum_server::accept::Accept;
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::server::TlsStream;
use tower_http::add_extension::AddExtension;

use crate::http::exchange::TlsConnectionInfo;

/// Runs the rustls handshake, then tags every request on the connection with a
/// [`TlsConnectionInfo`].
#[derive(Clone)]
pub struct TlsInfoAcceptor {
    inner: RustlsAcceptor,
}

impl TlsInfoAcceptor {
    pub fn new(config: RustlsConfig) -> Self {
        Self {
            inner: RustlsAcceptor::new(config),
        }
    }

    pub fn from_server_config(config: rustls::ServerConfig) -> Self {
        Self::new(RustlsConfig::from_config(Arc::new(config)))
    }
}

impl<I, S> Accept<I, S> for TlsInfoAcceptor
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: Send + 'static,
{
    type Stream = TlsStream<I>;
    type Service = AddExtension<S, TlsConnectionInfo>;
    type Future = BoxFuture<'static, io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let acceptor = self.inner.clone();
        Box::pin(async move {
            let (stream, service) = acceptor.accept(stream, service).await?;
            let (_, session) = stream.get_ref();
            let info = TlsConnectionInfo {
                peer_certificates: session.peer_certificates().map(|chain| chain.to_vec()),
            };
            tracing::trace!(
                client_certificates = info.peer_certificates.as_ref().map_or(0, Vec::len),
                "TLS handshake complete"
            );
            Ok((stream, AddExtension::new(service, info)))
        })
    }
}
