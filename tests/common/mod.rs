//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::time::Duration;

use app_server::config::ServerConfig;
use app_server::lifecycle::Shutdown;
use app_server::{AppServer, Router, SslOptions};
use tokio::net::TcpListener;

/// A server running on an ephemeral port. Shuts down when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    scheme: &'static str,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start `router` on 127.0.0.1 with default settings.
pub async fn start_server(router: Router) -> TestServer {
    start_with(router, ServerConfig::default(), None).await
}

/// Start `router` over TLS.
#[allow(dead_code)]
pub async fn start_tls_server(router: Router, options: SslOptions) -> TestServer {
    start_with(router, ServerConfig::default(), Some(options)).await
}

pub async fn start_with(router: Router, config: ServerConfig, tls: Option<SslOptions>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut server = AppServer::new(router, &config);
    let scheme = match tls {
        Some(options) => {
            server = server.with_tls(&options).unwrap();
            "https"
        }
        None => "http",
    };

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    // Listener is already bound; give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer { addr, shutdown, scheme }
}

/// Client that accepts the bundled self-signed certificate.
#[allow(dead_code)]
pub fn insecure_client() -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
}
