//! Application server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ listener ──▶ [TLS acceptor] ──▶ axum handler ──▶ Router
//!                                                                   │
//!                                         worker thread ◀── dispatch┘
//!                                              │
//!                                        Context (handler)
//!                                              │
//!     Client ◀── hyper body ◀── channel ◀──────┘
//! ```
//!
//! Configuration comes from a TOML file (`--config`). A `[server.ssl]` or `[ssl]`
//! table switches the listener to HTTPS.

use std::io::Cursor;
use std::path::PathBuf;

use axum::http::StatusCode;
use clap::Parser;
use tokio::net::TcpListener;

use app_server::config::{self, LoadedConfig};
use app_server::context::{Charset, Cookie, Session};
use app_server::lifecycle::{shutdown_on_ctrl_c, Shutdown};
use app_server::observability::init_logging;
use app_server::{AppServer, Router, SslOptions};

#[derive(Parser)]
#[command(name = "app-server")]
#[command(about = "HTTP application server", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let loaded = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::parse_config("")?,
    };
    init_logging(&loaded.app.observability);

    tracing::info!("app-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %loaded.app.server.bind_address,
        context_path = %loaded.app.server.context_path,
        max_request_size = loaded.app.server.max_request_size,
        "Configuration loaded"
    );

    let server = build_server(&loaded)?;
    let listener = TcpListener::bind(&loaded.app.server.bind_address).await?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(shutdown_on_ctrl_c(shutdown));

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_server(loaded: &LoadedConfig) -> Result<AppServer, Box<dyn std::error::Error>> {
    let router = demo_routes(Router::from_config(&loaded.app.server));
    let server = AppServer::new(router, &loaded.app.server);

    match SslOptions::from_config(&loaded.tree)? {
        Some(options) => {
            tracing::info!(cert_type = %options, client_auth = %options.client_auth(), "TLS enabled");
            Ok(server.with_tls(&options)?)
        }
        None => Ok(server),
    }
}

fn demo_routes(router: Router) -> Router {
    router
        .get("/", |ctx| ctx.send_string("Hello from app-server\n"))
        .get("/hello", |ctx| {
            let name = ctx.query().get("name").unwrap_or("world").to_string();
            ctx.send_string(&format!("Hello, {}!\n", name))
        })
        .post("/echo", |ctx| {
            let body = ctx.body().clone();
            if let Some(content_type) = ctx.header_value("content-type").and_then(|v| v.parse().ok()) {
                ctx.set_response_type(content_type)?;
            }
            ctx.send(body)
        })
        .get("/download", |ctx| {
            let data: Vec<u8> = (0..1024u32).map(|i| (i % 256) as u8).collect();
            let length = data.len() as u64;
            ctx.send_stream(Cursor::new(data), Some(length))
        })
        .get("/stream", |ctx| {
            let mut writer = ctx.response_writer(Charset::Utf8)?;
            for i in 1..=5 {
                writer.write_str(&format!("line {}\n", i))?;
            }
            writer.finish();
            Ok(())
        })
        .get("/whoami", |ctx| {
            let certificates = ctx.client_certificates().map(|c| c.len()).unwrap_or(0);
            let body = serde_json::json!({
                "scheme": ctx.scheme(),
                "host": ctx.host(),
                "port": ctx.port(),
                "protocol": ctx.protocol(),
                "remote_address": ctx.remote_address(),
                "client_certificates": certificates,
            });
            ctx.set_response_type(mime::APPLICATION_JSON)?;
            ctx.send(body.to_string())
        })
        .get("/login", |ctx| {
            let user = ctx.query().get("user").unwrap_or("guest").to_string();
            let id = format!("{}-{}", user, ctx.remote_address());
            let mut session = Session::new(id.clone());
            session.put("user", user);
            ctx.set_session(session);
            ctx.set_response_cookie(Cookie::new("sid", id).with_http_only(true))?;
            ctx.on_complete(|ctx| {
                tracing::info!(path = %ctx.request_path(), "Login complete");
                Ok(())
            });
            ctx.send_status(StatusCode::NO_CONTENT)
        })
}
