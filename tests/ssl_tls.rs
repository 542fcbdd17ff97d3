//! HTTPS serving driven by `SslOptions`.

use app_server::config::parse_config;
use app_server::config::ServerConfig;
use app_server::ssl::{CertificateType, ClientAuth, ResourceSupplier, SslError, TLS_V1_2, TLS_V1_3};
use app_server::{AppServer, Router, SslOptions};
use axum::http::StatusCode;

mod common;

const LOCALHOST_CRT: &[u8] = include_bytes!("../resources/ssl/localhost.crt");

fn whoami_router() -> Router {
    Router::new().get("/whoami", |ctx| {
        let certificates = ctx.client_certificates()?.len();
        let body = format!("{} {} {}", ctx.scheme(), ctx.is_secure(), certificates);
        ctx.send_string(&body)
    })
}

#[tokio::test]
async fn test_self_signed_pkcs12_serves_https() {
    let server = common::start_tls_server(whoami_router(), SslOptions::self_signed()).await;
    let res = common::insecure_client()
        .get(server.url("/whoami"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "https true 0");
}

#[tokio::test]
async fn test_self_signed_from_config_file() {
    let loaded = parse_config(
        r#"
        [server.ssl]
        type = "self-signed"
        password = "ignored"
        protocol = "TLSv1.2"
        "#,
    )
    .unwrap();
    let options = SslOptions::from_config(&loaded.tree).unwrap().unwrap();
    assert_eq!(options.cert_type(), CertificateType::Pkcs12);
    assert_eq!(options.protocol(), [TLS_V1_2]);

    let server = common::start_tls_server(whoami_router(), options).await;
    let res = common::insecure_client()
        .get(server.url("/whoami"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "https true 0");
}

#[tokio::test]
async fn test_self_signed_x509_serves_https() {
    let options = SslOptions::self_signed_of("X509").unwrap();
    let server = common::start_tls_server(whoami_router(), options).await;
    let res = common::insecure_client()
        .get(server.url("/whoami"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_requested_client_auth_allows_anonymous_clients() {
    let mut options = SslOptions::self_signed();
    options
        .set_client_auth(ClientAuth::Requested)
        .set_trust_certificate(ResourceSupplier::from_static("localhost.crt", LOCALHOST_CRT));
    let server = common::start_tls_server(whoami_router(), options).await;

    let res = common::insecure_client()
        .get(server.url("/whoami"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "https true 0");
}

#[tokio::test]
async fn test_required_client_auth_rejects_anonymous_clients() {
    let mut options = SslOptions::self_signed();
    options
        .set_client_auth(ClientAuth::Required)
        .set_trust_certificate(ResourceSupplier::from_static("localhost.crt", LOCALHOST_CRT));
    let server = common::start_tls_server(whoami_router(), options).await;

    let result = common::insecure_client()
        .get(server.url("/whoami"))
        .send()
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_plain_http_against_tls_listener_fails() {
    let server = common::start_tls_server(whoami_router(), SslOptions::self_signed()).await;
    let result = reqwest::get(format!("http://{}/whoami", server.addr)).await;
    assert!(result.map(|r| r.status() != StatusCode::OK).unwrap_or(true));
}

#[test]
fn test_missing_certificate_fails_at_startup() {
    let server = AppServer::new(Router::new(), &ServerConfig::default());
    match server.with_tls(&SslOptions::pkcs12("certs/missing.p12", "secret")) {
        Err(SslError::ResourceNotFound(path)) => assert_eq!(path, "certs/missing.p12"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("server should not start without its certificate"),
    }
}

#[test]
fn test_pkcs12_config_defaults() {
    let loaded = parse_config(
        r#"
        [ssl]
        type = "PKCS12"
        cert = "a.p12"
        password = "secret"
        "#,
    )
    .unwrap();
    let options = SslOptions::from_config(&loaded.tree).unwrap().unwrap();

    assert_eq!(options.cert_type(), CertificateType::Pkcs12);
    assert_eq!(options.client_auth(), ClientAuth::None);
    assert_eq!(options.protocol(), [TLS_V1_3, TLS_V1_2]);
    assert_eq!(options.password(), Some("secret"));
}

#[test]
fn test_unknown_client_auth_is_a_configuration_error() {
    let loaded = parse_config(
        r#"
        [ssl]
        cert = "a.p12"
        password = "secret"
        clientAuth = "sometimes"
        "#,
    )
    .unwrap();
    assert!(matches!(
        SslOptions::from_config(&loaded.tree),
        Err(SslError::Configuration(_))
    ));
}
