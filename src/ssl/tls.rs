//! TLS engine configuration.
//!
//! Turns [`SslOptions`] into a `rustls::ServerConfig`. This is the point where the
//! certificate suppliers are finally opened, so unresolvable paths fail here.

use std::sync::Arc;

use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig, SupportedProtocolVersion};

use crate::ssl::error::SslError;
use crate::ssl::options::{CertificateType, ClientAuth, SslOptions};
use crate::ssl::resource::ResourceSupplier;

type Identity = (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>);

/// Build the server-side TLS configuration.
pub fn server_config(options: &SslOptions) -> Result<ServerConfig, SslError> {
    options.validate()?;

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let versions = protocol_versions(options.protocol())?;
    let (chain, key) = load_identity(options)?;

    let builder = ServerConfig::builder_with_provider(Arc::clone(&provider)).with_protocol_versions(&versions)?;
    let builder = match options.client_auth() {
        ClientAuth::None => builder.with_no_client_auth(),
        mode => builder.with_client_cert_verifier(client_verifier(options, mode, provider)?),
    };

    let mut config = builder.with_single_cert(chain, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    tracing::info!(
        cert_type = %options.cert_type(),
        client_auth = %options.client_auth(),
        protocol = ?options.protocol(),
        "TLS engine configured"
    );
    Ok(config)
}

/// Map protocol names onto the versions the engine implements.
fn protocol_versions(names: &[String]) -> Result<Vec<&'static SupportedProtocolVersion>, SslError> {
    let mut versions: Vec<&'static SupportedProtocolVersion> = Vec::new();
    for name in names {
        let version = match name.to_ascii_uppercase().as_str() {
            "TLSV1.3" => &rustls::version::TLS13,
            "TLSV1.2" => &rustls::version::TLS12,
            _ => {
                tracing::warn!(protocol = %name, "TLS protocol not supported, skipping");
                continue;
            }
        };
        if !versions.iter().any(|known| known.version == version.version) {
            versions.push(version);
        }
    }

    if versions.is_empty() {
        return Err(SslError::Configuration(format!(
            "none of the protocols {:?} is supported",
            names
        )));
    }
    Ok(versions)
}

fn load_identity(options: &SslOptions) -> Result<Identity, SslError> {
    let certificate = options
        .certificate()
        .ok_or_else(|| SslError::Configuration("missing certificate".to_string()))?;

    match options.cert_type() {
        CertificateType::X509 => {
            let chain = pem_certificates(&certificate.read_all()?, certificate)?;
            let key_source = options
                .private_key()
                .ok_or_else(|| SslError::Configuration("X509 requires a private key".to_string()))?;
            let key_pem = key_source.read_all()?;
            let key = match options.password() {
                Some(password) => {
                    let key = PKey::private_key_from_pem_passphrase(&key_pem, password.as_bytes())?;
                    PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.private_key_to_pkcs8()?))
                }
                None => rustls_pemfile::private_key(&mut key_pem.as_slice())?.ok_or_else(|| {
                    SslError::Configuration(format!("no private key found in {}", key_source.description()))
                })?,
            };
            Ok((chain, key))
        }
        CertificateType::Pkcs12 => {
            let password = options.password().unwrap_or_default();
            let parsed = Pkcs12::from_der(&certificate.read_all()?)?.parse2(password)?;

            let leaf = parsed.cert.ok_or_else(|| {
                SslError::Configuration(format!("no certificate found in {}", certificate.description()))
            })?;
            let key = parsed.pkey.ok_or_else(|| {
                SslError::Configuration(format!("no private key found in {}", certificate.description()))
            })?;

            let mut chain = vec![CertificateDer::from(leaf.to_der()?)];
            if let Some(ca) = parsed.ca {
                for cert in ca.iter() {
                    chain.push(CertificateDer::from(cert.to_der()?));
                }
            }
            let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.private_key_to_pkcs8()?));
            Ok((chain, key))
        }
    }
}

fn pem_certificates(pem: &[u8], source: &ResourceSupplier) -> Result<Vec<CertificateDer<'static>>, SslError> {
    let chain = rustls_pemfile::certs(&mut &pem[..]).collect::<Result<Vec<_>, _>>()?;
    if chain.is_empty() {
        return Err(SslError::Configuration(format!(
            "no certificates found in {}",
            source.description()
        )));
    }
    Ok(chain)
}

fn is_pem(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .is_some_and(|start| bytes[start..].starts_with(b"-----BEGIN"))
}

/// Trust anchors for client certificates. PEM input is detected by its armor; any
/// other input is read as a PKCS12 trust store.
fn trust_roots(options: &SslOptions) -> Result<RootCertStore, SslError> {
    let source = options.trust_certificate().ok_or_else(|| {
        SslError::Configuration(format!("clientAuth {} requires trust.cert", options.client_auth()))
    })?;
    let bytes = source.read_all()?;

    let certificates = if is_pem(&bytes) {
        pem_certificates(&bytes, source)?
    } else {
        let parsed = Pkcs12::from_der(&bytes)?.parse2(options.trust_password().unwrap_or_default())?;
        let mut certificates = Vec::new();
        if let Some(cert) = parsed.cert {
            certificates.push(CertificateDer::from(cert.to_der()?));
        }
        if let Some(ca) = parsed.ca {
            for cert in ca.iter() {
                certificates.push(CertificateDer::from(cert.to_der()?));
            }
        }
        certificates
    };

    let mut roots = RootCertStore::empty();
    for certificate in certificates {
        roots.add(certificate)?;
    }
    if roots.is_empty() {
        return Err(SslError::Configuration(format!(
            "no trusted certificates found in {}",
            source.description()
        )));
    }
    Ok(roots)
}

fn client_verifier(
    options: &SslOptions,
    mode: ClientAuth,
    provider: Arc<CryptoProvider>,
) -> Result<Arc<dyn rustls::server::danger::ClientCertVerifier>, SslError> {
    let roots = trust_roots(options)?;
    let builder = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider);
    let builder = if mode == ClientAuth::Requested {
        builder.allow_unauthenticated()
    } else {
        builder
    };
    builder
        .build()
        .map_err(|e| SslError::Configuration(format!("client certificate verifier: {}", e)))
}
