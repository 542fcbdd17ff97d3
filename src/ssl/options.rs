//! TLS options for serving HTTPS.
//!
//! Two certificate formats are supported:
//! - PKCS12: a password-protected container holding the certificate chain and key
//! - X.509: a PEM certificate chain plus a PEM PKCS#8 private key
//!
//! JKS is not supported.
//!
//! # Configuration
//! ```toml
//! [server.ssl]            # or [ssl]
//! type = "PKCS12"         # PKCS12 (default), X509 or self-signed
//! cert = "conf/server.p12"
//! password = "secret"
//! clientAuth = "REQUESTED"  # NONE (default), REQUESTED, REQUIRED
//! protocol = ["TLSv1.3", "TLSv1.2"]
//!
//! [server.ssl.trust]
//! cert = "conf/clients.crt"
//! password = "trust-secret"
//! ```

use std::fmt;
use std::str::FromStr;

use rustls::pki_types::CertificateDer;

use crate::config::ConfigTree;
use crate::ssl::builtin;
use crate::ssl::error::SslError;
use crate::ssl::resource::{ResourceLoader, ResourceSupplier};

/// TLSv1.2.
pub const TLS_V1_2: &str = "TLSv1.2";

/// TLSv1.3.
pub const TLS_V1_3: &str = "TLSv1.3";

/// Value of `type` selecting the bundled development certificate.
pub const SELF_SIGNED: &str = "self-signed";

/// Configuration paths searched by [`SslOptions::from_config`], in order.
pub const DEFAULT_PATHS: &[&str] = &["server.ssl", "ssl"];

/// Certificate container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertificateType {
    #[default]
    Pkcs12,
    X509,
}

impl CertificateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateType::Pkcs12 => "PKCS12",
            CertificateType::X509 => "X509",
        }
    }
}

impl FromStr for CertificateType {
    type Err = SslError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PKCS12" => Ok(CertificateType::Pkcs12),
            "X509" => Ok(CertificateType::X509),
            _ => Err(SslError::Configuration(format!("SSL type: {}", s))),
        }
    }
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client certificate policy for TLS connections in server mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientAuth {
    /// Client certificates are not requested.
    #[default]
    None,
    /// Client certificates are requested but not required.
    Requested,
    /// Client certificates are required.
    Required,
}

impl ClientAuth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientAuth::None => "NONE",
            ClientAuth::Requested => "REQUESTED",
            ClientAuth::Required => "REQUIRED",
        }
    }
}

impl FromStr for ClientAuth {
    type Err = SslError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(ClientAuth::None),
            "REQUESTED" => Ok(ClientAuth::Requested),
            "REQUIRED" => Ok(ClientAuth::Required),
            _ => Err(SslError::Configuration(format!("clientAuth: {}", s))),
        }
    }
}

impl fmt::Display for ClientAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of the certificates a client presented.
pub trait PeerCertificateProvider {
    /// The client's certificate chain.
    ///
    /// Fails with [`SslError::PeerUnverified`] when the peer's identity has not been
    /// verified.
    fn peer_certificates(&self) -> Result<Vec<CertificateDer<'static>>, SslError>;
}

impl<F> PeerCertificateProvider for F
where
    F: Fn() -> Result<Vec<CertificateDer<'static>>, SslError>,
{
    fn peer_certificates(&self) -> Result<Vec<CertificateDer<'static>>, SslError> {
        self()
    }
}

/// TLS options. Built once at startup, then shared read-only.
#[derive(Debug, Clone)]
pub struct SslOptions {
    cert_type: CertificateType,
    certificate: Option<ResourceSupplier>,
    private_key: Option<ResourceSupplier>,
    trust_certificate: Option<ResourceSupplier>,
    password: Option<String>,
    trust_password: Option<String>,
    client_auth: ClientAuth,
    protocol: Vec<String>,
}

impl Default for SslOptions {
    fn default() -> Self {
        Self {
            cert_type: CertificateType::Pkcs12,
            certificate: None,
            private_key: None,
            trust_certificate: None,
            password: None,
            trust_password: None,
            client_auth: ClientAuth::None,
            protocol: vec![TLS_V1_3.to_string(), TLS_V1_2.to_string()],
        }
    }
}

impl SslOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// X.509 certificate chain and unencrypted PKCS#8 key, both PEM.
    pub fn x509(crt: &str, key: &str) -> Self {
        Self::x509_with(&ResourceLoader::system(), crt, key, None)
    }

    /// X.509 certificate chain and PKCS#8 key, the key optionally encrypted.
    pub fn x509_with_password(crt: &str, key: &str, password: Option<&str>) -> Self {
        Self::x509_with(&ResourceLoader::system(), crt, key, password)
    }

    /// PKCS12 container.
    pub fn pkcs12(crt: &str, password: &str) -> Self {
        Self::pkcs12_with(&ResourceLoader::system(), crt, password)
    }

    /// The bundled PKCS12 development certificate for `localhost`.
    pub fn self_signed() -> Self {
        Self::self_signed_with(&ResourceLoader::system(), CertificateType::Pkcs12)
    }

    /// The bundled development certificate for `localhost` in the given format.
    pub fn self_signed_of(cert_type: &str) -> Result<Self, SslError> {
        let cert_type = cert_type.parse()?;
        Ok(Self::self_signed_with(&ResourceLoader::system(), cert_type))
    }

    fn x509_with(loader: &ResourceLoader, crt: &str, key: &str, password: Option<&str>) -> Self {
        Self {
            cert_type: CertificateType::X509,
            certificate: Some(loader.supplier(crt)),
            private_key: Some(loader.supplier(key)),
            password: password.map(str::to_string),
            ..Self::default()
        }
    }

    fn pkcs12_with(loader: &ResourceLoader, crt: &str, password: &str) -> Self {
        Self {
            cert_type: CertificateType::Pkcs12,
            certificate: Some(loader.supplier(crt)),
            password: Some(password.to_string()),
            ..Self::default()
        }
    }

    fn self_signed_with(loader: &ResourceLoader, cert_type: CertificateType) -> Self {
        match cert_type {
            CertificateType::Pkcs12 => {
                Self::pkcs12_with(loader, builtin::LOCALHOST_P12, builtin::LOCALHOST_PASSWORD)
            }
            CertificateType::X509 => {
                Self::x509_with(loader, builtin::LOCALHOST_CRT, builtin::LOCALHOST_KEY, None)
            }
        }
    }

    /// Resolve options from `server.ssl`, falling back to `ssl`.
    pub fn from_config(tree: &ConfigTree) -> Result<Option<Self>, SslError> {
        Self::from_paths(tree, DEFAULT_PATHS)
    }

    /// Resolve options from the first of `paths` present in the tree.
    pub fn from_paths(tree: &ConfigTree, paths: &[&str]) -> Result<Option<Self>, SslError> {
        Self::resolve(tree, paths, &ResourceLoader::system())
    }

    /// Resolve options, looking certificate paths up through `loader`.
    ///
    /// Returns `Ok(None)` when none of `paths` exists. Certificate paths are not
    /// opened here; a missing file surfaces when the TLS engine is built.
    pub fn resolve(tree: &ConfigTree, paths: &[&str], loader: &ResourceLoader) -> Result<Option<Self>, SslError> {
        let Some(path) = paths.iter().find(|path| tree.has_path(path)) else {
            return Ok(None);
        };
        let key = |name: &str| format!("{}.{}", path, name);

        let kind = if tree.has_path(&key("type")) {
            tree.get_string(&key("type"))?
        } else {
            CertificateType::Pkcs12.as_str().to_string()
        };

        let mut options = if kind.eq_ignore_ascii_case(SELF_SIGNED) {
            if tree.has_path(&key("password")) {
                // The bundled container only opens with its own password.
                tracing::debug!(path = %path, "Ignoring configured password for the self-signed certificate");
            }
            Self::self_signed_with(loader, CertificateType::Pkcs12)
        } else {
            match kind.parse::<CertificateType>()? {
                CertificateType::X509 => {
                    let password = if tree.has_path(&key("password")) {
                        Some(tree.get_string(&key("password"))?)
                    } else {
                        None
                    };
                    Self::x509_with(
                        loader,
                        &tree.get_string(&key("cert"))?,
                        &tree.get_string(&key("key"))?,
                        password.as_deref(),
                    )
                }
                CertificateType::Pkcs12 => Self::pkcs12_with(
                    loader,
                    &tree.get_string(&key("cert"))?,
                    &tree.get_string(&key("password"))?,
                ),
            }
        };

        if tree.has_path(&key("clientAuth")) {
            options.client_auth = tree.get_string(&key("clientAuth"))?.parse()?;
        }
        if tree.has_path(&key("trust.cert")) {
            options.trust_certificate = Some(loader.supplier(&tree.get_string(&key("trust.cert"))?));
        }
        if tree.has_path(&key("trust.password")) {
            options.trust_password = Some(tree.get_string(&key("trust.password"))?);
        }
        if tree.has_path(&key("protocol")) {
            options.protocol = tree.get_string_list(&key("protocol"))?;
        }

        tracing::debug!(
            path = %path,
            cert_type = %options.cert_type,
            client_auth = %options.client_auth,
            protocol = ?options.protocol,
            "SSL options resolved"
        );
        Ok(Some(options))
    }

    /// Certificate type. Default is PKCS12.
    pub fn cert_type(&self) -> CertificateType {
        self.cert_type
    }

    pub fn set_type(&mut self, cert_type: CertificateType) -> &mut Self {
        self.cert_type = cert_type;
        self
    }

    /// A PKCS12 container or a PEM X.509 certificate chain.
    pub fn certificate(&self) -> Option<&ResourceSupplier> {
        self.certificate.as_ref()
    }

    pub fn set_certificate(&mut self, certificate: ResourceSupplier) -> &mut Self {
        self.certificate = Some(certificate);
        self
    }

    pub fn set_certificate_path(&mut self, path: &str) -> &mut Self {
        self.set_certificate(ResourceLoader::system().supplier(path))
    }

    /// PEM PKCS#8 private key. X.509 only.
    pub fn private_key(&self) -> Option<&ResourceSupplier> {
        self.private_key.as_ref()
    }

    pub fn set_private_key(&mut self, private_key: ResourceSupplier) -> &mut Self {
        self.private_key = Some(private_key);
        self
    }

    pub fn set_private_key_path(&mut self, path: &str) -> &mut Self {
        self.set_private_key(ResourceLoader::system().supplier(path))
    }

    /// Certificates used to verify clients.
    pub fn trust_certificate(&self) -> Option<&ResourceSupplier> {
        self.trust_certificate.as_ref()
    }

    pub fn set_trust_certificate(&mut self, trust: ResourceSupplier) -> &mut Self {
        self.trust_certificate = Some(trust);
        self
    }

    pub fn set_trust_certificate_path(&mut self, path: &str) -> &mut Self {
        self.set_trust_certificate(ResourceLoader::system().supplier(path))
    }

    /// Container password (PKCS12) or key password (X.509).
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn set_password(&mut self, password: Option<String>) -> &mut Self {
        self.password = password;
        self
    }

    pub fn trust_password(&self) -> Option<&str> {
        self.trust_password.as_deref()
    }

    pub fn set_trust_password(&mut self, password: Option<String>) -> &mut Self {
        self.trust_password = password;
        self
    }

    /// Client certificate policy. Default is [`ClientAuth::None`].
    pub fn client_auth(&self) -> ClientAuth {
        self.client_auth
    }

    pub fn set_client_auth(&mut self, client_auth: ClientAuth) -> &mut Self {
        self.client_auth = client_auth;
        self
    }

    /// Enabled protocols, most preferred first. Default is TLSv1.3, TLSv1.2.
    pub fn protocol(&self) -> &[String] {
        &self.protocol
    }

    pub fn set_protocol<I, S>(&mut self, protocol: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocol = protocol.into_iter().map(Into::into).collect();
        self
    }

    /// Check the per-format required fields.
    pub fn validate(&self) -> Result<(), SslError> {
        if self.certificate.is_none() {
            return Err(SslError::Configuration(format!("{} requires a certificate", self.cert_type)));
        }
        match self.cert_type {
            CertificateType::X509 if self.private_key.is_none() => {
                Err(SslError::Configuration("X509 requires a private key".to_string()))
            }
            CertificateType::Pkcs12 if self.password.is_none() => {
                Err(SslError::Configuration("PKCS12 requires a password".to_string()))
            }
            _ => Ok(()),
        }
    }

    /// The client's certificates, filtered through the client-auth policy.
    ///
    /// - `Required`: provider failures propagate; an empty chain is an error
    /// - `Requested`: an unverified peer yields an empty list
    /// - `None`: always empty, the provider is not consulted
    pub fn client_certificates(
        &self,
        provider: &dyn PeerCertificateProvider,
    ) -> Result<Vec<CertificateDer<'static>>, SslError> {
        match self.client_auth {
            ClientAuth::Required => {
                let certificates = provider.peer_certificates()?;
                if certificates.is_empty() {
                    return Err(SslError::PeerUnverified("No peer certificates".to_string()));
                }
                Ok(certificates)
            }
            ClientAuth::Requested => match provider.peer_certificates() {
                Ok(certificates) => Ok(certificates),
                Err(SslError::PeerUnverified(_)) => Ok(Vec::new()),
                Err(other) => Err(other),
            },
            ClientAuth::None => Ok(Vec::new()),
        }
    }
}

impl fmt::Display for SslOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cert_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn tree(toml: &str) -> ConfigTree {
        ConfigTree::parse(toml).unwrap()
    }

    fn resolve(toml: &str) -> Result<Option<SslOptions>, SslError> {
        SslOptions::from_config(&tree(toml))
    }

    #[test]
    fn pkcs12_with_defaults() {
        let options = resolve(
            r#"
            [ssl]
            type = "PKCS12"
            cert = "a.p12"
            password = "secret"
            "#,
        )
        .unwrap()
        .unwrap();

        assert_eq!(options.cert_type(), CertificateType::Pkcs12);
        assert_eq!(options.client_auth(), ClientAuth::None);
        assert_eq!(options.protocol(), ["TLSv1.3", "TLSv1.2"]);
        assert_eq!(options.password(), Some("secret"));
        assert_eq!(options.certificate().unwrap().description(), "a.p12");
        assert!(options.private_key().is_none());
        assert_eq!(options.to_string(), "PKCS12");
    }

    #[test]
    fn type_defaults_to_pkcs12() {
        let options = resolve("[ssl]\ncert = \"a.p12\"\npassword = \"secret\"").unwrap().unwrap();
        assert_eq!(options.cert_type(), CertificateType::Pkcs12);
    }

    #[test]
    fn missing_section_is_none() {
        assert!(resolve("[server]\nbind_address = \"127.0.0.1:1\"").unwrap().is_none());
    }

    #[test]
    fn server_ssl_takes_precedence() {
        let options = resolve(
            r#"
            [server.ssl]
            type = "x509"
            cert = "server.crt"
            key = "server.key"

            [ssl]
            cert = "other.p12"
            password = "x"
            "#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(options.cert_type(), CertificateType::X509);
        assert_eq!(options.certificate().unwrap().description(), "server.crt");
        assert_eq!(options.private_key().unwrap().description(), "server.key");
        assert_eq!(options.password(), None);
    }

    #[test]
    fn custom_candidate_paths() {
        let tree = tree("[tls]\ncert = \"a.p12\"\npassword = \"p\"");
        assert!(SslOptions::from_paths(&tree, &["web.tls", "tls"]).unwrap().is_some());
        assert!(SslOptions::from_paths(&tree, &["web.tls"]).unwrap().is_none());
    }

    #[test]
    fn x509_requires_key() {
        let err = resolve("[ssl]\ntype = \"X509\"\ncert = \"server.crt\"").unwrap_err();
        assert!(matches!(err, SslError::Configuration(ref msg) if msg.contains("ssl.key")));
    }

    #[test]
    fn pkcs12_requires_password() {
        let err = resolve("[ssl]\ncert = \"a.p12\"").unwrap_err();
        assert!(matches!(err, SslError::Configuration(ref msg) if msg.contains("ssl.password")));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = resolve("[ssl]\ntype = \"JKS\"\ncert = \"a.jks\"").unwrap_err();
        assert!(matches!(err, SslError::Configuration(ref msg) if msg.contains("JKS")));
    }

    #[test]
    fn optional_fields() {
        let options = resolve(
            r#"
            [ssl]
            type = "X509"
            cert = "server.crt"
            key = "server.key"
            password = "keypass"
            clientAuth = "requested"
            protocol = "TLSv1.2"

            [ssl.trust]
            cert = "ca.crt"
            password = "trustpass"
            "#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(options.client_auth(), ClientAuth::Requested);
        assert_eq!(options.protocol(), ["TLSv1.2"]);
        assert_eq!(options.password(), Some("keypass"));
        assert_eq!(options.trust_certificate().unwrap().description(), "ca.crt");
        assert_eq!(options.trust_password(), Some("trustpass"));
    }

    #[test]
    fn unknown_client_auth_is_rejected() {
        let err = resolve("[ssl]\ncert = \"a.p12\"\npassword = \"p\"\nclientAuth = \"sometimes\"").unwrap_err();
        assert!(matches!(err, SslError::Configuration(ref msg) if msg.contains("sometimes")));
    }

    #[test]
    fn self_signed_ignores_material_fields() {
        for extra in [
            "",
            "cert = \"missing.p12\"",
            "password = \"not-changeit\"",
            "cert = \"x.crt\"\nkey = \"x.key\"\npassword = 42",
        ] {
            let options = resolve(&format!("[ssl]\ntype = \"SELF-SIGNED\"\n{}", extra))
                .unwrap()
                .unwrap();
            assert_eq!(options.cert_type(), CertificateType::Pkcs12);
            assert_eq!(options.password(), Some(builtin::LOCALHOST_PASSWORD));
            assert_eq!(options.certificate().unwrap().description(), builtin::LOCALHOST_P12);
            assert!(options.certificate().unwrap().read_all().is_ok());
        }
    }

    #[test]
    fn self_signed_keeps_client_auth_and_protocol() {
        let options = resolve("[ssl]\ntype = \"self-signed\"\nclientAuth = \"REQUIRED\"\nprotocol = [\"TLSv1.3\"]")
            .unwrap()
            .unwrap();
        assert_eq!(options.client_auth(), ClientAuth::Required);
        assert_eq!(options.protocol(), ["TLSv1.3"]);
    }

    #[test]
    fn self_signed_factories() {
        let pkcs12 = SslOptions::self_signed();
        assert_eq!(pkcs12.cert_type(), CertificateType::Pkcs12);
        assert!(pkcs12.validate().is_ok());

        let x509 = SslOptions::self_signed_of("x509").unwrap();
        assert_eq!(x509.cert_type(), CertificateType::X509);
        assert_eq!(x509.private_key().unwrap().description(), builtin::LOCALHOST_KEY);
        assert!(x509.validate().is_ok());

        assert!(SslOptions::self_signed_of("jks").is_err());
    }

    #[test]
    fn validate_checks_required_material() {
        let mut options = SslOptions::new();
        assert!(options.validate().is_err());

        options.set_certificate(ResourceSupplier::from_static("cert", b""));
        assert!(options.validate().is_err()); // PKCS12 without password

        options.set_password(Some("p".into()));
        assert!(options.validate().is_ok());

        options.set_type(CertificateType::X509);
        assert!(options.validate().is_err()); // X509 without key

        options.set_private_key(ResourceSupplier::from_static("key", b""));
        assert!(options.validate().is_ok());
    }

    fn with_auth(client_auth: ClientAuth) -> SslOptions {
        let mut options = SslOptions::self_signed();
        options.set_client_auth(client_auth);
        options
    }

    fn certificate() -> CertificateDer<'static> {
        CertificateDer::from(vec![0x30, 0x00])
    }

    #[test]
    fn required_propagates_unverified() {
        let provider = || -> Result<Vec<CertificateDer<'static>>, SslError> {
            Err(SslError::PeerUnverified("handshake without certificate".into()))
        };
        let err = with_auth(ClientAuth::Required).client_certificates(&provider).unwrap_err();
        assert!(matches!(err, SslError::PeerUnverified(_)));
    }

    #[test]
    fn required_rejects_empty_chain() {
        let provider = || -> Result<Vec<CertificateDer<'static>>, SslError> { Ok(Vec::new()) };
        let err = with_auth(ClientAuth::Required).client_certificates(&provider).unwrap_err();
        assert!(matches!(err, SslError::PeerUnverified(ref msg) if msg == "No peer certificates"));
    }

    #[test]
    fn required_returns_chain() {
        let provider = || -> Result<Vec<CertificateDer<'static>>, SslError> { Ok(vec![certificate()]) };
        let certs = with_auth(ClientAuth::Required).client_certificates(&provider).unwrap();
        assert_eq!(certs, vec![certificate()]);
    }

    #[test]
    fn requested_swallows_unverified() {
        let provider = || -> Result<Vec<CertificateDer<'static>>, SslError> {
            Err(SslError::PeerUnverified("no certificate".into()))
        };
        let certs = with_auth(ClientAuth::Requested).client_certificates(&provider).unwrap();
        assert!(certs.is_empty());

        let provider = || -> Result<Vec<CertificateDer<'static>>, SslError> { Ok(vec![certificate()]) };
        assert_eq!(with_auth(ClientAuth::Requested).client_certificates(&provider).unwrap().len(), 1);
    }

    #[test]
    fn requested_propagates_other_failures() {
        let provider = || -> Result<Vec<CertificateDer<'static>>, SslError> {
            Err(SslError::Io(std::io::Error::other("socket closed")))
        };
        assert!(with_auth(ClientAuth::Requested).client_certificates(&provider).is_err());
    }

    #[test]
    fn none_never_calls_provider() {
        let calls = Cell::new(0);
        let provider = || -> Result<Vec<CertificateDer<'static>>, SslError> {
            calls.set(calls.get() + 1);
            Ok(vec![certificate()])
        };
        let certs = with_auth(ClientAuth::None).client_certificates(&provider).unwrap();
        assert!(certs.is_empty());
        assert_eq!(calls.get(), 0);
    }
}
