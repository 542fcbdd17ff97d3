//! Development certificate bundled with the binary.
//!
//! A self-signed certificate for `localhost` (SAN `DNS:localhost`, `IP:127.0.0.1`),
//! shipped both as a PKCS12 container and as PEM certificate + PKCS#8 key. The names
//! below are looked up through [`ResourceLoader`](super::ResourceLoader) like any
//! other path, after the filesystem candidates.

/// PKCS12 container holding the localhost certificate and key.
pub const LOCALHOST_P12: &str = "ssl/localhost.p12";

/// PEM certificate for localhost.
pub const LOCALHOST_CRT: &str = "ssl/localhost.crt";

/// PEM PKCS#8 private key for localhost.
pub const LOCALHOST_KEY: &str = "ssl/localhost.key";

/// Password of [`LOCALHOST_P12`].
pub const LOCALHOST_PASSWORD: &str = "changeit";

/// Embedded resources, by name.
pub static EMBEDDED: &[(&str, &[u8])] = &[
    (LOCALHOST_P12, include_bytes!("../../resources/ssl/localhost.p12")),
    (LOCALHOST_CRT, include_bytes!("../../resources/ssl/localhost.crt")),
    (LOCALHOST_KEY, include_bytes!("../../resources/ssl/localhost.key")),
];
