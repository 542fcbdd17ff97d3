//! Response cookies.

use std::fmt;

use crate::context::ContextError;

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// A cookie to send with the response.
///
/// `max_age` follows the header semantics: positive values expire after that many
/// seconds, zero deletes the cookie, and `None` makes it a session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    path: Option<String>,
    domain: Option<String>,
    max_age: Option<i64>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

const EPOCH: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    /// A cookie that tells the client to drop `name`.
    pub fn removal(name: impl Into<String>) -> Self {
        Self::new(name, "").with_max_age(0)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn is_http_only(&self) -> bool {
        self.http_only
    }

    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    /// Reject names, values and attributes that would change the meaning of the
    /// rendered header.
    pub fn validate(&self) -> Result<(), ContextError> {
        let invalid = |what: &str| ContextError::InvalidHeader(format!("cookie {} {:?}", what, self.name));
        if self.name.is_empty() || !self.name.bytes().all(is_token_byte) {
            return Err(invalid("name"));
        }
        let value = self
            .value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(&self.value);
        if !value.bytes().all(is_cookie_octet) {
            return Err(invalid("value"));
        }
        let attributes = [self.path.as_deref(), self.domain.as_deref()];
        if attributes
            .iter()
            .flatten()
            .any(|attr| attr.bytes().any(|b| b == b';' || b.is_ascii_control()))
        {
            return Err(invalid("attribute"));
        }
        Ok(())
    }

    pub(crate) fn set_path_if_absent(&mut self, path: &str) {
        if self.path.is_none() {
            self.path = Some(path.to_string());
        }
    }
}

// token: visible ASCII minus separators
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
}

// cookie-octet: visible ASCII minus DQUOTE, comma, semicolon and backslash
fn is_cookie_octet(b: u8) -> bool {
    b.is_ascii_graphic() && !matches!(b, b'"' | b',' | b';' | b'\\')
}

/// Renders the `Set-Cookie` header value.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={}", path)?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        match self.max_age {
            Some(0) => write!(f, "; Max-Age=0; Expires={}", EPOCH)?,
            Some(seconds) if seconds > 0 => write!(f, "; Max-Age={}", seconds)?,
            _ => {}
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site.as_str())?;
        }
        Ok(())
    }
}
