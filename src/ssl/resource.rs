//! Certificate and key material lookup.
//!
//! # Resolution order
//! 1. The path as given (absolute, or relative to the process working directory)
//! 2. The path joined onto the loader's working directory
//! 3. The embedded resource table, with a leading `/` stripped
//!
//! The first existing candidate wins. When none exists the lookup fails with
//! [`SslError::ResourceNotFound`] carrying the original path.

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use crate::ssl::builtin;
use crate::ssl::error::SslError;

/// An open handle on certificate or key material.
pub type ResourceStream = Box<dyn Read + Send>;

type OpenFn = dyn Fn() -> Result<ResourceStream, SslError> + Send + Sync;

/// Deferred access to certificate or key material.
///
/// Nothing is touched until [`open`](Self::open) is called. Every call opens a new
/// handle, so the file descriptor lives only as long as the caller keeps the stream.
#[derive(Clone)]
pub struct ResourceSupplier {
    description: String,
    open: Arc<OpenFn>,
}

impl ResourceSupplier {
    pub fn new<F>(description: impl Into<String>, open: F) -> Self
    where
        F: Fn() -> Result<ResourceStream, SslError> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            open: Arc::new(open),
        }
    }

    /// Supplier over bytes already in memory.
    pub fn from_static(description: impl Into<String>, bytes: &'static [u8]) -> Self {
        Self::new(description, move || Ok(Box::new(Cursor::new(bytes)) as ResourceStream))
    }

    /// Where the material comes from, for error messages.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Acquire a fresh handle.
    pub fn open(&self) -> Result<ResourceStream, SslError> {
        (self.open)()
    }

    /// Read the whole resource. The handle is released before returning.
    pub fn read_all(&self) -> Result<Vec<u8>, SslError> {
        let mut stream = self.open()?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for ResourceSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSupplier")
            .field("description", &self.description)
            .finish()
    }
}

/// Resolves paths against the filesystem, then the embedded table.
#[derive(Debug, Clone)]
pub struct ResourceLoader {
    working_dir: Option<PathBuf>,
    embedded: &'static [(&'static str, &'static [u8])],
}

impl ResourceLoader {
    pub fn new(working_dir: impl Into<PathBuf>, embedded: &'static [(&'static str, &'static [u8])]) -> Self {
        Self {
            working_dir: Some(working_dir.into()),
            embedded,
        }
    }

    /// Loader rooted at the process working directory, backed by the bundled
    /// development certificate.
    pub fn system() -> Self {
        Self {
            working_dir: std::env::current_dir().ok(),
            embedded: builtin::EMBEDDED,
        }
    }

    /// Open `path`, trying each candidate in order.
    pub fn open(&self, path: &str) -> Result<ResourceStream, SslError> {
        if let Some(file) = self.find_file(path) {
            tracing::trace!(path, resolved = %file.display(), "Resource found on filesystem");
            return Ok(Box::new(File::open(file)?));
        }

        let name = path.strip_prefix('/').unwrap_or(path);
        self.embedded
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, bytes)| Box::new(Cursor::new(*bytes)) as ResourceStream)
            .ok_or_else(|| SslError::ResourceNotFound(path.to_string()))
    }

    /// A lazy supplier for `path`. The lookup runs on each [`ResourceSupplier::open`].
    pub fn supplier(&self, path: &str) -> ResourceSupplier {
        let loader = self.clone();
        let target = path.to_string();
        ResourceSupplier::new(path, move || loader.open(&target))
    }

    fn find_file(&self, path: &str) -> Option<PathBuf> {
        let as_given = PathBuf::from(path);
        let relative = self.working_dir.as_deref().map(|dir| dir.join(path));

        std::iter::once(as_given)
            .chain(relative)
            .find(|candidate| candidate.is_file())
    }
}

impl Default for ResourceLoader {
    fn default() -> Self {
        Self::system()
    }
}
