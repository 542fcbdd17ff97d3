//! `Range` header handling.
//!
//! Only single byte ranges are served. A header listing several ranges is answered
//! with the first one.

use crate::context::error::ContextError;

/// A satisfiable byte range, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start: u64,
    end: u64,
    total: u64,
}

impl ByteRange {
    /// Resolve `header` against a body of `length` bytes.
    ///
    /// Returns `Ok(None)` when there is no header or the length is unknown or zero,
    /// in which case the full body is sent.
    pub fn parse(header: Option<&str>, length: Option<u64>) -> Result<Option<ByteRange>, ContextError> {
        let (Some(header), Some(total)) = (header, length) else {
            return Ok(None);
        };
        if total == 0 {
            return Ok(None);
        }

        let unsatisfiable = || ContextError::RangeNotSatisfiable {
            range: header.to_string(),
            length: total,
        };

        let spec = header
            .trim()
            .strip_prefix("bytes=")
            .ok_or_else(unsatisfiable)?;
        let first = spec.split(',').next().unwrap_or_default().trim();
        let (from, to) = first.split_once('-').ok_or_else(unsatisfiable)?;
        let (from, to) = (from.trim(), to.trim());
        let number = |s: &str| s.parse::<u64>().map_err(|_| unsatisfiable());

        let (start, end) = match (from.is_empty(), to.is_empty()) {
            (true, true) => return Err(unsatisfiable()),
            // bytes=-500: the last 500 bytes
            (true, false) => {
                let suffix = number(to)?;
                if suffix == 0 {
                    return Err(unsatisfiable());
                }
                (total.saturating_sub(suffix), total - 1)
            }
            (false, true) => (number(from)?, total - 1),
            (false, false) => (number(from)?, number(to)?.min(total - 1)),
        };

        if start >= total || start > end {
            return Err(unsatisfiable());
        }
        Ok(Some(ByteRange { start, end, total }))
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of bytes in the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value of the `Content-Range` header for a `206` response.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}
