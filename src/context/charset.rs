//! Text encodings for string responses.

use std::fmt;
use std::str::FromStr;

use crate::context::error::ContextError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Iso8859_1,
    UsAscii,
}

impl Charset {
    /// Name as written in a `Content-Type` parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Iso8859_1 => "iso-8859-1",
            Charset::UsAscii => "us-ascii",
        }
    }

    /// Encode `text`. Characters outside the charset become `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let limit = match self {
            Charset::Utf8 => return text.as_bytes().to_vec(),
            Charset::Iso8859_1 => 0xFF,
            Charset::UsAscii => 0x7F,
        };
        text.chars()
            .map(|c| if (c as u32) <= limit { c as u32 as u8 } else { b'?' })
            .collect()
    }
}

impl FromStr for Charset {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" => Ok(Charset::Iso8859_1),
            "us-ascii" | "ascii" => Ok(Charset::UsAscii),
            _ => Err(ContextError::UnsupportedCharset(s.to_string())),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
