//! Dotted-path lookups over a parsed TOML document.
//!
//! `server.ssl.trust.cert` walks nested tables; quoted TOML keys containing dots are not
//! addressable, which no setting needs.

use toml::{Table, Value};

use crate::config::loader::ConfigError;

/// Read-only hierarchical configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigTree {
    root: Table,
}

impl ConfigTree {
    pub fn new(root: Table) -> Self {
        Self { root }
    }

    /// Parse TOML text into a tree.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        content.parse::<Table>().map(Self::new).map_err(ConfigError::Parse)
    }

    pub fn root(&self) -> &Table {
        &self.root
    }

    /// Look up the raw value at `path`.
    pub fn get_value(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.get_value(path).is_some()
    }

    /// Read a scalar as a string. Numbers and booleans are rendered, so
    /// `password = 123456` reads as `"123456"`.
    pub fn get_string(&self, path: &str) -> Result<String, ConfigError> {
        let value = self
            .get_value(path)
            .ok_or_else(|| ConfigError::Missing(path.to_string()))?;
        scalar_to_string(value).ok_or_else(|| ConfigError::WrongType {
            path: path.to_string(),
            expected: "string",
            found: value.type_str(),
        })
    }

    /// Read either a single scalar or an array of scalars.
    pub fn get_string_list(&self, path: &str) -> Result<Vec<String>, ConfigError> {
        let value = self
            .get_value(path)
            .ok_or_else(|| ConfigError::Missing(path.to_string()))?;
        let wrong_type = |found: &Value| ConfigError::WrongType {
            path: path.to_string(),
            expected: "string or array of strings",
            found: found.type_str(),
        };
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| scalar_to_string(item).ok_or_else(|| wrong_type(item)))
                .collect(),
            other => scalar_to_string(other).map(|s| vec![s]).ok_or_else(|| wrong_type(other)),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}
