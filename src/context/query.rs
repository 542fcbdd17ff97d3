//! Query string and form parameters.

use std::ops::Deref;

use indexmap::IndexMap;

/// Multi-valued parameters in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    values: IndexMap<String, Vec<String>>,
}

impl ParamMap {
    /// Decode `application/x-www-form-urlencoded` data.
    pub fn parse(input: &[u8]) -> Self {
        let mut values: IndexMap<String, Vec<String>> = IndexMap::new();
        for (name, value) in url::form_urlencoded::parse(input) {
            values.entry(name.into_owned()).or_default().push(value.into_owned());
        }
        Self { values }
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// The raw query string plus its decoded parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    raw: String,
    params: ParamMap,
}

impl QueryString {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            params: ParamMap::parse(raw.as_bytes()),
        }
    }

    /// Undecoded text after `?`, empty when the URL had none.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl Deref for QueryString {
    type Target = ParamMap;

    fn deref(&self) -> &ParamMap {
        &self.params
    }
}
