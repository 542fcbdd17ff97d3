//! Request header and cookie views.

use axum::http::{header, HeaderMap};
use indexmap::IndexMap;

/// Request headers keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    values: IndexMap<String, Vec<String>>,
}

impl Headers {
    pub fn from_map(map: &HeaderMap) -> Self {
        let mut values: IndexMap<String, Vec<String>> = IndexMap::new();
        for (name, value) in map {
            values
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        Self { values }
    }

    /// First value of `name`, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.values
            .get(name.to_ascii_lowercase().as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.get_all(name).is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Request cookies in the order the client sent them.
pub type CookieMap = IndexMap<String, String>;

/// Collect cookies from every `Cookie` header. A repeated name keeps its first value.
pub fn parse_cookies(map: &HeaderMap) -> CookieMap {
    let mut cookies = CookieMap::new();
    for value in map.get_all(header::COOKIE) {
        let Ok(line) = value.to_str() else {
            continue;
        };
        for pair in line.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            cookies
                .entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
    }
    cookies
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_lookup_ignores_case() {
        let mut map = HeaderMap::new();
        map.append("accept", HeaderValue::from_static("text/html"));
        map.append("accept", HeaderValue::from_static("application/json"));
        map.insert("x-trace", HeaderValue::from_static("abc"));

        let headers = Headers::from_map(&map);
        assert_eq!(headers.get("Accept"), Some("text/html"));
        assert_eq!(headers.get_all("ACCEPT").len(), 2);
        assert!(headers.contains("X-Trace"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn cookies_keep_first_duplicate_and_order() {
        let mut map = HeaderMap::new();
        map.append(header::COOKIE, HeaderValue::from_static("sid=abc; theme=\"dark\""));
        map.append(header::COOKIE, HeaderValue::from_static("sid=later;lang=en; junk"));

        let cookies = parse_cookies(&map);
        assert_eq!(cookies.get("sid").map(String::as_str), Some("abc"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
        let names: Vec<_> = cookies.keys().map(String::as_str).collect();
        assert_eq!(names, ["sid", "theme", "lang"]);
    }
}
