//! Replay request descriptor

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Case-insensitive header map. Keys are stored lowercased; the original
/// casing is not preserved because no consumer needs it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderMap(BTreeMap<String, String>);

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove every header whose name matches a predicate.
    pub fn retain<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        self.0.retain(|k, _| keep(k));
    }
}

impl FromIterator<(String, String)> for HeaderMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(&k, v);
        }
        map
    }
}

/// A captured network call to be re-executed under the original page's
/// authentication context. One descriptor backs exactly one in-flight
/// replay; it is retired on resolution or timeout and never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayRequestDescriptor {
    /// Unique id binding this request to its single completion event
    pub correlation_id: Uuid,

    /// HTTP method
    pub method: String,

    /// Target URL; may be relative, resolved against the target's location
    /// at dispatch time
    pub url: String,

    /// Request headers (case-insensitive)
    pub headers: HeaderMap,

    /// Request body
    pub body: Option<String>,
}

/// URL/body overrides applied to a captured descriptor prior to replay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestEdits {
    pub url: Option<String>,
    pub body: Option<String>,
}

impl ReplayRequestDescriptor {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    /// Apply user edits, minting a fresh correlation id since the edited
    /// request is a new dispatch.
    pub fn edited(&self, edits: &RequestEdits) -> Self {
        let mut descriptor = self.clone();
        descriptor.correlation_id = Uuid::new_v4();
        if let Some(url) = &edits.url {
            descriptor.url = url.clone();
        }
        if let Some(body) = &edits.body {
            descriptor.body = Some(body.clone());
        }
        descriptor
    }

    /// Render as a curl command for copy/export.
    pub fn to_curl(&self) -> String {
        let mut cmd = format!("curl -X {} {}", self.method, shell_quote(&self.url));

        for (name, value) in self.headers.iter() {
            cmd.push_str(&format!(" -H {}", shell_quote(&format!("{}: {}", name, value))));
        }

        if let Some(body) = &self.body {
            cmd.push_str(&format!(" --data {}", shell_quote(body)));
        }

        cmd
    }
}

/// Single-quote a value for shell usage, escaping embedded single quotes.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Bearer token");

        assert_eq!(headers.get("authorization"), Some("Bearer token"));
        assert_eq!(headers.get("AUTHORIZATION"), Some("Bearer token"));
        assert!(headers.remove("Authorization").is_some());
        assert!(headers.is_empty());
    }

    #[test]
    fn test_curl_rendering() {
        let descriptor = ReplayRequestDescriptor::new("post", "https://api.example.com/users")
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"name":"it's"}"#);

        let curl = descriptor.to_curl();
        assert!(curl.starts_with("curl -X POST 'https://api.example.com/users'"));
        assert!(curl.contains("-H 'content-type: application/json'"));
        assert!(curl.contains(r#"--data '{"name":"it'\''s"}'"#));
    }

    #[test]
    fn test_descriptor_serializes_with_correlation_id() {
        let descriptor = ReplayRequestDescriptor::new("GET", "https://example.com/api/me")
            .with_header("Accept", "application/json");

        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(json.contains(&descriptor.correlation_id.to_string()));

        let restored: ReplayRequestDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.correlation_id, descriptor.correlation_id);
        assert_eq!(restored.headers.get("accept"), Some("application/json"));
    }

    #[test]
    fn test_edits_mint_new_correlation_id() {
        let original = ReplayRequestDescriptor::new("GET", "https://example.com/a");
        let edits = RequestEdits {
            url: Some("https://example.com/b".to_string()),
            body: None,
        };
        let edited = original.edited(&edits);

        assert_eq!(edited.url, "https://example.com/b");
        assert_ne!(edited.correlation_id, original.correlation_id);
    }
}
