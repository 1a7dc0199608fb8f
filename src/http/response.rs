//! Replay response type and body classification

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Response to a replayed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResponse {
    /// HTTP status code
    pub status: u16,

    /// Status text (e.g., "OK", "Not Found")
    pub status_text: String,

    /// Response headers
    pub headers: HashMap<String, String>,

    /// Response body
    pub body: String,

    /// URL after redirects
    pub final_url: String,
}

/// Keywords that mark an HTML page as a login/authentication wall.
const LOGIN_INDICATORS: &[&str] = &[
    "log in",
    "login",
    "sign in",
    "signin",
    "authenticate",
    "session expired",
    "password",
];

impl ReplayResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn is_auth_rejection(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the body is structured data (JSON-like). The content type is
    /// consulted first; otherwise the body must actually parse as JSON.
    pub fn is_structured_data(&self) -> bool {
        if let Some(ct) = self.content_type() {
            let ct = ct.to_ascii_lowercase();
            if ct.contains("application/json") || ct.contains("+json") {
                // An empty body is inconclusive regardless of the type
                return !self.body.trim().is_empty();
            }
            if ct.contains("text/html") {
                return false;
            }
        }

        let trimmed = self.body.trim();
        if trimmed.is_empty() {
            return false;
        }
        (trimmed.starts_with('{') || trimmed.starts_with('['))
            && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    }

    /// Whether the body is an HTML page containing login indicators. Such a
    /// response counts as "not vulnerable" even at 2xx: the server answered
    /// with an authentication wall, not the protected resource.
    pub fn looks_like_login_page(&self) -> bool {
        let body = self.body.to_ascii_lowercase();

        let is_html = self
            .content_type()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or_else(|| body.contains("<html") || body.contains("<!doctype"));

        is_html && LOGIN_INDICATORS.iter().any(|kw| body.contains(kw))
    }
}
