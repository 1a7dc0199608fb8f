//! Request replay under the original page's authentication context
//!
//! A privileged controller delegates execution of a captured request to a
//! mediator bound 1:1 to the target environment. The mediator prefers a
//! zero-injection bridge into the target's credential context; when none is
//! available it installs (once) a minimal executor inside the target and
//! talks to it over a correlation-id-keyed single-shot channel with a hard
//! timeout.

mod controller;
mod executor;
mod mediator;

pub use controller::{ReplayController, TargetId};
pub use executor::{ExecutorHandle, ExecutorOutcome};
pub use mediator::{BridgeError, ExecutionBridge, PreparedRequest, TargetHandle, TargetMediator};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ReplayError;
use crate::http::{HeaderMap, ReplayRequestDescriptor, ReplayResponse};

/// Lifecycle of one dispatched replay request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplayState {
    Created,
    Dispatched,
    Resolved,
    TimedOut,
    Failed,
}

/// Seam between the probe suite and the replay machinery; lets probes run
/// against any request executor.
#[async_trait]
pub trait ReplayExecutor: Send + Sync {
    async fn execute(
        &self,
        descriptor: &ReplayRequestDescriptor,
    ) -> Result<ReplayResponse, ReplayError>;
}

/// Headers never forwarded across the trust boundary. Ambient credentials
/// come from the credentialed-fetch mode, not header injection.
const FORBIDDEN_HEADERS: &[&str] = &[
    "host",
    "connection",
    "origin",
    "referer",
    "content-length",
    "cookie",
    "cookie2",
    "date",
    "user-agent",
    "keep-alive",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "via",
    "accept-charset",
    "accept-encoding",
    "dnt",
];

const FORBIDDEN_PREFIXES: &[&str] = &["sec-fetch-", "sec-ch-", "sec-websocket-", "proxy-"];

/// Strip unsafe/forbidden headers prior to dispatch, regardless of pathway.
pub fn sanitize_headers(headers: &HeaderMap) -> HeaderMap {
    let mut sanitized = headers.clone();
    sanitized.retain(|name| {
        !FORBIDDEN_HEADERS.contains(&name)
            && !FORBIDDEN_PREFIXES.iter().any(|p| name.starts_with(p))
    });
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_headers_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert("Cookie", "session=abc");
        headers.insert("Host", "example.com");
        headers.insert("Origin", "https://example.com");
        headers.insert("Referer", "https://example.com/page");
        headers.insert("Content-Length", "42");
        headers.insert("User-Agent", "x");
        headers.insert("Sec-Fetch-Mode", "cors");
        headers.insert("Sec-CH-UA", "x");
        headers.insert("Proxy-Authorization", "x");
        headers.insert("Authorization", "Bearer token");
        headers.insert("Content-Type", "application/json");

        let sanitized = sanitize_headers(&headers);

        assert_eq!(sanitized.len(), 2);
        assert!(sanitized.contains("authorization"));
        assert!(sanitized.contains("content-type"));
    }
}
