//! Automated access-control probes
//!
//! Three heuristic probes run on top of the replay protocol: broken
//! authentication, IDOR, and method bypass. Probes are independent and
//! fault-isolated; one probe failing never blocks the others on the same
//! endpoint.

mod broken_auth;
mod idor;
mod method_bypass;

pub use broken_auth::BrokenAuthProbe;
pub use idor::IdorProbe;
pub use method_bypass::MethodBypassProbe;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::app::ProbeConfig;
use crate::http::ReplayRequestDescriptor;
use crate::replay::ReplayExecutor;

/// Vulnerability class a probe can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VulnerabilityType {
    BrokenAuthentication,
    Idor,
    MethodBypass,
}

/// Probe finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A confirmed access-control weakness on one endpoint
#[derive(Debug, Clone, Serialize)]
pub struct VulnerabilityFinding {
    #[serde(rename = "type")]
    pub vulnerability_type: VulnerabilityType,
    pub severity: Severity,
    pub endpoint: ReplayRequestDescriptor,
    pub evidence: String,
}

/// One access-control probe.
#[async_trait]
pub trait SecurityProbe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run against one endpoint. `None` means inconclusive or protected.
    async fn probe(
        &self,
        endpoint: &ReplayRequestDescriptor,
        executor: &dyn ReplayExecutor,
    ) -> Result<Option<VulnerabilityFinding>>;
}

/// Header names that carry authorization material; stripped by the probes
/// that replay without credentials.
pub(crate) const AUTH_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "token",
    "access-token",
    "cookie",
    "session",
];

/// Clone a descriptor with authorization headers removed and a fresh
/// correlation id.
pub(crate) fn strip_auth(endpoint: &ReplayRequestDescriptor) -> ReplayRequestDescriptor {
    let mut stripped = ReplayRequestDescriptor::new(&endpoint.method, &endpoint.url);
    stripped.body = endpoint.body.clone();
    for (name, value) in endpoint.headers.iter() {
        if !AUTH_HEADERS.contains(&name) {
            stripped.headers.insert(name, value);
        }
    }
    stripped
}

/// Run the full suite against one endpoint. A probe error is logged and the
/// remaining probes still run.
pub async fn run_security_probes(
    endpoint: &ReplayRequestDescriptor,
    executor: &dyn ReplayExecutor,
) -> Vec<VulnerabilityFinding> {
    let probes: [&dyn SecurityProbe; 3] = [&BrokenAuthProbe, &IdorProbe, &MethodBypassProbe];
    let mut findings = Vec::new();

    for probe in probes {
        match probe.probe(endpoint, executor).await {
            Ok(Some(finding)) => findings.push(finding),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(probe = probe.name(), error = %e, "Probe failed, continuing suite");
            }
        }
    }

    findings
}

/// Run the suite across many endpoints with bounded concurrency.
pub async fn run_batch(
    endpoints: &[ReplayRequestDescriptor],
    executor: Arc<dyn ReplayExecutor>,
    config: &ProbeConfig,
) -> Vec<VulnerabilityFinding> {
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));

    let tasks = endpoints.iter().map(|endpoint| {
        let semaphore = Arc::clone(&semaphore);
        let executor = Arc::clone(&executor);
        async move {
            let _permit = semaphore.acquire().await.ok()?;
            Some(run_security_probes(endpoint, executor.as_ref()).await)
        }
    });

    futures::future::join_all(tasks)
        .await
        .into_iter()
        .flatten()
        .flatten()
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::ReplayError;
    use crate::http::ReplayResponse;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Replay executor answering from a canned (method, url) table;
    /// everything else gets a 404.
    pub struct ScriptedExecutor {
        responses: HashMap<(String, String), ReplayResponse>,
        pub log: Mutex<Vec<(String, String, bool)>>,
    }

    impl ScriptedExecutor {
        pub fn new() -> Self {
            Self {
                responses: HashMap::new(),
                log: Mutex::new(Vec::new()),
            }
        }

        pub fn respond(mut self, method: &str, url: &str, response: ReplayResponse) -> Self {
            self.responses
                .insert((method.to_ascii_uppercase(), url.to_string()), response);
            self
        }

        pub fn requests(&self) -> Vec<(String, String, bool)> {
            self.log.lock().clone()
        }
    }

    #[async_trait]
    impl ReplayExecutor for ScriptedExecutor {
        async fn execute(
            &self,
            descriptor: &ReplayRequestDescriptor,
        ) -> Result<ReplayResponse, ReplayError> {
            self.log.lock().push((
                descriptor.method.clone(),
                descriptor.url.clone(),
                descriptor.headers.contains("authorization")
                    || descriptor.headers.contains("cookie"),
            ));

            Ok(self
                .responses
                .get(&(descriptor.method.clone(), descriptor.url.clone()))
                .cloned()
                .unwrap_or_else(|| ReplayResponse {
                    status: 404,
                    status_text: "Not Found".to_string(),
                    headers: Default::default(),
                    body: String::new(),
                    final_url: descriptor.url.clone(),
                }))
        }
    }

    pub fn json_response(status: u16, body: &str) -> ReplayResponse {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        ReplayResponse {
            status,
            status_text: String::new(),
            headers,
            body: body.to_string(),
            final_url: String::new(),
        }
    }

    pub fn html_response(status: u16, body: &str) -> ReplayResponse {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/html".to_string());
        ReplayResponse {
            status,
            status_text: String::new(),
            headers,
            body: body.to_string(),
            final_url: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::error::ReplayError;
    use crate::http::ReplayResponse;

    #[test]
    fn test_strip_auth_removes_credential_headers() {
        let endpoint = ReplayRequestDescriptor::new("GET", "https://api.example.com/me")
            .with_header("Authorization", "Bearer t")
            .with_header("X-Api-Key", "k")
            .with_header("Session", "s")
            .with_header("Accept", "application/json");

        let stripped = strip_auth(&endpoint);
        assert_eq!(stripped.headers.len(), 1);
        assert!(stripped.headers.contains("accept"));
        assert_ne!(stripped.correlation_id, endpoint.correlation_id);
    }

    struct FailingExecutor;

    #[async_trait]
    impl ReplayExecutor for FailingExecutor {
        async fn execute(
            &self,
            _descriptor: &ReplayRequestDescriptor,
        ) -> Result<ReplayResponse, ReplayError> {
            Err(ReplayError::Dispatch("target gone".to_string()))
        }
    }

    #[tokio::test]
    async fn test_suite_survives_failing_executor() {
        let endpoint = ReplayRequestDescriptor::new("GET", "https://api.example.com/users/7");
        let findings = run_security_probes(&endpoint, &FailingExecutor).await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_full_suite_on_wide_open_endpoint() {
        let endpoint = ReplayRequestDescriptor::new("GET", "https://api.example.com/users/7")
            .with_header("Authorization", "Bearer t");

        let executor = ScriptedExecutor::new()
            .respond("GET", "https://api.example.com/users/7", json_response(200, r#"{"id":7}"#))
            .respond("GET", "https://api.example.com/users/8", json_response(200, r#"{"id":8}"#))
            .respond("POST", "https://api.example.com/users/7", json_response(200, r#"{"ok":true}"#));

        let findings = run_security_probes(&endpoint, &executor).await;
        let types: Vec<_> = findings.iter().map(|f| f.vulnerability_type).collect();

        assert!(types.contains(&VulnerabilityType::BrokenAuthentication));
        assert!(types.contains(&VulnerabilityType::Idor));
        assert!(types.contains(&VulnerabilityType::MethodBypass));
    }
}
