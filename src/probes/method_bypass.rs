//! HTTP method bypass probe
//!
//! Replays the endpoint with every other common verb, credentials stripped
//! and body dropped. A structured-data 2xx on any alternate verb means the
//! access decision is keyed on the method rather than the caller.

use anyhow::Result;
use async_trait::async_trait;

use super::{strip_auth, SecurityProbe, Severity, VulnerabilityFinding, VulnerabilityType};
use crate::http::ReplayRequestDescriptor;
use crate::replay::ReplayExecutor;

const METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

pub struct MethodBypassProbe;

#[async_trait]
impl SecurityProbe for MethodBypassProbe {
    fn name(&self) -> &'static str {
        "method-bypass"
    }

    async fn probe(
        &self,
        endpoint: &ReplayRequestDescriptor,
        executor: &dyn ReplayExecutor,
    ) -> Result<Option<VulnerabilityFinding>> {
        let original = endpoint.method.to_ascii_uppercase();

        for method in METHODS {
            if *method == original {
                continue;
            }

            let mut test = strip_auth(endpoint);
            test.method = method.to_string();
            // A replayed body only makes sense for the original verb
            test.body = None;

            let response = match executor.execute(&test).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(method, error = %e, "Method substitution failed");
                    continue;
                }
            };

            if response.is_success()
                && response.is_structured_data()
                && !response.looks_like_login_page()
            {
                // First bypass is conclusive
                return Ok(Some(VulnerabilityFinding {
                    vulnerability_type: VulnerabilityType::MethodBypass,
                    severity: Severity::Medium,
                    endpoint: endpoint.clone(),
                    evidence: format!(
                        "unauthenticated {} returned {} with structured data ({} was the recorded method)",
                        method, response.status, original
                    ),
                }));
            }
        }

        Ok(None)
    }
}
