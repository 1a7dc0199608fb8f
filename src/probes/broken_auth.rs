//! Broken authentication probe
//!
//! Replays the endpoint with authorization-bearing headers stripped. A
//! structured-data 2xx answer means the resource is served without
//! credentials. An HTML answer containing login indicators is the server
//! walling the request off, so it is not a finding even at 2xx.
//!
//! Known limitation, kept deliberately: cookie/session-based auth can slip
//! through this heuristic because the credentialed fetch mode may still
//! attach ambient cookies; the probe measures header-borne auth only.

use anyhow::Result;
use async_trait::async_trait;

use super::{strip_auth, SecurityProbe, Severity, VulnerabilityFinding, VulnerabilityType};
use crate::http::ReplayRequestDescriptor;
use crate::replay::ReplayExecutor;

pub struct BrokenAuthProbe;

#[async_trait]
impl SecurityProbe for BrokenAuthProbe {
    fn name(&self) -> &'static str {
        "broken-auth"
    }

    async fn probe(
        &self,
        endpoint: &ReplayRequestDescriptor,
        executor: &dyn ReplayExecutor,
    ) -> Result<Option<VulnerabilityFinding>> {
        let stripped = strip_auth(endpoint);
        let response = executor
            .execute(&stripped)
            .await
            .map_err(|e| anyhow::anyhow!("replay failed: {}", e))?;

        // Explicit rejection or redirect: the endpoint is protected
        if response.is_auth_rejection() || response.is_redirect() {
            return Ok(None);
        }

        if !response.is_success() {
            return Ok(None);
        }

        // 2xx HTML login wall: protected, despite the status
        if response.looks_like_login_page() {
            return Ok(None);
        }

        // Only a structured-data body proves the resource itself was served;
        // anything ambiguous or empty is inconclusive
        if !response.is_structured_data() {
            return Ok(None);
        }

        Ok(Some(VulnerabilityFinding {
            vulnerability_type: VulnerabilityType::BrokenAuthentication,
            severity: Severity::High,
            endpoint: endpoint.clone(),
            evidence: format!(
                "{} {} returned {} with structured data after auth headers were removed",
                endpoint.method, stripped.url, response.status
            ),
        }))
    }
}
