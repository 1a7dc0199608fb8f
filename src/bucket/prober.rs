//! Bucket reachability probing
//!
//! Issues listing probes under a global concurrency cap with a per-probe
//! timeout. One candidate's failure never cancels the others in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;

use super::{BucketCandidate, Provider};
use crate::app::BucketConfig;
use crate::error::BucketError;

/// Outcome of probing one candidate. Ephemeral; attached to the finding
/// that referenced the bucket.
#[derive(Debug, Clone, Serialize)]
pub struct BucketProbeResult {
    pub candidate: BucketCandidate,

    /// The endpoint answered with any HTTP status
    pub reachable: bool,

    /// The endpoint returned a listing body at 2xx
    pub listing_enabled: bool,

    pub http_status: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// Reachability prober with bounded concurrency
pub struct BucketProber {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    config: BucketConfig,
}

impl BucketProber {
    pub fn new(config: BucketConfig) -> Result<Self, BucketError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| BucketError::Request(e.to_string()))?;

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            config,
        })
    }

    /// Probe one candidate's endpoints in order, stopping at the first that
    /// yields an HTTP response viewable as a verdict.
    pub async fn test_access(&self, candidate: &BucketCandidate) -> BucketProbeResult {
        let started = Instant::now();

        if candidate.provider == Provider::Unknown {
            return self.failed(
                candidate,
                started,
                BucketError::UnsupportedProvider("unknown".into()).to_string(),
            );
        }
        if !self.config.provider_enabled(candidate.provider) {
            return self.failed(
                candidate,
                started,
                format!("probing disabled for provider {}", candidate.provider.as_str()),
            );
        }

        // Cap simultaneous probes across all candidates
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return self.failed(candidate, started, "prober shut down".to_string());
            }
        };

        let mut last_error = None;

        for endpoint in &candidate.candidate_endpoints {
            match self.client.get(endpoint).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    let listing = (200..300).contains(&status) && is_listing_body(&body);

                    return BucketProbeResult {
                        candidate: candidate.clone(),
                        reachable: true,
                        listing_enabled: listing,
                        http_status: Some(status),
                        latency_ms: started.elapsed().as_millis() as u64,
                        error: None,
                    };
                }
                Err(e) => {
                    tracing::debug!(endpoint = %endpoint, error = %e, "Bucket probe attempt failed");
                    last_error = Some(if e.is_timeout() {
                        BucketError::Timeout(self.config.timeout_ms).to_string()
                    } else {
                        BucketError::Request(e.to_string()).to_string()
                    });
                }
            }
        }

        let error = last_error.unwrap_or_else(|| "no probe endpoints".to_string());
        self.failed(candidate, started, error)
    }

    /// Probe many candidates; failures are isolated per candidate.
    pub async fn test_all(&self, candidates: &[BucketCandidate]) -> Vec<BucketProbeResult> {
        let futures = candidates.iter().map(|c| self.test_access(c));
        futures::future::join_all(futures).await
    }

    fn failed(
        &self,
        candidate: &BucketCandidate,
        started: Instant,
        error: String,
    ) -> BucketProbeResult {
        BucketProbeResult {
            candidate: candidate.clone(),
            reachable: false,
            listing_enabled: false,
            http_status: None,
            latency_ms: started.elapsed().as_millis() as u64,
            error: Some(error),
        }
    }
}

/// Whether a response body is a bucket listing rather than an access-denied
/// page: S3-style XML, Azure enumeration XML, or a GCS JSON object listing.
fn is_listing_body(body: &str) -> bool {
    let trimmed = body.trim_start();

    if trimmed.contains("<ListBucketResult") || trimmed.contains("<EnumerationResults") {
        return true;
    }

    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            return value.get("items").is_some() || value.get("kind").is_some();
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_body_classification() {
        assert!(is_listing_body(
            r#"<?xml version="1.0"?><ListBucketResult><Contents/></ListBucketResult>"#
        ));
        assert!(is_listing_body(r#"<EnumerationResults><Blobs/></EnumerationResults>"#));
        assert!(is_listing_body(r#"{"kind":"storage#objects","items":[]}"#));
        assert!(!is_listing_body(
            r#"<?xml version="1.0"?><Error><Code>AccessDenied</Code></Error>"#
        ));
        assert!(!is_listing_body("<html>403 Forbidden</html>"));
    }

    #[tokio::test]
    async fn test_unknown_provider_is_rejected_without_network() {
        let prober = BucketProber::new(BucketConfig::default()).unwrap();
        let candidate = BucketCandidate {
            raw_url: "https://example.com/x".to_string(),
            provider: Provider::Unknown,
            bucket_name: "x".to_string(),
            region: None,
            candidate_endpoints: Vec::new(),
        };

        let result = prober.test_access(&candidate).await;
        assert!(!result.reachable);
        assert!(result.error.unwrap().contains("Unsupported"));
    }

    #[tokio::test]
    async fn test_disabled_provider_is_skipped() {
        let mut config = BucketConfig::default();
        config.enabled_providers.insert("aws".to_string(), false);
        let prober = BucketProber::new(config).unwrap();

        let candidate = super::super::parse("s3://backups").unwrap();
        let result = prober.test_access(&candidate).await;
        assert!(!result.reachable);
        assert!(result.error.unwrap().contains("disabled"));
    }
}
