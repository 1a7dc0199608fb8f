//! IDOR probe
//!
//! Extracts numeric path segments and identifier-looking query parameters
//! from the endpoint and replays one substituted request per candidate,
//! keeping the original credentials. The first structured-data 2xx response
//! confirms the finding and halts further substitutions for the endpoint.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::{SecurityProbe, Severity, VulnerabilityFinding, VulnerabilityType};
use crate::http::ReplayRequestDescriptor;
use crate::replay::ReplayExecutor;

/// Substitute for identifier values that are not plain integers.
const PROBE_VALUE: &str = "1";

pub struct IdorProbe;

#[async_trait]
impl SecurityProbe for IdorProbe {
    fn name(&self) -> &'static str {
        "idor"
    }

    async fn probe(
        &self,
        endpoint: &ReplayRequestDescriptor,
        executor: &dyn ReplayExecutor,
    ) -> Result<Option<VulnerabilityFinding>> {
        for substituted_url in substitutions(&endpoint.url) {
            let mut test = endpoint.clone();
            test.correlation_id = Uuid::new_v4();
            test.url = substituted_url.clone();

            let response = match executor.execute(&test).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(url = %substituted_url, error = %e, "IDOR substitution failed");
                    continue;
                }
            };

            if response.is_success()
                && response.is_structured_data()
                && !response.looks_like_login_page()
            {
                // One confirmed substitution is enough
                return Ok(Some(VulnerabilityFinding {
                    vulnerability_type: VulnerabilityType::Idor,
                    severity: Severity::High,
                    endpoint: endpoint.clone(),
                    evidence: format!(
                        "substituted object reference {} returned {} with structured data",
                        substituted_url, response.status
                    ),
                }));
            }
        }

        Ok(None)
    }
}

/// One substituted URL per identifier found: numeric ids incremented by one,
/// templated or opaque identifiers replaced with a fixed probe value.
fn substitutions(url: &str) -> Vec<String> {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    };

    let mut results = Vec::new();

    // Numeric and templated path segments
    let segments: Vec<&str> = base.split('/').collect();
    for (i, segment) in segments.iter().enumerate() {
        let replacement = if let Ok(n) = segment.parse::<u64>() {
            Some((n + 1).to_string())
        } else if segment.starts_with('{') && segment.ends_with('}') {
            Some(PROBE_VALUE.to_string())
        } else {
            None
        };

        if let Some(replacement) = replacement {
            let mut substituted = segments.clone();
            substituted[i] = &replacement;
            let mut candidate = substituted.join("/");
            if let Some(query) = query {
                candidate.push('?');
                candidate.push_str(query);
            }
            results.push(candidate);
        }
    }

    // Identifier-looking query parameters
    if let Some(query) = query {
        let pairs: Vec<&str> = query.split('&').collect();
        for (i, pair) in pairs.iter().enumerate() {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            if !is_identifier_param(name) {
                continue;
            }

            let replacement = match value.parse::<u64>() {
                Ok(n) => format!("{}={}", name, n + 1),
                Err(_) => format!("{}={}", name, PROBE_VALUE),
            };

            let mut substituted = pairs.clone();
            substituted[i] = &replacement;
            results.push(format!("{}?{}", base, substituted.join("&")));
        }
    }

    results
}

/// Identifier-looking parameter names. The "id" suffix only counts behind a
/// word boundary (`order_id`, `order-id`, `orderId`), so names like `valid`
/// or `paid` are never substituted.
fn is_identifier_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "id"
        || lower == "uid"
        || lower == "user"
        || lower.ends_with("_id")
        || lower.ends_with("-id")
        || name.ends_with("Id")
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[test]
    fn test_numeric_path_segment_incremented() {
        let subs = substitutions("https://api.example.com/api/orders/100");
        assert_eq!(subs, vec!["https://api.example.com/api/orders/101"]);
    }

    #[test]
    fn test_query_identifier_substituted() {
        let subs = substitutions("https://api.example.com/api/orders?order_id=55&sort=asc");
        assert_eq!(
            subs,
            vec!["https://api.example.com/api/orders?order_id=56&sort=asc"]
        );
    }

    #[test]
    fn test_templated_segment_gets_probe_value() {
        let subs = substitutions("https://api.example.com/api/users/{userId}/profile");
        assert_eq!(subs, vec!["https://api.example.com/api/users/1/profile"]);
    }

    #[test]
    fn test_no_identifiers_no_substitutions() {
        assert!(substitutions("https://api.example.com/api/health").is_empty());
    }

    #[test]
    fn test_params_merely_ending_in_id_are_not_identifiers() {
        assert!(substitutions("https://api.example.com/api/orders?valid=true").is_empty());
        assert!(substitutions("https://api.example.com/api/report?paid=false&grid=2").is_empty());
    }

    #[test]
    fn test_camel_case_id_suffix_is_substituted() {
        let subs = substitutions("https://api.example.com/api/orders?orderId=55");
        assert_eq!(subs, vec!["https://api.example.com/api/orders?orderId=56"]);
    }

    #[tokio::test]
    async fn test_non_identifier_param_yields_no_finding() {
        let endpoint = ReplayRequestDescriptor::new("GET", "https://api.example.com/api/orders?valid=true")
            .with_header("Authorization", "Bearer t");

        // Endpoint ignores unknown values and answers 200 either way; a
        // substitution here would be a false positive
        let executor = ScriptedExecutor::new().respond(
            "GET",
            "https://api.example.com/api/orders?valid=1",
            json_response(200, r#"{"orders":[]}"#),
        );

        assert!(IdorProbe.probe(&endpoint, &executor).await.unwrap().is_none());
        assert!(executor.requests().is_empty());
    }

    #[tokio::test]
    async fn test_first_hit_halts_further_substitutions() {
        let endpoint =
            ReplayRequestDescriptor::new("GET", "https://api.example.com/api/orders/100?user_id=7")
                .with_header("Authorization", "Bearer t");

        let executor = ScriptedExecutor::new().respond(
            "GET",
            "https://api.example.com/api/orders/101?user_id=7",
            json_response(200, r#"{"order":101}"#),
        );

        let finding = IdorProbe.probe(&endpoint, &executor).await.unwrap().unwrap();
        assert_eq!(finding.vulnerability_type, VulnerabilityType::Idor);

        // The query substitution was never attempted after the path hit
        assert_eq!(executor.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_denied_substitutions_yield_no_finding() {
        let endpoint = ReplayRequestDescriptor::new("GET", "https://api.example.com/api/orders/100");
        let executor = ScriptedExecutor::new().respond(
            "GET",
            "https://api.example.com/api/orders/101",
            json_response(403, r#"{"error":"forbidden"}"#),
        );

        assert!(IdorProbe.probe(&endpoint, &executor).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_idor_keeps_original_credentials() {
        let endpoint = ReplayRequestDescriptor::new("GET", "https://api.example.com/api/orders/100")
            .with_header("Authorization", "Bearer t");
        let executor = ScriptedExecutor::new().respond(
            "GET",
            "https://api.example.com/api/orders/101",
            json_response(200, r#"{"order":101}"#),
        );

        IdorProbe.probe(&endpoint, &executor).await.unwrap();
        let (_, _, had_auth) = executor.requests()[0].clone();
        assert!(had_auth);
    }
}
