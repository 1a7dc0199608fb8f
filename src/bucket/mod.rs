//! Cloud storage bucket parsing and reachability probing

mod prober;

pub use prober::{BucketProbeResult, BucketProber};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::BucketError;

/// Cloud object-storage provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Gcp,
    Azure,
    DigitalOcean,
    Alibaba,
    Unknown,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
            Provider::Azure => "azure",
            Provider::DigitalOcean => "digitalocean",
            Provider::Alibaba => "alibaba",
            Provider::Unknown => "unknown",
        }
    }
}

/// A parsed reference to a cloud storage container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketCandidate {
    /// URL as it appeared in scanned content
    pub raw_url: String,

    /// Classified provider
    pub provider: Provider,

    /// Container name
    pub bucket_name: String,

    /// Region, where the URL shape carries one
    pub region: Option<String>,

    /// Listing-probe URLs appropriate for the provider
    pub candidate_endpoints: Vec<String>,
}

/// Parse a bucket reference by URL shape. Recognizes virtual-hosted and
/// path-style forms plus the `s3://` scheme; anything else is a parse error.
pub fn parse(raw: &str) -> Result<BucketCandidate, BucketError> {
    let raw = raw.trim();

    if let Some(rest) = raw.strip_prefix("s3://") {
        let bucket = rest.split('/').next().unwrap_or("");
        if bucket.is_empty() {
            return Err(BucketError::Parse(raw.to_string()));
        }
        return Ok(candidate(raw, Provider::Aws, bucket, None, None));
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&with_scheme).map_err(|_| BucketError::Parse(raw.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| BucketError::Parse(raw.to_string()))?
        .to_ascii_lowercase();
    let first_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    // AWS path-style: s3.amazonaws.com/bucket or s3.region.amazonaws.com/bucket
    if host == "s3.amazonaws.com" || (host.starts_with("s3.") && host.ends_with(".amazonaws.com")) {
        let bucket = first_segment.ok_or_else(|| BucketError::Parse(raw.to_string()))?;
        let region = host
            .strip_prefix("s3.")
            .and_then(|r| r.strip_suffix(".amazonaws.com"))
            .filter(|r| !r.is_empty())
            .map(|r| r.to_string());
        return Ok(candidate(raw, Provider::Aws, &bucket, region, None));
    }

    // AWS virtual-hosted: bucket.s3.amazonaws.com, bucket.s3.region.amazonaws.com,
    // bucket.s3-region.amazonaws.com
    if host.ends_with(".amazonaws.com") {
        if let Some(idx) = host.find(".s3").filter(|&i| i > 0) {
            let bucket = &host[..idx];
            let middle = &host[idx + 1..host.len() - ".amazonaws.com".len()];
            let region = middle
                .strip_prefix("s3.")
                .or_else(|| middle.strip_prefix("s3-"))
                .filter(|r| !r.is_empty())
                .map(|r| r.to_string());
            return Ok(candidate(raw, Provider::Aws, bucket, region, None));
        }
        return Err(BucketError::Parse(raw.to_string()));
    }

    // GCP path-style: storage.googleapis.com/bucket
    if host == "storage.googleapis.com" {
        let bucket = first_segment.ok_or_else(|| BucketError::Parse(raw.to_string()))?;
        return Ok(candidate(raw, Provider::Gcp, &bucket, None, None));
    }

    // GCP virtual-hosted: bucket.storage.googleapis.com
    if let Some(bucket) = host.strip_suffix(".storage.googleapis.com") {
        return Ok(candidate(raw, Provider::Gcp, bucket, None, None));
    }

    // Azure: account.blob.core.windows.net/container
    if let Some(account) = host.strip_suffix(".blob.core.windows.net") {
        let container = first_segment.ok_or_else(|| BucketError::Parse(raw.to_string()))?;
        return Ok(candidate(
            raw,
            Provider::Azure,
            &container,
            None,
            Some(account.to_string()),
        ));
    }

    // DigitalOcean: bucket.region.digitaloceanspaces.com
    if let Some(prefix) = host.strip_suffix(".digitaloceanspaces.com") {
        let mut parts = prefix.rsplitn(2, '.');
        let region = parts.next().unwrap_or("").to_string();
        if let Some(bucket) = parts.next() {
            return Ok(candidate(
                raw,
                Provider::DigitalOcean,
                bucket,
                Some(region),
                None,
            ));
        }
        // region.digitaloceanspaces.com/bucket
        let bucket = first_segment.ok_or_else(|| BucketError::Parse(raw.to_string()))?;
        return Ok(candidate(
            raw,
            Provider::DigitalOcean,
            &bucket,
            Some(region),
            None,
        ));
    }

    // Alibaba: bucket.oss-region.aliyuncs.com
    if let Some(prefix) = host.strip_suffix(".aliyuncs.com") {
        if let Some((bucket, oss_region)) = prefix.split_once(".oss-") {
            return Ok(candidate(
                raw,
                Provider::Alibaba,
                bucket,
                Some(oss_region.to_string()),
                None,
            ));
        }
        return Err(BucketError::Parse(raw.to_string()));
    }

    Err(BucketError::Parse(raw.to_string()))
}

fn candidate(
    raw: &str,
    provider: Provider,
    bucket: &str,
    region: Option<String>,
    azure_account: Option<String>,
) -> BucketCandidate {
    let candidate_endpoints =
        listing_endpoints(provider, bucket, region.as_deref(), azure_account.as_deref());

    BucketCandidate {
        raw_url: raw.to_string(),
        provider,
        bucket_name: bucket.to_string(),
        region,
        candidate_endpoints,
    }
}

/// Provider-appropriate listing probe URLs, most specific first.
fn listing_endpoints(
    provider: Provider,
    bucket: &str,
    region: Option<&str>,
    azure_account: Option<&str>,
) -> Vec<String> {
    match provider {
        Provider::Aws => {
            let mut endpoints = Vec::new();
            if let Some(region) = region {
                endpoints.push(format!(
                    "https://{}.s3.{}.amazonaws.com/?list-type=2",
                    bucket, region
                ));
            }
            endpoints.push(format!("https://{}.s3.amazonaws.com/?list-type=2", bucket));
            endpoints.push(format!("https://s3.amazonaws.com/{}?list-type=2", bucket));
            endpoints
        }
        Provider::Gcp => vec![
            format!("https://storage.googleapis.com/storage/v1/b/{}/o", bucket),
            format!("https://storage.googleapis.com/{}/", bucket),
        ],
        Provider::Azure => {
            let account = azure_account.unwrap_or(bucket);
            vec![format!(
                "https://{}.blob.core.windows.net/{}?restype=container&comp=list",
                account, bucket
            )]
        }
        Provider::DigitalOcean => {
            let region = region.unwrap_or("nyc3");
            vec![format!(
                "https://{}.{}.digitaloceanspaces.com/",
                bucket, region
            )]
        }
        Provider::Alibaba => {
            let region = region.unwrap_or("cn-hangzhou");
            vec![format!("https://{}.oss-{}.aliyuncs.com/", bucket, region)]
        }
        Provider::Unknown => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_style_s3() {
        let c = parse("https://s3.amazonaws.com/my-bucket/file.png").unwrap();
        assert_eq!(c.provider, Provider::Aws);
        assert_eq!(c.bucket_name, "my-bucket");
        assert_eq!(c.region, None);
    }

    #[test]
    fn test_parse_virtual_hosted_s3_with_region() {
        let c = parse("https://assets.s3.eu-west-1.amazonaws.com/logo.png").unwrap();
        assert_eq!(c.provider, Provider::Aws);
        assert_eq!(c.bucket_name, "assets");
        assert_eq!(c.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_parse_s3_scheme() {
        let c = parse("s3://backups/db.sql").unwrap();
        assert_eq!(c.provider, Provider::Aws);
        assert_eq!(c.bucket_name, "backups");
    }

    #[test]
    fn test_parse_gcp_both_forms() {
        let path = parse("https://storage.googleapis.com/my-data/file").unwrap();
        assert_eq!(path.provider, Provider::Gcp);
        assert_eq!(path.bucket_name, "my-data");

        let hosted = parse("https://my-data.storage.googleapis.com/file").unwrap();
        assert_eq!(hosted.provider, Provider::Gcp);
        assert_eq!(hosted.bucket_name, "my-data");
    }

    #[test]
    fn test_parse_azure_container() {
        let c = parse("https://corp.blob.core.windows.net/backups/x.zip").unwrap();
        assert_eq!(c.provider, Provider::Azure);
        assert_eq!(c.bucket_name, "backups");
        assert!(c.candidate_endpoints[0].contains("corp.blob.core.windows.net/backups"));
    }

    #[test]
    fn test_parse_digitalocean_space() {
        let c = parse("https://media.nyc3.digitaloceanspaces.com/a.jpg").unwrap();
        assert_eq!(c.provider, Provider::DigitalOcean);
        assert_eq!(c.bucket_name, "media");
        assert_eq!(c.region.as_deref(), Some("nyc3"));
    }

    #[test]
    fn test_parse_alibaba_oss() {
        let c = parse("https://cdn.oss-cn-shanghai.aliyuncs.com/a.js").unwrap();
        assert_eq!(c.provider, Provider::Alibaba);
        assert_eq!(c.bucket_name, "cdn");
        assert_eq!(c.region.as_deref(), Some("cn-shanghai"));
    }

    #[test]
    fn test_unknown_shape_is_parse_error() {
        assert!(matches!(
            parse("https://example.com/file.png"),
            Err(BucketError::Parse(_))
        ));
        assert!(matches!(parse("not a url at all%%%"), Err(BucketError::Parse(_))));
    }

    #[test]
    fn test_aws_endpoints_include_region_form() {
        let c = parse("https://assets.s3.eu-west-1.amazonaws.com/x").unwrap();
        assert!(c.candidate_endpoints[0].contains("s3.eu-west-1.amazonaws.com"));
        assert!(c.candidate_endpoints.iter().all(|e| e.contains("list-type=2")));
    }
}
