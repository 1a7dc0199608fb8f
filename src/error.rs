//! Custom error types for leakhound
//!
//! Replay and probe failures are returned as typed values so callers can
//! render the specific failure kind with a remediation hint. Scan-level
//! rule errors are recovered locally and never surface here.

use thiserror::Error;

/// Main error type for leakhound operations
#[derive(Error, Debug)]
pub enum LeakhoundError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scanner errors
    #[error("Scanner error: {0}")]
    Scan(#[from] ScanError),

    /// Bucket prober errors
    #[error("Bucket error: {0}")]
    Bucket(#[from] BucketError),

    /// Replay protocol errors
    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {path}")]
    ReadError { path: String, source: std::io::Error },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {field} - {reason}")]
    ValidationError { field: String, reason: String },
}

/// Scanner errors
#[derive(Error, Debug)]
pub enum ScanError {
    /// Isolated per rule; the scan continues without the failing rule.
    #[error("Rule evaluation failed: {rule_id}: {reason}")]
    RuleEvaluation { rule_id: String, reason: String },

    #[error("Scan cancelled")]
    Cancelled,
}

/// Bucket prober errors
#[derive(Error, Debug)]
pub enum BucketError {
    #[error("Unrecognized bucket URL shape: {0}")]
    Parse(String),

    #[error("Unsupported storage provider: {0}")]
    UnsupportedProvider(String),

    #[error("Probe timed out after {0}ms")]
    Timeout(u64),

    #[error("Probe request failed: {0}")]
    Request(String),
}

/// Replay protocol errors, one variant per failure kind in the taxonomy.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Bad target reference or unparseable URL.
    #[error("Invalid replay target or URL: {0}")]
    Parse(String),

    /// No execution pathway succeeded, including failed executor install.
    #[error("No replay pathway succeeded: {0}")]
    Dispatch(String),

    /// Transport failure after both credential modes were attempted.
    #[error("Network failure in both credential modes: {0}")]
    Network(String),

    /// No completion event arrived within the wall-clock bound.
    #[error("Replay timed out after {0}ms")]
    Timeout(u64),
}

impl ReplayError {
    /// Stable failure-kind tag rendered to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            ReplayError::Parse(_) => "PARSE_ERROR",
            ReplayError::Dispatch(_) => "DISPATCH_ERROR",
            ReplayError::Network(_) => "NETWORK_ERROR",
            ReplayError::Timeout(_) => "TIMEOUT_ERROR",
        }
    }
}

/// Trait for providing user-friendly hints
pub trait UserHint {
    fn user_hint(&self) -> String;
}

impl UserHint for ConfigError {
    fn user_hint(&self) -> String {
        match self {
            ConfigError::ReadError { path, .. } => {
                format!("Could not read '{}'. Check if the file exists and you have read permissions.", path)
            }
            ConfigError::ParseError(_) => {
                "The configuration file has invalid syntax. Check for TOML formatting errors.".into()
            }
            ConfigError::ValidationError { field, reason } => {
                format!("Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl UserHint for BucketError {
    fn user_hint(&self) -> String {
        match self {
            BucketError::Parse(url) => {
                format!("'{}' does not look like a cloud storage URL this tool recognizes.", url)
            }
            BucketError::UnsupportedProvider(p) => {
                format!("Provider '{}' is not supported for reachability probing.", p)
            }
            BucketError::Timeout(ms) => {
                format!("The bucket did not respond within {}ms. It may be firewalled or slow.", ms)
            }
            BucketError::Request(_) => {
                "The probe request could not be sent. Check network connectivity.".into()
            }
        }
    }
}

impl UserHint for ReplayError {
    fn user_hint(&self) -> String {
        match self {
            ReplayError::Parse(_) => {
                "The target or URL could not be parsed. Verify the captured request.".into()
            }
            ReplayError::Dispatch(_) => {
                "The request could not be delivered to the target context. The target may have gone away.".into()
            }
            ReplayError::Network(_) => {
                "The endpoint was unreachable with and without credentials. Check the target server.".into()
            }
            ReplayError::Timeout(ms) => {
                format!("No response within {}ms. The endpoint may be hanging; try again or raise the timeout.", ms)
            }
        }
    }
}
