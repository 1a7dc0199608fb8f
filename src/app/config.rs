//! Application configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::bucket::Provider;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Scanner settings
    pub scanner: ScannerConfig,

    /// Bucket prober settings
    pub buckets: BucketConfig,

    /// Replay protocol settings
    pub replay: ReplayConfig,

    /// Security probe settings
    pub probes: ProbeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Category name -> enabled. Categories missing from the map are enabled.
    pub enabled_categories: HashMap<String, bool>,

    /// Minimum risk level included in results ("low".."critical")
    pub risk_threshold: String,

    /// Entropy gate in bits per character
    pub entropy_threshold: f64,

    /// Context window size on each side of a match, in characters
    pub context_window: usize,

    /// Debounce settling window for repeated scan triggers
    pub debounce_ms: u64,

    /// Yield to the runtime after this many matches
    pub yield_every: usize,

    /// Domains for which scanning is skipped entirely
    pub whitelist_domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    /// Per-provider probe toggles. Providers missing from the map are enabled.
    pub enabled_providers: HashMap<String, bool>,

    /// Maximum simultaneous probes in flight
    pub concurrency: usize,

    /// Per-probe timeout in milliseconds
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Wall-clock bound for one replayed request
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Maximum endpoints probed simultaneously in a batch run
    pub concurrency: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled_categories: HashMap::new(),
            risk_threshold: "low".to_string(),
            entropy_threshold: 3.5,
            context_window: 50,
            debounce_ms: 300,
            yield_every: 16,
            whitelist_domains: Vec::new(),
        }
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            enabled_providers: HashMap::new(),
            concurrency: 3,
            timeout_ms: 5000,
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { concurrency: 3 }
    }
}

impl ScannerConfig {
    /// Whether a rule category is enabled. Unknown categories default to on.
    pub fn category_enabled(&self, category: &str) -> bool {
        self.enabled_categories.get(category).copied().unwrap_or(true)
    }

    /// Whether a domain (or any parent domain) is whitelisted.
    pub fn is_whitelisted(&self, domain: &str) -> bool {
        let domain = domain.to_ascii_lowercase();
        self.whitelist_domains.iter().any(|w| {
            let w = w.to_ascii_lowercase();
            domain == w || domain.ends_with(&format!(".{}", w))
        })
    }
}

impl BucketConfig {
    pub fn provider_enabled(&self, provider: Provider) -> bool {
        self.enabled_providers
            .get(provider.as_str())
            .copied()
            .unwrap_or(true)
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;

            let config: Config = toml::from_str(&contents)
                .with_context(|| "Failed to parse configuration file")?;

            tracing::info!("Loaded configuration from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<&str>) -> Result<()> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)?;

        tracing::info!("Saved configuration to {:?}", config_path);
        Ok(())
    }

    /// Get default configuration file path
    fn default_config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("io", "leakhound", "leakhound")
            .context("Failed to determine config directory")?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
