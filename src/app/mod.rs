//! Application-level configuration

mod config;

pub use config::{BucketConfig, Config, ProbeConfig, ReplayConfig, ScannerConfig};
