//! Leakhound - Credential Leak Scanner
//!
//! Inspects rendered page content for leaked credentials, probes referenced
//! cloud-storage buckets for public exposure, replays captured network calls
//! under the original page's authentication context, and runs a small suite
//! of access-control probes on top of the replay mechanism.

pub mod app;
pub mod bucket;
pub mod error;
pub mod http;
pub mod probes;
pub mod replay;
pub mod reporting;
pub mod scanner;

pub use error::{LeakhoundError, UserHint};
