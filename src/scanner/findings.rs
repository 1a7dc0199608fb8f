//! Scan findings and aggregation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Risk tier for a detection rule / finding. The derived order is used for
/// sorting and threshold comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "critical" => RiskLevel::Critical,
            "high" => RiskLevel::High,
            "medium" => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

/// A single detected credential-like match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Rule that produced the match
    pub rule_id: String,

    /// The matched text
    pub matched_text: String,

    /// Risk tier
    pub risk: RiskLevel,

    /// Rule category (aws, github, generic, ...)
    pub category: String,

    /// Byte offset of the match within the scanned content
    pub source_offset: usize,

    /// Cleaned context around the match
    pub context_snippet: String,

    /// When the match was discovered
    pub discovered_at: DateTime<Utc>,
}

impl Finding {
    /// Dedup key within one scan result.
    pub fn key(&self) -> (String, String) {
        (self.rule_id.clone(), self.matched_text.clone())
    }
}

/// A scan result split into matches not seen in earlier scans of the same
/// session and matches already known.
#[derive(Debug, Clone, Default)]
pub struct PartitionedFindings {
    pub new: Vec<Finding>,
    pub seen: Vec<Finding>,
}

/// Merges phase outputs, removes duplicates, sorts by risk, and tracks which
/// (rule, match) pairs earlier scans of this session already reported.
#[derive(Debug, Default)]
pub struct FindingAggregator {
    seen_keys: HashSet<(String, String)>,
}

impl FindingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge phase outputs into the final result list: duplicates collapse
    /// to the highest risk tier, the list is sorted non-increasing by risk,
    /// and discovery order is preserved within a tier.
    pub fn merge(&self, phases: Vec<Vec<Finding>>) -> Vec<Finding> {
        let mut merged: Vec<Finding> = Vec::new();

        for finding in phases.into_iter().flatten() {
            match merged.iter_mut().find(|f| f.key() == finding.key()) {
                Some(existing) => {
                    if finding.risk > existing.risk {
                        existing.risk = finding.risk;
                        existing.category = finding.category;
                    }
                }
                None => merged.push(finding),
            }
        }

        // Stable sort keeps discovery order within a tier
        merged.sort_by(|a, b| b.risk.cmp(&a.risk));
        merged
    }

    /// Partition a merged result into new-vs-previously-seen and record the
    /// new keys. A rescan supersedes the previous result; it is not merged
    /// into it.
    pub fn partition(&mut self, findings: Vec<Finding>) -> PartitionedFindings {
        let mut result = PartitionedFindings::default();

        for finding in findings {
            if self.seen_keys.insert(finding.key()) {
                result.new.push(finding);
            } else {
                result.seen.push(finding);
            }
        }

        result
    }

    pub fn reset(&mut self) {
        self.seen_keys.clear();
    }
}
