//! Match validation
//!
//! Stateless false-positive suppression applied to every raw rule match:
//! an entropy gate for rules matching generic token shapes, a cleaned
//! context window, and per-rule exclusion expressions tested against that
//! window. Deterministic for a given (match, context, rule) triple.

use super::rules::{is_placeholder, DetectionRule};

/// Validator configuration, taken from `ScannerConfig` at scan time.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorOptions {
    /// Minimum Shannon entropy in bits per character
    pub entropy_threshold: f64,

    /// Characters kept on each side of a match
    pub context_window: usize,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            entropy_threshold: 3.5,
            context_window: 50,
        }
    }
}

/// Shannon entropy over the byte distribution, in bits per character.
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq = [0u32; 256];
    let len = s.len() as f64;

    for byte in s.bytes() {
        freq[byte as usize] += 1;
    }

    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Extract the cleaned context window around a match: `window` characters on
/// each side, markup stripped, whitespace collapsed.
pub fn context_window(content: &str, start: usize, end: usize, window: usize) -> String {
    let from = content[..start]
        .char_indices()
        .rev()
        .nth(window.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = content[end..]
        .char_indices()
        .nth(window)
        .map(|(i, _)| end + i)
        .unwrap_or(content.len());

    clean_context(&content[from..to])
}

/// Strip markup tags and collapse whitespace runs to single spaces.
fn clean_context(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    let mut last_space = false;

    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                // A tag boundary separates words
                if !last_space && !out.is_empty() {
                    out.push(' ');
                    last_space = true;
                }
            }
            _ if in_tag => {}
            c if c.is_whitespace() => {
                if !last_space && !out.is_empty() {
                    out.push(' ');
                    last_space = true;
                }
            }
            c => {
                out.push(c);
                last_space = false;
            }
        }
    }

    out.trim_end().to_string()
}

/// Validate one raw match. Returns false when the finding must be dropped.
pub fn validate(
    matched: &str,
    context: &str,
    rule: &DetectionRule,
    options: &ValidatorOptions,
) -> bool {
    // Exclusion expressions fire on the context window, not the match
    for exclusion in &rule.exclusions {
        if exclusion.is_match(context) {
            return false;
        }
    }

    if rule.entropy_gated {
        // A generic token shape has to carry actual information to count
        if is_placeholder(matched) {
            return false;
        }
        if is_uniform(matched) {
            return false;
        }

        let token = credential_portion(matched);
        if shannon_entropy(token) < options.entropy_threshold {
            return false;
        }
    }

    true
}

/// A repeated-character or single-class string can never be a live secret.
fn is_uniform(s: &str) -> bool {
    let mut chars = s.chars().filter(|c| c.is_ascii_alphanumeric());
    match chars.next() {
        Some(first) => {
            let rest: Vec<char> = chars.collect();
            rest.iter().all(|&c| c == first)
                || (s.chars().all(|c| c.is_ascii_digit() || !c.is_ascii_alphanumeric())
                    && !rest.is_empty())
        }
        None => true,
    }
}

/// For key=value shaped matches the entropy gate applies to the value, not
/// the surrounding assignment syntax.
fn credential_portion(matched: &str) -> &str {
    matched
        .rsplit(|c| c == ':' || c == '=')
        .next()
        .map(|v| v.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace()))
        .filter(|v| !v.is_empty())
        .unwrap_or(matched)
}
