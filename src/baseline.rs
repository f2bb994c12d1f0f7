use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// How badly a policy being out of compliance matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Baseline identity carried through to the run report
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BaselineMetadata {
    pub name: String,
    pub version: String,
}

/// One expected-state declaration from the baseline document
#[derive(Debug, Clone, Serialize)]
pub struct BaselineEntry {
    pub policy_name: String,
    /// Raw JSON value; coerced to the catalog's declared type at resolve time
    pub expected_value: serde_json::Value,
    pub description: String,
    pub severity: Severity,
    pub auto_remediate: bool,
}

/// A parsed baseline: metadata plus entries sorted by policy name
///
/// Loaded once per invocation and discarded at process exit. Entry order is
/// fixed alphabetically here so every downstream list is deterministic.
#[derive(Debug, Clone, Serialize)]
pub struct Baseline {
    pub metadata: BaselineMetadata,
    pub entries: Vec<BaselineEntry>,
}

/// Wire form of a single policy declaration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    value: serde_json::Value,
    #[serde(default)]
    description: String,
    severity: Severity,
    #[serde(default)]
    auto_remediate: bool,
}

/// Wire form of the baseline document
///
/// The `policies` field is required: a document without it (or with an empty
/// map) does not describe a baseline and is rejected outright.
#[derive(Debug, Deserialize)]
struct RawBaseline {
    metadata: BaselineMetadata,
    policies: BTreeMap<String, RawEntry>,
}

/// Load a baseline document from a JSON file
pub fn load_baseline(path: &Path) -> Result<Baseline> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read baseline file: {}", path.display()))?;

    parse_baseline(&content)
        .with_context(|| format!("Invalid baseline document: {}", path.display()))
}

/// Parse and validate a baseline document
pub fn parse_baseline(content: &str) -> Result<Baseline> {
    let raw: RawBaseline =
        serde_json::from_str(content).context("Failed to parse baseline JSON")?;

    if raw.policies.is_empty() {
        anyhow::bail!("Baseline must declare at least one policy");
    }

    // BTreeMap iteration gives the alphabetical entry order
    let entries = raw
        .policies
        .into_iter()
        .map(|(policy_name, entry)| BaselineEntry {
            policy_name,
            expected_value: entry.value,
            description: entry.description,
            severity: entry.severity,
            auto_remediate: entry.auto_remediate,
        })
        .collect();

    Ok(Baseline {
        metadata: raw.metadata,
        entries,
    })
}

/// Compute hash of a baseline for report correlation and change detection
pub fn compute_baseline_hash(baseline: &Baseline) -> Result<String> {
    // Serialize to a stable JSON representation
    let json = serde_json::to_string(baseline)
        .context("Failed to serialize baseline for hashing")?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let result = hasher.finalize();

    Ok(format!("sha256:{}", hex::encode(&result)))
}

// Helper module for hex encoding
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
