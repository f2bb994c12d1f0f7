use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

use crate::engine::{ComplianceResult, RemediationOutcome, Summary};
use crate::provider::{Platform, Scope};

/// Identity and context for one reconciliation run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub baseline_path: String,
    pub baseline_name: String,
    pub baseline_version: String,
    pub baseline_hash: String,
    pub platform: Platform,
    pub scope: Scope,
    pub enforcement_mode: bool,
    pub exit_code: i32,
}

/// Terminal artifact of a reconciliation run
///
/// Always produced except when the baseline itself fails to load. Written to
/// a file sink and/or printed; never persisted beyond the run by this tool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationReport {
    pub metadata: ReportMetadata,
    pub summary: Summary,
    pub compliance_results: Vec<ComplianceResult>,
    pub remediation_outcomes: Vec<RemediationOutcome>,
}

impl RemediationReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }

    /// Write the report to a file atomically
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let content = self.to_json()?;

        crate::provider::common::atomic_write(path, content.as_bytes())
            .with_context(|| format!("Failed to write report file: {}", path.display()))?;

        crate::provider::common::set_permissions_readable_all(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::Severity;
    use crate::engine::{ComplianceStatus, RemediationAction};
    use crate::value::PolicyValue;

    fn make_report() -> RemediationReport {
        let results = vec![ComplianceResult {
            policy_name: "FirewallEnabled".to_string(),
            description: "Enables the firewall".to_string(),
            severity: Severity::Critical,
            current_value: None,
            expected_value: PolicyValue::Bool(true),
            status: ComplianceStatus::Missing,
            auto_remediate: true,
            timestamp: Utc::now(),
        }];

        let outcomes = vec![RemediationOutcome {
            policy_name: "FirewallEnabled".to_string(),
            action: RemediationAction::Remediated,
            old_value: None,
            new_value: Some(PolicyValue::Bool(true)),
            success: true,
            message: "set to true".to_string(),
            timestamp: Utc::now(),
        }];

        RemediationReport {
            metadata: ReportMetadata {
                run_id: Uuid::new_v4(),
                timestamp: Utc::now(),
                baseline_path: "/etc/baselines/workstation.json".to_string(),
                baseline_name: "Workstation Security".to_string(),
                baseline_version: "1.2".to_string(),
                baseline_hash: "sha256:abc".to_string(),
                platform: Platform::MacOs,
                scope: Scope::Machine,
                enforcement_mode: true,
                exit_code: 0,
            },
            summary: crate::engine::summarize(&results, &outcomes),
            compliance_results: results,
            remediation_outcomes: outcomes,
        }
    }

    #[test]
    fn report_serializes_with_camel_case_keys() {
        let json = make_report().to_json().unwrap();

        assert!(json.contains("\"runId\""));
        assert!(json.contains("\"baselineName\""));
        assert!(json.contains("\"baselineHash\""));
        assert!(json.contains("\"enforcementMode\""));
        assert!(json.contains("\"exitCode\""));
        assert!(json.contains("\"totalPolicies\""));
        assert!(json.contains("\"nonCompliantPolicies\""));
        assert!(json.contains("\"complianceResults\""));
        assert!(json.contains("\"remediationOutcomes\""));
    }

    #[test]
    fn statuses_and_actions_use_camel_case_values() {
        let json = make_report().to_json().unwrap();

        assert!(json.contains("\"missing\""));
        assert!(json.contains("\"remediated\""));
        assert!(json.contains("\"macos\""));
    }

    #[test]
    fn absent_current_values_are_omitted() {
        let json = make_report().to_json().unwrap();
        assert!(!json.contains("\"currentValue\""));
        assert!(json.contains("\"expectedValue\""));
    }

    #[test]
    fn report_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");

        make_report().write_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(
            parsed["metadata"]["baselineName"],
            serde_json::json!("Workstation Security")
        );
        assert_eq!(parsed["summary"]["remediationSuccesses"], serde_json::json!(1));
    }
}
