use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::baseline::{Baseline, Severity};
use crate::catalog::Catalog;
use crate::provider::{Platform, ProviderError, Scope};
use crate::router::{PolicyError, PolicyRouter};
use crate::value::PolicyValue;

/// Where a policy stands relative to its baseline expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Missing,
}

/// Assessment verdict for one baseline entry; immutable once created
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceResult {
    pub policy_name: String,
    pub description: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<PolicyValue>,
    pub expected_value: PolicyValue,
    pub status: ComplianceStatus,
    pub auto_remediate: bool,
    pub timestamp: DateTime<Utc>,
}

/// What enforcement did (or deliberately did not do) for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RemediationAction {
    Remediated,
    AttemptedFailed,
    Skipped,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationOutcome {
    pub policy_name: String,
    pub action: RemediationAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<PolicyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<PolicyValue>,
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate counts for one reconciliation run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_policies: usize,
    pub compliant_policies: usize,
    pub non_compliant_policies: usize,
    pub missing_policies: usize,
    pub remediation_attempts: usize,
    pub remediation_successes: usize,
    pub remediation_failures: usize,
}

/// Final status of a reconciliation run, mapped onto the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    NonCompliance,
    RemediationFailures,
    CriticalError,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::NonCompliance => 1,
            ExitStatus::RemediationFailures => 2,
            ExitStatus::CriticalError => 3,
        }
    }
}

/// A baseline entry resolved against the catalog
///
/// The expected value has already been coerced to the policy's declared
/// type, so assessment compares exactly, type included.
#[derive(Debug, Clone)]
pub struct ResolvedEntry {
    pub policy_name: String,
    pub description: String,
    pub severity: Severity,
    pub auto_remediate: bool,
    pub expected: PolicyValue,
}

/// Drives one reconciliation run: resolve, assess, optionally enforce
pub struct Reconciler<'a> {
    catalog: &'a Catalog,
    router: &'a PolicyRouter<'a>,
    platform: Platform,
    scope: Scope,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        catalog: &'a Catalog,
        router: &'a PolicyRouter<'a>,
        platform: Platform,
        scope: Scope,
    ) -> Self {
        Self {
            catalog,
            router,
            platform,
            scope,
        }
    }

    /// Resolve every baseline entry against the catalog
    ///
    /// A baseline referencing an unknown policy, or declaring an expected
    /// value that cannot be coerced to the policy's type, is a fatal error:
    /// nothing is assessed and no report is produced.
    pub fn resolve(&self, baseline: &Baseline) -> Result<Vec<ResolvedEntry>> {
        baseline
            .entries
            .iter()
            .map(|entry| {
                let def = self
                    .catalog
                    .lookup(self.platform, &entry.policy_name)
                    .with_context(|| {
                        format!("Baseline references unknown policy '{}'", entry.policy_name)
                    })?;

                let expected = PolicyValue::from_json(&entry.expected_value, def.value_type)
                    .with_context(|| {
                        format!(
                            "Expected value for '{}' is not a valid {}",
                            entry.policy_name, def.value_type
                        )
                    })?;

                let description = if entry.description.is_empty() {
                    def.description.to_string()
                } else {
                    entry.description.clone()
                };

                Ok(ResolvedEntry {
                    policy_name: entry.policy_name.clone(),
                    description,
                    severity: entry.severity,
                    auto_remediate: entry.auto_remediate,
                    expected,
                })
            })
            .collect()
    }

    /// Assess every entry independently; one result per entry, no early exit
    ///
    /// A provider failure on one entry degrades that entry to `Missing`
    /// (current value unknown) and the run continues.
    pub fn assess(&self, entries: &[ResolvedEntry]) -> Result<Vec<ComplianceResult>> {
        let mut results = Vec::with_capacity(entries.len());

        for entry in entries {
            let current = match self.router.get_policy(self.platform, &entry.policy_name, self.scope)
            {
                Ok(setting) => setting.value,
                Err(PolicyError::Provider(e)) => {
                    warn!(
                        "Provider failure reading '{}', treating as missing: {}",
                        entry.policy_name, e
                    );
                    None
                }
                Err(e @ PolicyError::UnknownPolicy { .. }) => {
                    // Resolve already vetted every name; reaching this means
                    // the catalog lookup infrastructure itself is broken
                    return Err(anyhow::Error::new(e).context("catalog lookup failed during assessment"));
                }
            };

            let status = match &current {
                Some(value) if *value == entry.expected => ComplianceStatus::Compliant,
                Some(_) => ComplianceStatus::NonCompliant,
                None => ComplianceStatus::Missing,
            };

            debug!(
                "Assessed '{}': {:?} (current: {:?}, expected: {})",
                entry.policy_name, status, current, entry.expected
            );

            results.push(ComplianceResult {
                policy_name: entry.policy_name.clone(),
                description: entry.description.clone(),
                severity: entry.severity,
                current_value: current,
                expected_value: entry.expected.clone(),
                status,
                auto_remediate: entry.auto_remediate,
                timestamp: Utc::now(),
            });
        }

        Ok(results)
    }

    /// Remediate every non-compliant entry: one write attempt each, no retries
    ///
    /// Entries with auto-remediate disabled get a `Skipped` outcome and are
    /// never written. A write is verified by reading the value back; a write
    /// that does not stick is `AttemptedFailed`, a provider error is `Error`.
    pub fn enforce(
        &self,
        entries: &[ResolvedEntry],
        results: &[ComplianceResult],
    ) -> Vec<RemediationOutcome> {
        let mut outcomes = Vec::new();

        for (entry, result) in entries.iter().zip(results) {
            if result.status == ComplianceStatus::Compliant {
                continue;
            }

            if !entry.auto_remediate {
                debug!("Skipping '{}': remediation disabled", entry.policy_name);
                outcomes.push(RemediationOutcome {
                    policy_name: entry.policy_name.clone(),
                    action: RemediationAction::Skipped,
                    old_value: result.current_value.clone(),
                    new_value: None,
                    success: false,
                    message: "remediation disabled for this policy".to_string(),
                    timestamp: Utc::now(),
                });
                continue;
            }

            outcomes.push(self.remediate_entry(entry, result));
        }

        outcomes
    }

    fn remediate_entry(
        &self,
        entry: &ResolvedEntry,
        result: &ComplianceResult,
    ) -> RemediationOutcome {
        info!(
            "Remediating '{}': {:?} -> {}",
            entry.policy_name, result.current_value, entry.expected
        );

        let write = self.router.set_policy(
            self.platform,
            &entry.policy_name,
            &entry.expected,
            self.scope,
        );

        let (action, new_value, success, message) = match write {
            Ok(()) => {
                // Verify the write stuck before claiming success
                match self
                    .router
                    .get_policy(self.platform, &entry.policy_name, self.scope)
                {
                    Ok(setting) if setting.value.as_ref() == Some(&entry.expected) => (
                        RemediationAction::Remediated,
                        Some(entry.expected.clone()),
                        true,
                        format!("set to {}", entry.expected),
                    ),
                    Ok(setting) => (
                        RemediationAction::AttemptedFailed,
                        setting.value,
                        false,
                        "value did not persist after write".to_string(),
                    ),
                    Err(e) => (
                        RemediationAction::AttemptedFailed,
                        None,
                        false,
                        format!("verification read failed: {}", e),
                    ),
                }
            }
            Err(e) => {
                if matches!(e, PolicyError::Provider(ProviderError::AccessDenied(_))) {
                    warn!(
                        "Access denied writing '{}'; run with elevated privileges",
                        entry.policy_name
                    );
                }
                (
                    RemediationAction::Error,
                    None,
                    false,
                    e.to_string(),
                )
            }
        };

        RemediationOutcome {
            policy_name: entry.policy_name.clone(),
            action,
            old_value: result.current_value.clone(),
            new_value,
            success,
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Aggregate counts from results and outcomes
pub fn summarize(results: &[ComplianceResult], outcomes: &[RemediationOutcome]) -> Summary {
    let mut summary = Summary {
        total_policies: results.len(),
        ..Summary::default()
    };

    for result in results {
        match result.status {
            ComplianceStatus::Compliant => summary.compliant_policies += 1,
            ComplianceStatus::NonCompliant => summary.non_compliant_policies += 1,
            ComplianceStatus::Missing => summary.missing_policies += 1,
        }
    }

    for outcome in outcomes {
        match outcome.action {
            RemediationAction::Skipped => {}
            RemediationAction::Remediated => {
                summary.remediation_attempts += 1;
                summary.remediation_successes += 1;
            }
            RemediationAction::AttemptedFailed | RemediationAction::Error => {
                summary.remediation_attempts += 1;
                summary.remediation_failures += 1;
            }
        }
    }

    summary
}

/// Map a run's counts onto its exit status
///
/// Pure function of the summary: the outcome never depends on entry order.
pub fn compute_exit_status(summary: &Summary, enforcing: bool) -> ExitStatus {
    let drifted = summary.non_compliant_policies + summary.missing_policies;

    if !enforcing {
        if drifted == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::NonCompliance
        }
    } else if summary.remediation_failures > 0 {
        ExitStatus::RemediationFailures
    } else if drifted > summary.remediation_successes {
        ExitStatus::NonCompliance
    } else {
        ExitStatus::Success
    }
}
