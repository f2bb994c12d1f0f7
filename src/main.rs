use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

mod baseline;
mod catalog;
mod cli;
mod engine;
mod provider;
mod report;
mod router;
mod value;

use catalog::Catalog;
use cli::{Args, Commands};
use engine::{ComplianceResult, ComplianceStatus, ExitStatus, Reconciler, RemediationAction, ResolvedEntry};
use provider::{Platform, Scope};
use report::{RemediationReport, ReportMetadata};
use router::PolicyRouter;
use value::PolicyValue;

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let status = match run(args) {
        Ok(status) => status,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitStatus::CriticalError
        }
    };

    std::process::exit(status.code());
}

/// Initialize logging
///
/// Diagnostics go to stderr so `--json` report output on stdout stays clean.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn run(args: Args) -> Result<ExitStatus> {
    match args.command {
        Commands::Scan {
            baseline,
            scope,
            report,
            json,
        } => run_reconcile(ReconcileOptions {
            baseline_path: baseline,
            scope,
            report_path: report,
            json,
            enforce: false,
            dry_run: false,
        }),
        Commands::Enforce {
            baseline,
            scope,
            report,
            json,
            dry_run,
        } => run_reconcile(ReconcileOptions {
            baseline_path: baseline,
            scope,
            report_path: report,
            json,
            enforce: true,
            dry_run,
        }),
        Commands::GetPolicy { name, scope } => get_policy_cmd(&name, scope),
        Commands::SetPolicy { name, value, scope } => set_policy_cmd(&name, &value, scope),
        Commands::ListPolicies { platform } => {
            list_policies(platform);
            Ok(ExitStatus::Success)
        }
    }
}

/// Read and print one policy's current value
fn get_policy_cmd(name: &str, scope: Scope) -> Result<ExitStatus> {
    let platform = Platform::current()
        .context("This host platform has no native settings store support")?;

    let catalog = Catalog::builtin();
    let router = PolicyRouter::new(&catalog, provider::native_provider(platform)?);

    let setting = router.get_policy(platform, name, scope)?;
    match setting.value {
        Some(value) => println!("{} = {}", setting.policy_name, value),
        None => println!("{} is not set", setting.policy_name),
    }

    Ok(ExitStatus::Success)
}

/// Write one policy value, coerced through its declared type
fn set_policy_cmd(name: &str, raw: &str, scope: Scope) -> Result<ExitStatus> {
    let platform = Platform::current()
        .context("This host platform has no native settings store support")?;

    let catalog = Catalog::builtin();
    let def = catalog.lookup(platform, name)?;

    // Accept JSON literals (true, 900) and bare strings alike
    let json: serde_json::Value = serde_json::from_str(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    let value = PolicyValue::from_json(&json, def.value_type)
        .with_context(|| format!("Invalid value for '{}'", name))?;

    let router = PolicyRouter::new(&catalog, provider::native_provider(platform)?);
    router.set_policy(platform, name, &value, scope)?;
    println!("✓ {} set to {}", name, value);

    Ok(ExitStatus::Success)
}

struct ReconcileOptions {
    baseline_path: PathBuf,
    scope: Scope,
    report_path: Option<PathBuf>,
    json: bool,
    enforce: bool,
    dry_run: bool,
}

/// One full reconciliation run: load, assess, optionally enforce, report
fn run_reconcile(opts: ReconcileOptions) -> Result<ExitStatus> {
    let platform = Platform::current()
        .context("This host platform has no native settings store support")?;

    // A baseline that fails to load is the one fatal, report-less error
    let parsed = baseline::load_baseline(&opts.baseline_path)?;
    let baseline_hash = baseline::compute_baseline_hash(&parsed)?;

    let enforcing = opts.enforce && !opts.dry_run;

    if !opts.json {
        println!(
            "Host Configuration Baseline Manager v{}",
            env!("CARGO_PKG_VERSION")
        );
        println!("Platform: {}", platform);
        println!(
            "Baseline: {} v{} ({} policies)",
            parsed.metadata.name,
            parsed.metadata.version,
            parsed.entries.len()
        );
        println!();
    }

    if enforcing {
        // Missing rights are a warning, not a stop: write failures show up
        // in the report instead
        if let Err(e) = provider::common::ensure_admin_privileges() {
            tracing::warn!(
                "Not running with elevated privileges: {:#}. Remediation writes may fail.",
                e
            );
        }
    }

    let catalog = Catalog::builtin();
    let native = provider::native_provider(platform)?;
    let router = PolicyRouter::new(&catalog, native);
    let reconciler = Reconciler::new(&catalog, &router, platform, opts.scope);

    let entries = reconciler.resolve(&parsed)?;
    let results = reconciler.assess(&entries)?;

    let outcomes = if enforcing {
        reconciler.enforce(&entries, &results)
    } else {
        if opts.dry_run && !opts.json {
            print_dry_run(&entries, &results);
        }
        Vec::new()
    };

    let summary = engine::summarize(&results, &outcomes);
    let status = engine::compute_exit_status(&summary, enforcing);

    let report = RemediationReport {
        metadata: ReportMetadata {
            run_id: uuid::Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            baseline_path: opts.baseline_path.display().to_string(),
            baseline_name: parsed.metadata.name.clone(),
            baseline_version: parsed.metadata.version.clone(),
            baseline_hash,
            platform,
            scope: opts.scope,
            enforcement_mode: enforcing,
            exit_code: status.code(),
        },
        summary,
        compliance_results: results,
        remediation_outcomes: outcomes,
    };

    if let Some(path) = &opts.report_path {
        report.write_to(path)?;
        if !opts.json {
            println!("✓ Report written to: {}", path.display());
            println!();
        }
    }

    if opts.json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report);
    }

    Ok(status)
}

/// Print the human-readable run summary
fn print_report(report: &RemediationReport) {
    println!("Compliance results:");
    for result in &report.compliance_results {
        match result.status {
            ComplianceStatus::Compliant => {
                println!("  ✓ {}", result.policy_name);
            }
            ComplianceStatus::NonCompliant => {
                let current = result
                    .current_value
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!(
                    "  ✗ {}: expected {}, found {}",
                    result.policy_name, result.expected_value, current
                );
            }
            ComplianceStatus::Missing => {
                println!(
                    "  - {}: expected {}, not set",
                    result.policy_name, result.expected_value
                );
            }
        }
    }

    if !report.remediation_outcomes.is_empty() {
        println!();
        println!("Remediation:");
        for outcome in &report.remediation_outcomes {
            match outcome.action {
                RemediationAction::Remediated => {
                    println!("  ✓ {}: {}", outcome.policy_name, outcome.message);
                }
                RemediationAction::Skipped => {
                    println!("  - {}: {}", outcome.policy_name, outcome.message);
                }
                RemediationAction::AttemptedFailed | RemediationAction::Error => {
                    println!("  ✗ {}: {}", outcome.policy_name, outcome.message);
                }
            }
        }
    }

    println!();
    let summary = &report.summary;
    println!(
        "Summary: {} policies - {} compliant, {} non-compliant, {} missing",
        summary.total_policies,
        summary.compliant_policies,
        summary.non_compliant_policies,
        summary.missing_policies
    );
    if report.metadata.enforcement_mode {
        println!(
            "Remediation: {} attempted, {} succeeded, {} failed",
            summary.remediation_attempts,
            summary.remediation_successes,
            summary.remediation_failures
        );
    }
}

/// Show what enforcement would do, without writing anything
fn print_dry_run(entries: &[ResolvedEntry], results: &[ComplianceResult]) {
    println!("DRY RUN MODE - No changes will be made");
    println!();

    for (entry, result) in entries.iter().zip(results) {
        if result.status == ComplianceStatus::Compliant {
            continue;
        }

        if entry.auto_remediate {
            let current = result
                .current_value
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "not set".to_string());
            println!(
                "[DRY RUN] Would set {} = {} (currently {})",
                entry.policy_name, entry.expected, current
            );
        } else {
            println!(
                "[DRY RUN] Would skip {} (remediation disabled)",
                entry.policy_name
            );
        }
    }
    println!();
}

/// Print the catalog listing
fn list_policies(platform: Option<Platform>) {
    let catalog = Catalog::builtin();

    println!("Available policies:");
    println!();

    for def in catalog.list(platform) {
        println!(
            "  {} ({}, {})",
            def.friendly_name, def.platform, def.value_type
        );
        println!("      {}", def.description);
        println!("      key: {}  default: {}", def.native_key, def.default_value);
    }
}
