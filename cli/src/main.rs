//! auditor CLI: driving adapter for the auditor validation engine.
//!
//! Subcommands:
//! - `check <rules> --label <label> [field=value...] [--json]`: check a submission
//! - `fields <rules> <label>`: list the fields registered under a label
//! - `lint <rules>`: validate a rule file
//! - `info`: print rule types, keys, status codes and built-in transforms
//!
//! Rule files are JSON (`.json`) or YAML (anything else), shaped
//! `{ label: { field: rule } }`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use auditor::prelude::*;
use auditor::register_core_transforms;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Exit status when a submission has failing fields.
const EXIT_REJECTED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "auditor", version, about = "Check form submissions against declarative rules")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check submitted values against the rules of one label.
    Check {
        /// Rule file (JSON or YAML).
        rules: PathBuf,

        /// Label whose rules apply.
        #[arg(short, long)]
        label: String,

        /// Submitted values as `field=value`. An empty value counts as absent.
        #[arg(value_name = "FIELD=VALUE", value_parser = parse_pair)]
        values: Vec<(String, String)>,

        /// Print a JSON report instead of one line per field.
        #[arg(long)]
        json: bool,
    },

    /// List the fields registered under a label.
    Fields {
        /// Rule file (JSON or YAML).
        rules: PathBuf,

        /// Label to list.
        label: String,
    },

    /// Validate a rule file without checking anything.
    Lint {
        /// Rule file (JSON or YAML).
        rules: PathBuf,
    },

    /// Print rule types, rule keys, status codes and built-in transforms.
    Info,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},auditor={level},auditor_cli={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Check {
            rules,
            label,
            values,
            json,
        } => cmd_check(&rules, &label, &values, json),
        Command::Fields { rules, label } => cmd_fields(&rules, &label),
        Command::Lint { rules } => cmd_lint(&rules),
        Command::Info => {
            cmd_info();
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_check(
    rules: &Path,
    label: &str,
    values: &[(String, String)],
    json: bool,
) -> Result<ExitCode> {
    let auditor = load_auditor(rules)?;
    let results = check_submission(&auditor, label, values)?;
    let rejected = results.values().flatten().any(|r| !r.is_ok());

    if json {
        let errno: u32 = results
            .values()
            .flatten()
            .map(|r| u32::from(r.errno()))
            .sum();
        let fields: BTreeMap<&str, &CheckResult> = results
            .iter()
            .filter_map(|(field, r)| r.as_ref().map(|r| (field.as_str(), r)))
            .collect();
        let report = serde_json::json!({ "label": label, "errno": errno, "fields": fields });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (field, result) in &results {
            println!("{}", format_line(field, result.as_ref()));
        }
    }

    Ok(if rejected {
        ExitCode::from(EXIT_REJECTED)
    } else {
        ExitCode::SUCCESS
    })
}

fn cmd_fields(rules: &Path, label: &str) -> Result<ExitCode> {
    let auditor = load_auditor(rules)?;
    let Some(fields) = auditor.fields(label) else {
        bail!(
            "label \"{label}\" is not defined; available: [{}]",
            auditor.labels().join(", ")
        );
    };
    for field in fields {
        println!("{field}");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_lint(rules: &Path) -> Result<ExitCode> {
    let auditor = Auditor::new();
    let count = auditor
        .load_rules(&read_document(rules)?, &transforms())
        .with_context(|| format!("rules invalid in \"{}\"", rules.display()))?;
    println!(
        "Rules valid: {count} fields in {} labels",
        auditor.labels().len()
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_info() {
    println!("Rule types:");
    for rule_type in RuleType::ALL {
        let keys: Vec<&str> = RuleKey::ALL
            .into_iter()
            .filter(|key| *key != RuleKey::Type && rule_type.accepts(*key))
            .map(RuleKey::as_str)
            .collect();
        println!("  {:<12} {}", rule_type.as_str(), keys.join(", "));
    }

    println!("\nStatus codes:");
    for status in Status::ALL {
        println!(
            "  {:>3}  {:<20} {}",
            status.code(),
            status.name(),
            status.message().unwrap_or("")
        );
    }

    println!("\nTransforms:");
    for name in transforms().names() {
        println!("  {name}");
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Checking
// ═══════════════════════════════════════════════════════════════════════════════

/// Check every submitted field, plus every registered field that was not submitted (as
/// absent, so missing required fields are reported).
fn check_submission(
    auditor: &Auditor,
    label: &str,
    values: &[(String, String)],
) -> Result<BTreeMap<String, Option<CheckResult>>> {
    let Some(registered) = auditor.fields(label) else {
        bail!(
            "label \"{label}\" is not defined; available: [{}]",
            auditor.labels().join(", ")
        );
    };

    let mut results = BTreeMap::new();
    for (field, value) in values {
        if !auditor.contains(label, field) {
            tracing::warn!(label, field = field.as_str(), "no rule for submitted field");
            continue;
        }
        results.insert(field.clone(), auditor.check(label, field, value.as_str()));
    }
    for field in registered {
        if !results.contains_key(&field) {
            let result = auditor.check(label, &field, FieldValue::None);
            results.insert(field, result);
        }
    }
    Ok(results)
}

fn format_line(field: &str, result: Option<&CheckResult>) -> String {
    match result {
        None => format!("{field:<16} -    (absent)"),
        Some(r) if r.is_ok() => format!("{field:<16} OK   {}", r.val()),
        Some(r) => format!(
            "{field:<16} {:<4} {} ({})",
            r.errno(),
            r.ename().unwrap_or_default(),
            r.errstr().unwrap_or_default()
        ),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rule loading
// ═══════════════════════════════════════════════════════════════════════════════

fn transforms() -> TransformRegistry {
    register_core_transforms(TransformRegistryBuilder::new()).build()
}

fn load_auditor(path: &Path) -> Result<Auditor> {
    let auditor = Auditor::new();
    let count = auditor
        .load_rules(&read_document(path)?, &transforms())
        .with_context(|| format!("rules invalid in \"{}\"", path.display()))?;
    tracing::debug!(path = %path.display(), count, "loaded rules");
    Ok(auditor)
}

fn read_document(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read \"{}\"", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).context("JSON parse error")
    } else {
        // Default to YAML (handles .yaml and .yml)
        serde_yaml::from_str(&content).context("YAML parse error")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument parsing
// ═══════════════════════════════════════════════════════════════════════════════

fn parse_pair(pair: &str) -> Result<(String, String), String> {
    let (field, value) = pair
        .split_once('=')
        .ok_or_else(|| format!("invalid value \"{pair}\", expected field=value"))?;
    if field.is_empty() {
        return Err(format!("invalid value \"{pair}\", field name is empty"));
    }
    Ok((field.to_owned(), value.to_owned()))
}
