//! # Validate Subcommand
//!
//! Validates one or more bodies against a list type's rules without
//! committing anything. Every violation of every file is printed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use courtlist_core::ListType;
use courtlist_schema::{PayloadValidationError, RuleRegistry, RuleSet, StructuralValidator, ValidationMode, Violation};

/// Arguments for the `courtlist validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// List type whose rules apply.
    #[arg(long)]
    pub list_type: String,

    /// Also apply the list type's strict-mode rules.
    #[arg(long)]
    pub strict: bool,

    /// Print one JSON report per file instead of text.
    #[arg(long)]
    pub json: bool,

    /// Body files to validate.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
}

/// The outcome for one file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub valid: bool,
    pub violations: Vec<Violation>,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 if every file passed, 1 if any failed.
pub fn run_validate(args: &ValidateArgs, registry: &RuleRegistry) -> Result<u8> {
    let list_type = ListType::parse(&args.list_type).context("invalid --list-type")?;
    let rule_set = registry.rules_for(&list_type)?;
    let mode = ValidationMode::from_strict_flag(args.strict);
    if mode.is_strict() && !rule_set.has_strict_section() {
        tracing::info!(%list_type, "list type has no strict section; strict mode adds nothing");
    }

    let validator = StructuralValidator::new();
    let mut failed = 0usize;
    for file in &args.files {
        let report = validate_file(&validator, rule_set, mode, file)?;
        if !report.valid {
            failed += 1;
        }
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            print_report(&report);
        }
    }

    if !args.json {
        println!(
            "\n{list_type} ({mode}): {}/{} file(s) passed",
            args.files.len() - failed,
            args.files.len()
        );
    }
    Ok(if failed > 0 { crate::EXIT_REJECTED } else { 0 })
}

/// Validate one file. Unreadable files are operational errors; unparsable
/// ones are reported as violations.
pub fn validate_file(
    validator: &StructuralValidator,
    rule_set: &RuleSet,
    mode: ValidationMode,
    file: &Path,
) -> Result<FileReport> {
    let raw = crate::read_file(file)?;
    let violations = match validator.validate_bytes(&raw, rule_set, mode) {
        Ok(_) => Vec::new(),
        Err(PayloadValidationError { violations, .. }) => violations.into_vec(),
    };
    Ok(FileReport {
        file: file.to_path_buf(),
        valid: violations.is_empty(),
        violations,
    })
}

fn print_report(report: &FileReport) {
    if report.valid {
        println!("PASS {}", report.file.display());
        return;
    }
    println!(
        "FAIL {} ({} violation(s))",
        report.file.display(),
        report.violations.len()
    );
    for violation in &report.violations {
        println!("  - {violation}");
    }
}
