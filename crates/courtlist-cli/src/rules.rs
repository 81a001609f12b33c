//! # Rules Subcommand
//!
//! Lists the registered list types with their anchors, rule counts and
//! whether a strict section exists. With `--list-type`, prints every rule of
//! that list type.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::Args;

use courtlist_core::ListType;
use courtlist_schema::{Rule, RuleRegistry, RuleSet, ValidationMode};

/// Arguments for the `courtlist rules` subcommand.
#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Show the rules of a single list type.
    #[arg(long)]
    pub list_type: Option<String>,
}

/// Execute the rules subcommand.
pub fn run_rules(args: &RulesArgs, registry: &RuleRegistry) -> Result<u8> {
    let output = match &args.list_type {
        Some(raw) => {
            let list_type = ListType::parse(raw).context("invalid --list-type")?;
            let rule_set = registry.rules_for(&list_type)?;
            describe_rule_set(rule_set)
        }
        None => summarize(registry),
    };
    print!("{output}");
    Ok(0)
}

/// One line per list type.
pub fn summarize(registry: &RuleRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} list type(s)", registry.len());
    for rule_set in registry.iter() {
        let anchors: Vec<String> = rule_set.anchors().iter().map(ToString::to_string).collect();
        let _ = writeln!(
            out,
            "  {:<48} anchors={:<40} rules={:<3} strict={}",
            rule_set.list_type().as_str(),
            anchors.join(","),
            rule_set.rule_count(ValidationMode::Basic),
            if rule_set.has_strict_section() {
                format!("+{}", rule_set.strict_rules().len())
            } else {
                "none".to_string()
            }
        );
    }
    out
}

/// Every rule of one list type, grouped by mode.
pub fn describe_rule_set(rule_set: &RuleSet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule_set.list_type());
    let anchors: Vec<String> = rule_set.anchors().iter().map(ToString::to_string).collect();
    let _ = writeln!(out, "  anchors: {}", anchors.join(", "));
    let _ = writeln!(out, "  basic:");
    write_rules(&mut out, rule_set.base_rules());
    if rule_set.has_strict_section() {
        let _ = writeln!(out, "  strict:");
        write_rules(&mut out, rule_set.strict_rules());
        if rule_set.strict_schema().is_some() {
            let _ = writeln!(out, "    (plus JSON schema)");
        }
    }
    out
}

fn write_rules(out: &mut String, rules: &[Rule]) {
    for rule in rules {
        let _ = writeln!(out, "    {:<24} {}", rule.kind.label(), rule.path);
    }
}
