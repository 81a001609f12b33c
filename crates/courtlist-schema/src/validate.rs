//! # Structural Validation
//!
//! Walks a parsed submission body against the [`RuleSet`] for its list type
//! and collects every violation. Nothing fails fast: a provider fixing a
//! rejected list needs the complete defect list from a single submission.
//!
//! ## Evaluation
//!
//! For each anchor of the rule set, each applicable rule is resolved from
//! the anchor node. `[*]` segments fan out, so one rule yields one outcome
//! per concrete location.
//!
//! - `required`: the node must exist, be non-null and, for arrays, be
//!   non-empty. Strict mode also rejects strings that are blank.
//! - format rules: judged only on present, non-null values.
//! - `conditional_required`: as `required`, but only under holders where the
//!   condition path is present (and equal to the configured value).
//!
//! A node that cannot be reached because an ancestor is missing, null, or of
//! the wrong JSON kind is reported once, at that ancestor. Violations below
//! a structural violation are dropped, and identical
//! `(location, reason)` pairs from different rules collapse into one.
//!
//! ## Whitespace
//!
//! String leaves are validated with control characters (`\n`, `\r`, `\t`,
//! ...) removed, so a value with embedded line breaks is judged exactly like
//! the same value without them. No other normalization is applied.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use courtlist_core::ListType;

use crate::path::{FieldPath, MissingReason, Resolved, Segment};
use crate::rules::{Rule, RuleKind, RuleSet, ValidationMode};

// ---------------------------------------------------------------------------
// Violation types
// ---------------------------------------------------------------------------

/// One rule failure at one concrete location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Violation {
    /// Where in the document, e.g. `courtLists[0].courtHouse.courtHouseName`.
    pub location: FieldPath,
    /// Human-readable description.
    pub reason: String,
    /// Label of the rule that failed (`required`, `date_time`, `schema`, ...).
    pub rule: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} [{}]", self.location, self.reason, self.rule)
    }
}

/// The complete, ordered set of violations from one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationViolations(Vec<Violation>);

impl ValidationViolations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    /// Whether any violation is reported at `location`.
    pub fn contains_location(&self, location: &FieldPath) -> bool {
        self.0.iter().any(|v| &v.location == location)
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.0
    }
}

impl<'a> IntoIterator for &'a ValidationViolations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {violation}")?;
        }
        Ok(())
    }
}

/// A submission body that failed validation.
///
/// Always carries every violation found, never just the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("payload for {} failed validation with {} violation(s):\n{violations}", list_type_label(.list_type), .violations.len())]
pub struct PayloadValidationError {
    /// The list type validated against, when known.
    pub list_type: Option<ListType>,
    /// Every violation, in location order.
    pub violations: ValidationViolations,
}

fn list_type_label(list_type: &Option<ListType>) -> &str {
    list_type.as_ref().map_or("unknown list type", ListType::as_str)
}

impl PayloadValidationError {
    /// The body is not valid JSON at all.
    pub fn unparsable(list_type: Option<ListType>, error: &serde_json::Error) -> Self {
        Self {
            list_type,
            violations: ValidationViolations(vec![Violation {
                location: FieldPath::root(),
                reason: format!("body is not valid JSON: {error}"),
                rule: "json".to_string(),
            }]),
        }
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// The single walker shared by every list type and both modes.
///
/// Holds no state; one instance may be shared across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl StructuralValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `document`, failing with every violation found.
    pub fn validate(
        &self,
        document: &Value,
        rule_set: &RuleSet,
        mode: ValidationMode,
    ) -> Result<(), PayloadValidationError> {
        let violations = self.check(document, rule_set, mode);
        if violations.is_empty() {
            Ok(())
        } else {
            tracing::debug!(
                list_type = %rule_set.list_type(),
                %mode,
                violations = violations.len(),
                "payload failed structural validation"
            );
            Err(PayloadValidationError {
                list_type: Some(rule_set.list_type().clone()),
                violations,
            })
        }
    }

    /// Parse raw bytes as JSON and validate them, returning the document.
    pub fn validate_bytes(
        &self,
        raw: &[u8],
        rule_set: &RuleSet,
        mode: ValidationMode,
    ) -> Result<Value, PayloadValidationError> {
        let document: Value = serde_json::from_slice(raw)
            .map_err(|e| PayloadValidationError::unparsable(Some(rule_set.list_type().clone()), &e))?;
        self.validate(&document, rule_set, mode)?;
        Ok(document)
    }

    /// Collect violations without raising.
    pub fn check(&self, document: &Value, rule_set: &RuleSet, mode: ValidationMode) -> ValidationViolations {
        let normalized = strip_control_characters(document);
        let document: &Value = &normalized;
        let mut collector = Collector::default();

        for anchor in rule_set.anchors() {
            for resolved in anchor.resolve(document) {
                match resolved {
                    Resolved::Found { location, value } => {
                        if value.is_null() {
                            collector.structural(location, MissingReason::Null.to_string(), "anchor");
                            continue;
                        }
                        for rule in rule_set.rules(mode) {
                            apply_rule(rule, value, &location, mode, &mut collector);
                        }
                    }
                    Resolved::Missing { location, reason } => {
                        collector.structural(location, reason.to_string(), "anchor");
                    }
                }
            }
        }

        if mode.is_strict() {
            if let Some(schema) = rule_set.strict_schema() {
                for issue in schema.errors(document) {
                    if issue.missing {
                        collector.structural(issue.location, issue.message, "schema");
                    } else {
                        collector.schema(issue.location, issue.message);
                    }
                }
            }
        }

        collector.finish()
    }
}

fn apply_rule(rule: &Rule, anchor: &Value, anchor_location: &FieldPath, mode: ValidationMode, out: &mut Collector) {
    let label = rule.kind.label();
    match &rule.kind {
        RuleKind::Required => {
            for resolved in rule.path.resolve_from(anchor, anchor_location.clone()) {
                require(resolved, mode, label, out);
            }
        }
        RuleKind::Format(format) => {
            for resolved in rule.path.resolve_from(anchor, anchor_location.clone()) {
                if let Resolved::Found { location, value } = resolved {
                    if value.is_null() {
                        continue;
                    }
                    if let Err(violation) = format.check(value) {
                        out.content(location, violation.to_string(), label);
                    }
                }
            }
        }
        RuleKind::ConditionalRequired { when, equals } => {
            let Some((holder_path, Segment::Key(key))) = rule.path.split_last() else {
                return;
            };
            for resolved in holder_path.resolve_from(anchor, anchor_location.clone()) {
                let Resolved::Found { location, value: holder } = resolved else {
                    continue;
                };
                if !condition_holds(when, equals.as_ref(), holder) {
                    continue;
                }
                let target = FieldPath::root().child_key(key);
                for resolved in target.resolve_from(holder, location) {
                    require(resolved, mode, label, out);
                }
            }
        }
    }
}

fn require(resolved: Resolved<'_>, mode: ValidationMode, label: &'static str, out: &mut Collector) {
    match resolved {
        Resolved::Found { location, value } => {
            if let Some(reason) = presence_defect(value, mode) {
                out.structural(location, reason.to_string(), label);
            }
        }
        Resolved::Missing { location, reason } => out.structural(location, reason.to_string(), label),
    }
}

fn presence_defect(value: &Value, mode: ValidationMode) -> Option<&'static str> {
    match value {
        Value::Null => Some("is null"),
        Value::Array(items) if items.is_empty() => Some("is empty"),
        Value::String(s) if mode.is_strict() && s.trim().is_empty() => Some("is blank"),
        _ => None,
    }
}

fn condition_holds(when: &FieldPath, equals: Option<&Value>, holder: &Value) -> bool {
    when.resolve(holder).iter().any(|r| match r {
        Resolved::Found { value, .. } if !value.is_null() => equals.map_or(true, |expected| *value == expected),
        _ => false,
    })
}

/// Deduplicating, ancestor-suppressing violation sink.
#[derive(Default)]
struct Collector {
    // (location, reason) -> first rule label reporting it
    entries: BTreeMap<(FieldPath, String), &'static str>,
    structural: BTreeSet<FieldPath>,
    // schema findings, kept only where no structural violation covers them
    schema: Vec<(FieldPath, String)>,
}

impl Collector {
    /// A node that is absent, null, empty, blank, or unusable.
    fn structural(&mut self, location: FieldPath, reason: String, rule: &'static str) {
        self.structural.insert(location.clone());
        self.entries.entry((location, reason)).or_insert(rule);
    }

    /// A present value whose content is wrong.
    fn content(&mut self, location: FieldPath, reason: String, rule: &'static str) {
        self.entries.entry((location, reason)).or_insert(rule);
    }

    /// A schema failure other than a missing member. The schema words it
    /// differently from the walker, so it is dropped when a structural
    /// violation already sits at or above the same node.
    fn schema(&mut self, location: FieldPath, reason: String) {
        self.schema.push((location, reason));
    }

    fn finish(mut self) -> ValidationViolations {
        for (location, reason) in std::mem::take(&mut self.schema) {
            if !self.structural.contains(&location) {
                self.entries.entry((location, reason)).or_insert("schema");
            }
        }
        let structural = self.structural;
        let violations = self
            .entries
            .into_iter()
            .filter(|((location, _), _)| !structural.iter().any(|s| location.is_strictly_below(s)))
            .map(|((location, reason), rule)| Violation {
                location,
                reason,
                rule: rule.to_string(),
            })
            .collect();
        ValidationViolations(violations)
    }
}

/// `document` with control characters removed from every string leaf.
///
/// Borrows when nothing needs removing.
pub fn strip_control_characters(document: &Value) -> Cow<'_, Value> {
    if has_control_characters(document) {
        let mut owned = document.clone();
        strip_in_place(&mut owned);
        Cow::Owned(owned)
    } else {
        Cow::Borrowed(document)
    }
}

fn has_control_characters(value: &Value) -> bool {
    match value {
        Value::String(s) => s.chars().any(char::is_control),
        Value::Array(items) => items.iter().any(has_control_characters),
        Value::Object(map) => map.values().any(has_control_characters),
        _ => false,
    }
}

fn strip_in_place(value: &mut Value) {
    match value {
        Value::String(s) => s.retain(|c| !c.is_control()),
        Value::Array(items) => items.iter_mut().for_each(strip_in_place),
        Value::Object(map) => map.values_mut().for_each(strip_in_place),
        _ => {}
    }
}
