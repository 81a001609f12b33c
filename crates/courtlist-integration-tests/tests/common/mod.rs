//! Shared fixtures and helpers for the integration suite.

#![allow(dead_code)]

use serde_json::Value;

use courtlist_core::{HeaderGroup, ListType, Timestamp};
use courtlist_schema::{FieldPath, RuleKind, RuleRegistry, RuleSet, ValidationMode};

pub const CROWN_DAILY_LIST: &str = include_str!("../../fixtures/crown_daily_list.json");
pub const LONDON_ADMIN: &str = include_str!("../../fixtures/london_administrative_court.json");
pub const CST_WEEKLY: &str = include_str!("../../fixtures/cst_weekly_hearing_list.json");
pub const CIVIL_DAILY: &str = include_str!("../../fixtures/civil_daily_cause_list.json");
pub const COP_DAILY: &str = include_str!("../../fixtures/cop_daily_cause_list.json");
pub const CROWN_FIRM: &str = include_str!("../../fixtures/crown_firm_list.json");
pub const CROWN_WARNED: &str = include_str!("../../fixtures/crown_warned_list.json");
pub const ET_DAILY: &str = include_str!("../../fixtures/et_daily_list.json");
pub const FAMILY_DAILY: &str = include_str!("../../fixtures/family_daily_cause_list.json");
pub const IAC_DAILY: &str = include_str!("../../fixtures/iac_daily_list.json");
pub const MAGISTRATES_PUBLIC: &str = include_str!("../../fixtures/magistrates_public_list.json");
pub const MAGISTRATES_STANDARD: &str = include_str!("../../fixtures/magistrates_standard_list.json");
pub const PRIMARY_HEALTH: &str = include_str!("../../fixtures/primary_health_list.json");
pub const SJP_PRESS: &str = include_str!("../../fixtures/sjp_press_list.json");
pub const SJP_PUBLIC: &str = include_str!("../../fixtures/sjp_public_list.json");
pub const SSCS_DAILY: &str = include_str!("../../fixtures/sscs_daily_list.json");

pub fn json(text: &str) -> Value {
    serde_json::from_str(text).expect("fixture is valid JSON")
}

pub fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).expect("valid timestamp")
}

pub fn list_type(s: &str) -> ListType {
    ListType::parse(s).expect("valid list type")
}

pub fn registry() -> RuleRegistry {
    RuleRegistry::builtin().expect("built-in catalogue loads")
}

/// `(list type, fixture)` pairs that must validate in basic mode, one per
/// built-in rule set.
pub fn valid_fixtures() -> Vec<(&'static str, Value)> {
    vec![
        ("CROWN_DAILY_LIST", json(CROWN_DAILY_LIST)),
        ("LONDON_ADMINISTRATIVE_COURT_DAILY_CAUSE_LIST", json(LONDON_ADMIN)),
        ("CST_WEEKLY_HEARING_LIST", json(CST_WEEKLY)),
        ("CIVIL_DAILY_CAUSE_LIST", json(CIVIL_DAILY)),
        ("COP_DAILY_CAUSE_LIST", json(COP_DAILY)),
        ("CROWN_FIRM_LIST", json(CROWN_FIRM)),
        ("CROWN_WARNED_LIST", json(CROWN_WARNED)),
        ("ET_DAILY_LIST", json(ET_DAILY)),
        ("FAMILY_DAILY_CAUSE_LIST", json(FAMILY_DAILY)),
        ("IAC_DAILY_LIST", json(IAC_DAILY)),
        ("MAGISTRATES_PUBLIC_LIST", json(MAGISTRATES_PUBLIC)),
        ("MAGISTRATES_STANDARD_LIST", json(MAGISTRATES_STANDARD)),
        ("PRIMARY_HEALTH_LIST", json(PRIMARY_HEALTH)),
        ("SJP_PRESS_LIST", json(SJP_PRESS)),
        ("SJP_PUBLIC_LIST", json(SJP_PUBLIC)),
        ("SSCS_DAILY_LIST", json(SSCS_DAILY)),
    ]
}

/// Every concrete, non-root location that a `required` rule reaches in
/// `document`, in document order and without duplicates.
pub fn required_locations(rule_set: &RuleSet, mode: ValidationMode, document: &Value) -> Vec<FieldPath> {
    let mut out: Vec<FieldPath> = Vec::new();
    for anchor in rule_set.anchors() {
        for rule in rule_set.rules(mode) {
            if !matches!(rule.kind, RuleKind::Required) {
                continue;
            }
            for location in anchor.join(&rule.path).locate(document) {
                if !location.is_root() && !out.contains(&location) {
                    out.push(location);
                }
            }
        }
    }
    out
}

/// An envelope for the crown daily list end-to-end scenario.
pub fn crown_header(provenance: &str, source_id: &str) -> HeaderGroup {
    let display_from = ts("2024-10-01T00:00:00Z");
    HeaderGroup {
        provenance: Some(provenance.to_string()),
        source_artefact_id: Some(source_id.to_string()),
        artefact_type: Some("LIST".to_string()),
        sensitivity: Some("PUBLIC".to_string()),
        language: Some("ENGLISH".to_string()),
        display_from: Some(display_from),
        display_to: Some(display_from.plus_days(1).unwrap()),
        list_type: Some("CROWN_DAILY_LIST".to_string()),
        location_id: Some("457".to_string()),
        content_date: Some(display_from),
    }
}

/// Mutable references to every string leaf, in traversal order.
pub fn string_leaves(value: &mut Value) -> Vec<&mut String> {
    match value {
        Value::String(s) => vec![s],
        Value::Array(items) => items.iter_mut().flat_map(string_leaves).collect(),
        Value::Object(map) => map.values_mut().flat_map(string_leaves).collect(),
        _ => Vec::new(),
    }
}
