//! Property tests: embedded line breaks never cause a rejection, and
//! validating the same document twice gives the same answer.

mod common;

use proptest::prelude::*;
use serde_json::Value;

use courtlist_schema::{FieldPath, StructuralValidator, ValidationMode};

use common::*;

/// Insert `ch` into the `leaf`-th string leaf (modulo the leaf count) at
/// character offset `offset` (modulo its length + 1).
fn insert_break(document: &mut Value, leaf: usize, offset: usize, ch: char) {
    let mut leaves = string_leaves(document);
    if leaves.is_empty() {
        return;
    }
    let count = leaves.len();
    let target = &mut leaves[leaf % count];
    let chars = target.chars().count();
    let byte_offset = target
        .char_indices()
        .nth(offset % (chars + 1))
        .map_or(target.len(), |(i, _)| i);
    target.insert(byte_offset, ch);
}

fn line_breaks() -> impl Strategy<Value = Vec<(usize, usize, char)>> {
    prop::collection::vec(
        (any::<usize>(), any::<usize>(), prop_oneof![Just('\n'), Just('\r')]),
        1..12,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn line_breaks_in_strings_never_reject(breaks in line_breaks(), fixture in any::<usize>()) {
        let registry = registry();
        let mut fixtures = valid_fixtures();
        let (name, mut document) = fixtures.swap_remove(fixture % fixtures.len());
        for (leaf, offset, ch) in breaks {
            insert_break(&mut document, leaf, offset, ch);
        }
        let rule_set = registry.rules_for(&list_type(name)).unwrap();
        let violations = StructuralValidator::new().check(&document, rule_set, ValidationMode::Basic);
        prop_assert!(violations.is_empty(), "{}: {}", name, violations);
    }

    #[test]
    fn line_breaks_pass_strict_crown_rules(breaks in line_breaks()) {
        let registry = registry();
        let mut document = json(CROWN_DAILY_LIST);
        for (leaf, offset, ch) in breaks {
            insert_break(&mut document, leaf, offset, ch);
        }
        let rule_set = registry.rules_for(&list_type("CROWN_DAILY_LIST")).unwrap();
        let violations = StructuralValidator::new().check(&document, rule_set, ValidationMode::Strict);
        prop_assert!(violations.is_empty(), "{}", violations);
    }

    #[test]
    fn rejection_is_idempotent(picks in prop::collection::vec(any::<usize>(), 1..6), strict in any::<bool>()) {
        let registry = registry();
        let rule_set = registry.rules_for(&list_type("CROWN_DAILY_LIST")).unwrap();
        let mode = ValidationMode::from_strict_flag(strict);
        let valid = json(CROWN_DAILY_LIST);
        let locations = required_locations(rule_set, mode, &valid);

        let mut document = valid.clone();
        for pick in picks {
            locations[pick % locations.len()].remove(&mut document);
        }

        let validator = StructuralValidator::new();
        let first = validator.validate(&document, rule_set, mode);
        let second = validator.validate(&document, rule_set, mode);
        prop_assert!(first.is_err());
        prop_assert_eq!(first, second);
    }
}

#[test]
fn control_characters_do_not_hide_real_defects() {
    let registry = registry();
    let rule_set = registry.rules_for(&list_type("CROWN_DAILY_LIST")).unwrap();
    let mut document = json(CROWN_DAILY_LIST);
    document["document"]["publicationDate"] = Value::String("2024-10-\n1T09:00:00Z".to_string());

    let violations = StructuralValidator::new().check(&document, rule_set, ValidationMode::Basic);
    assert!(violations.contains_location(&FieldPath::parse("document.publicationDate").unwrap()));
}

#[test]
fn line_break_only_value_is_blank_in_strict_mode() {
    let registry = registry();
    let rule_set = registry.rules_for(&list_type("CROWN_DAILY_LIST")).unwrap();
    let mut document = json(CROWN_DAILY_LIST);
    document["venue"]["venueName"] = Value::String("\r\n".to_string());

    let validator = StructuralValidator::new();
    assert!(validator.check(&document, rule_set, ValidationMode::Basic).is_empty());
    let strict = validator.check(&document, rule_set, ValidationMode::Strict);
    assert!(strict.contains_location(&FieldPath::parse("venue.venueName").unwrap()));
}
