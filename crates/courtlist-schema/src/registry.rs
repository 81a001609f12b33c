//! # Rule Registry
//!
//! Maps a list type to its compiled [`RuleSet`]. A registry is built once,
//! at process start, from the catalogue embedded in this crate or from a
//! directory of rule files, and is read-only afterwards. It is passed by
//! reference to whatever needs it; there is no global lookup.
//!
//! Loading is all-or-nothing. A file that does not parse, a path or regex
//! that does not compile, or two files claiming the same list type fail the
//! whole load.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use courtlist_core::ListType;

use crate::rules::{RuleSet, ValidationMode};

/// The built-in catalogue, embedded at compile time.
const BUILTIN_RULE_SETS: &[(&str, &str)] = &[
    ("civil_daily_cause_list.yaml", include_str!("../../../rules/civil_daily_cause_list.yaml")),
    ("cop_daily_cause_list.yaml", include_str!("../../../rules/cop_daily_cause_list.yaml")),
    ("crown_daily_list.yaml", include_str!("../../../rules/crown_daily_list.yaml")),
    ("crown_firm_list.yaml", include_str!("../../../rules/crown_firm_list.yaml")),
    ("crown_warned_list.yaml", include_str!("../../../rules/crown_warned_list.yaml")),
    ("cst_weekly_hearing_list.yaml", include_str!("../../../rules/cst_weekly_hearing_list.yaml")),
    ("et_daily_list.yaml", include_str!("../../../rules/et_daily_list.yaml")),
    ("family_daily_cause_list.yaml", include_str!("../../../rules/family_daily_cause_list.yaml")),
    ("iac_daily_list.yaml", include_str!("../../../rules/iac_daily_list.yaml")),
    (
        "london_administrative_court_daily_cause_list.yaml",
        include_str!("../../../rules/london_administrative_court_daily_cause_list.yaml"),
    ),
    ("magistrates_public_list.yaml", include_str!("../../../rules/magistrates_public_list.yaml")),
    ("magistrates_standard_list.yaml", include_str!("../../../rules/magistrates_standard_list.yaml")),
    ("primary_health_list.yaml", include_str!("../../../rules/primary_health_list.yaml")),
    ("sjp_press_list.yaml", include_str!("../../../rules/sjp_press_list.yaml")),
    ("sjp_public_list.yaml", include_str!("../../../rules/sjp_public_list.yaml")),
    ("sscs_daily_list.yaml", include_str!("../../../rules/sscs_daily_list.yaml")),
];

/// Errors building or querying a [`RuleRegistry`].
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No rule set is registered for the list type. This is a configuration
    /// gap, not a defect in the submitted document.
    #[error("no rule set registered for list type {0}")]
    UnknownListType(ListType),

    /// A rule set could not be loaded.
    #[error("invalid rule set {origin}: {reason}")]
    InvalidRuleSet {
        /// File name or other source of the rule set.
        origin: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A rule directory could not be read.
    #[error("failed to read rule sets from {path}: {source}")]
    Io {
        /// The directory or file being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Immutable map from list type to compiled rule set.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rule_sets: BTreeMap<ListType, RuleSet>,
}

impl RuleRegistry {
    /// The catalogue shipped with this crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        let rule_sets = BUILTIN_RULE_SETS
            .iter()
            .map(|(name, text)| RuleSet::from_yaml_str(text, name))
            .collect::<Result<Vec<_>, _>>()?;
        let registry = Self::from_rule_sets(rule_sets)?;
        registry.log_loaded("builtin");
        Ok(registry)
    }

    /// Every `*.yaml`, `*.yml` and `*.json` file directly inside `dir`.
    ///
    /// Files are loaded in name order so that errors are reproducible.
    pub fn from_dir(dir: &Path) -> Result<Self, RegistryError> {
        let io_err = |source| RegistryError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
            if path.is_file() && matches!(extension, "yaml" | "yml" | "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut rule_sets = Vec::with_capacity(files.len());
        for path in &files {
            let origin = path.display().to_string();
            let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
                path: origin.clone(),
                source,
            })?;
            let rule_set = if path.extension().is_some_and(|e| e == "json") {
                RuleSet::from_json_str(&text, &origin)?
            } else {
                RuleSet::from_yaml_str(&text, &origin)?
            };
            rule_sets.push(rule_set);
        }

        let registry = Self::from_rule_sets(rule_sets)?;
        registry.log_loaded(&dir.display().to_string());
        Ok(registry)
    }

    /// Build a registry from already-compiled rule sets.
    pub fn from_rule_sets(rule_sets: impl IntoIterator<Item = RuleSet>) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for rule_set in rule_sets {
            let list_type = rule_set.list_type().clone();
            if map.contains_key(&list_type) {
                return Err(RegistryError::InvalidRuleSet {
                    origin: list_type.to_string(),
                    reason: "duplicate list type".to_string(),
                });
            }
            map.insert(list_type, rule_set);
        }
        Ok(Self { rule_sets: map })
    }

    /// The rule set for `list_type`.
    pub fn rules_for(&self, list_type: &ListType) -> Result<&RuleSet, RegistryError> {
        self.rule_sets
            .get(list_type)
            .ok_or_else(|| RegistryError::UnknownListType(list_type.clone()))
    }

    pub fn contains(&self, list_type: &ListType) -> bool {
        self.rule_sets.contains_key(list_type)
    }

    /// Registered list types, in order.
    pub fn list_types(&self) -> impl Iterator<Item = &ListType> {
        self.rule_sets.keys()
    }

    /// Registered rule sets, ordered by list type.
    pub fn iter(&self) -> impl Iterator<Item = &RuleSet> {
        self.rule_sets.values()
    }

    pub fn len(&self) -> usize {
        self.rule_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_sets.is_empty()
    }

    fn log_loaded(&self, source: &str) {
        let rule_count: usize = self.iter().map(|s| s.rule_count(ValidationMode::Strict)).sum();
        tracing::info!(source, list_types = self.len(), rule_count, "rule registry loaded");
    }
}
