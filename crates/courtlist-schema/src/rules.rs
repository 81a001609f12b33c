//! # Rule Sets
//!
//! A rule set is the declarative description of one list type's body: which
//! paths must be present and which formats their values must follow. Rule
//! sets are data. They are written as YAML (or JSON) documents, deserialized
//! into [`RuleSetDocument`], and compiled into a [`RuleSet`] whose paths,
//! regular expressions and embedded JSON Schema are ready to evaluate.
//!
//! ```yaml
//! list_type: CROWN_DAILY_LIST
//! anchors: ["$"]
//! rules:
//!   - { path: document.publicationDate, kind: date_time }
//!   - { path: "courtLists[*].courtHouse.courtHouseName", kind: required }
//! strict:
//!   rules:
//!     - { path: venue.venueAddress.postCode, kind: postcode }
//!   schema: { type: object, required: [document] }
//! ```

use jsonschema::error::ValidationErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use courtlist_core::ListType;

use crate::formats::{Format, Pattern};
use crate::path::{FieldPath, MissingReason, Segment};
use crate::registry::RegistryError;

/// Which rules of a set are applied.
///
/// The caller chooses the mode; nothing infers it from the list type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// The base rules only.
    #[default]
    Basic,
    /// Base rules plus the strict section, blank-string rejection, and the
    /// embedded JSON Schema when one is declared.
    Strict,
}

impl ValidationMode {
    /// Map the inbound `strict_mode` flag to a mode.
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::Basic
        }
    }

    /// Whether this is [`ValidationMode::Strict`].
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl std::fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Basic => "basic",
            Self::Strict => "strict",
        })
    }
}

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

/// A rule set as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetDocument {
    pub list_type: ListType,
    /// Nodes the rules are evaluated under. Empty means the document root.
    #[serde(default)]
    pub anchors: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleDocument>,
    #[serde(default)]
    pub strict: Option<StrictDocument>,
}

/// One rule as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDocument {
    pub path: String,
    #[serde(flatten)]
    pub kind: RuleKindDocument,
}

/// The `kind` of a rule and its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKindDocument {
    Required,
    DateTime,
    Date,
    FixedLength {
        length: usize,
    },
    Pattern {
        pattern: String,
    },
    InitialOrEmpty,
    Postcode,
    ConditionalRequired {
        /// Path relative to the node holding the target field.
        when: String,
        /// Value `when` must equal. Any present value triggers when absent.
        #[serde(default)]
        equals: Option<Value>,
    },
}

/// The strict-mode section of a rule set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrictDocument {
    #[serde(default)]
    pub rules: Vec<RuleDocument>,
    /// JSON Schema (Draft 2020-12) the whole document must satisfy.
    #[serde(default)]
    pub schema: Option<Value>,
}

// ---------------------------------------------------------------------------
// Compiled form
// ---------------------------------------------------------------------------

/// What a compiled rule checks.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// The node must be present, non-null and, for arrays, non-empty.
    Required,
    /// A present, non-null value must pass the format check.
    Format(Format),
    /// The target is required when `when`, resolved from the node holding
    /// the target, is present (and equal to `equals` if given).
    ConditionalRequired {
        when: FieldPath,
        equals: Option<Value>,
    },
}

impl RuleKind {
    /// Short label used in violation reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Format(format) => format.label(),
            Self::ConditionalRequired { .. } => "conditional_required",
        }
    }
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub path: FieldPath,
    pub kind: RuleKind,
}

impl Rule {
    /// A `required` rule.
    pub fn required(path: FieldPath) -> Self {
        Self {
            path,
            kind: RuleKind::Required,
        }
    }

    /// A format rule.
    pub fn format(path: FieldPath, format: Format) -> Self {
        Self {
            path,
            kind: RuleKind::Format(format),
        }
    }
}

/// A JSON Schema compiled once at load time.
pub struct CompiledSchema {
    source: Value,
    validator: jsonschema::Validator,
}

impl CompiledSchema {
    /// Compile a Draft 2020-12 schema.
    pub fn compile(source: Value) -> Result<Self, String> {
        let mut options = jsonschema::options();
        options.with_draft(jsonschema::Draft::Draft202012);
        let validator = options.build(&source).map_err(|e| e.to_string())?;
        Ok(Self { source, validator })
    }

    /// The schema as declared.
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Every schema error, located at the node it concerns.
    ///
    /// A `required` failure is reported by the schema at the holding
    /// object; it is moved to the absent member so that it lands where a
    /// structural `required` rule would report it.
    pub fn errors(&self, document: &Value) -> Vec<SchemaIssue> {
        self.validator
            .iter_errors(document)
            .map(|e| {
                let location = FieldPath::from_json_pointer(&e.instance_path.to_string());
                match &e.kind {
                    ValidationErrorKind::Required {
                        property: Value::String(member),
                    } => SchemaIssue {
                        location: location.child_key(member),
                        message: MissingReason::Absent.to_string(),
                        missing: true,
                    },
                    _ => SchemaIssue {
                        location,
                        message: e.to_string(),
                        missing: false,
                    },
                }
            })
            .collect()
    }
}

/// One JSON Schema failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub location: FieldPath,
    pub message: String,
    /// The node at `location` is absent.
    pub missing: bool,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// The rules for one list type, ready to evaluate.
#[derive(Debug)]
pub struct RuleSet {
    list_type: ListType,
    anchors: Vec<FieldPath>,
    rules: Vec<Rule>,
    strict_rules: Vec<Rule>,
    strict_schema: Option<CompiledSchema>,
}

impl RuleSet {
    /// Build a rule set programmatically. With no anchors, rules are
    /// evaluated from the document root.
    pub fn new(list_type: ListType, anchors: Vec<FieldPath>, rules: Vec<Rule>) -> Self {
        let anchors = if anchors.is_empty() {
            vec![FieldPath::root()]
        } else {
            anchors
        };
        Self {
            list_type,
            anchors,
            rules,
            strict_rules: Vec::new(),
            strict_schema: None,
        }
    }

    /// Add strict-mode rules and an optional schema.
    pub fn with_strict(mut self, rules: Vec<Rule>, schema: Option<CompiledSchema>) -> Self {
        self.strict_rules = rules;
        self.strict_schema = schema;
        self
    }

    /// Compile a serialized rule set. `origin` names its source in errors.
    pub fn compile(document: RuleSetDocument, origin: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidRuleSet {
            origin: origin.to_string(),
            reason,
        };

        let anchors = document
            .anchors
            .iter()
            .map(|a| FieldPath::parse(a).map_err(|e| invalid(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        let rules = compile_rules(&document.rules, origin)?;
        if rules.is_empty() {
            return Err(invalid("rule set declares no rules".to_string()));
        }

        let (strict_rules, strict_schema) = match document.strict {
            Some(strict) => {
                let rules = compile_rules(&strict.rules, origin)?;
                let schema = strict
                    .schema
                    .map(|s| CompiledSchema::compile(s).map_err(|e| invalid(format!("strict schema: {e}"))))
                    .transpose()?;
                (rules, schema)
            }
            None => (Vec::new(), None),
        };

        Ok(Self::new(document.list_type, anchors, rules).with_strict(strict_rules, strict_schema))
    }

    /// Parse and compile a YAML rule set.
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self, RegistryError> {
        let document: RuleSetDocument =
            serde_yaml::from_str(text).map_err(|e| RegistryError::InvalidRuleSet {
                origin: origin.to_string(),
                reason: format!("YAML parse error: {e}"),
            })?;
        Self::compile(document, origin)
    }

    /// Parse and compile a JSON rule set.
    pub fn from_json_str(text: &str, origin: &str) -> Result<Self, RegistryError> {
        let document: RuleSetDocument =
            serde_json::from_str(text).map_err(|e| RegistryError::InvalidRuleSet {
                origin: origin.to_string(),
                reason: format!("JSON parse error: {e}"),
            })?;
        Self::compile(document, origin)
    }

    pub fn list_type(&self) -> &ListType {
        &self.list_type
    }

    /// Anchor paths; never empty.
    pub fn anchors(&self) -> &[FieldPath] {
        &self.anchors
    }

    /// Rules applied in every mode.
    pub fn base_rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules applied only in strict mode.
    pub fn strict_rules(&self) -> &[Rule] {
        &self.strict_rules
    }

    /// Schema applied only in strict mode.
    pub fn strict_schema(&self) -> Option<&CompiledSchema> {
        self.strict_schema.as_ref()
    }

    /// Whether strict mode adds anything over basic mode.
    pub fn has_strict_section(&self) -> bool {
        !self.strict_rules.is_empty() || self.strict_schema.is_some()
    }

    /// The rules applicable in `mode`, base rules first.
    pub fn rules(&self, mode: ValidationMode) -> impl Iterator<Item = &Rule> {
        let strict: &[Rule] = if mode.is_strict() { &self.strict_rules } else { &[] };
        self.rules.iter().chain(strict)
    }

    /// Total rules applicable in `mode`.
    pub fn rule_count(&self, mode: ValidationMode) -> usize {
        self.rules(mode).count()
    }
}

fn compile_rules(documents: &[RuleDocument], origin: &str) -> Result<Vec<Rule>, RegistryError> {
    documents.iter().map(|d| compile_rule(d, origin)).collect()
}

fn compile_rule(document: &RuleDocument, origin: &str) -> Result<Rule, RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidRuleSet {
        origin: origin.to_string(),
        reason: format!("rule at \"{}\": {reason}", document.path),
    };

    let path = FieldPath::parse(&document.path).map_err(|e| invalid(e.to_string()))?;
    let kind = match &document.kind {
        RuleKindDocument::Required => RuleKind::Required,
        RuleKindDocument::DateTime => RuleKind::Format(Format::DateTime),
        RuleKindDocument::Date => RuleKind::Format(Format::Date),
        RuleKindDocument::FixedLength { length } => RuleKind::Format(Format::FixedLength(*length)),
        RuleKindDocument::Pattern { pattern } => {
            let pattern = Pattern::new(pattern).map_err(|e| invalid(format!("invalid regex: {e}")))?;
            RuleKind::Format(Format::Pattern(pattern))
        }
        RuleKindDocument::InitialOrEmpty => RuleKind::Format(Format::InitialOrEmpty),
        RuleKindDocument::Postcode => RuleKind::Format(Format::Postcode),
        RuleKindDocument::ConditionalRequired { when, equals } => {
            if !matches!(path.segments().last(), Some(Segment::Key(_))) {
                return Err(invalid(
                    "conditional_required target must end in an object key".to_string(),
                ));
            }
            let when = FieldPath::parse(when).map_err(|e| invalid(e.to_string()))?;
            RuleKind::ConditionalRequired {
                when,
                equals: equals.clone(),
            }
        }
    };
    Ok(Rule { path, kind })
}
