//! # courtlist-schema — Rule Sets and Structural Validation
//!
//! Court list bodies are untyped JSON whose required shape depends on the
//! list type. This crate holds everything needed to judge a body:
//!
//! - [`path`]: [`FieldPath`] addressing, shared by the validator and by
//!   fault-injection in tests.
//! - [`formats`]: pure semantic checks (date-times, dates, fixed lengths,
//!   initials, postcodes, patterns).
//! - [`rules`]: declarative rule sets and their compiled form.
//! - [`registry`]: the immutable list type → rule set map, built once.
//! - [`validate`]: the single collect-all walker.
//!
//! Adding a list type means adding a rule file. The walker does not change.

pub mod formats;
pub mod path;
pub mod registry;
pub mod rules;
pub mod validate;

pub use formats::{Format, FormatViolation};
pub use path::{FieldPath, PathParseError, Resolved};
pub use registry::{RegistryError, RuleRegistry};
pub use rules::{Rule, RuleKind, RuleSet, SchemaIssue, ValidationMode};
pub use validate::{PayloadValidationError, StructuralValidator, ValidationViolations, Violation};
