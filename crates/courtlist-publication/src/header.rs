//! # Envelope Validation
//!
//! Turns a wire [`HeaderGroup`] into a [`ValidatedHeader`]. Like body
//! validation this is collect-all: every field problem is reported in one
//! [`HeaderValidationError`], so a provider can fix an envelope in a single
//! round trip.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use courtlist_core::{
    ArtefactType, HeaderGroup, Language, ListType, Sensitivity, ValidatedHeader, ValidationError,
};

use crate::config::PublicationConfig;

/// Whether submissions must carry a provider source artefact id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceIdMode {
    /// Every submission is keyed by its source artefact id.
    #[default]
    Required,
    /// Manual uploads may omit it and are keyed by content instead.
    Optional,
}

/// One problem with one envelope field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderIssue {
    /// Wire name of the field.
    pub field: &'static str,
    pub reason: String,
}

impl std::fmt::Display for HeaderIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Every problem found in an envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("envelope failed validation with {} issue(s):{}", .issues.len(), render_issues(.issues))]
pub struct HeaderValidationError {
    pub issues: Vec<HeaderIssue>,
}

impl HeaderValidationError {
    /// Whether `field` is among the reported fields.
    pub fn mentions(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }
}

fn render_issues(issues: &[HeaderIssue]) -> String {
    issues.iter().map(|i| format!("\n  - {i}")).collect()
}

const MISSING: &str = "is missing";
const BLANK: &str = "must not be blank";

/// Validates and canonicalizes submission envelopes.
#[derive(Debug, Clone, Copy)]
pub struct HeaderValidator {
    source_id_mode: SourceIdMode,
    default_display_days: i64,
}

impl Default for HeaderValidator {
    fn default() -> Self {
        Self::new(SourceIdMode::Required, 1)
    }
}

impl HeaderValidator {
    pub fn new(source_id_mode: SourceIdMode, default_display_days: i64) -> Self {
        Self {
            source_id_mode,
            default_display_days,
        }
    }

    pub fn from_config(config: &PublicationConfig) -> Self {
        Self::new(config.source_id_mode, config.default_display_days)
    }

    pub fn source_id_mode(&self) -> SourceIdMode {
        self.source_id_mode
    }

    /// Validate `header`, reporting every field problem at once.
    pub fn validate(&self, header: &HeaderGroup) -> Result<ValidatedHeader, HeaderValidationError> {
        let mut issues = Vec::new();

        let provenance = non_blank("provenance", header.provenance.as_deref(), &mut issues);
        let location_id = non_blank("locationId", header.location_id.as_deref(), &mut issues);
        let source_artefact_id = match self.source_id_mode {
            SourceIdMode::Required => {
                non_blank("sourceArtefactId", header.source_artefact_id.as_deref(), &mut issues).map(Some)
            }
            SourceIdMode::Optional => Some(trimmed(header.source_artefact_id.as_deref())),
        };

        let artefact_type = parsed::<ArtefactType>("type", header.artefact_type.as_deref(), &mut issues);
        let sensitivity = parsed::<Sensitivity>("sensitivity", header.sensitivity.as_deref(), &mut issues);
        let language = parsed::<Language>("language", header.language.as_deref(), &mut issues);
        let content_date = present("contentDate", header.content_date, &mut issues);

        let list_type = match header.list_type.as_deref() {
            None => {
                issues.push(issue("listType", MISSING));
                None
            }
            Some(raw) => match ListType::parse(raw) {
                Ok(list_type) => Some(list_type),
                Err(e) => {
                    issues.push(issue("listType", e.to_string()));
                    None
                }
            },
        };

        let display_from = present("displayFrom", header.display_from, &mut issues);
        let display_to = match (display_from, header.display_to) {
            (_, Some(to)) => Some(to),
            (Some(from), None) => match from.plus_days(self.default_display_days) {
                Ok(to) => Some(to),
                Err(e) => {
                    issues.push(issue("displayTo", e.to_string()));
                    None
                }
            },
            (None, None) => None,
        };
        if let (Some(from), Some(to)) = (display_from, display_to) {
            if from > to {
                issues.push(issue(
                    "displayTo",
                    format!("{to} is before displayFrom {from}"),
                ));
            }
        }

        match (
            provenance,
            source_artefact_id,
            artefact_type,
            sensitivity,
            language,
            display_from,
            display_to,
            list_type,
            location_id,
            content_date,
        ) {
            (
                Some(provenance),
                Some(source_artefact_id),
                Some(artefact_type),
                Some(sensitivity),
                Some(language),
                Some(display_from),
                Some(display_to),
                Some(list_type),
                Some(location_id),
                Some(content_date),
            ) if issues.is_empty() => Ok(ValidatedHeader {
                provenance,
                source_artefact_id,
                artefact_type,
                sensitivity,
                language,
                display_from,
                display_to,
                list_type,
                location_id,
                content_date,
            }),
            _ => Err(HeaderValidationError { issues }),
        }
    }
}

fn issue(field: &'static str, reason: impl Into<String>) -> HeaderIssue {
    HeaderIssue {
        field,
        reason: reason.into(),
    }
}

fn present<T: Copy>(field: &'static str, value: Option<T>, issues: &mut Vec<HeaderIssue>) -> Option<T> {
    if value.is_none() {
        issues.push(issue(field, MISSING));
    }
    value
}

fn parsed<T>(field: &'static str, value: Option<&str>, issues: &mut Vec<HeaderIssue>) -> Option<T>
where
    T: FromStr<Err = ValidationError>,
{
    let Some(raw) = value else {
        issues.push(issue(field, MISSING));
        return None;
    };
    match raw.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            issues.push(issue(field, e.to_string()));
            None
        }
    }
}

fn non_blank(field: &'static str, value: Option<&str>, issues: &mut Vec<HeaderIssue>) -> Option<String> {
    match value.map(str::trim) {
        None => {
            issues.push(issue(field, MISSING));
            None
        }
        Some("") => {
            issues.push(issue(field, BLANK));
            None
        }
        Some(v) => Some(v.to_string()),
    }
}

/// Optional source ids: blank is the same as absent.
fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
