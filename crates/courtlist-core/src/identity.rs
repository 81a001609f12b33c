//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers used throughout the engine.
//! An [`ArtefactId`] cannot be passed where a [`ListType`] is expected.
//!
//! ## Validation
//!
//! [`ListType`] validates its format at construction time. [`ArtefactId`]
//! is UUID-based and always valid by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// UUID-based identifiers
// ---------------------------------------------------------------------------

/// Unique identifier of a persisted artefact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtefactId(Uuid);

impl ArtefactId {
    /// Create a new random artefact identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an artefact identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ArtefactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArtefactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// String-based identifiers
// ---------------------------------------------------------------------------

/// The list type of a publication, e.g. `CROWN_DAILY_LIST`.
///
/// The set of list types is open: the rule registry, not this type, decides
/// which ones are known. The canonical form is upper-case ASCII words joined
/// by single underscores; [`ListType::parse`] upper-cases and trims its input
/// before checking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListType(String);

impl ListType {
    /// Create a list type, normalizing case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidListType`] if the normalized value
    /// is not `SCREAMING_SNAKE_CASE`.
    pub fn parse(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = value.as_ref();
        let normalized = raw.trim().to_ascii_uppercase();
        if Self::is_canonical(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(ValidationError::InvalidListType(raw.to_string()))
        }
    }

    fn is_canonical(s: &str) -> bool {
        !s.is_empty()
            && s.split('_').all(|word| {
                !word.is_empty()
                    && word
                        .chars()
                        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            })
    }

    /// Access the list type string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ListType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ListType> for String {
    fn from(value: ListType) -> Self {
        value.0
    }
}

impl std::str::FromStr for ListType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ListType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
