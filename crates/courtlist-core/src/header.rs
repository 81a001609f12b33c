//! # Submission Envelope
//!
//! [`HeaderGroup`] is the envelope as it arrives on the wire: every field is
//! optional, and the enumerated fields are kept as raw text, so that a
//! missing, null or unrecognised value can be reported rather than failing
//! deserialization. The envelope validator turns it into a
//! [`ValidatedHeader`], whose fields are guaranteed present and canonical.
//!
//! [`IdentityKey`] is derived from a validated header and names the
//! supersession chain a submission belongs to.

use serde::{Deserialize, Serialize};

use crate::domain::{ArtefactType, Language, Sensitivity};
use crate::identity::ListType;
use crate::temporal::Timestamp;

/// Envelope metadata as submitted by an upstream provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderGroup {
    /// Identifier of the submitting system.
    #[serde(default)]
    pub provenance: Option<String>,
    /// The provider's own identifier for the publication.
    #[serde(default)]
    pub source_artefact_id: Option<String>,
    /// Kind of publication, e.g. `LIST`.
    #[serde(default, rename = "type")]
    pub artefact_type: Option<String>,
    /// Access classification, e.g. `PUBLIC`.
    #[serde(default)]
    pub sensitivity: Option<String>,
    /// Body language, e.g. `ENGLISH`.
    #[serde(default)]
    pub language: Option<String>,
    /// Start of the requested visibility window.
    #[serde(default)]
    pub display_from: Option<Timestamp>,
    /// End of the requested visibility window.
    #[serde(default)]
    pub display_to: Option<Timestamp>,
    /// List type, kept raw so that malformed values can be reported.
    #[serde(default)]
    pub list_type: Option<String>,
    /// Court or tribunal location identifier.
    #[serde(default)]
    pub location_id: Option<String>,
    /// The date the published content relates to.
    #[serde(default)]
    pub content_date: Option<Timestamp>,
}

/// An envelope that passed validation, in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedHeader {
    pub provenance: String,
    /// Absent only for manual uploads accepted in optional-source-id mode.
    pub source_artefact_id: Option<String>,
    pub artefact_type: ArtefactType,
    pub sensitivity: Sensitivity,
    pub language: Language,
    pub display_from: Timestamp,
    pub display_to: Timestamp,
    pub list_type: ListType,
    pub location_id: String,
    pub content_date: Timestamp,
}

impl ValidatedHeader {
    /// The supersession identity of this envelope.
    ///
    /// Provider submissions are keyed by their source artefact id. Without
    /// one, the key falls back to the content date and language, so that two
    /// manual uploads for the same court, day and language supersede each
    /// other while the English and Welsh editions coexist.
    pub fn identity_key(&self) -> IdentityKey {
        match &self.source_artefact_id {
            Some(source_artefact_id) => IdentityKey::Sourced {
                provenance: self.provenance.clone(),
                source_artefact_id: source_artefact_id.clone(),
                list_type: self.list_type.clone(),
                location_id: self.location_id.clone(),
            },
            None => IdentityKey::ContentBased {
                provenance: self.provenance.clone(),
                list_type: self.list_type.clone(),
                location_id: self.location_id.clone(),
                content_date: self.content_date,
                language: self.language,
            },
        }
    }

    /// Whether the requested display window has ended at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.display_to < now
    }
}

/// The key under which at most one artefact may be current.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentityKey {
    /// Keyed by the provider's source artefact id.
    Sourced {
        provenance: String,
        source_artefact_id: String,
        list_type: ListType,
        location_id: String,
    },
    /// Keyed by content, for submissions without a source artefact id.
    ContentBased {
        provenance: String,
        list_type: ListType,
        location_id: String,
        content_date: Timestamp,
        language: Language,
    },
}

impl IdentityKey {
    /// The list type component of the key.
    pub fn list_type(&self) -> &ListType {
        match self {
            Self::Sourced { list_type, .. } | Self::ContentBased { list_type, .. } => list_type,
        }
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sourced {
                provenance,
                source_artefact_id,
                list_type,
                location_id,
            } => write!(f, "{provenance}/{source_artefact_id}/{list_type}/{location_id}"),
            Self::ContentBased {
                provenance,
                list_type,
                location_id,
                content_date,
                language,
            } => write!(
                f,
                "{provenance}/{list_type}/{location_id}/{}/{language}",
                content_date.as_datetime().format("%Y-%m-%d")
            ),
        }
    }
}
