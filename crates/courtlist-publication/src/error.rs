//! # Publication Errors
//!
//! [`PublicationError`] is what a caller of the orchestrator sees. Content
//! rejections (envelope, body) carry full diagnostics and are never
//! downgraded. Configuration gaps, transient conflicts, refusals and storage
//! failures each have their own variant so callers can route them.

use thiserror::Error;

use courtlist_core::{ListType, StateTransitionError};
use courtlist_schema::{PayloadValidationError, RegistryError};

use crate::header::HeaderValidationError;
use crate::storage::StorageError;
use crate::store::StoreError;

/// Errors from the supersession critical section.
#[derive(Error, Debug)]
pub enum SupersessionError {
    /// The per-key serialization could not be obtained, or the store found
    /// that another commit got there first. Transient; retry.
    #[error("supersession conflict for {key}: {reason}")]
    Conflict {
        /// Display form of the identity key.
        key: String,
        /// What was contended.
        reason: String,
    },

    /// The body could not be persisted. Nothing was committed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A lifecycle transition was rejected by the artefact.
    #[error(transparent)]
    StateTransition(#[from] StateTransitionError),
}

impl From<StoreError> for SupersessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotCurrent { key, .. } => Self::Conflict {
                key,
                reason: err_reason_current_changed(),
            },
            StoreError::NotFound(id) => Self::Conflict {
                key: id.to_string(),
                reason: "artefact disappeared during commit".to_string(),
            },
            StoreError::StateTransition(e) => Self::StateTransition(e),
        }
    }
}

fn err_reason_current_changed() -> String {
    "current artefact changed since the decision was made".to_string()
}

/// Errors returned by [`crate::PublicationService::validate_and_ingest`].
#[derive(Error, Debug)]
pub enum PublicationError {
    /// The authorization pre-check refused the upload.
    #[error("{identity} is not authorized to publish {list_type}")]
    Unauthorized {
        /// The submitting identity.
        identity: String,
        /// The list type requested.
        list_type: ListType,
    },

    /// The envelope is malformed. The body was not examined.
    #[error(transparent)]
    HeaderValidation(#[from] HeaderValidationError),

    /// The body violates its list type's rules.
    #[error(transparent)]
    PayloadValidation(#[from] PayloadValidationError),

    /// No rule set is registered for the list type. A configuration error,
    /// not a content error.
    #[error("configuration error: no rule set registered for list type {0}")]
    UnknownListType(ListType),

    /// A rule registry could not be used.
    #[error("configuration error: {0}")]
    Registry(RegistryError),

    /// Serialization for the identity key was not obtained within the retry
    /// budget.
    #[error("supersession conflict for {key} persisted after {attempts} attempt(s)")]
    Conflict {
        /// Display form of the identity key.
        key: String,
        /// Attempts made.
        attempts: u32,
    },

    /// The body could not be persisted. No supersession was applied.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An artefact lifecycle transition was rejected.
    #[error(transparent)]
    StateTransition(#[from] StateTransitionError),
}

impl From<RegistryError> for PublicationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownListType(list_type) => Self::UnknownListType(list_type),
            other => Self::Registry(other),
        }
    }
}

impl PublicationError {
    /// Whether the submitter's content was rejected, as opposed to an
    /// operational failure.
    pub fn is_content_rejection(&self) -> bool {
        matches!(self, Self::HeaderValidation(_) | Self::PayloadValidation(_))
    }
}
