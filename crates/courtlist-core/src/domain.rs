//! # Envelope Enumerations
//!
//! Closed enumerations carried in a submission's envelope. Each has a single
//! definition here; adding a variant forces every `match` in the workspace
//! to handle it.
//!
//! Wire form is `SCREAMING_SNAKE_CASE`, the form providers already send.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The kind of publication an artefact represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtefactType {
    /// A hearing list.
    List,
    /// Judgments and outcomes.
    JudgementsAndOutcomes,
    /// A general publication (notices, guidance).
    GeneralPublication,
    /// Listing and court services update.
    Lcsu,
}

/// Access classification of a published artefact.
///
/// Consumed, not decided, by the engine: it travels with the artefact so
/// downstream distribution can enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sensitivity {
    /// Visible to anyone.
    Public,
    /// Visible to verified users.
    Private,
    /// Visible to users holding a matching entitlement.
    Classified,
}

/// Language of the publication body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    /// English.
    English,
    /// Welsh.
    Welsh,
    /// Both English and Welsh.
    BiLingual,
}

impl ArtefactType {
    /// All variants, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::List,
        Self::JudgementsAndOutcomes,
        Self::GeneralPublication,
        Self::Lcsu,
    ];

    /// Wire name of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "LIST",
            Self::JudgementsAndOutcomes => "JUDGEMENTS_AND_OUTCOMES",
            Self::GeneralPublication => "GENERAL_PUBLICATION",
            Self::Lcsu => "LCSU",
        }
    }
}

impl Sensitivity {
    /// All variants, in declaration order.
    pub const ALL: [Self; 3] = [Self::Public, Self::Private, Self::Classified];

    /// Wire name of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
            Self::Classified => "CLASSIFIED",
        }
    }
}

impl Language {
    /// All variants, in declaration order.
    pub const ALL: [Self; 3] = [Self::English, Self::Welsh, Self::BiLingual];

    /// Wire name of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "ENGLISH",
            Self::Welsh => "WELSH",
            Self::BiLingual => "BI_LINGUAL",
        }
    }
}

macro_rules! wire_enum_impls {
    ($ty:ty, $field:literal) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| ValidationError::UnknownVariant {
                        field: $field,
                        value: s.to_string(),
                    })
            }
        }
    };
}

wire_enum_impls!(ArtefactType, "artefact type");
wire_enum_impls!(Sensitivity, "sensitivity");
wire_enum_impls!(Language, "language");
