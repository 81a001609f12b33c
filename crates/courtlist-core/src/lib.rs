//! # courtlist-core — Foundational Types for the Publication Engine
//!
//! Every other crate in the workspace depends on `courtlist-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `ArtefactId` and `ListType` are
//!    newtypes; a list type is validated and canonicalized at construction.
//!
//! 2. **Closed envelope enums.** `ArtefactType`, `Sensitivity` and `Language`
//!    are defined once. Adding a variant forces every consumer to handle it.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision, so
//!    display windows from different providers compare exactly.
//!
//! 4. **Wire envelope vs validated envelope.** `HeaderGroup` admits missing
//!    fields; `ValidatedHeader` does not. Downstream code only ever sees the
//!    latter.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `courtlist-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod domain;
pub mod error;
pub mod header;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use digest::{sha256_digest, ContentDigest, DigestAlgorithm};
pub use domain::{ArtefactType, Language, Sensitivity};
pub use error::{StateTransitionError, ValidationError};
pub use header::{HeaderGroup, IdentityKey, ValidatedHeader};
pub use identity::{ArtefactId, ListType};
pub use temporal::Timestamp;
