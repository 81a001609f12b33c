//! # courtlist-state — Artefact Lifecycle
//!
//! - **Artefact** (`artefact.rs`): `Current → Superseded | Expired`, with an
//!   ordered transition log and the effective validity window.
//!
//! Transitions are runtime-checked and report
//! [`courtlist_core::StateTransitionError`]; terminal states reject every
//! further transition.

pub mod artefact;

pub use artefact::{Artefact, ArtefactState, StorageReference, TransitionRecord};
