//! # Artefact Lifecycle State Machine
//!
//! An artefact is an accepted publication. It is created `Current` and
//! leaves that state exactly once:
//!
//! ```text
//! Current ──▶ Superseded   (a newer submission with the same identity key)
//!    │
//!    └──────▶ Expired      (its display window has ended)
//! ```
//!
//! Both exits are terminal. Nothing ever deletes an artefact or touches its
//! stored body; a transition changes the state, the successor link, and the
//! end of the effective window, and appends to the transition log.

use serde::{Deserialize, Serialize};

use courtlist_core::{
    ArtefactId, ContentDigest, IdentityKey, StateTransitionError, Timestamp, ValidatedHeader,
};

// ─── Artefact State ──────────────────────────────────────────────────

/// The lifecycle state of an artefact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtefactState {
    /// The artefact is the live publication for its identity key.
    Current,
    /// Replaced by a newer artefact (terminal).
    Superseded,
    /// Display window ended without replacement (terminal).
    Expired,
}

impl ArtefactState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Superseded | Self::Expired)
    }
}

impl std::fmt::Display for ArtefactState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Current => "CURRENT",
            Self::Superseded => "SUPERSEDED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

// ─── Stored Body Reference ───────────────────────────────────────────

/// Where the accepted body was stored, and what it hashed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageReference {
    /// Opaque location understood by the payload store.
    pub location: String,
    /// Digest of the body bytes exactly as received.
    pub digest: ContentDigest,
    /// Body length in bytes.
    pub size_bytes: u64,
}

// ─── Transition Records ──────────────────────────────────────────────

/// Record of an artefact state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State before the transition.
    pub from_state: ArtefactState,
    /// State after the transition.
    pub to_state: ArtefactState,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Reason for the transition.
    pub reason: String,
}

// ─── Artefact ────────────────────────────────────────────────────────

/// A persisted publication with its lifecycle state and transition history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artefact {
    pub artefact_id: ArtefactId,
    /// The validated envelope the artefact was accepted with.
    pub header: ValidatedHeader,
    pub payload: StorageReference,
    /// Start of the window during which the artefact is visible.
    pub effective_from: Timestamp,
    /// End of the visible window. Starts as the requested display end and
    /// is capped at the supersession time when a successor arrives.
    pub effective_to: Timestamp,
    pub state: ArtefactState,
    /// The artefact that replaced this one.
    pub superseded_by: Option<ArtefactId>,
    /// The artefact this one replaced.
    pub supersedes: Option<ArtefactId>,
    /// Position in the global commit order. Later commits win.
    pub commit_sequence: u64,
    pub received_at: Timestamp,
    /// Ordered log of all state transitions.
    pub transitions: Vec<TransitionRecord>,
}

impl Artefact {
    /// Create a current artefact whose effective window is the requested
    /// display window.
    pub fn new_current(
        artefact_id: ArtefactId,
        header: ValidatedHeader,
        payload: StorageReference,
        received_at: Timestamp,
    ) -> Self {
        Self {
            artefact_id,
            effective_from: header.display_from,
            effective_to: header.display_to,
            header,
            payload,
            state: ArtefactState::Current,
            superseded_by: None,
            supersedes: None,
            commit_sequence: 0,
            received_at,
            transitions: Vec::new(),
        }
    }

    /// The identity key this artefact is current for.
    pub fn identity_key(&self) -> IdentityKey {
        self.header.identity_key()
    }

    pub fn is_current(&self) -> bool {
        self.state == ArtefactState::Current
    }

    /// Whether the display window has ended at `now`, regardless of state.
    pub fn display_window_ended(&self, now: Timestamp) -> bool {
        self.header.is_expired_at(now)
    }

    /// Whether consumers should see this artefact at `now`.
    pub fn is_visible_at(&self, now: Timestamp) -> bool {
        self.is_current() && self.effective_from <= now && now <= self.effective_to
    }

    /// Replace this artefact with `successor` (CURRENT → SUPERSEDED).
    ///
    /// The effective window is capped at `at`, but never ends before it
    /// starts.
    pub fn supersede(&mut self, successor: ArtefactId, at: Timestamp) -> Result<(), StateTransitionError> {
        self.require_current(ArtefactState::Superseded)?;
        self.superseded_by = Some(successor);
        self.effective_to = self.effective_to.min(at).max(self.effective_from);
        self.do_transition(ArtefactState::Superseded, at, format!("superseded by {successor}"));
        Ok(())
    }

    /// Retire an artefact whose display window has ended (CURRENT → EXPIRED).
    pub fn expire(&mut self, at: Timestamp) -> Result<(), StateTransitionError> {
        self.require_current(ArtefactState::Expired)?;
        if !self.display_window_ended(at) {
            return Err(StateTransitionError::InvalidTransition {
                from: self.state.to_string(),
                to: ArtefactState::Expired.to_string(),
                reason: format!("display window open until {}", self.header.display_to),
            });
        }
        self.do_transition(ArtefactState::Expired, at, "display window ended".to_string());
        Ok(())
    }

    fn require_current(&self, target: ArtefactState) -> Result<(), StateTransitionError> {
        if self.state.is_terminal() {
            return Err(StateTransitionError::InvalidTransition {
                from: self.state.to_string(),
                to: target.to_string(),
                reason: "terminal state".to_string(),
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: ArtefactState, at: Timestamp, reason: String) {
        self.transitions.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            timestamp: at,
            reason,
        });
        self.state = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
