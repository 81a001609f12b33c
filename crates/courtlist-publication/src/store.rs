//! # Artefact Store
//!
//! The artefact store owns the "at most one current artefact per identity
//! key" invariant. [`ArtefactStore::commit`] is a compare-and-set: it
//! succeeds only if the artefact the caller decided to supersede is still
//! the current one for the key, and it applies the supersession of the
//! prior and the insertion of the successor as one step.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use courtlist_core::{ArtefactId, IdentityKey, StateTransitionError, Timestamp};
use courtlist_state::Artefact;

/// Errors from an artefact store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The current artefact for the key is not the one the commit expected.
    #[error("current artefact for {key} is {}, expected {}", render(.actual), render(.expected))]
    NotCurrent {
        key: String,
        expected: Option<ArtefactId>,
        actual: Option<ArtefactId>,
    },

    #[error("artefact {0} not found")]
    NotFound(ArtefactId),

    #[error(transparent)]
    StateTransition(#[from] StateTransitionError),
}

fn render(id: &Option<ArtefactId>) -> String {
    id.map_or_else(|| "none".to_string(), |id| id.to_string())
}

/// One atomic change to the store.
#[derive(Debug, Clone)]
pub struct Commit {
    /// The new artefact, in state `Current`. Its commit sequence is assigned
    /// by the store.
    pub artefact: Artefact,
    /// The artefact it replaces, or `None` if none may be current.
    pub supersedes: Option<ArtefactId>,
    /// The commit instant.
    pub at: Timestamp,
}

/// Persistence for artefacts and their lifecycle.
pub trait ArtefactStore: Send + Sync {
    /// The current artefact for `key`, if any.
    fn current_for(&self, key: &IdentityKey) -> Option<Artefact>;

    fn get(&self, id: &ArtefactId) -> Option<Artefact>;

    /// Every artefact ever committed under `key`, in commit order.
    fn history(&self, key: &IdentityKey) -> Vec<Artefact>;

    /// Every artefact currently in state `Current`.
    fn current_artefacts(&self) -> Vec<Artefact>;

    /// Apply `commit` atomically, returning the stored artefact.
    fn commit(&self, commit: Commit) -> Result<Artefact, StoreError>;

    /// Move an artefact whose display window has ended to `Expired`.
    fn expire(&self, id: &ArtefactId, at: Timestamp) -> Result<Artefact, StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    artefacts: HashMap<ArtefactId, Artefact>,
    current: HashMap<IdentityKey, ArtefactId>,
    chains: HashMap<IdentityKey, Vec<ArtefactId>>,
    last_sequence: u64,
}

/// Artefact store held in process memory.
///
/// A single `RwLock` covers all maps, so readers always see a state in which
/// the current-artefact index agrees with the artefacts themselves.
#[derive(Debug, Default)]
pub struct InMemoryArtefactStore {
    inner: RwLock<Inner>,
}

impl InMemoryArtefactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of artefacts held, in any state.
    pub fn len(&self) -> usize {
        self.inner.read().artefacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().artefacts.is_empty()
    }
}

impl ArtefactStore for InMemoryArtefactStore {
    fn current_for(&self, key: &IdentityKey) -> Option<Artefact> {
        let inner = self.inner.read();
        inner
            .current
            .get(key)
            .and_then(|id| inner.artefacts.get(id))
            .cloned()
    }

    fn get(&self, id: &ArtefactId) -> Option<Artefact> {
        self.inner.read().artefacts.get(id).cloned()
    }

    fn history(&self, key: &IdentityKey) -> Vec<Artefact> {
        let inner = self.inner.read();
        inner
            .chains
            .get(key)
            .map(|ids| ids.iter().filter_map(|id| inner.artefacts.get(id)).cloned().collect())
            .unwrap_or_default()
    }

    fn current_artefacts(&self) -> Vec<Artefact> {
        let inner = self.inner.read();
        let mut current: Vec<Artefact> = inner
            .current
            .values()
            .filter_map(|id| inner.artefacts.get(id))
            .cloned()
            .collect();
        current.sort_by_key(|a| a.commit_sequence);
        current
    }

    fn commit(&self, commit: Commit) -> Result<Artefact, StoreError> {
        let Commit {
            mut artefact,
            supersedes,
            at,
        } = commit;
        let key = artefact.identity_key();

        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let actual = inner.current.get(&key).copied();
        if actual != supersedes {
            return Err(StoreError::NotCurrent {
                key: key.to_string(),
                expected: supersedes,
                actual,
            });
        }

        if let Some(prior_id) = supersedes {
            let prior = inner
                .artefacts
                .get_mut(&prior_id)
                .ok_or(StoreError::NotFound(prior_id))?;
            prior.supersede(artefact.artefact_id, at)?;
            artefact.supersedes = Some(prior_id);
        }

        inner.last_sequence += 1;
        artefact.commit_sequence = inner.last_sequence;
        inner.current.insert(key.clone(), artefact.artefact_id);
        inner.chains.entry(key).or_default().push(artefact.artefact_id);
        inner.artefacts.insert(artefact.artefact_id, artefact.clone());
        Ok(artefact)
    }

    fn expire(&self, id: &ArtefactId, at: Timestamp) -> Result<Artefact, StoreError> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let artefact = inner.artefacts.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        artefact.expire(at)?;
        let key = artefact.identity_key();
        if inner.current.get(&key) == Some(id) {
            inner.current.remove(&key);
        }
        Ok(artefact.clone())
    }
}
