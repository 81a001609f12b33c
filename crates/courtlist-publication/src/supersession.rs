//! # Artefact Supersession
//!
//! Decides whether an accepted submission replaces the current artefact for
//! its identity key, and applies that decision.
//!
//! ## Critical section
//!
//! Everything from "look up the current artefact" to "commit" runs while
//! holding a mutex dedicated to the identity key:
//!
//! 1. expire the current artefact if its display window has ended;
//! 2. decide [`SupersessionDecision::CreateNew`] or
//!    [`SupersessionDecision::Supersede`];
//! 3. persist the body (a failure here aborts with nothing committed);
//! 4. commit the new artefact and the supersession of the prior together.
//!
//! Submissions for different keys never wait on each other. The lock is
//! taken with a timeout; failing to get it is a
//! [`SupersessionError::Conflict`], which the orchestrator retries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use courtlist_core::{ArtefactId, IdentityKey, Timestamp, ValidatedHeader};
use courtlist_state::Artefact;

use crate::error::SupersessionError;
use crate::storage::PayloadStore;
use crate::store::{ArtefactStore, Commit};

/// What happens to the current artefact when a submission is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "prior", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupersessionDecision {
    /// No artefact is current for the key; the submission starts a chain.
    CreateNew,
    /// The submission replaces the given current artefact.
    Supersede(ArtefactId),
}

impl SupersessionDecision {
    /// The artefact being replaced, if any.
    pub fn prior(&self) -> Option<ArtefactId> {
        match self {
            Self::CreateNew => None,
            Self::Supersede(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for SupersessionDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateNew => f.write_str("CREATE_NEW"),
            Self::Supersede(id) => write!(f, "SUPERSEDE({id})"),
        }
    }
}

/// The result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedArtefact {
    /// The new current artefact.
    pub artefact: Artefact,
    pub decision: SupersessionDecision,
    /// A prior whose window had ended and was expired instead of superseded.
    pub expired: Option<ArtefactId>,
}

/// One mutex per identity key, created on demand and dropped when unused.
#[derive(Debug, Default)]
struct KeyLocks {
    locks: Mutex<HashMap<IdentityKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    fn handle(&self, key: &IdentityKey) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.lock().entry(key.clone()).or_default())
    }

    /// Give back a handle, removing the entry once nobody else holds one.
    fn release(&self, key: &IdentityKey, handle: Arc<Mutex<()>>) {
        drop(handle);
        let mut locks = self.locks.lock();
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
    }

    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Applies supersession decisions against an artefact store.
pub struct SupersessionEngine {
    artefacts: Arc<dyn ArtefactStore>,
    payloads: Arc<dyn PayloadStore>,
    locks: KeyLocks,
    lock_timeout: Duration,
}

impl std::fmt::Debug for SupersessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupersessionEngine")
            .field("lock_timeout", &self.lock_timeout)
            .field("held_keys", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl SupersessionEngine {
    pub fn new(
        artefacts: Arc<dyn ArtefactStore>,
        payloads: Arc<dyn PayloadStore>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            artefacts,
            payloads,
            locks: KeyLocks::default(),
            lock_timeout,
        }
    }

    pub fn artefact_store(&self) -> &Arc<dyn ArtefactStore> {
        &self.artefacts
    }

    pub fn payload_store(&self) -> &Arc<dyn PayloadStore> {
        &self.payloads
    }

    #[cfg(test)]
    pub(crate) fn lock_handle(&self, key: &IdentityKey) -> Arc<Mutex<()>> {
        self.locks.handle(key)
    }

    /// Decide what committing `candidate` at `now` would do.
    ///
    /// Pure: an existing artefact is superseded only if it is current, its
    /// window has not ended, and it shares the candidate's identity key.
    pub fn resolve(
        candidate: &ValidatedHeader,
        existing: Option<&Artefact>,
        now: Timestamp,
    ) -> SupersessionDecision {
        match existing {
            Some(prior)
                if prior.is_current()
                    && !prior.display_window_ended(now)
                    && prior.identity_key() == candidate.identity_key() =>
            {
                SupersessionDecision::Supersede(prior.artefact_id)
            }
            _ => SupersessionDecision::CreateNew,
        }
    }

    /// Persist `body` and commit a new current artefact for `header`.
    pub fn commit(
        &self,
        header: ValidatedHeader,
        body: &[u8],
        now: Timestamp,
    ) -> Result<CommittedArtefact, SupersessionError> {
        let key = header.identity_key();
        let handle = self.locks.handle(&key);
        let result = match handle.try_lock_for(self.lock_timeout) {
            Some(_guard) => self.commit_locked(&key, header, body, now),
            None => Err(SupersessionError::Conflict {
                key: key.to_string(),
                reason: format!("lock not acquired within {}ms", self.lock_timeout.as_millis()),
            }),
        };
        self.locks.release(&key, handle);
        result
    }

    fn commit_locked(
        &self,
        key: &IdentityKey,
        header: ValidatedHeader,
        body: &[u8],
        now: Timestamp,
    ) -> Result<CommittedArtefact, SupersessionError> {
        let mut existing = self.artefacts.current_for(key);
        let mut expired = None;
        if let Some(stale) = existing.take_if(|a| a.display_window_ended(now)) {
            self.artefacts.expire(&stale.artefact_id, now)?;
            tracing::info!(artefact_id = %stale.artefact_id, %key, "expired artefact whose display window ended");
            expired = Some(stale.artefact_id);
        }

        let decision = Self::resolve(&header, existing.as_ref(), now);

        let payload = self.payloads.persist(&header, body).inspect_err(|e| {
            tracing::error!(%key, error = %e, "payload storage failed; nothing committed");
        })?;

        let artefact = Artefact::new_current(ArtefactId::new(), header, payload, now);
        let artefact = self.artefacts.commit(Commit {
            artefact,
            supersedes: decision.prior(),
            at: now,
        })?;

        tracing::info!(
            artefact_id = %artefact.artefact_id,
            %decision,
            %key,
            commit_sequence = artefact.commit_sequence,
            "artefact committed"
        );
        Ok(CommittedArtefact {
            artefact,
            decision,
            expired,
        })
    }

    /// Expire every current artefact whose display window has ended at
    /// `now`, returning the ids expired.
    ///
    /// Each expiry runs under its key's lock, so a sweep never races a
    /// commit for the same key. A key whose lock is not acquired within the
    /// lock timeout is skipped with a warning and left for the next sweep.
    pub fn expire_due(&self, now: Timestamp) -> Result<Vec<ArtefactId>, SupersessionError> {
        let mut expired = Vec::new();
        for candidate in self.artefacts.current_artefacts() {
            if !candidate.display_window_ended(now) {
                continue;
            }
            let key = candidate.identity_key();
            let handle = self.locks.handle(&key);
            let result = match handle.try_lock_for(self.lock_timeout) {
                Some(_guard) => self.expire_if_current(&key, candidate.artefact_id, now),
                None => {
                    tracing::warn!(
                        %key,
                        artefact_id = %candidate.artefact_id,
                        "expiry skipped: key lock not acquired"
                    );
                    Ok(None)
                }
            };
            self.locks.release(&key, handle);
            expired.extend(result?);
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expiry sweep finished");
        }
        Ok(expired)
    }

    fn expire_if_current(
        &self,
        key: &IdentityKey,
        id: ArtefactId,
        now: Timestamp,
    ) -> Result<Option<ArtefactId>, SupersessionError> {
        match self.artefacts.current_for(key) {
            Some(current) if current.artefact_id == id => {
                self.artefacts.expire(&id, now)?;
                Ok(Some(id))
            }
            _ => Ok(None),
        }
    }
}
