//! # Publication Orchestrator
//!
//! [`PublicationService::validate_and_ingest`] is the one inbound operation.
//! Steps run in a fixed order and the first failure ends the submission:
//!
//! 1. authorization pre-check on the declared list type;
//! 2. envelope validation;
//! 3. rule set lookup (an unknown list type is a configuration error);
//! 4. body parse and structural validation in the requested mode;
//! 5. supersession commit, retried with backoff on conflict.
//!
//! A submission that fails any step leaves no trace in the stores.

use std::sync::Arc;

use serde::Serialize;

use courtlist_core::{HeaderGroup, ListType, Timestamp, ValidatedHeader};
use courtlist_schema::{RuleRegistry, StructuralValidator, ValidationMode};
use courtlist_state::Artefact;

use crate::auth::{AllowAll, UploadAuthorizer};
use crate::config::{PublicationConfig, RetryPolicy};
use crate::error::{PublicationError, SupersessionError};
use crate::header::HeaderValidator;
use crate::storage::{InMemoryPayloadStore, PayloadStore};
use crate::store::{ArtefactStore, InMemoryArtefactStore};
use crate::supersession::{CommittedArtefact, SupersessionDecision, SupersessionEngine};

/// The result of a successful ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    /// The committed artefact, now current for its identity key.
    pub artefact: Artefact,
    pub decision: SupersessionDecision,
    /// Commit attempts used, including the successful one.
    pub attempts: u32,
}

/// Validates submissions and commits accepted ones as artefacts.
pub struct PublicationService {
    registry: Arc<RuleRegistry>,
    headers: HeaderValidator,
    validator: StructuralValidator,
    engine: SupersessionEngine,
    authorizer: Arc<dyn UploadAuthorizer>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for PublicationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicationService")
            .field("list_types", &self.registry.len())
            .field("headers", &self.headers)
            .field("engine", &self.engine)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl PublicationService {
    /// Start building a service over `registry`.
    pub fn builder(registry: Arc<RuleRegistry>) -> PublicationServiceBuilder {
        PublicationServiceBuilder {
            registry,
            config: PublicationConfig::default(),
            authorizer: None,
            artefacts: None,
            payloads: None,
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &SupersessionEngine {
        &self.engine
    }

    pub fn artefact_store(&self) -> &Arc<dyn ArtefactStore> {
        self.engine.artefact_store()
    }

    /// Validate a submission and, if it passes, commit it.
    pub fn validate_and_ingest(
        &self,
        identity: &str,
        raw_body: &[u8],
        header: &HeaderGroup,
        strict_mode: bool,
    ) -> Result<IngestOutcome, PublicationError> {
        self.validate_and_ingest_at(identity, raw_body, header, strict_mode, Timestamp::now())
    }

    /// [`validate_and_ingest`](Self::validate_and_ingest) at a fixed instant.
    pub fn validate_and_ingest_at(
        &self,
        identity: &str,
        raw_body: &[u8],
        header: &HeaderGroup,
        strict_mode: bool,
        now: Timestamp,
    ) -> Result<IngestOutcome, PublicationError> {
        // Authorization needs a list type. An absent or malformed one cannot
        // be authorized against and is reported by envelope validation.
        if let Some(list_type) = header.list_type.as_deref().and_then(|raw| ListType::parse(raw).ok()) {
            if !self.authorizer.can_upload(identity, &list_type) {
                tracing::warn!(identity, %list_type, "upload refused by authorization pre-check");
                return Err(PublicationError::Unauthorized {
                    identity: identity.to_string(),
                    list_type,
                });
            }
        }

        let validated = self.headers.validate(header).inspect_err(|e| {
            tracing::warn!(identity, issues = e.issues.len(), "envelope rejected");
        })?;

        let rule_set = self.registry.rules_for(&validated.list_type)?;
        let mode = ValidationMode::from_strict_flag(strict_mode);
        self.validator
            .validate_bytes(raw_body, rule_set, mode)
            .inspect_err(|e| {
                tracing::warn!(
                    identity,
                    list_type = %validated.list_type,
                    %mode,
                    violations = e.violations.len(),
                    "payload rejected"
                );
            })?;

        let (committed, attempts) = self.commit_with_retry(&validated, raw_body, now)?;
        Ok(IngestOutcome {
            artefact: committed.artefact,
            decision: committed.decision,
            attempts,
        })
    }

    fn commit_with_retry(
        &self,
        header: &ValidatedHeader,
        body: &[u8],
        now: Timestamp,
    ) -> Result<(CommittedArtefact, u32), PublicationError> {
        let mut attempt = 1;
        loop {
            match self.engine.commit(header.clone(), body, now) {
                Ok(committed) => return Ok((committed, attempt)),
                Err(SupersessionError::Conflict { key, reason }) => {
                    if attempt >= self.retry.max_attempts {
                        tracing::error!(%key, attempts = attempt, %reason, "supersession conflict not resolved");
                        return Err(PublicationError::Conflict { key, attempts: attempt });
                    }
                    let backoff = self.retry.backoff_after(attempt);
                    tracing::debug!(
                        %key,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        %reason,
                        "supersession conflict, retrying"
                    );
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
                Err(SupersessionError::Storage(e)) => return Err(PublicationError::Storage(e)),
                Err(SupersessionError::StateTransition(e)) => {
                    return Err(PublicationError::StateTransition(e))
                }
            }
        }
    }
}

/// Assembles a [`PublicationService`], defaulting every collaborator to its
/// in-memory form and authorization to [`AllowAll`].
pub struct PublicationServiceBuilder {
    registry: Arc<RuleRegistry>,
    config: PublicationConfig,
    authorizer: Option<Arc<dyn UploadAuthorizer>>,
    artefacts: Option<Arc<dyn ArtefactStore>>,
    payloads: Option<Arc<dyn PayloadStore>>,
}

impl PublicationServiceBuilder {
    pub fn config(mut self, config: PublicationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn UploadAuthorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    pub fn artefact_store(mut self, store: Arc<dyn ArtefactStore>) -> Self {
        self.artefacts = Some(store);
        self
    }

    pub fn payload_store(mut self, store: Arc<dyn PayloadStore>) -> Self {
        self.payloads = Some(store);
        self
    }

    pub fn build(self) -> PublicationService {
        let artefacts = self
            .artefacts
            .unwrap_or_else(|| Arc::new(InMemoryArtefactStore::new()));
        let payloads = self
            .payloads
            .unwrap_or_else(|| Arc::new(InMemoryPayloadStore::new()));
        PublicationService {
            registry: self.registry,
            headers: HeaderValidator::from_config(&self.config),
            validator: StructuralValidator::new(),
            engine: SupersessionEngine::new(artefacts, payloads, self.config.lock_timeout()),
            authorizer: self.authorizer.unwrap_or_else(|| Arc::new(AllowAll)),
            retry: self.config.retry_policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AllowList;
    use crate::storage::StorageError;
    use courtlist_schema::{FieldPath, Rule, RuleSet};
    use courtlist_state::{ArtefactState, StorageReference};
    use serde_json::json;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    const NOON: &str = "2024-10-01T12:00:00Z";

    fn registry() -> Arc<RuleRegistry> {
        let rules = RuleSet::new(
            ListType::parse("TEST_LIST").unwrap(),
            vec![FieldPath::root()],
            vec![
                Rule::required(FieldPath::parse("document").unwrap()),
                Rule::required(FieldPath::parse("hearings[*].caseName").unwrap()),
            ],
        );
        Arc::new(RuleRegistry::from_rule_sets([rules]).unwrap())
    }

    fn header(list_type: &str) -> HeaderGroup {
        HeaderGroup {
            provenance: Some("COMMON_PLATFORM".to_string()),
            source_artefact_id: Some("id1".to_string()),
            artefact_type: Some("LIST".to_string()),
            sensitivity: Some("PUBLIC".to_string()),
            language: Some("ENGLISH".to_string()),
            display_from: Some(ts("2024-10-01T00:00:00Z")),
            display_to: Some(ts("2024-10-02T00:00:00Z")),
            list_type: Some(list_type.to_string()),
            location_id: Some("123".to_string()),
            content_date: Some(ts("2024-10-01T00:00:00Z")),
        }
    }

    fn valid_body() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "document": {"publicationDate": "2024-10-01T09:00:00Z"},
            "hearings": [{"caseName": "R v Smith"}]
        }))
        .unwrap()
    }

    fn service() -> PublicationService {
        PublicationService::builder(registry()).build()
    }

    #[test]
    fn accepted_then_superseded() {
        let service = service();
        let first = service
            .validate_and_ingest_at("feed", &valid_body(), &header("TEST_LIST"), false, ts(NOON))
            .unwrap();
        assert_eq!(first.decision, SupersessionDecision::CreateNew);
        assert_eq!(first.attempts, 1);

        let second = service
            .validate_and_ingest_at("feed", &valid_body(), &header("test_list"), false, ts(NOON))
            .unwrap();
        assert_eq!(second.decision, SupersessionDecision::Supersede(first.artefact.artefact_id));
        let prior = service.artefact_store().get(&first.artefact.artefact_id).unwrap();
        assert_eq!(prior.state, ArtefactState::Superseded);
    }

    #[test]
    fn invalid_body_reports_all_violations_and_commits_nothing() {
        let service = service();
        let body = serde_json::to_vec(&json!({"hearings": [{}, {"caseName": null}]})).unwrap();
        let err = service
            .validate_and_ingest_at("feed", &body, &header("TEST_LIST"), false, ts(NOON))
            .unwrap_err();
        let PublicationError::PayloadValidation(e) = err else {
            panic!("expected payload validation error, got {err:?}");
        };
        assert_eq!(e.violations.len(), 3);
        let key = service.headers.validate(&header("TEST_LIST")).unwrap().identity_key();
        assert!(service.artefact_store().history(&key).is_empty());
    }

    #[test]
    fn unparsable_body_is_payload_error() {
        let err = service()
            .validate_and_ingest_at("feed", b"{not json", &header("TEST_LIST"), false, ts(NOON))
            .unwrap_err();
        assert!(matches!(err, PublicationError::PayloadValidation(_)));
    }

    #[test]
    fn unknown_list_type_is_configuration_error() {
        let err = service()
            .validate_and_ingest_at("feed", &valid_body(), &header("OTHER_LIST"), false, ts(NOON))
            .unwrap_err();
        assert!(matches!(err, PublicationError::UnknownListType(ref lt) if lt.as_str() == "OTHER_LIST"));
    }

    #[test]
    fn header_errors_stop_before_body() {
        let mut h = header("TEST_LIST");
        h.provenance = None;
        let err = service()
            .validate_and_ingest_at("feed", b"{not json", &h, false, ts(NOON))
            .unwrap_err();
        assert!(matches!(err, PublicationError::HeaderValidation(_)));
    }

    #[test]
    fn unauthorized_short_circuits() {
        let service = PublicationService::builder(registry())
            .authorizer(Arc::new(
                AllowList::new().grant("feed", ListType::parse("OTHER_LIST").unwrap()),
            ))
            .build();
        // Even a malformed envelope is refused before validation.
        let mut h = header("TEST_LIST");
        h.provenance = None;
        let err = service
            .validate_and_ingest_at("feed", b"{not json", &h, false, ts(NOON))
            .unwrap_err();
        assert!(matches!(err, PublicationError::Unauthorized { .. }));
    }

    struct BrokenPayloadStore;

    impl PayloadStore for BrokenPayloadStore {
        fn persist(&self, _: &ValidatedHeader, _: &[u8]) -> Result<StorageReference, StorageError> {
            Err(StorageError::Unavailable("bucket offline".to_string()))
        }

        fn fetch(&self, reference: &StorageReference) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(reference.location.clone()))
        }
    }

    #[test]
    fn storage_failure_surfaces() {
        let service = PublicationService::builder(registry())
            .payload_store(Arc::new(BrokenPayloadStore))
            .build();
        let err = service
            .validate_and_ingest_at("feed", &valid_body(), &header("TEST_LIST"), false, ts(NOON))
            .unwrap_err();
        assert!(matches!(err, PublicationError::Storage(_)));
        assert!(!err.is_content_rejection());
    }

    #[test]
    fn persistent_conflict_exhausts_retries() {
        let config = PublicationConfig {
            lock_timeout_ms: 5,
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            ..PublicationConfig::default()
        };
        let service = PublicationService::builder(registry()).config(config).build();
        let key = service.headers.validate(&header("TEST_LIST")).unwrap().identity_key();
        let handle = service.engine.lock_handle(&key);
        let _held = handle.lock();

        let err = service
            .validate_and_ingest_at("feed", &valid_body(), &header("TEST_LIST"), false, ts(NOON))
            .unwrap_err();
        assert!(matches!(err, PublicationError::Conflict { attempts: 3, .. }));
    }
}
