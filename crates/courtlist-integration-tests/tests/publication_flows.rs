//! End-to-end flows through `PublicationService`: acceptance, supersession,
//! concurrency, and the failure paths that must leave no trace.

mod common;

use std::sync::{Arc, Barrier};

use courtlist_core::{IdentityKey, ValidatedHeader};
use courtlist_publication::{
    AllowList, ArtefactStore, InMemoryArtefactStore, PayloadStore, PublicationConfig, PublicationError,
    PublicationService, SourceIdMode, StorageError, SupersessionDecision,
};
use courtlist_state::{ArtefactState, StorageReference};

use common::*;

const MORNING: &str = "2024-10-01T08:00:00Z";
const NOON: &str = "2024-10-01T12:00:00Z";

fn service() -> PublicationService {
    PublicationService::builder(Arc::new(registry())).build()
}

fn crown_body() -> Vec<u8> {
    CROWN_DAILY_LIST.as_bytes().to_vec()
}

fn updated_crown_body() -> Vec<u8> {
    let mut document = json(CROWN_DAILY_LIST);
    document["venue"]["venueName"] = serde_json::json!("Leeds Combined Court Centre (amended)");
    serde_json::to_vec(&document).unwrap()
}

#[test]
fn crown_daily_list_create_then_supersede() {
    let service = service();
    let header = crown_header("X", "id1");

    let first = service
        .validate_and_ingest_at("crown-feed", &crown_body(), &header, false, ts(MORNING))
        .unwrap();
    assert_eq!(first.decision, SupersessionDecision::CreateNew);
    assert_eq!(first.artefact.state, ArtefactState::Current);
    assert_eq!(first.artefact.effective_from, ts("2024-10-01T00:00:00Z"));
    assert_eq!(first.artefact.effective_to, ts("2024-10-02T00:00:00Z"));

    let second = service
        .validate_and_ingest_at("crown-feed", &updated_crown_body(), &header, false, ts(NOON))
        .unwrap();
    assert_eq!(second.decision, SupersessionDecision::Supersede(first.artefact.artefact_id));
    assert_eq!(second.artefact.supersedes, Some(first.artefact.artefact_id));
    assert_ne!(second.artefact.payload.digest, first.artefact.payload.digest);

    let store = service.artefact_store();
    let key = second.artefact.identity_key();
    assert_eq!(store.current_for(&key).unwrap().artefact_id, second.artefact.artefact_id);

    let prior = store.get(&first.artefact.artefact_id).unwrap();
    assert_eq!(prior.state, ArtefactState::Superseded);
    assert_eq!(prior.superseded_by, Some(second.artefact.artefact_id));
    assert_eq!(prior.effective_to, ts(NOON));
    assert_eq!(prior.payload, first.artefact.payload);
}

#[test]
fn different_courts_do_not_supersede_each_other() {
    let service = service();
    let leeds = crown_header("X", "id1");
    let mut york = crown_header("X", "id1");
    york.location_id = Some("458".to_string());

    service
        .validate_and_ingest_at("feed", &crown_body(), &leeds, false, ts(MORNING))
        .unwrap();
    let other = service
        .validate_and_ingest_at("feed", &crown_body(), &york, false, ts(MORNING))
        .unwrap();
    assert_eq!(other.decision, SupersessionDecision::CreateNew);
}

#[test]
fn concurrent_same_key_submissions_are_linearized() {
    for _ in 0..20 {
        let service = service();
        let header = crown_header("X", "id1");
        let barrier = Barrier::new(2);

        let outcomes: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        service
                            .validate_and_ingest_at("feed", &crown_body(), &header, false, ts(NOON))
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let creates: Vec<_> = outcomes
            .iter()
            .filter(|o| o.decision == SupersessionDecision::CreateNew)
            .collect();
        let supersedes: Vec<_> = outcomes
            .iter()
            .filter(|o| matches!(o.decision, SupersessionDecision::Supersede(_)))
            .collect();
        assert_eq!(creates.len(), 1);
        assert_eq!(supersedes.len(), 1);
        assert_eq!(
            supersedes[0].decision,
            SupersessionDecision::Supersede(creates[0].artefact.artefact_id)
        );

        // Last committed wins.
        let key = creates[0].artefact.identity_key();
        let current = service.artefact_store().current_for(&key).unwrap();
        assert_eq!(current.artefact_id, supersedes[0].artefact.artefact_id);
        assert!(supersedes[0].artefact.commit_sequence > creates[0].artefact.commit_sequence);
    }
}

#[test]
fn many_keys_in_parallel_each_end_with_one_current() {
    let service = service();
    let sources: Vec<String> = (0..6).map(|i| format!("id{i}")).collect();

    std::thread::scope(|s| {
        for source in &sources {
            for _ in 0..3 {
                let service = &service;
                s.spawn(move || {
                    let header = crown_header("X", source);
                    service
                        .validate_and_ingest_at("feed", &crown_body(), &header, false, ts(NOON))
                        .unwrap();
                });
            }
        }
    });

    for source in &sources {
        let header = crown_header("X", source);
        let key = courtlist_publication::HeaderValidator::default()
            .validate(&header)
            .unwrap()
            .identity_key();
        let history = service.artefact_store().history(&key);
        assert_eq!(history.len(), 3);
        assert_eq!(history.iter().filter(|a| a.is_current()).count(), 1);
    }
}

#[test]
fn invalid_submission_leaves_no_artefact() {
    let service = service();
    let header = crown_header("X", "id1");
    let mut document = json(CROWN_DAILY_LIST);
    courtlist_schema::FieldPath::parse("venue")
        .unwrap()
        .remove(&mut document);
    let body = serde_json::to_vec(&document).unwrap();

    let err = service
        .validate_and_ingest_at("feed", &body, &header, false, ts(NOON))
        .unwrap_err();
    let PublicationError::PayloadValidation(e) = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(e.violations.len(), 1);
    assert!(service.artefact_store().current_artefacts().is_empty());
}

#[test]
fn strict_mode_is_chosen_by_the_caller() {
    let service = service();
    let header = crown_header("X", "id1");
    let mut document = json(CROWN_DAILY_LIST);
    document["venue"]["venueAddress"]["postCode"] = serde_json::json!("not a postcode");
    let body = serde_json::to_vec(&document).unwrap();

    let err = service
        .validate_and_ingest_at("feed", &body, &header, true, ts(MORNING))
        .unwrap_err();
    assert!(err.is_content_rejection());

    let accepted = service
        .validate_and_ingest_at("feed", &body, &header, false, ts(MORNING))
        .unwrap();
    assert_eq!(accepted.decision, SupersessionDecision::CreateNew);
}

#[test]
fn refused_identity_is_rejected_before_validation() {
    let service = PublicationService::builder(Arc::new(registry()))
        .authorizer(Arc::new(
            AllowList::new().grant("sjp-feed", list_type("SJP_PRESS_LIST")),
        ))
        .build();
    let err = service
        .validate_and_ingest_at("sjp-feed", b"not even json", &crown_header("X", "id1"), false, ts(NOON))
        .unwrap_err();
    assert!(matches!(err, PublicationError::Unauthorized { .. }));
}

struct OfflinePayloadStore;

impl PayloadStore for OfflinePayloadStore {
    fn persist(&self, _: &ValidatedHeader, _: &[u8]) -> Result<StorageReference, StorageError> {
        Err(StorageError::Unavailable("blob store offline".to_string()))
    }

    fn fetch(&self, reference: &StorageReference) -> Result<Vec<u8>, StorageError> {
        Err(StorageError::NotFound(reference.location.clone()))
    }
}

#[test]
fn storage_failure_never_supersedes_the_prior() {
    let artefacts: Arc<dyn ArtefactStore> = Arc::new(InMemoryArtefactStore::new());
    let header = crown_header("X", "id1");

    let healthy = PublicationService::builder(Arc::new(registry()))
        .artefact_store(Arc::clone(&artefacts))
        .build();
    let first = healthy
        .validate_and_ingest_at("feed", &crown_body(), &header, false, ts(MORNING))
        .unwrap();

    let degraded = PublicationService::builder(Arc::new(registry()))
        .artefact_store(Arc::clone(&artefacts))
        .payload_store(Arc::new(OfflinePayloadStore))
        .build();
    let err = degraded
        .validate_and_ingest_at("feed", &updated_crown_body(), &header, false, ts(NOON))
        .unwrap_err();
    assert!(matches!(err, PublicationError::Storage(_)));

    let prior = artefacts.get(&first.artefact.artefact_id).unwrap();
    assert_eq!(prior.state, ArtefactState::Current);
    assert_eq!(prior.effective_to, first.artefact.effective_to);
}

#[test]
fn manual_uploads_key_by_content_date_and_language() {
    let config = PublicationConfig {
        source_id_mode: SourceIdMode::Optional,
        ..PublicationConfig::default()
    };
    let service = PublicationService::builder(Arc::new(registry()))
        .config(config)
        .build();

    let mut english = crown_header("MANUAL_UPLOAD", "unused");
    english.source_artefact_id = None;
    let mut welsh = english.clone();
    welsh.language = Some("WELSH".to_string());

    let a = service
        .validate_and_ingest_at("admin", &crown_body(), &english, false, ts(MORNING))
        .unwrap();
    assert!(matches!(a.artefact.identity_key(), IdentityKey::ContentBased { .. }));
    let b = service
        .validate_and_ingest_at("admin", &crown_body(), &welsh, false, ts(MORNING))
        .unwrap();
    assert_eq!(b.decision, SupersessionDecision::CreateNew);
    let c = service
        .validate_and_ingest_at("admin", &updated_crown_body(), &english, false, ts(NOON))
        .unwrap();
    assert_eq!(c.decision, SupersessionDecision::Supersede(a.artefact.artefact_id));
}

#[test]
fn ended_display_window_expires_rather_than_supersedes() {
    let service = service();
    let header = crown_header("X", "id1");
    let first = service
        .validate_and_ingest_at("feed", &crown_body(), &header, false, ts(MORNING))
        .unwrap();

    let later = ts("2024-10-05T08:00:00Z");
    let mut next_week = header.clone();
    next_week.display_from = Some(later);
    next_week.display_to = Some(later.plus_days(1).unwrap());
    let second = service
        .validate_and_ingest_at("feed", &crown_body(), &next_week, false, later)
        .unwrap();

    assert_eq!(second.decision, SupersessionDecision::CreateNew);
    let prior = service.artefact_store().get(&first.artefact.artefact_id).unwrap();
    assert_eq!(prior.state, ArtefactState::Expired);
}

#[test]
fn stored_body_is_byte_identical() {
    let payloads = Arc::new(courtlist_publication::InMemoryPayloadStore::new());
    let service = PublicationService::builder(Arc::new(registry()))
        .payload_store(payloads.clone())
        .build();
    let body = crown_body();
    let outcome = service
        .validate_and_ingest_at("feed", &body, &crown_header("X", "id1"), false, ts(NOON))
        .unwrap();
    assert_eq!(payloads.fetch(&outcome.artefact.payload).unwrap(), body);
}
