//! # courtlist-publication — Validate and Ingest
//!
//! Everything between "a provider sent bytes and an envelope" and "an
//! artefact is current":
//!
//! - [`auth`]: the authorization pre-check trait and two implementations.
//! - [`header`]: envelope validation and canonicalization.
//! - [`storage`]: where accepted bodies go ([`PayloadStore`]).
//! - [`store`]: artefact persistence with compare-and-set commits
//!   ([`ArtefactStore`]).
//! - [`supersession`]: the per-identity-key critical section.
//! - [`orchestrator`]: [`PublicationService::validate_and_ingest`].
//! - [`config`]: YAML and environment configuration.
//!
//! Body validation itself lives in `courtlist-schema`; artefact lifecycle
//! transitions in `courtlist-state`.

pub mod auth;
pub mod config;
pub mod error;
pub mod header;
pub mod orchestrator;
pub mod storage;
pub mod store;
pub mod supersession;

pub use auth::{AllowAll, AllowList, UploadAuthorizer};
pub use config::{ConfigError, PublicationConfig, RetryPolicy};
pub use error::{PublicationError, SupersessionError};
pub use header::{HeaderIssue, HeaderValidationError, HeaderValidator, SourceIdMode};
pub use orchestrator::{IngestOutcome, PublicationService, PublicationServiceBuilder};
pub use storage::{DirectoryPayloadStore, InMemoryPayloadStore, PayloadStore, StorageError};
pub use store::{ArtefactStore, Commit, InMemoryArtefactStore, StoreError};
pub use supersession::{CommittedArtefact, SupersessionDecision, SupersessionEngine};
