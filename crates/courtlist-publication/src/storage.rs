//! # Payload Storage
//!
//! Accepted bodies are stored byte-for-byte as received, addressed by their
//! SHA-256 digest under the list type: `{list_type}/{digest_hex}.json`.
//! Identical resubmissions therefore share one blob, and a blob is never
//! rewritten once stored. On retrieval the digest is recomputed and checked
//! against the reference, so corruption is detected at read time.
//!
//! The engine only sees the [`PayloadStore`] trait. Two implementations ship
//! here: an in-memory map and a directory on the local filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use thiserror::Error;

use courtlist_core::{sha256_digest, ContentDigest, ValidatedHeader};
use courtlist_state::StorageReference;

/// Errors from a payload store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("payload I/O failed at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// The backing store refused or could not take the write.
    #[error("payload store unavailable: {0}")]
    Unavailable(String),

    #[error("no payload stored at {0}")]
    NotFound(String),

    #[error("payload at {location} is corrupt: expected {expected}, found {actual}")]
    Corrupted {
        location: String,
        expected: ContentDigest,
        actual: ContentDigest,
    },
}

/// Durable storage for accepted bodies.
pub trait PayloadStore: Send + Sync {
    /// Store `body` for a submission with `header`, returning where it went.
    fn persist(&self, header: &ValidatedHeader, body: &[u8]) -> Result<StorageReference, StorageError>;

    /// Read back a stored body, verifying its digest.
    fn fetch(&self, reference: &StorageReference) -> Result<Vec<u8>, StorageError>;
}

fn relative_location(header: &ValidatedHeader, digest: &ContentDigest) -> String {
    format!("{}/{}.json", header.list_type, digest.to_hex())
}

fn verify(reference: &StorageReference, bytes: Vec<u8>) -> Result<Vec<u8>, StorageError> {
    let actual = sha256_digest(&bytes);
    if actual != reference.digest {
        return Err(StorageError::Corrupted {
            location: reference.location.clone(),
            expected: reference.digest.clone(),
            actual,
        });
    }
    Ok(bytes)
}

// ─── In-memory ───────────────────────────────────────────────────────

/// Payload store backed by a map. Used by tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryPayloadStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryPayloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl PayloadStore for InMemoryPayloadStore {
    fn persist(&self, header: &ValidatedHeader, body: &[u8]) -> Result<StorageReference, StorageError> {
        let digest = sha256_digest(body);
        let location = format!("memory://{}", relative_location(header, &digest));
        self.blobs
            .write()
            .entry(location.clone())
            .or_insert_with(|| body.to_vec());
        Ok(StorageReference {
            location,
            digest,
            size_bytes: body.len() as u64,
        })
    }

    fn fetch(&self, reference: &StorageReference) -> Result<Vec<u8>, StorageError> {
        let bytes = self
            .blobs
            .read()
            .get(&reference.location)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(reference.location.clone()))?;
        verify(reference, bytes)
    }
}

// ─── Filesystem ──────────────────────────────────────────────────────

/// Payload store rooted at a local directory.
///
/// Blobs are written to a temporary sibling and renamed into place, so a
/// reader never sees a partial file.
#[derive(Debug, Clone)]
pub struct DirectoryPayloadStore {
    root: PathBuf,
}

impl DirectoryPayloadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn io_error(location: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        location: location.display().to_string(),
        source,
    }
}

impl PayloadStore for DirectoryPayloadStore {
    fn persist(&self, header: &ValidatedHeader, body: &[u8]) -> Result<StorageReference, StorageError> {
        let digest = sha256_digest(body);
        let path = self.root.join(relative_location(header, &digest));
        let reference = StorageReference {
            location: path.display().to_string(),
            digest,
            size_bytes: body.len() as u64,
        };
        if path.is_file() {
            return Ok(reference);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        let staging = path.with_extension("json.partial");
        std::fs::write(&staging, body).map_err(io_error(&staging))?;
        std::fs::rename(&staging, &path).map_err(io_error(&path))?;
        tracing::debug!(location = %reference.location, size_bytes = reference.size_bytes, "payload stored");
        Ok(reference)
    }

    fn fetch(&self, reference: &StorageReference) -> Result<Vec<u8>, StorageError> {
        let path = Path::new(&reference.location);
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(reference.location.clone()))
            }
            Err(e) => return Err(io_error(path)(e)),
        };
        verify(reference, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtlist_core::{ArtefactType, Language, ListType, Sensitivity, Timestamp};

    fn header() -> ValidatedHeader {
        let day = Timestamp::parse("2024-10-01T00:00:00Z").unwrap();
        ValidatedHeader {
            provenance: "COMMON_PLATFORM".to_string(),
            source_artefact_id: Some("id1".to_string()),
            artefact_type: ArtefactType::List,
            sensitivity: Sensitivity::Public,
            language: Language::English,
            display_from: day,
            display_to: day.plus_days(1).unwrap(),
            list_type: ListType::parse("CROWN_DAILY_LIST").unwrap(),
            location_id: "123".to_string(),
            content_date: day,
        }
    }

    #[test]
    fn in_memory_round_trip() {
        let store = InMemoryPayloadStore::new();
        let body = br#"{"document":{}}"#;
        let reference = store.persist(&header(), body).unwrap();
        assert!(reference.location.starts_with("memory://CROWN_DAILY_LIST/"));
        assert_eq!(reference.size_bytes, body.len() as u64);
        assert_eq!(store.fetch(&reference).unwrap(), body.to_vec());
    }

    #[test]
    fn identical_bodies_share_a_blob() {
        let store = InMemoryPayloadStore::new();
        let a = store.persist(&header(), b"{}").unwrap();
        let b = store.persist(&header(), b"{}").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn fetch_unknown_location() {
        let store = InMemoryPayloadStore::new();
        let mut reference = store.persist(&header(), b"{}").unwrap();
        reference.location.push_str(".missing");
        assert!(matches!(store.fetch(&reference), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn directory_store_writes_content_addressed_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryPayloadStore::new(dir.path());
        let body = br#"{"venue":{}}"#;
        let reference = store.persist(&header(), body).unwrap();

        let expected = dir
            .path()
            .join("CROWN_DAILY_LIST")
            .join(format!("{}.json", sha256_digest(body).to_hex()));
        assert_eq!(Path::new(&reference.location), expected);
        assert_eq!(std::fs::read(&expected).unwrap(), body.to_vec());
        assert_eq!(store.fetch(&reference).unwrap(), body.to_vec());
    }

    #[test]
    fn directory_store_detects_tampering() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryPayloadStore::new(dir.path());
        let reference = store.persist(&header(), b"{}").unwrap();
        std::fs::write(&reference.location, b"{\"x\":1}").unwrap();
        assert!(matches!(store.fetch(&reference), Err(StorageError::Corrupted { .. })));
    }

    #[test]
    fn directory_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryPayloadStore::new(dir.path());
        let reference = store.persist(&header(), b"{}").unwrap();
        std::fs::remove_file(&reference.location).unwrap();
        assert!(matches!(store.fetch(&reference), Err(StorageError::NotFound(_))));
    }
}
