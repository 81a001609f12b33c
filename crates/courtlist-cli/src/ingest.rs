//! # Ingest Subcommand
//!
//! Runs each body file, in order, through the full publication pipeline
//! under one envelope. Because every file shares the envelope's identity
//! key, each accepted file after the first supersedes its predecessor.
//!
//! Artefacts are held in memory for the duration of the command. Bodies go
//! to memory as well unless `--store-dir` names a directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use courtlist_core::HeaderGroup;
use courtlist_publication::{
    DirectoryPayloadStore, IngestOutcome, PublicationConfig, PublicationError, PublicationService,
};
use courtlist_schema::RuleRegistry;
use courtlist_state::Artefact;

/// Arguments for the `courtlist ingest` subcommand.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// YAML or JSON envelope applied to every file.
    #[arg(long, value_name = "HEADER")]
    pub header: PathBuf,

    /// Identity presented to the authorization check.
    #[arg(long, default_value = "courtlist-cli")]
    pub identity: String,

    /// Apply strict-mode rules.
    #[arg(long)]
    pub strict: bool,

    /// Store accepted bodies under this directory.
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Body files, ingested in order.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
}

/// Read an envelope file. YAML is a superset of JSON, so both parse.
pub fn read_header(path: &Path) -> Result<HeaderGroup> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read envelope {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("failed to parse envelope {}", path.display()))
}

/// Execute the ingest subcommand.
///
/// Returns exit code 0 if every file was accepted, 1 if any was rejected.
/// Configuration, conflict and storage failures abort with an error.
pub fn run_ingest(args: &IngestArgs, config: &PublicationConfig, registry: RuleRegistry) -> Result<u8> {
    let header = read_header(&args.header)?;

    let mut builder = PublicationService::builder(Arc::new(registry)).config(config.clone());
    if let Some(dir) = &args.store_dir {
        builder = builder.payload_store(Arc::new(DirectoryPayloadStore::new(dir)));
    }
    let service = builder.build();

    let mut rejected = 0usize;
    let mut last: Option<IngestOutcome> = None;
    for file in &args.files {
        let raw = crate::read_file(file)?;
        match service.validate_and_ingest(&args.identity, &raw, &header, args.strict) {
            Ok(outcome) => {
                println!(
                    "ACCEPT {} -> {} {}",
                    file.display(),
                    outcome.artefact.artefact_id,
                    outcome.decision
                );
                last = Some(outcome);
            }
            Err(e) if e.is_content_rejection() => {
                rejected += 1;
                println!("REJECT {}\n{e}", file.display());
            }
            Err(e @ PublicationError::Unauthorized { .. }) => {
                rejected += 1;
                println!("REFUSED {}: {e}", file.display());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to ingest {}", file.display()));
            }
        }
    }

    if let Some(outcome) = last {
        print_chain(&service, &outcome.artefact);
    }
    Ok(if rejected > 0 { crate::EXIT_REJECTED } else { 0 })
}

fn print_chain(service: &PublicationService, latest: &Artefact) {
    let history = service.artefact_store().history(&latest.identity_key());
    println!("\n{} ({} artefact(s))", latest.identity_key(), history.len());
    for artefact in &history {
        println!(
            "  #{:<3} {} {:<10} effective {} .. {}  {}",
            artefact.commit_sequence,
            artefact.artefact_id,
            artefact.state,
            artefact.effective_from,
            artefact.effective_to,
            artefact.payload.location,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"
provenance: COMMON_PLATFORM
sourceArtefactId: cli-1
type: LIST
sensitivity: PUBLIC
language: ENGLISH
displayFrom: "2024-10-01T00:00:00Z"
displayTo: "2099-12-31T00:00:00Z"
listType: CST_WEEKLY_HEARING_LIST
locationId: "1"
contentDate: "2024-10-01T00:00:00Z"
"#;

    const BODY: &str = r#"[{"date":"01/10/2024","caseName":"A v B","hearingLength":"1 hour","hearingType":"Remote","venue":"Leeds"}]"#;

    #[test]
    fn header_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header.yaml");
        std::fs::write(&path, HEADER).unwrap();
        let header = read_header(&path).unwrap();
        assert_eq!(header.list_type.as_deref(), Some("CST_WEEKLY_HEARING_LIST"));
        assert_eq!(header.source_artefact_id.as_deref(), Some("cli-1"));
    }

    #[test]
    fn ingest_two_files_into_directory_store() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("header.yaml");
        std::fs::write(&header, HEADER).unwrap();
        let first = dir.path().join("first.json");
        std::fs::write(&first, BODY).unwrap();
        let second = dir.path().join("second.json");
        std::fs::write(&second, BODY.replace("Leeds", "York")).unwrap();
        let store = dir.path().join("blobs");

        let args = IngestArgs {
            header,
            identity: "tester".to_string(),
            strict: false,
            store_dir: Some(store.clone()),
            files: vec![first, second],
        };
        let config = PublicationConfig::default();
        let registry = config.load_registry().unwrap();
        assert_eq!(run_ingest(&args, &config, registry).unwrap(), 0);

        let stored = std::fs::read_dir(store.join("CST_WEEKLY_HEARING_LIST")).unwrap().count();
        assert_eq!(stored, 2);
    }

    #[test]
    fn rejected_file_gives_exit_code_one() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("header.yaml");
        std::fs::write(&header, HEADER).unwrap();
        let body = dir.path().join("bad.json");
        std::fs::write(&body, r#"[{"caseName":"A v B"}]"#).unwrap();

        let args = IngestArgs {
            header,
            identity: "tester".to_string(),
            strict: false,
            store_dir: None,
            files: vec![body],
        };
        let config = PublicationConfig::default();
        let registry = config.load_registry().unwrap();
        assert_eq!(run_ingest(&args, &config, registry).unwrap(), crate::EXIT_REJECTED);
    }

    #[test]
    fn unknown_envelope_value_gives_exit_code_one() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("header.yaml");
        std::fs::write(&header, HEADER.replace("sensitivity: PUBLIC", "sensitivity: SECRET")).unwrap();
        let body = dir.path().join("body.json");
        std::fs::write(&body, BODY).unwrap();

        let args = IngestArgs {
            header,
            identity: "tester".to_string(),
            strict: false,
            store_dir: None,
            files: vec![body],
        };
        let config = PublicationConfig::default();
        let registry = config.load_registry().unwrap();
        assert_eq!(run_ingest(&args, &config, registry).unwrap(), crate::EXIT_REJECTED);
    }
}
