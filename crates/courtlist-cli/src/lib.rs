//! # courtlist-cli — Command-Line Front End
//!
//! Provides the `courtlist` binary.
//!
//! ## Subcommands
//!
//! - `courtlist rules` — list the registered list types and their rules.
//! - `courtlist validate` — validate bodies against a list type.
//! - `courtlist ingest` — run bodies through the full publication pipeline.
//!
//! ```bash
//! courtlist rules --list-type CROWN_DAILY_LIST
//! courtlist validate --list-type CROWN_DAILY_LIST --strict crown.json
//! courtlist ingest --header header.yaml monday.json monday-v2.json
//! ```
//!
//! Exit codes: 0 success, 1 a submission was rejected, 2 operational error.

pub mod ingest;
pub mod rules;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};

use courtlist_publication::PublicationConfig;
use courtlist_schema::RuleRegistry;

/// Exit code for a rejected submission.
pub const EXIT_REJECTED: u8 = 1;
/// Exit code for an operational failure.
pub const EXIT_OPERATIONAL: u8 = 2;

/// Load configuration from `path` (or defaults), then apply environment
/// overrides.
pub fn load_config(path: Option<&Path>) -> Result<PublicationConfig> {
    let config = match path {
        Some(path) => PublicationConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PublicationConfig::default(),
    };
    config
        .with_env_overrides()
        .context("invalid configuration override in environment")
}

/// Build the rule registry the configuration points at.
pub fn load_registry(config: &PublicationConfig) -> Result<RuleRegistry> {
    let registry = config.load_registry().with_context(|| match &config.rules_dir {
        Some(dir) => format!("failed to load rule sets from {}", dir.display()),
        None => "failed to load built-in rule sets".to_string(),
    })?;
    tracing::debug!(list_types = registry.len(), "rule registry ready");
    Ok(registry)
}

/// Read a file, naming it in the error.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}
