//! Publication pipeline configuration.
//!
//! Every field has a default, so an empty YAML file (or none at all) gives
//! a working pipeline backed by the built-in rule catalogue. Three settings
//! can be overridden from the environment for deployments that do not ship
//! a config file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use courtlist_schema::{RegistryError, RuleRegistry};

use crate::header::SourceIdMode;

/// Environment variable overriding [`PublicationConfig::rules_dir`].
pub const ENV_RULES_DIR: &str = "COURTLIST_RULES_DIR";
/// Environment variable overriding [`PublicationConfig::lock_timeout_ms`].
pub const ENV_LOCK_TIMEOUT_MS: &str = "COURTLIST_LOCK_TIMEOUT_MS";
/// Environment variable overriding [`PublicationConfig::max_attempts`].
pub const ENV_MAX_ATTEMPTS: &str = "COURTLIST_MAX_ATTEMPTS";

/// Longest default display window, in days.
pub const MAX_DISPLAY_DAYS: i64 = 366;

/// Configuration for the publication pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublicationConfig {
    /// Directory of rule set files. `None` uses the built-in catalogue.
    pub rules_dir: Option<PathBuf>,
    /// Whether submissions must carry a source artefact id.
    pub source_id_mode: SourceIdMode,
    /// Display window length applied when an envelope omits `displayTo`.
    pub default_display_days: i64,
    /// How long a submission waits for its identity key's lock.
    pub lock_timeout_ms: u64,
    /// Commit attempts before a conflict is surfaced to the caller.
    pub max_attempts: u32,
    /// Delay before the first retry. Doubles per attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound on the retry delay.
    pub max_backoff_ms: u64,
}

impl Default for PublicationConfig {
    fn default() -> Self {
        Self {
            rules_dir: None,
            source_id_mode: SourceIdMode::Required,
            default_display_days: 1,
            lock_timeout_ms: 250,
            max_attempts: 5,
            initial_backoff_ms: 10,
            max_backoff_ms: 200,
        }
    }
}

impl PublicationConfig {
    /// Parse configuration from YAML text and validate it.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        // An empty document is YAML null, which serde_yaml will not read as
        // a defaulted struct.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text).map_err(|e| match e {
            ConfigError::Parse(reason) => ConfigError::Parse(format!("{}: {reason}", path.display())),
            other => other,
        })
    }

    /// Apply overrides from the process environment.
    ///
    /// Variables:
    /// - `COURTLIST_RULES_DIR` (path to a rule set directory)
    /// - `COURTLIST_LOCK_TIMEOUT_MS` (milliseconds)
    /// - `COURTLIST_MAX_ATTEMPTS` (at least 1)
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(dir) = lookup(ENV_RULES_DIR).filter(|s| !s.trim().is_empty()) {
            self.rules_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = lookup(ENV_LOCK_TIMEOUT_MS) {
            self.lock_timeout_ms = parse_env(ENV_LOCK_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            self.max_attempts = parse_env(ENV_MAX_ATTEMPTS, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings that would make the pipeline unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "lock_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        if !(0..=MAX_DISPLAY_DAYS).contains(&self.default_display_days) {
            return Err(ConfigError::Invalid {
                field: "default_display_days",
                reason: format!(
                    "must be between 0 and {MAX_DISPLAY_DAYS}, got {}",
                    self.default_display_days
                ),
            });
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid {
                field: "initial_backoff_ms",
                reason: format!(
                    "{} exceeds max_backoff_ms {}",
                    self.initial_backoff_ms, self.max_backoff_ms
                ),
            });
        }
        Ok(())
    }

    /// Build the rule registry this configuration points at.
    pub fn load_registry(&self) -> Result<RuleRegistry, RegistryError> {
        match &self.rules_dir {
            Some(dir) => RuleRegistry::from_dir(dir),
            None => RuleRegistry::builtin(),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// The conflict retry schedule.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: raw.to_string(),
    })
}

/// Exponential backoff schedule for supersession conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        PublicationConfig::default().retry_policy()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(String),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("invalid value for {var}: \"{value}\"")]
    InvalidEnv { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn empty_yaml_gives_defaults() {
        assert_eq!(PublicationConfig::from_yaml_str("").unwrap(), PublicationConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = PublicationConfig::from_yaml_str(
            "source_id_mode: optional\nmax_attempts: 2\n",
        )
        .unwrap();
        assert_eq!(config.source_id_mode, SourceIdMode::Optional);
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.lock_timeout_ms, 250);
    }

    #[test]
    fn unknown_field_rejected() {
        let err = PublicationConfig::from_yaml_str("max_retries: 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = PublicationConfig::from_yaml_str("max_attempts: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_attempts", .. }));
    }

    #[test]
    fn display_days_bounded() {
        for yaml in ["default_display_days: -1\n", "default_display_days: 9223372036854775807\n"] {
            let err = PublicationConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { field: "default_display_days", .. }));
        }
        let config = PublicationConfig::from_yaml_str("default_display_days: 366\n").unwrap();
        assert_eq!(config.default_display_days, MAX_DISPLAY_DAYS);
    }

    #[test]
    fn backoff_bounds_checked() {
        let err = PublicationConfig::from_yaml_str("initial_backoff_ms: 500\nmax_backoff_ms: 100\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "initial_backoff_ms", .. }));
    }

    #[test]
    fn env_overrides_applied() {
        let config = PublicationConfig::default()
            .with_overrides_from(lookup(&[
                (ENV_RULES_DIR, "/etc/courtlist/rules"),
                (ENV_LOCK_TIMEOUT_MS, "1000"),
                (ENV_MAX_ATTEMPTS, " 3 "),
            ]))
            .unwrap();
        assert_eq!(config.rules_dir, Some(PathBuf::from("/etc/courtlist/rules")));
        assert_eq!(config.lock_timeout(), Duration::from_secs(1));
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn malformed_env_value_is_an_error() {
        let err = PublicationConfig::default()
            .with_overrides_from(lookup(&[(ENV_MAX_ATTEMPTS, "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_MAX_ATTEMPTS, .. }));
    }

    #[test]
    fn no_env_leaves_config_unchanged() {
        let config = PublicationConfig::default().with_overrides_from(lookup(&[])).unwrap();
        assert_eq!(config, PublicationConfig::default());
    }

    #[test]
    fn from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courtlist.yaml");
        std::fs::write(&path, "default_display_days: 7\n").unwrap();
        let config = PublicationConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.default_display_days, 7);

        let missing = PublicationConfig::from_yaml_file(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }

    #[test]
    fn default_registry_is_builtin() {
        let registry = PublicationConfig::default().load_registry().unwrap();
        assert!(!registry.is_empty());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
        };
        assert_eq!(policy.backoff_after(1), Duration::from_millis(10));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(20));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(40));
        assert_eq!(policy.backoff_after(4), Duration::from_millis(50));
        assert_eq!(policy.backoff_after(40), Duration::from_millis(50));
    }
}
