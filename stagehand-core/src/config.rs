//! Worker configuration.
//!
//! Layered, lowest precedence first: built-in defaults, an optional YAML
//! config file, then environment variables. The file format stores plain
//! milliseconds so it round-trips without custom serde.
//!
//! # API pattern
//!
//! Environment application has two forms:
//! - `apply_env_from(lookup)` — explicit lookup; used in tests
//! - `apply_env()` — reads the process environment, delegates to `_from`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

pub const ENV_POLLING: &str = "STAGEHAND_API_POLLING";
pub const ENV_MAX_EMPTY_PULL: &str = "STAGEHAND_MAX_EMPTY_PULL";
pub const ENV_STOP_ON_ERROR: &str = "STAGEHAND_STOP_ON_ERROR";
pub const ENV_TAG_SELECTOR: &str = "STAGEHAND_TAG_SELECTOR";
pub const ENV_WORKPATH: &str = "STAGEHAND_WORKPATH";

const DEFAULT_POLLING_MS: u64 = 30_000;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 300_000;

/// Resolved worker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Delay between queue poll attempts, and the initial final-push retry
    /// delay.
    pub polling_interval: Duration,

    /// Consecutive empty pulls before the worker stops. Zero or negative
    /// means poll forever.
    pub max_empty_pulls: i64,

    /// Fail fast on otherwise-recoverable errors.
    pub stop_on_error: bool,

    /// Free-text tag filter sent with each pickup (sanitized upstream).
    pub tag_selector: Option<String>,

    /// Scratch root; each job works in `<workpath>/<uid>`.
    pub workpath: PathBuf,

    /// Ceiling for the final-push exponential backoff.
    pub retry_max_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_millis(DEFAULT_POLLING_MS),
            max_empty_pulls: -1,
            stop_on_error: false,
            tag_selector: None,
            workpath: std::env::temp_dir().join("stagehand"),
            retry_max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
        }
    }
}

/// On-disk YAML form. Every field optional; absent fields keep the previous
/// layer's value.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkerConfigFile {
    pub polling_ms: Option<u64>,
    pub max_empty_pulls: Option<i64>,
    pub stop_on_error: Option<bool>,
    pub tag_selector: Option<String>,
    pub workpath: Option<PathBuf>,
    pub retry_max_delay_ms: Option<u64>,
}

impl WorkerConfig {
    /// Defaults, then the YAML file at `path` if it exists, then the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = path {
            if path.exists() {
                config.apply_file(path)?;
            }
        }
        config.apply_env()?;
        Ok(config)
    }

    /// Merge a YAML config file over the current values.
    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let file: WorkerConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        self.merge_file(file);
        Ok(())
    }

    fn merge_file(&mut self, file: WorkerConfigFile) {
        if let Some(ms) = file.polling_ms {
            self.polling_interval = Duration::from_millis(ms);
        }
        if let Some(max) = file.max_empty_pulls {
            self.max_empty_pulls = max;
        }
        if let Some(stop) = file.stop_on_error {
            self.stop_on_error = stop;
        }
        if let Some(selector) = file.tag_selector {
            self.tag_selector = Some(selector);
        }
        if let Some(workpath) = file.workpath {
            self.workpath = workpath;
        }
        if let Some(ms) = file.retry_max_delay_ms {
            self.retry_max_delay = Duration::from_millis(ms);
        }
    }

    /// Merge the process environment over the current values.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Merge environment values provided by `lookup` over the current values.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_POLLING) {
            let ms: u64 = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_POLLING,
                value: raw,
            })?;
            self.polling_interval = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup(ENV_MAX_EMPTY_PULL) {
            let max: i64 = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_MAX_EMPTY_PULL,
                value: raw,
            })?;
            self.max_empty_pulls = max;
        }
        if let Some(raw) = lookup(ENV_STOP_ON_ERROR) {
            self.stop_on_error = match raw.as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: ENV_STOP_ON_ERROR,
                        value: raw,
                    })
                }
            };
        }
        if let Some(selector) = lookup(ENV_TAG_SELECTOR) {
            self.tag_selector = Some(selector);
        }
        if let Some(workpath) = lookup(ENV_WORKPATH) {
            self.workpath = PathBuf::from(workpath);
        }
        Ok(())
    }

    /// Whether the empty-pull limit is active.
    pub fn empty_pull_limit(&self) -> Option<u64> {
        (self.max_empty_pulls > 0).then_some(self.max_empty_pulls as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_poll_every_thirty_seconds_forever() {
        let config = WorkerConfig::default();
        assert_eq!(config.polling_interval, Duration::from_secs(30));
        assert_eq!(config.max_empty_pulls, -1);
        assert!(config.empty_pull_limit().is_none());
        assert!(!config.stop_on_error);
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("stagehand.yaml");
        std::fs::write(
            &path,
            "polling_ms: 5000\nmax_empty_pulls: 3\nstop_on_error: true\n",
        )
        .expect("write config");

        let mut config = WorkerConfig::default();
        config.apply_file(&path).expect("apply");
        assert_eq!(config.polling_interval, Duration::from_millis(5000));
        assert_eq!(config.empty_pull_limit(), Some(3));
        assert!(config.stop_on_error);
        // Untouched fields keep defaults.
        assert_eq!(config.retry_max_delay, Duration::from_secs(300));
    }

    #[test]
    fn env_layer_overrides_file_layer() {
        let vars = env(&[
            (ENV_POLLING, "1000"),
            (ENV_MAX_EMPTY_PULL, "7"),
            (ENV_TAG_SELECTOR, "fleet-a, urgent"),
        ]);
        let mut config = WorkerConfig {
            polling_interval: Duration::from_millis(5000),
            ..WorkerConfig::default()
        };
        config
            .apply_env_from(|var| vars.get(var).cloned())
            .expect("apply env");
        assert_eq!(config.polling_interval, Duration::from_millis(1000));
        assert_eq!(config.max_empty_pulls, 7);
        assert_eq!(config.tag_selector.as_deref(), Some("fleet-a, urgent"));
    }

    #[test]
    fn malformed_env_number_is_rejected() {
        let vars = env(&[(ENV_POLLING, "soon")]);
        let err = WorkerConfig::default()
            .apply_env_from(|var| vars.get(var).cloned())
            .expect_err("must reject");
        assert!(matches!(err, ConfigError::InvalidEnv { var, .. } if var == ENV_POLLING));
    }

    #[test]
    fn stop_on_error_accepts_common_spellings() {
        for (raw, expected) in [("1", true), ("true", true), ("no", false)] {
            let vars = env(&[(ENV_STOP_ON_ERROR, raw)]);
            let mut config = WorkerConfig::default();
            config
                .apply_env_from(|var| vars.get(var).cloned())
                .expect("apply env");
            assert_eq!(config.stop_on_error, expected, "raw = {raw}");
        }
    }

    #[test]
    fn missing_file_in_load_is_not_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let config =
            WorkerConfig::load(Some(&dir.path().join("absent.yaml"))).expect("load");
        assert_eq!(config.polling_interval, Duration::from_secs(30));
    }

    #[test]
    fn zero_and_negative_limits_mean_unlimited() {
        for max in [0, -5] {
            let config = WorkerConfig {
                max_empty_pulls: max,
                ..WorkerConfig::default()
            };
            assert!(config.empty_pull_limit().is_none(), "max = {max}");
        }
    }
}
