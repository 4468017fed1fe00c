//! Configuration file support
//!
//! Fetch defaults can be stored in a YAML file so they need not be repeated on
//! every invocation. Values given on the command line take precedence.
//!
//! ```yaml
//! cache_duration_ms: 5000
//! retries: 2
//! retry_delay_ms: 250
//! headers:
//!   X-Chapter: acm
//! ```

use directories::ProjectDirs;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::fetch::{DEFAULT_CACHE_DURATION, DEFAULT_RETRY_DELAY};

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// The file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for this schema
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Fetch defaults loaded from the config file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Freshness window for cached entries, in milliseconds
    pub cache_duration_ms: u64,
    /// Additional attempts after the first failure
    pub retries: u32,
    /// Wait before each retry, in milliseconds
    pub retry_delay_ms: u64,
    /// Extra request headers
    pub headers: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_duration_ms: DEFAULT_CACHE_DURATION.as_millis() as u64,
            retries: 0,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            headers: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Loads configuration.
    ///
    /// Search order:
    /// 1. Explicit path if provided (must exist)
    /// 2. `$XDG_CONFIG_HOME/acmfetch/config.yaml` or the platform equivalent
    ///
    /// Falls back to built-in defaults when no default file exists.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit_path {
            Some(path) if path.exists() => Self::load_from_path(path),
            Some(path) => Err(ConfigError::NotFound(path.to_path_buf())),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load_from_path(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Path of the default config file, if a home directory can be determined
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "acmfetch")?;
        Some(project_dirs.config_dir().join("config.yaml"))
    }

    /// Loads and parses a specific file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses YAML content; an empty document yields the defaults
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn cache_duration(&self) -> Duration {
        Duration::from_millis(self.cache_duration_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_fetch_defaults() {
        let config = Config::default();
        assert_eq!(config.cache_duration(), Duration::from_millis(60_000));
        assert_eq!(config.retries, 0);
        assert_eq!(config.retry_delay(), Duration::from_millis(1_000));
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_parse_full_file() {
        let config = Config::parse(
            "cache_duration_ms: 5000\n\
             retries: 2\n\
             retry_delay_ms: 250\n\
             headers:\n  X-Chapter: acm\n",
        )
        .expect("Should parse");

        assert_eq!(config.cache_duration(), Duration::from_secs(5));
        assert_eq!(config.retries, 2);
        assert_eq!(config.retry_delay(), Duration::from_millis(250));
        assert_eq!(config.headers.get("X-Chapter").map(String::as_str), Some("acm"));
    }

    #[test]
    fn test_parse_partial_file_keeps_other_defaults() {
        let config = Config::parse("retries: 3\n").expect("Should parse");
        assert_eq!(config.retries, 3);
        assert_eq!(config.cache_duration_ms, 60_000);
    }

    #[test]
    fn test_parse_empty_file_yields_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
        assert_eq!(Config::parse("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_rejects_unknown_fields() {
        assert!(Config::parse("retry: 3\n").is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "retries: 1\n").expect("Should write config");

        let config = Config::load(Some(&path)).expect("Should load");
        assert_eq!(config.retries, 1);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("missing.yaml");

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(err.to_string().contains("missing.yaml"));
    }

    #[test]
    fn test_load_invalid_yaml_reports_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "retries: [not, a, number]\n").expect("Should write config");

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn test_default_path_names_project() {
        if let Some(path) = Config::default_path() {
            assert!(path.to_string_lossy().contains("acmfetch"));
            assert!(path.ends_with("config.yaml"));
        }
        // Passes when no home directory is available (e.g., CI)
    }
}
