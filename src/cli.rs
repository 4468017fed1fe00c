//! Command-line interface parsing for acmfetch
//!
//! This module handles parsing of CLI arguments using clap and merges them
//! with the config file into the options each fetch call-site is built from.

use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::fetch::{FetchError, FetchOptions, RetryDelay};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--header` argument is not of the form `Name: value`
    #[error("Invalid header argument: '{0}'. Expected 'Name: value'")]
    MalformedHeader(String),

    /// A header name or value cannot be sent over HTTP
    #[error(transparent)]
    InvalidHeader(#[from] FetchError),
}

/// acmfetch - Fetch JSON resources through a shared in-memory cache
#[derive(Parser, Debug)]
#[command(name = "acmfetch")]
#[command(about = "Fetch JSON resources with caching, retries and cancellation")]
#[command(version)]
pub struct Cli {
    /// URLs to fetch; each gets its own call-site sharing one cache
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Additional attempts after the first failure
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Wait before each retry, in milliseconds
    #[arg(long, value_name = "MS")]
    pub retry_delay: Option<u64>,

    /// Double the retry delay after each failed attempt
    #[arg(long)]
    pub backoff: bool,

    /// How long a cached response stays fresh, in milliseconds
    #[arg(long, value_name = "MS")]
    pub cache_duration: Option<u64>,

    /// Cache key to use instead of the URL
    #[arg(long, value_name = "KEY")]
    pub cache_key: Option<String>,

    /// Extra request header, repeatable
    ///
    /// Example: -H "Authorization: Bearer abc123"
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// Fetch each URL this many times; later rounds are served from the cache
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// Always go to the network, ignoring fresh cache entries
    #[arg(long)]
    pub refetch: bool,

    /// Path to config file (default: $XDG_CONFIG_HOME/acmfetch/config.yaml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Everything needed to run the fetches requested on the command line
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// URLs to fetch, in order
    pub urls: Vec<String>,
    /// Number of fetch rounds
    pub repeat: u32,
    /// Whether every fetch bypasses the cache
    pub skip_cache: bool,
    /// Options shared by every call-site
    pub options: FetchOptions<Value>,
}

/// Parses a `Name: value` header argument.
///
/// # Returns
/// * `Ok((name, value))` with surrounding whitespace trimmed
/// * `Err(CliError::MalformedHeader)` if there is no colon or the name is empty
pub fn parse_header_arg(s: &str) -> Result<(String, String), CliError> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| CliError::MalformedHeader(s.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::MalformedHeader(s.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

impl RunConfig {
    /// Creates a RunConfig from parsed CLI arguments and the loaded config file.
    ///
    /// Command-line values win over file values; headers from both are merged,
    /// with command-line headers replacing file headers of the same name.
    pub fn from_cli(cli: &Cli, config: &Config) -> Result<Self, CliError> {
        let retry_delay = cli
            .retry_delay
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.retry_delay());
        let retry_delay = if cli.backoff {
            RetryDelay::exponential(retry_delay, retry_delay.saturating_mul(32))
        } else {
            RetryDelay::Fixed(retry_delay)
        };

        let mut options = FetchOptions::new()
            .with_retries(cli.retries.unwrap_or(config.retries))
            .with_retry_delay(retry_delay)
            .with_cache_duration(
                cli.cache_duration
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| config.cache_duration()),
            );

        if let Some(key) = &cli.cache_key {
            options = options.with_cache_key(key.clone());
        }

        for (name, value) in &config.headers {
            options = options.with_header(name, value)?;
        }
        for arg in &cli.headers {
            let (name, value) = parse_header_arg(arg)?;
            options = options.with_header(&name, &value)?;
        }

        Ok(RunConfig {
            urls: cli.urls.clone(),
            repeat: cli.repeat,
            skip_cache: cli.refetch,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://localhost:8080/api/events";

    #[test]
    fn test_parse_header_arg_trims_whitespace() {
        let (name, value) = parse_header_arg("Authorization:  Bearer abc ").unwrap();
        assert_eq!(name, "Authorization");
        assert_eq!(value, "Bearer abc");
    }

    #[test]
    fn test_parse_header_arg_keeps_colons_in_value() {
        let (name, value) = parse_header_arg("X-Origin: http://localhost:3000").unwrap();
        assert_eq!(name, "X-Origin");
        assert_eq!(value, "http://localhost:3000");
    }

    #[test]
    fn test_parse_header_arg_allows_empty_value() {
        let (name, value) = parse_header_arg("X-Empty:").unwrap();
        assert_eq!(name, "X-Empty");
        assert_eq!(value, "");
    }

    #[test]
    fn test_parse_header_arg_without_colon_is_malformed() {
        let err = parse_header_arg("Authorization").unwrap_err();
        assert!(matches!(err, CliError::MalformedHeader(_)));
        assert!(err.to_string().contains("Invalid header argument"));
    }

    #[test]
    fn test_parse_header_arg_with_empty_name_is_malformed() {
        assert!(matches!(
            parse_header_arg(": value"),
            Err(CliError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_cli_parse_url_only() {
        let cli = Cli::parse_from(["acmfetch", URL]);
        assert_eq!(cli.urls, vec![URL.to_string()]);
        assert_eq!(cli.repeat, 1);
        assert!(!cli.refetch);
        assert!(cli.retries.is_none());
        assert!(cli.headers.is_empty());
    }

    #[test]
    fn test_cli_requires_url() {
        assert!(Cli::try_parse_from(["acmfetch"]).is_err());
    }

    #[test]
    fn test_cli_rejects_zero_repeat() {
        assert!(Cli::try_parse_from(["acmfetch", "--repeat", "0", URL]).is_err());
    }

    #[test]
    fn test_cli_collects_repeated_headers() {
        let cli = Cli::parse_from(["acmfetch", "-H", "A: 1", "--header", "B: 2", URL]);
        assert_eq!(cli.headers, vec!["A: 1", "B: 2"]);
    }

    #[test]
    fn test_run_config_uses_file_defaults() {
        let cli = Cli::parse_from(["acmfetch", URL]);
        let config = Config {
            retries: 2,
            retry_delay_ms: 300,
            cache_duration_ms: 5_000,
            ..Default::default()
        };

        let run = RunConfig::from_cli(&cli, &config).unwrap();

        assert_eq!(run.options.retries, 2);
        assert_eq!(run.options.retry_delay.delay_for(0), Duration::from_millis(300));
        assert_eq!(run.options.cache_duration, Duration::from_secs(5));
        assert!(run.options.cache_key.is_none());
        assert!(!run.skip_cache);
    }

    #[test]
    fn test_run_config_cli_overrides_file() {
        let cli = Cli::parse_from([
            "acmfetch",
            "--retries",
            "1",
            "--retry-delay",
            "100",
            "--cache-duration",
            "2000",
            "--cache-key",
            "events",
            "--refetch",
            "--repeat",
            "3",
            URL,
        ]);
        let config = Config {
            retries: 5,
            ..Default::default()
        };

        let run = RunConfig::from_cli(&cli, &config).unwrap();

        assert_eq!(run.options.retries, 1);
        assert_eq!(run.options.retry_delay.delay_for(0), Duration::from_millis(100));
        assert_eq!(run.options.cache_duration, Duration::from_secs(2));
        assert_eq!(run.options.cache_key.as_deref(), Some("events"));
        assert!(run.skip_cache);
        assert_eq!(run.repeat, 3);
    }

    #[test]
    fn test_run_config_backoff_doubles_delay() {
        let cli = Cli::parse_from(["acmfetch", "--retry-delay", "100", "--backoff", URL]);
        let run = RunConfig::from_cli(&cli, &Config::default()).unwrap();

        assert_eq!(run.options.retry_delay.delay_for(0), Duration::from_millis(100));
        assert_eq!(run.options.retry_delay.delay_for(1), Duration::from_millis(200));
        assert_eq!(run.options.retry_delay.delay_for(10), Duration::from_millis(3_200));
    }

    #[test]
    fn test_run_config_cli_header_replaces_file_header() {
        let cli = Cli::parse_from(["acmfetch", "-H", "X-Chapter: ubc", URL]);
        let mut config = Config::default();
        config.headers.insert("X-Chapter".to_string(), "acm".to_string());
        config.headers.insert("X-Client".to_string(), "cli".to_string());

        let run = RunConfig::from_cli(&cli, &config).unwrap();

        assert_eq!(run.options.headers.get("x-chapter").unwrap(), "ubc");
        assert_eq!(run.options.headers.get("x-client").unwrap(), "cli");
    }

    #[test]
    fn test_run_config_rejects_unsendable_header() {
        let cli = Cli::parse_from(["acmfetch", "-H", "Bad Name: x", URL]);
        let err = RunConfig::from_cli(&cli, &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::InvalidHeader(_)));
        assert!(err.to_string().contains("Invalid header"));
    }
}
