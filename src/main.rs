//! acmfetch - Fetch JSON resources through a shared in-memory cache
//!
//! Each URL on the command line gets its own fetch call-site; all call-sites
//! share one cache store, so repeated rounds are served from memory while the
//! entries stay fresh.

use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;
use tracing::{debug, info};

use acmfetch::cli::{Cli, RunConfig};
use acmfetch::config::Config;
use acmfetch::{CacheStore, DataFetcher};

/// Runs every requested round and prints each result as pretty JSON
///
/// Returns the failures, as `(url, message)`, of the last round in which any
/// call-site settled into an error.
async fn run(run_config: RunConfig) -> Result<Vec<(String, String)>, Box<dyn std::error::Error>> {
    // One connection pool and one cache for every call-site
    let client = reqwest::Client::new();
    let store = CacheStore::new();
    let fetchers: Vec<DataFetcher<Value>> = run_config
        .urls
        .iter()
        .map(|url| {
            DataFetcher::with_client(
                client.clone(),
                store.clone(),
                url.clone(),
                run_config.options.clone(),
            )
        })
        .collect();

    let skip_cache = run_config.skip_cache;
    let mut failures = Vec::new();
    for round in 1..=run_config.repeat {
        debug!(round, "starting fetch round");

        // Fetch every URL concurrently
        let results: Vec<Option<Value>> =
            futures::future::join_all(fetchers.iter().map(|fetcher| async move {
                if skip_cache {
                    fetcher.refetch().await
                } else {
                    fetcher.fetch(false).await
                }
            }))
            .await;

        for (fetcher, result) in fetchers.iter().zip(results) {
            match result {
                Some(data) => println!("{}", serde_json::to_string_pretty(&data)?),
                None => {
                    let message = fetcher
                        .state()
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "no data".to_string());
                    failures.push((fetcher.url().to_string(), message));
                }
            }
        }

        if !failures.is_empty() {
            break;
        }
    }

    info!(entries = store.len(), "done");
    Ok(failures)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    acmfetch::logging::init(cli.verbose);

    let run_config = match Config::load(cli.config.as_deref())
        .map_err(|e| e.to_string())
        .and_then(|config| RunConfig::from_cli(&cli, &config).map_err(|e| e.to_string()))
    {
        Ok(run_config) => run_config,
        Err(message) => {
            eprintln!("Error: {}", message);
            return ExitCode::FAILURE;
        }
    };

    match run(run_config).await {
        Ok(failures) if failures.is_empty() => ExitCode::SUCCESS,
        Ok(failures) => {
            for (url, message) in failures {
                eprintln!("Error: {}: {}", url, message);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
