//! Tracing setup for the command-line front end
//!
//! Logs go to stderr so stdout stays clean for fetched JSON. `RUST_LOG`
//! overrides the default directive.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Builds the filter used by [`init`]
///
/// The default directive is `info`, or `debug` when `verbose` is set; any
/// directives in `RUST_LOG` are layered on top.
pub fn env_filter(verbose: bool) -> EnvFilter {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

/// Installs the global subscriber
///
/// Returns false if a subscriber was already installed, which keeps repeated
/// calls (tests, embedding) harmless.
pub fn init(verbose: bool) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
