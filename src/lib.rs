//! acmfetch library
//!
//! A client-side data fetching utility: cached JSON GETs with bounded retries,
//! cooperative cancellation and observable loading state. The binary is a thin
//! command-line front end over the same modules.

pub mod cache;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod logging;

pub use cache::{CacheEntry, CacheStore};
pub use fetch::{DataFetcher, FetchError, FetchOptions, FetchState, RetryDelay};
