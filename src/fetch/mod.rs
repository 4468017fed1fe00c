//! Cached data fetching for UI call-sites
//!
//! This module provides `DataFetcher`, a per-call-site utility that performs an
//! HTTP GET, memoizes the parsed JSON in a shared `CacheStore`, serves fresh
//! entries without touching the network, retries failures with a configurable
//! delay, and exposes loading/error/data state to whatever renders it.

mod error;
mod fetcher;
mod options;
mod state;

pub use error::FetchError;
pub use fetcher::DataFetcher;
pub use options::{
    ErrorCallback, FetchOptions, RetryDelay, SuccessCallback, DEFAULT_CACHE_DURATION,
    DEFAULT_RETRY_DELAY,
};
pub use state::FetchState;
