//! In-memory cache for fetched JSON documents
//!
//! This module provides the cache store shared by every fetch call-site in a
//! process. Entries are immutable JSON snapshots stamped with the instant they
//! were written; freshness is decided at read time against the caller's cache
//! duration, and stale entries are left in place rather than purged.

mod store;

pub use store::{CacheEntry, CacheStore};
