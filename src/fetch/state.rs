//! Observable state of a fetch call-site

use chrono::{DateTime, Utc};

use super::FetchError;

/// What a call-site exposes to the UI layer on every change
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    /// Last data delivered to the call-site, or the initial data
    pub data: Option<T>,
    /// Whether a network fetch is in progress
    pub is_loading: bool,
    /// Terminal error of the latest fetch, if it failed
    pub error: Option<FetchError>,
    /// Retries performed by the current fetch
    pub retry_count: u32,
    /// When the latest successful network fetch completed
    pub last_fetch_time: Option<DateTime<Utc>>,
}

impl<T> FetchState<T> {
    /// State before any fetch has run
    pub fn new(initial_data: Option<T>) -> Self {
        Self {
            data: initial_data,
            is_loading: false,
            error: None,
            retry_count: 0,
            last_fetch_time: None,
        }
    }

    /// Whether the latest fetch settled into an error
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_exposes_initial_data() {
        let state = FetchState::new(Some(vec![1, 2]));
        assert_eq!(state.data, Some(vec![1, 2]));
        assert!(!state.is_loading);
        assert!(!state.is_error());
        assert_eq!(state.retry_count, 0);
        assert!(state.last_fetch_time.is_none());
    }

    #[test]
    fn test_default_has_no_data() {
        let state: FetchState<String> = FetchState::default();
        assert!(state.data.is_none());
    }
}
