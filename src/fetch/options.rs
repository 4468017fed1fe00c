//! Construction-time configuration for a fetch call-site

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::FetchError;

/// Default freshness window for cached entries
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_millis(60_000);

/// Default wait before each retry
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);

/// Callback invoked with the data of a successful fetch
pub type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Callback invoked with the error of a terminally failed fetch
pub type ErrorCallback = Arc<dyn Fn(&FetchError) + Send + Sync>;

/// How long to wait before a retry
#[derive(Clone)]
pub enum RetryDelay {
    /// The same delay before every retry
    Fixed(Duration),
    /// A delay computed from the zero-based retry index
    Computed(Arc<dyn Fn(u32) -> Duration + Send + Sync>),
}

impl RetryDelay {
    /// Builds a delay from a function of the retry index
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        RetryDelay::Computed(Arc::new(f))
    }

    /// Doubling backoff starting at `base`, capped at `max`
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self::from_fn(move |attempt| {
            let factor = 2u32.saturating_pow(attempt);
            base.saturating_mul(factor).min(max)
        })
    }

    /// The delay to wait before retry number `attempt` (zero-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            RetryDelay::Fixed(delay) => *delay,
            RetryDelay::Computed(f) => f(attempt),
        }
    }
}

impl Default for RetryDelay {
    fn default() -> Self {
        RetryDelay::Fixed(DEFAULT_RETRY_DELAY)
    }
}

impl From<Duration> for RetryDelay {
    fn from(delay: Duration) -> Self {
        RetryDelay::Fixed(delay)
    }
}

impl fmt::Debug for RetryDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryDelay::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            RetryDelay::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

/// Options for a fetch call-site
///
/// Every field has a default; use struct update syntax or the `with_*`
/// builders to override only what a call-site needs.
pub struct FetchOptions<T> {
    /// Whether the call-site fetches automatically on mount and on dependency change
    pub enabled: bool,
    /// Data exposed before the first fetch resolves
    pub initial_data: Option<T>,
    /// Entries younger than this are served without a network call
    pub cache_duration: Duration,
    /// Store key; defaults to the request URL
    pub cache_key: Option<String>,
    /// Additional attempts after the first failure
    pub retries: u32,
    /// Wait before each retry
    pub retry_delay: RetryDelay,
    /// Headers sent on top of `Content-Type: application/json`
    pub headers: HeaderMap,
    /// Invoked once per successful network fetch
    pub on_success: Option<SuccessCallback<T>>,
    /// Invoked once per fetch that settles into an error
    pub on_error: Option<ErrorCallback>,
    /// Values whose change re-runs the automatic fetch
    pub dependencies: Vec<Value>,
}

impl<T> Default for FetchOptions<T> {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_data: None,
            cache_duration: DEFAULT_CACHE_DURATION,
            cache_key: None,
            retries: 0,
            retry_delay: RetryDelay::default(),
            headers: HeaderMap::new(),
            on_success: None,
            on_error: None,
            dependencies: Vec::new(),
        }
    }
}

impl<T> Clone for FetchOptions<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            enabled: self.enabled,
            initial_data: self.initial_data.clone(),
            cache_duration: self.cache_duration,
            cache_key: self.cache_key.clone(),
            retries: self.retries,
            retry_delay: self.retry_delay.clone(),
            headers: self.headers.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

impl<T> fmt::Debug for FetchOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("enabled", &self.enabled)
            .field("has_initial_data", &self.initial_data.is_some())
            .field("cache_duration", &self.cache_duration)
            .field("cache_key", &self.cache_key)
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("headers", &self.headers)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl<T> FetchOptions<T> {
    /// Creates options with every default
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the automatic fetch
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the data exposed before the first fetch resolves
    pub fn with_initial_data(mut self, data: T) -> Self {
        self.initial_data = Some(data);
        self
    }

    /// Sets the freshness window
    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.cache_duration = duration;
        self
    }

    /// Sets an explicit store key
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Sets the retry budget
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the retry delay, fixed or computed
    pub fn with_retry_delay(mut self, delay: impl Into<RetryDelay>) -> Self {
        self.retry_delay = delay.into();
        self
    }

    /// Adds a header, validating its name and value
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, FetchError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::InvalidHeader(format!("{}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FetchError::InvalidHeader(format!("{}: {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets the success callback
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(f));
        self
    }

    /// Sets the error callback
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&FetchError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Sets the dependency list
    pub fn with_dependencies(mut self, dependencies: Vec<Value>) -> Self {
        self.dependencies = dependencies;
        self
    }
}
