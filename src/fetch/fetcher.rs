//! Cached, retrying JSON fetcher for a single call-site
//!
//! A `DataFetcher` performs HTTP GETs against one URL, memoizes successful
//! responses in a shared `CacheStore`, retries failures with a configurable
//! delay, and publishes its loading/error/data state through a watch channel.
//! Each fetch runs under its own cancellation token; starting a new fetch or
//! dropping the fetcher cancels the previous one, and a cancelled fetch never
//! touches state, the store, or callbacks.

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{FetchError, FetchOptions, FetchState};
use crate::cache::CacheStore;

/// Mutable lifecycle bookkeeping, guarded by one lock
///
/// Every state mutation and store write checks the fetch's token while this
/// lock is held, so a superseded fetch cannot write after its successor began.
struct Control {
    /// Token of the most recently started fetch
    current: CancellationToken,
    /// Whether automatic fetches are enabled
    enabled: bool,
    /// Last dependency list seen by the automatic fetch
    dependencies: Vec<Value>,
}

struct Inner<T> {
    client: Client,
    store: CacheStore,
    url: String,
    cache_key: String,
    /// `Content-Type: application/json` merged with configured headers
    headers: HeaderMap,
    options: FetchOptions<T>,
    state: watch::Sender<FetchState<T>>,
    control: Mutex<Control>,
}

/// A fetch call-site
///
/// Owns its `FetchState` and shares the cache through the injected store.
/// Dropping the fetcher is the unmount: any in-flight request or pending retry
/// is cancelled.
pub struct DataFetcher<T> {
    inner: Arc<Inner<T>>,
}

impl<T> DataFetcher<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates a call-site for `url` with a default HTTP client
    ///
    /// No fetch is started; call [`mount`](Self::mount) to begin the automatic
    /// lifecycle or [`fetch`](Self::fetch) / [`refetch`](Self::refetch) directly.
    pub fn new(store: CacheStore, url: impl Into<String>, options: FetchOptions<T>) -> Self {
        Self::with_client(Client::new(), store, url, options)
    }

    /// Creates a call-site with a custom HTTP client
    pub fn with_client(
        client: Client,
        store: CacheStore,
        url: impl Into<String>,
        mut options: FetchOptions<T>,
    ) -> Self {
        let url = url.into();
        let cache_key = options.cache_key.clone().unwrap_or_else(|| url.clone());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(options.headers.clone());

        let (state, _) = watch::channel(FetchState::new(options.initial_data.take()));
        let control = Control {
            current: CancellationToken::new(),
            enabled: options.enabled,
            dependencies: options.dependencies.clone(),
        };

        Self {
            inner: Arc::new(Inner {
                client,
                store,
                url,
                cache_key,
                headers,
                options,
                state,
                control: Mutex::new(control),
            }),
        }
    }

    /// The URL this call-site requests
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// The key this call-site reads and writes in the store
    pub fn cache_key(&self) -> &str {
        &self.inner.cache_key
    }

    /// Snapshot of the current state
    pub fn state(&self) -> FetchState<T> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.inner.state.subscribe()
    }

    /// Fetches the resource, serving a fresh cache entry unless `skip_cache`
    ///
    /// Cancels this call-site's previous fetch first. Returns `None` when the
    /// fetch fails after exhausting its retries or is itself cancelled; the
    /// failure is recorded in [`state`](Self::state), never returned.
    pub async fn fetch(&self, skip_cache: bool) -> Option<T> {
        let token = self.inner.begin();
        self.inner.run(&token, skip_cache).await
    }

    /// Fetches bypassing the cache and stores the result as the call-site's data
    pub async fn refetch(&self) -> Option<T> {
        let token = self.inner.begin();
        let data = self.inner.run(&token, true).await;
        if let Some(data) = &data {
            self.inner.commit_data(&token, data.clone());
        }
        data
    }

    /// Removes this call-site's entry from the store, returning whether one existed
    pub fn clear_cache(&self) -> bool {
        debug!(key = %self.inner.cache_key, "clearing cache entry");
        self.inner.store.remove(&self.inner.cache_key)
    }

    /// Starts the automatic lifecycle: fetches once if enabled
    ///
    /// The fetch is spawned on the current tokio runtime; outside a runtime
    /// nothing is started. Returns whether a fetch was started.
    pub fn mount(&self) -> bool {
        let enabled = self.inner.lock().enabled;
        enabled && self.trigger()
    }

    /// Replaces the dependency list, re-running the automatic fetch if it changed
    ///
    /// A change supersedes any in-flight fetch, even when the call-site is
    /// disabled and nothing new is started. Returns whether a fetch was started.
    pub fn set_dependencies(&self, dependencies: Vec<Value>) -> bool {
        let should_fetch = {
            let mut control = self.inner.lock();
            if control.dependencies == dependencies {
                return false;
            }
            control.dependencies = dependencies;
            self.inner.supersede(&control);
            control.enabled
        };
        should_fetch && self.trigger()
    }

    /// Enables or disables automatic fetching
    ///
    /// Any change supersedes the in-flight fetch. Turning a disabled call-site
    /// on starts a fetch, as a dependency change would. Returns whether a fetch
    /// was started.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        {
            let mut control = self.inner.lock();
            if control.enabled == enabled {
                return false;
            }
            control.enabled = enabled;
            self.inner.supersede(&control);
        }
        enabled && self.trigger()
    }

    /// Tears the call-site down, cancelling any in-flight work
    pub fn unmount(self) {
        drop(self);
    }

    /// Spawns an automatic fetch that writes its data into state on success
    ///
    /// Returns false, without cancelling anything, when there is no tokio
    /// runtime to spawn on.
    fn trigger(&self) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(url = %self.inner.url, "no tokio runtime, automatic fetch skipped");
            return false;
        };
        let token = self.inner.begin();
        let inner = Arc::clone(&self.inner);
        handle.spawn(async move {
            if let Some(data) = inner.run(&token, false).await {
                inner.commit_data(&token, data);
            }
        });
        true
    }
}

impl<T> Drop for DataFetcher<T> {
    fn drop(&mut self) {
        let control = self
            .inner
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        control.current.cancel();
    }
}

impl<T> Inner<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancels the previous fetch and issues a token for a new one
    fn begin(&self) -> CancellationToken {
        let mut control = self.lock();
        control.current.cancel();
        control.current = CancellationToken::new();
        control.current.clone()
    }

    /// Cancels the in-flight fetch without starting another
    ///
    /// Called with the control lock held. The cancelled fetch can no longer
    /// settle, so its loading flag is lowered here.
    fn supersede(&self, control: &Control) {
        control.current.cancel();
        self.state
            .send_if_modified(|state| std::mem::replace(&mut state.is_loading, false));
    }

    /// Applies `modify` only while `token` is live; returns false once it is cancelled
    fn update_if_current<F>(&self, token: &CancellationToken, modify: F) -> bool
    where
        F: FnOnce(&mut FetchState<T>) -> bool,
    {
        let _control = self.lock();
        if token.is_cancelled() {
            return false;
        }
        self.state.send_if_modified(modify);
        true
    }

    fn commit_data(&self, token: &CancellationToken, data: T) {
        self.update_if_current(token, |state| {
            state.data = Some(data);
            true
        });
    }

    /// Core fetch algorithm shared by manual and automatic fetches
    async fn run(&self, token: &CancellationToken, skip_cache: bool) -> Option<T> {
        if !skip_cache {
            if let Some(data) = self.cached() {
                debug!(key = %self.cache_key, "cache hit");
                // A superseded fetch may have left the loading flag raised.
                self.update_if_current(token, |state| {
                    std::mem::replace(&mut state.is_loading, false)
                });
                return Some(data);
            }
            debug!(key = %self.cache_key, "cache miss");
        }

        let started = self.update_if_current(token, |state| {
            state.is_loading = true;
            state.error = None;
            state.retry_count = 0;
            true
        });
        if !started {
            return None;
        }

        let retries = self.options.retries;
        let mut retry_count = 0;
        loop {
            debug!(url = %self.url, attempt = retry_count + 1, "requesting");
            let result = tokio::select! {
                _ = token.cancelled() => {
                    debug!(url = %self.url, "fetch cancelled in flight");
                    return None;
                }
                result = self.request() => result,
            };

            let err = match result {
                Ok((value, data)) => return self.settle_success(token, value, data),
                Err(err) => err,
            };

            if token.is_cancelled() {
                return None;
            }

            if retry_count < retries {
                let delay = self.options.retry_delay.delay_for(retry_count);
                retry_count += 1;
                warn!(
                    url = %self.url,
                    error = %err,
                    retry = retry_count,
                    retries,
                    delay_ms = delay.as_millis() as u64,
                    "fetch failed, retrying"
                );
                let current = retry_count;
                let live = self.update_if_current(token, |state| {
                    state.retry_count = current;
                    true
                });
                if !live {
                    return None;
                }
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(url = %self.url, "retry cancelled");
                        return None;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
                continue;
            }

            self.settle_error(token, err);
            return None;
        }
    }

    /// Fresh cached data for this key, if it decodes as `T`
    fn cached(&self) -> Option<T> {
        let value = self
            .store
            .get_fresh(&self.cache_key, self.options.cache_duration)?;
        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(key = %self.cache_key, error = %e, "cached entry has a different shape");
                None
            }
        }
    }

    /// One GET attempt: status check, then JSON decode
    async fn request(&self) -> Result<(Value, T), FetchError> {
        let response = self
            .client
            .get(&self.url)
            .headers(self.headers.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let value: Value = serde_json::from_slice(&body)?;
        let data: T = serde_json::from_value(value.clone())?;
        Ok((value, data))
    }

    /// Writes the store and settles state; the token is checked before the write
    fn settle_success(&self, token: &CancellationToken, value: Value, data: T) -> Option<T> {
        {
            let _control = self.lock();
            if token.is_cancelled() {
                return None;
            }
            self.store.insert(self.cache_key.clone(), value);
            self.state.send_modify(|state| {
                state.is_loading = false;
                state.error = None;
                state.retry_count = 0;
                state.last_fetch_time = Some(Utc::now());
            });
        }

        info!(url = %self.url, key = %self.cache_key, "fetch succeeded");
        if let Some(on_success) = &self.options.on_success {
            on_success(&data);
        }
        Some(data)
    }

    fn settle_error(&self, token: &CancellationToken, err: FetchError) {
        let settled = self.update_if_current(token, |state| {
            state.is_loading = false;
            state.error = Some(err.clone());
            true
        });
        if !settled {
            return;
        }

        warn!(url = %self.url, error = %err, "fetch failed");
        if let Some(on_error) = &self.options.on_error {
            on_error(&err);
        }
    }
}
