//! Keyed cache for backend reads.
//!
//! Each logical resource is addressed by a [`QueryKey`], an ordered tuple of
//! identifiers such as `["events", "MEMBER", true]` or `["event", "e1"]`. For
//! every key the cache keeps the last value, the last error, the fetch status
//! and how many views are observing it.
//!
//! - Reads sharing a key while a request is in flight await that same request.
//! - A successful read is reused until its key is invalidated (or, when
//!   configured, until it goes stale).
//! - Mutations invalidate whole key families by prefix once they succeed.

pub mod events;

pub use events::{keys, EventStore};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::api::{ClientError, ErrorCode, ErrorInfo};
use crate::config::CacheConfig;

/// One component of a cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Str(String),
    Int(i64),
    Bool(bool),
    /// An absent dependency, e.g. the role of a logged-out viewer
    None,
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Str(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::Int(value)
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        KeyPart::Bool(value)
    }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(KeyPart::None)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Str(s) => write!(f, "{:?}", s),
            KeyPart::Int(i) => write!(f, "{}", i),
            KeyPart::Bool(b) => write!(f, "{}", b),
            KeyPart::None => f.write_str("null"),
        }
    }
}

/// Ordered identifier tuple addressing a cached read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    pub fn new(root: impl Into<KeyPart>) -> Self {
        Self(vec![root.into()])
    }

    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Whether `prefix` addresses this key or a family containing it.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", part)?;
        }
        f.write_str("]")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No value yet; the first fetch is in flight
    Pending,
    Success,
    Error,
}

/// What a view sees for a key
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    /// Last successfully fetched value, kept across later failures
    pub data: Option<Arc<T>>,
    pub error: Option<ErrorInfo>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// A request for this key is in flight
    pub is_fetching: bool,
}

impl<T> QueryState<T> {
    fn failed(error: ErrorInfo) -> Self {
        Self {
            status: QueryStatus::Error,
            data: None,
            error: Some(error),
            fetched_at: None,
            is_fetching: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    /// The fetched value, or the error that prevented it.
    pub fn into_result(self) -> Result<Arc<T>, ErrorInfo> {
        match (self.status, self.data, self.error) {
            (QueryStatus::Success, Some(data), _) => Ok(data),
            (_, _, Some(error)) => Err(error),
            (_, Some(data), None) => Ok(data),
            (_, None, None) => Err(ErrorInfo::new(
                ErrorCode::InternalError,
                "query has not resolved",
            )),
        }
    }
}

type Value = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<Value, ErrorInfo>>>;

struct CacheEntry {
    status: QueryStatus,
    data: Option<Value>,
    error: Option<ErrorInfo>,
    fetched_at: Option<DateTime<Utc>>,
    /// Last time the entry resolved or was created
    touched: Instant,
    stale: bool,
    /// Identifies the request whose result may be committed
    generation: u64,
    in_flight: Option<SharedFetch>,
    subscribers: usize,
}

impl CacheEntry {
    fn new() -> Self {
        Self {
            status: QueryStatus::Pending,
            data: None,
            error: None,
            fetched_at: None,
            touched: Instant::now(),
            stale: true,
            generation: 0,
            in_flight: None,
            subscribers: 0,
        }
    }

    fn is_fresh(&self, stale_after: Option<Duration>) -> bool {
        if self.stale || self.status != QueryStatus::Success {
            return false;
        }
        match stale_after {
            Some(limit) => self.touched.elapsed() < limit,
            None => true,
        }
    }

    fn snapshot<T: Send + Sync + 'static>(&self) -> QueryState<T> {
        let data = self.data.clone().and_then(|v| v.downcast::<T>().ok());
        QueryState {
            status: self.status,
            data,
            error: self.error.clone(),
            fetched_at: self.fetched_at,
            is_fetching: self.in_flight.is_some(),
        }
    }
}

/// Shared read cache with request coalescing and prefix invalidation
pub struct QueryCache {
    entries: Arc<DashMap<QueryKey, CacheEntry>>,
    stale_after: Option<Duration>,
    gc_after: Duration,
    generations: AtomicU64,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            stale_after: config.stale_after(),
            gc_after: config.gc_after(),
            generations: AtomicU64::new(1),
        }
    }

    /// Read `key`, running `fetcher` only if no usable value or in-flight
    /// request exists.
    ///
    /// Concurrent callers with the same key share one request. The request is
    /// driven on its own task, so dropping the returned future only stops this
    /// caller from waiting; other callers and the cache still receive the
    /// result. Must be called from within a tokio runtime.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let (request, generation, started) = {
            let mut entry = self.entries.entry(key.clone()).or_insert_with(CacheEntry::new);

            if let Some(in_flight) = &entry.in_flight {
                debug!(key = %key, "Joining in-flight request");
                (in_flight.clone(), entry.generation, false)
            } else if entry.is_fresh(self.stale_after) {
                debug!(key = %key, "Serving cached value");
                return entry.snapshot();
            } else {
                let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                let future = fetcher();
                let request: SharedFetch = async move {
                    future
                        .await
                        .map(|value| Arc::new(value) as Value)
                        .map_err(|e| ErrorInfo::from(&e))
                }
                .boxed()
                .shared();

                debug!(key = %key, generation, "Starting request");
                entry.generation = generation;
                entry.in_flight = Some(request.clone());
                (request, generation, true)
            }
        };

        if started {
            let entries = self.entries.clone();
            let driver = request.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let outcome = driver.await;
                commit(&entries, &key, generation, &outcome);
            });
        }

        let outcome = request.await;
        commit(&self.entries, &key, generation, &outcome);

        let previous = self.entries.get(&key).and_then(|e| e.data.clone());
        match outcome {
            Ok(value) => match value.downcast::<T>() {
                Ok(data) => QueryState {
                    status: QueryStatus::Success,
                    data: Some(data),
                    error: None,
                    fetched_at: Some(Utc::now()),
                    is_fetching: false,
                },
                Err(_) => {
                    warn!(key = %key, "Cached value has a different type than requested");
                    QueryState::failed(ErrorInfo::new(
                        ErrorCode::InternalError,
                        format!("cache key {} holds a value of another type", key),
                    ))
                }
            },
            Err(error) => QueryState {
                status: QueryStatus::Error,
                data: previous.and_then(|v| v.downcast::<T>().ok()),
                error: Some(error),
                fetched_at: None,
                is_fetching: false,
            },
        }
    }

    /// Current state of `key` without starting a request.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<QueryState<T>> {
        self.entries.get(key).map(|entry| entry.snapshot())
    }

    /// Mark every entry under `prefix` stale so its next read refetches.
    ///
    /// In-flight requests under the prefix are detached: their callers still
    /// get the result, but it is not cached. Returns the number of entries hit.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let bump = self.generations.fetch_add(1, Ordering::Relaxed);
        let mut count = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.key().starts_with(prefix) {
                let entry = entry.value_mut();
                entry.stale = true;
                if entry.in_flight.take().is_some() {
                    entry.generation = bump;
                }
                count += 1;
            }
        }
        debug!(prefix = %prefix, count, "Invalidated queries");
        count
    }

    /// Drop every entry under `prefix`.
    pub fn remove(&self, prefix: &QueryKey) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before - self.entries.len()
    }

    /// Register interest in `key` for as long as the guard lives.
    pub fn subscribe(&self, key: QueryKey) -> QuerySubscription<'_> {
        self.entries
            .entry(key.clone())
            .or_insert_with(CacheEntry::new)
            .subscribers += 1;
        QuerySubscription { cache: self, key }
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.entries.get(key).map(|e| e.subscribers).unwrap_or(0)
    }

    /// Drop unobserved entries that have not been touched for the retention
    /// period. Returns the number removed.
    pub fn collect_garbage(&self) -> usize {
        let gc_after = self.gc_after;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.subscribers > 0 || entry.touched.elapsed() < gc_after);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "Collected unobserved queries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Store a finished request's result, unless the entry has moved on.
fn commit(
    entries: &DashMap<QueryKey, CacheEntry>,
    key: &QueryKey,
    generation: u64,
    outcome: &Result<Value, ErrorInfo>,
) {
    let Some(mut entry) = entries.get_mut(key) else {
        return;
    };
    if entry.generation != generation || entry.in_flight.is_none() {
        return;
    }

    entry.in_flight = None;
    entry.touched = Instant::now();
    match outcome {
        Ok(value) => {
            entry.status = QueryStatus::Success;
            entry.data = Some(value.clone());
            entry.error = None;
            entry.fetched_at = Some(Utc::now());
            entry.stale = false;
        }
        Err(error) => {
            debug!(key = %key, error = %error, "Request failed");
            entry.status = QueryStatus::Error;
            entry.error = Some(error.clone());
            entry.stale = true;
        }
    }
}

/// Keeps a key observed; released on drop
pub struct QuerySubscription<'a> {
    cache: &'a QueryCache,
    key: QueryKey,
}

impl QuerySubscription<'_> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for QuerySubscription<'_> {
    fn drop(&mut self) {
        if let Some(mut entry) = self.cache.entries.get_mut(&self.key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            entry.touched = Instant::now();
        }
    }
}
