//! Async query abstraction for data fetching with caching support.
//!
//! Inspired by TanStack Query, this module provides a `Query<T>` type that
//! encapsulates async data fetching, loading states, and error handling.
//!
//! A query may carry a synchronous cache lookup. When it hits, the query
//! resolves straight to `Success` and never passes through `Loading`.
//!
//! # Example
//!
//! ```ignore
//! let coordinator = coordinator.clone();
//! let mut query = Query::new(move || {
//!     let coordinator = coordinator.clone();
//!     async move { coordinator.load_one("42").await }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::api::source::Fetched;
use crate::api::types::Pagination;
use crate::cache::CacheSource;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_idle(&self) -> bool {
    matches!(self, QueryState::Idle)
  }

  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// Observable request state handed to presentation code.
///
/// `data` and `error` are never both set.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
  pub data: Option<T>,
  pub loading: bool,
  pub error: Option<String>,
  pub pagination: Option<Pagination>,
}

impl<T> RequestState<T> {
  /// Nothing requested: not loading, no data, no error.
  pub fn empty() -> Self {
    Self {
      data: None,
      loading: false,
      error: None,
      pagination: None,
    }
  }

  pub fn loading() -> Self {
    Self {
      loading: true,
      ..Self::empty()
    }
  }

  /// Terminal state for a finished fetch cycle.
  pub fn resolved(result: Result<Fetched<T>, String>) -> Self {
    match result {
      Ok(Fetched { data, pagination }) => Self {
        data: Some(data),
        loading: false,
        error: None,
        pagination,
      },
      Err(error) => Self {
        error: Some(error),
        ..Self::empty()
      },
    }
  }
}

impl<T: Clone> From<&QueryState<Fetched<T>>> for RequestState<T> {
  fn from(state: &QueryState<Fetched<T>>) -> Self {
    match state {
      QueryState::Idle => Self::empty(),
      QueryState::Loading => Self::loading(),
      QueryState::Success(fetched) => Self::resolved(Ok(fetched.clone())),
      QueryState::Error(e) => Self::resolved(Err(e.clone())),
    }
  }
}

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// A synchronous probe for already-available data
type LookupFn<T> = Box<dyn Fn() -> Option<T> + Send + Sync>;

/// Async query for data fetching with state management.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure)
/// - An optional cache lookup consulted before fetching
/// - Loading/success/error states
/// - Async result handling via channels
///
/// Each fetch cycle owns the receiving end of a fresh channel. Replacing or
/// dropping the receiver (refetch, drop of the query) means a late result
/// from an earlier cycle is discarded instead of applied.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  lookup: Option<LookupFn<T>>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  fetched_at: Option<Instant>,
  source: Option<CacheSource>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time a fetch cycle reaches the remote source.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      lookup: None,
      receiver: None,
      fetched_at: None,
      source: None,
    }
  }

  /// Attach a cache lookup, consulted by every non-forced fetch.
  pub fn with_lookup<L>(mut self, lookup: L) -> Self
  where
    L: Fn() -> Option<T> + Send + Sync + 'static,
  {
    self.lookup = Some(Box::new(lookup));
    self
  }

  /// Swap the fetcher and lookup without touching state or a pending fetch.
  pub fn rebind<F, Fut, L>(&mut self, fetcher: F, lookup: L)
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
    L: Fn() -> Option<T> + Send + Sync + 'static,
  {
    self.fetcher = Box::new(move || Box::pin(fetcher()));
    self.lookup = Some(Box::new(lookup));
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if the query succeeded.
  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  /// Check if the query failed.
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error message if the query failed.
  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Where the current data came from.
  pub fn source(&self) -> Option<CacheSource> {
    self.source
  }

  /// When the current data was resolved.
  pub fn fetched_at(&self) -> Option<Instant> {
    self.fetched_at
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch(false);
  }

  /// Start a new fetch cycle even if one is pending.
  ///
  /// With `force` the cache lookup is skipped and the fetcher always runs.
  pub fn refetch(&mut self, force: bool) {
    // Cancel any pending fetch by dropping the receiver
    self.receiver = None;
    self.start_fetch(force);
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(result) => {
        self.apply(result);
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.apply(Err("Query was cancelled".to_string()));
        true
      }
    }
  }

  /// Wait until the pending fetch resolves.
  ///
  /// Returns `false` immediately if nothing is pending.
  pub async fn settle(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.recv().await {
      Some(result) => self.apply(result),
      None => self.apply(Err("Query was cancelled".to_string())),
    }
    true
  }

  fn apply(&mut self, result: Result<T, String>) {
    self.receiver = None;
    match result {
      Ok(data) => {
        self.state = QueryState::Success(data);
        self.fetched_at = Some(Instant::now());
        self.source = Some(CacheSource::Network);
      }
      Err(error) => {
        self.state = QueryState::Error(error);
        self.source = None;
      }
    }
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self, force: bool) {
    if !force {
      if let Some(data) = self.lookup.as_ref().and_then(|lookup| lookup()) {
        self.receiver = None;
        self.state = QueryState::Success(data);
        self.fetched_at = Some(Instant::now());
        self.source = Some(CacheSource::Cache);
        return;
      }
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.
// If you need to share a query, wrap it in Arc<Mutex<Query<T>>>.

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("fetched_at", &self.fetched_at)
      .field("source", &self.source)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(vec![1, 2, 3]) });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    assert!(query.settle().await);
    assert!(query.is_success());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
    assert_eq!(query.source(), Some(CacheSource::Network));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(|| async { Err("Something went wrong".to_string()) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.error(), Some("Something went wrong"));
  }

  #[tokio::test]
  async fn test_lookup_hit_skips_loading() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();
    let mut query = Query::new(move || {
      let calls = calls_clone.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(1)
      }
    })
    .with_lookup(|| Some(99));

    query.fetch();

    assert!(query.is_success());
    assert_eq!(query.data(), Some(&99));
    assert_eq!(query.source(), Some(CacheSource::Cache));
    assert!(!query.settle().await);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_forced_refetch_ignores_lookup() {
    let mut query = Query::new(|| async { Ok::<_, String>(1) }).with_lookup(|| Some(99));

    query.refetch(true);
    assert!(query.is_loading());

    query.settle().await;
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, String>(42)
    });

    query.fetch();
    assert!(query.is_loading());

    // Second fetch should be no-op
    query.fetch();
    assert!(query.is_loading());
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        // The first call resolves last
        let delay = if n == 0 { 80 } else { 10 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok::<_, String>(n)
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(5)).await;

    // Refetch should cancel the first and start a new one
    query.refetch(false);
    query.settle().await;
    assert_eq!(query.data(), Some(&1));

    // The late first result is never applied
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!query.poll());
    assert_eq!(query.data(), Some(&1));
  }

  #[test]
  fn test_request_state_from_query_state() {
    let fetched = Fetched {
      data: vec!["soto"],
      pagination: None,
    };

    assert_eq!(RequestState::from(&QueryState::<Fetched<Vec<&str>>>::Idle), RequestState::empty());
    assert!(RequestState::from(&QueryState::<Fetched<Vec<&str>>>::Loading).loading);

    let success = RequestState::from(&QueryState::Success(fetched));
    assert_eq!(success.data, Some(vec!["soto"]));
    assert!(!success.loading);
    assert!(success.error.is_none());

    let failure = RequestState::from(&QueryState::<Fetched<Vec<&str>>>::Error("boom".into()));
    assert_eq!(failure.error.as_deref(), Some("boom"));
    assert!(failure.data.is_none());
  }
}
