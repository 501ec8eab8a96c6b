//! Reactive query bindings for presentation code.
//!
//! `use_collection` and `use_entity` issue their first fetch immediately and
//! then follow their input: handing them new params (or a new id) whose cache
//! key differs from the current one starts a new fetch cycle, while the same
//! key is a no-op. Results from a cycle that was superseded are never applied.

use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

use crate::api::cached_client::FetchCoordinator;
use crate::api::source::{DataSource, Fetched};
use crate::api::types::Pagination;
use crate::cache::{CacheKey, CacheSource, QueryParams};
use crate::query::{Query, QueryState, RequestState};

/// Bind a collection query to `params` and start fetching.
pub fn use_collection<S: DataSource>(
  coordinator: &FetchCoordinator<S>,
  params: Option<QueryParams>,
) -> CollectionQuery<S> {
  CollectionQuery::new(coordinator.clone(), params)
}

/// Bind a single-item query to `id` and start fetching.
pub fn use_entity<S: DataSource>(coordinator: &FetchCoordinator<S>, id: Option<&str>) -> EntityQuery<S> {
  EntityQuery::new(coordinator.clone(), id)
}

// ============================================================================
// Collections
// ============================================================================

pub struct CollectionQuery<S: DataSource> {
  coordinator: FetchCoordinator<S>,
  params: Option<QueryParams>,
  key: CacheKey,
  query: Query<Fetched<Vec<S::Item>>>,
}

impl<S: DataSource> CollectionQuery<S> {
  fn new(coordinator: FetchCoordinator<S>, params: Option<QueryParams>) -> Self {
    let key = coordinator.normalize(params.as_ref()).key;
    let query = collection_query(&coordinator, &params);
    let mut this = Self {
      coordinator,
      params,
      key,
      query,
    };
    this.query.fetch();
    this
  }

  /// Follow new params. Returns `true` if a new fetch cycle started.
  pub fn set_params(&mut self, params: Option<QueryParams>) -> bool {
    let key = self.coordinator.normalize(params.as_ref()).key;
    self.params = params;

    if key == self.key {
      // Same query, possibly a different TTL override; keep the current state.
      let fetcher = list_fetcher(&self.coordinator, &self.params);
      let lookup = list_lookup(&self.coordinator, &self.params);
      self.query.rebind(fetcher, lookup);
      return false;
    }

    debug!(from = %self.key, to = %key, "collection params changed");
    self.key = key;
    // Dropping the old query drops its receiver, so a late response is ignored.
    self.query = collection_query(&self.coordinator, &self.params);
    self.query.fetch();
    true
  }

  /// Start a new cycle; `force` bypasses the cache regardless of freshness.
  pub fn refetch(&mut self, force: bool) {
    self.query.refetch(force);
  }

  /// Apply a finished fetch, if any. Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    self.query.poll()
  }

  /// Wait for the pending fetch, if any.
  pub async fn settle(&mut self) -> bool {
    self.query.settle().await
  }

  /// Current items; empty while loading or after an error.
  pub fn items(&self) -> &[S::Item] {
    self
      .query
      .data()
      .map(|fetched| fetched.data.as_slice())
      .unwrap_or(&[])
  }

  pub fn loading(&self) -> bool {
    self.query.is_loading()
  }

  pub fn error(&self) -> Option<&str> {
    self.query.error()
  }

  pub fn pagination(&self) -> Option<&Pagination> {
    self.query.data().and_then(|fetched| fetched.pagination.as_ref())
  }

  pub fn source(&self) -> Option<CacheSource> {
    self.query.source()
  }

  pub fn key(&self) -> &CacheKey {
    &self.key
  }

  pub fn params(&self) -> Option<&QueryParams> {
    self.params.as_ref()
  }

  pub fn query_state(&self) -> &QueryState<Fetched<Vec<S::Item>>> {
    self.query.state()
  }

  /// Snapshot of the observable state.
  pub fn state(&self) -> RequestState<Vec<S::Item>> {
    RequestState::from(self.query.state())
  }
}

fn collection_query<S: DataSource>(
  coordinator: &FetchCoordinator<S>,
  params: &Option<QueryParams>,
) -> Query<Fetched<Vec<S::Item>>> {
  Query::new(list_fetcher(coordinator, params)).with_lookup(list_lookup(coordinator, params))
}

fn list_fetcher<S: DataSource>(
  coordinator: &FetchCoordinator<S>,
  params: &Option<QueryParams>,
) -> impl Fn() -> BoxFuture<'static, Result<Fetched<Vec<S::Item>>, String>> + Send + Sync + 'static {
  let coordinator = coordinator.clone();
  let params = params.clone();
  move || {
    let coordinator = coordinator.clone();
    let params = params.clone();
    async move { coordinator.load_list(params.as_ref()).await }.boxed()
  }
}

fn list_lookup<S: DataSource>(
  coordinator: &FetchCoordinator<S>,
  params: &Option<QueryParams>,
) -> impl Fn() -> Option<Fetched<Vec<S::Item>>> + Send + Sync + 'static {
  let coordinator = coordinator.clone();
  let params = params.clone();
  move || coordinator.cached_list(params.as_ref())
}

// ============================================================================
// Single items
// ============================================================================

pub struct EntityQuery<S: DataSource> {
  coordinator: FetchCoordinator<S>,
  id: Option<String>,
  /// None while there is no id to fetch
  query: Option<Query<Fetched<S::Item>>>,
}

impl<S: DataSource> EntityQuery<S> {
  fn new(coordinator: FetchCoordinator<S>, id: Option<&str>) -> Self {
    let mut this = Self {
      coordinator,
      id: None,
      query: None,
    };
    this.set_id(id);
    this
  }

  /// Follow a new id. Returns `true` if a new fetch cycle started.
  ///
  /// An absent or empty id clears the query without fetching.
  pub fn set_id(&mut self, id: Option<&str>) -> bool {
    let id = id.filter(|id| !id.is_empty()).map(String::from);
    if id == self.id && (self.query.is_some() || id.is_none()) {
      return false;
    }
    self.id = id;

    let Some(id) = self.id.clone() else {
      self.query = None;
      return false;
    };

    debug!(%id, "entity id changed");
    let mut query = entity_query(&self.coordinator, id);
    query.fetch();
    self.query = Some(query);
    true
  }

  pub fn refetch(&mut self, force: bool) {
    if let Some(query) = self.query.as_mut() {
      query.refetch(force);
    }
  }

  pub fn poll(&mut self) -> bool {
    self.query.as_mut().map(|q| q.poll()).unwrap_or(false)
  }

  pub async fn settle(&mut self) -> bool {
    match self.query.as_mut() {
      Some(query) => query.settle().await,
      None => false,
    }
  }

  pub fn item(&self) -> Option<&S::Item> {
    self
      .query
      .as_ref()
      .and_then(|q| q.data())
      .map(|fetched| &fetched.data)
  }

  pub fn loading(&self) -> bool {
    self.query.as_ref().is_some_and(|q| q.is_loading())
  }

  pub fn error(&self) -> Option<&str> {
    self.query.as_ref().and_then(|q| q.error())
  }

  pub fn source(&self) -> Option<CacheSource> {
    self.query.as_ref().and_then(|q| q.source())
  }

  pub fn id(&self) -> Option<&str> {
    self.id.as_deref()
  }

  pub fn state(&self) -> RequestState<S::Item> {
    match &self.query {
      Some(query) => RequestState::from(query.state()),
      None => RequestState::empty(),
    }
  }
}

fn entity_query<S: DataSource>(coordinator: &FetchCoordinator<S>, id: String) -> Query<Fetched<S::Item>> {
  let fetch_coordinator = coordinator.clone();
  let fetch_id = id.clone();
  let lookup_coordinator = coordinator.clone();

  Query::new(move || {
    let coordinator = fetch_coordinator.clone();
    let id = fetch_id.clone();
    async move { coordinator.load_one(&id).await }
  })
  .with_lookup(move || lookup_coordinator.cached_one(&id))
}
