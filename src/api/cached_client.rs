//! Fetch coordination: cache lookups, remote loads and write-through.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{normalize_with_default, CacheKey, CacheStore, Normalized, QueryParams};
use crate::query::RequestState;

use super::source::{DataSource, Fetched};

pub const LIST_FAILURE: &str = "Failed to fetch recipes";
pub const LIST_TRANSPORT_FAILURE: &str = "An error occurred while fetching recipes";
pub const ITEM_FAILURE: &str = "Failed to fetch recipe";
pub const ITEM_TRANSPORT_FAILURE: &str = "An error occurred while fetching recipe";

/// Coordinates a [`DataSource`] with the collection and single-item caches.
///
/// Both flows follow the same steps: derive the key, serve a fresh entry if
/// allowed, otherwise call the source, normalize the response shape, write
/// successes through to the store and report failures without touching it.
/// Clones share the source and both stores.
pub struct FetchCoordinator<S: DataSource> {
  source: Arc<S>,
  lists: CacheStore<Vec<S::Item>>,
  items: CacheStore<S::Item>,
  /// TTL for lists without an override, and for every single-item lookup
  default_ttl: Duration,
}

impl<S: DataSource> FetchCoordinator<S> {
  /// Create a coordinator with fresh, empty stores.
  pub fn new(source: S) -> Self {
    Self::with_stores(source, CacheStore::new(), CacheStore::new())
  }

  /// Create a coordinator over existing stores, e.g. to share them with
  /// another coordinator.
  pub fn with_stores(
    source: S,
    lists: CacheStore<Vec<S::Item>>,
    items: CacheStore<S::Item>,
  ) -> Self {
    Self {
      source: Arc::new(source),
      lists,
      items,
      default_ttl: crate::cache::DEFAULT_TTL,
    }
  }

  /// Set the TTL used when a query does not carry its own.
  pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
    self.default_ttl = ttl;
    self
  }

  pub fn default_ttl(&self) -> Duration {
    self.default_ttl
  }

  pub fn lists(&self) -> &CacheStore<Vec<S::Item>> {
    &self.lists
  }

  pub fn items(&self) -> &CacheStore<S::Item> {
    &self.items
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  /// Normalize collection params, applying this coordinator's default TTL
  /// when the params carry no override.
  pub fn normalize(&self, params: Option<&QueryParams>) -> Normalized {
    normalize_with_default(params, self.default_ttl)
  }

  // ==========================================================================
  // Collections
  // ==========================================================================

  /// Fresh cached page for `params`, if any. Never touches the source.
  pub fn cached_list(&self, params: Option<&QueryParams>) -> Option<Fetched<Vec<S::Item>>> {
    let Normalized { key, ttl, .. } = self.normalize(params);
    let entry = self.lists.get_fresh(&key, ttl)?;
    debug!(%key, "list cache hit");
    Some(Fetched {
      data: entry.payload,
      pagination: entry.pagination,
    })
  }

  /// Load `params` from the source and write a success through to the cache.
  pub async fn load_list(&self, params: Option<&QueryParams>) -> Result<Fetched<Vec<S::Item>>, String> {
    let Normalized { key, params, .. } = self.normalize(params);
    debug!(%key, "list cache miss, fetching");

    let response = match self.source.get_collection(&params).await {
      Ok(response) => response,
      Err(e) => {
        warn!(%key, error = %e, "list fetch failed");
        return Err(transport_message(&e, LIST_TRANSPORT_FAILURE));
      }
    };

    match response.into_fetched(LIST_FAILURE) {
      Ok(fetched) => {
        self
          .lists
          .set(key.clone(), fetched.data.clone(), fetched.pagination.clone());
        debug!(%key, items = fetched.data.len(), "list cached");
        Ok(fetched)
      }
      Err(message) => {
        warn!(%key, %message, "list fetch rejected by source");
        Err(message)
      }
    }
  }

  /// Resolve a collection query, bypassing the cache when `force` is set.
  pub async fn fetch_list(
    &self,
    params: Option<&QueryParams>,
    force: bool,
  ) -> RequestState<Vec<S::Item>> {
    if !force {
      if let Some(fetched) = self.cached_list(params) {
        return RequestState::resolved(Ok(fetched));
      }
    }
    RequestState::resolved(self.load_list(params).await)
  }

  // ==========================================================================
  // Single items
  // ==========================================================================

  /// Fresh cached item for `id`, if any. Never touches the source.
  pub fn cached_one(&self, id: &str) -> Option<Fetched<S::Item>> {
    let key = CacheKey::from(id);
    let entry = self.items.get_fresh(&key, self.default_ttl)?;
    debug!(%key, "item cache hit");
    Some(Fetched {
      data: entry.payload,
      pagination: entry.pagination,
    })
  }

  /// Load `id` from the source and write a success through to the cache.
  pub async fn load_one(&self, id: &str) -> Result<Fetched<S::Item>, String> {
    let key = CacheKey::from(id);
    debug!(%key, "item cache miss, fetching");

    let response = match self.source.get_by_id(id).await {
      Ok(response) => response,
      Err(e) => {
        warn!(%key, error = %e, "item fetch failed");
        return Err(transport_message(&e, ITEM_TRANSPORT_FAILURE));
      }
    };

    match response.into_fetched(ITEM_FAILURE) {
      Ok(fetched) => {
        self
          .items
          .set(key, fetched.data.clone(), fetched.pagination.clone());
        Ok(fetched)
      }
      Err(message) => {
        warn!(%key, %message, "item fetch rejected by source");
        Err(message)
      }
    }
  }

  /// Resolve a single-item query. An absent or empty id resolves to an empty
  /// state without calling the source.
  pub async fn fetch_one(&self, id: Option<&str>, force: bool) -> RequestState<S::Item> {
    let Some(id) = id.filter(|id| !id.is_empty()) else {
      return RequestState::empty();
    };
    if !force {
      if let Some(fetched) = self.cached_one(id) {
        return RequestState::resolved(Ok(fetched));
      }
    }
    RequestState::resolved(self.load_one(id).await)
  }
}

impl<S: DataSource> Clone for FetchCoordinator<S> {
  fn clone(&self) -> Self {
    Self {
      source: Arc::clone(&self.source),
      lists: self.lists.clone(),
      items: self.items.clone(),
      default_ttl: self.default_ttl,
    }
  }
}

fn transport_message(error: &color_eyre::Report, fallback: &str) -> String {
  let message = error.to_string();
  if message.trim().is_empty() {
    fallback.to_string()
  } else {
    message
  }
}
