//! In-memory TTL store shared across call sites.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::key::CacheKey;
use super::traits::CacheEntry;
use crate::api::types::Pagination;

/// Mapping from cache key to the last stored response.
///
/// Clones share the same underlying map, so one store can be handed to every
/// consumer that should see the same cached results. There is no eviction:
/// entries live as long as the store. Concurrent writers to one key race and
/// the last `set` wins.
pub struct CacheStore<T> {
  entries: Arc<RwLock<HashMap<CacheKey, CacheEntry<T>>>>,
}

impl<T: Clone> CacheStore<T> {
  pub fn new() -> Self {
    Self {
      entries: Arc::new(RwLock::new(HashMap::new())),
    }
  }

  /// Get the entry for `key`, fresh or not.
  pub fn get(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(key)
      .cloned()
  }

  /// Get the entry for `key` only if it is within `ttl` as of now.
  pub fn get_fresh(&self, key: &CacheKey, ttl: Duration) -> Option<CacheEntry<T>> {
    let now = Instant::now();
    self.get(key).filter(|entry| entry.is_fresh(ttl, now))
  }

  /// Store `payload` under `key`, replacing any previous entry.
  pub fn set(&self, key: CacheKey, payload: T, pagination: Option<Pagination>) {
    let entry = CacheEntry {
      stored_at: Instant::now(),
      payload,
      pagination,
    };
    self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key, entry);
  }

  pub fn contains(&self, key: &CacheKey) -> bool {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .contains_key(key)
  }

  pub fn len(&self) -> usize {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<T: Clone> Default for CacheStore<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Clone for CacheStore<T> {
  fn clone(&self) -> Self {
    Self {
      entries: Arc::clone(&self.entries),
    }
  }
}

impl<T> std::fmt::Debug for CacheStore<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let len = self
      .entries
      .read()
      .map(|entries| entries.len())
      .unwrap_or_default();
    f.debug_struct("CacheStore")
      .field("entries", &len)
      .finish()
  }
}
