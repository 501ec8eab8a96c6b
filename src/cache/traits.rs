//! Core types for the response cache.

use std::time::{Duration, Instant};

use crate::api::types::Pagination;

/// A stored response. Entries are never mutated; a new fetch replaces the
/// whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  /// When the entry was written. Only meaningful for staleness checks.
  pub stored_at: Instant,
  pub payload: T,
  pub pagination: Option<Pagination>,
}

impl<T> CacheEntry<T> {
  /// True iff `now - stored_at <= ttl`.
  pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
    now.saturating_duration_since(self.stored_at) <= ttl
  }

  pub fn age(&self, now: Instant) -> Duration {
    now.saturating_duration_since(self.stored_at)
  }
}

/// Indicates where resolved data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from the remote source
  Network,
  /// Data from the cache, within its TTL
  Cache,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry_at(stored_at: Instant) -> CacheEntry<u32> {
    CacheEntry {
      stored_at,
      payload: 7,
      pagination: None,
    }
  }

  #[test]
  fn test_fresh_up_to_and_including_ttl() {
    let stored_at = Instant::now();
    let entry = entry_at(stored_at);
    let ttl = Duration::from_secs(60);

    assert!(entry.is_fresh(ttl, stored_at));
    assert!(entry.is_fresh(ttl, stored_at + Duration::from_secs(30)));
    assert!(entry.is_fresh(ttl, stored_at + ttl));
  }

  #[test]
  fn test_stale_one_millisecond_past_ttl() {
    let stored_at = Instant::now();
    let entry = entry_at(stored_at);
    let ttl = Duration::from_secs(60);

    assert!(!entry.is_fresh(ttl, stored_at + ttl + Duration::from_millis(1)));
  }

  #[test]
  fn test_zero_ttl_only_fresh_at_write_instant() {
    let stored_at = Instant::now();
    let entry = entry_at(stored_at);

    assert!(entry.is_fresh(Duration::ZERO, stored_at));
    assert!(!entry.is_fresh(Duration::ZERO, stored_at + Duration::from_millis(1)));
  }

  #[test]
  fn test_age_saturates_for_earlier_now() {
    let stored_at = Instant::now() + Duration::from_secs(5);
    let entry = entry_at(stored_at);

    assert_eq!(entry.age(Instant::now()), Duration::ZERO);
  }
}
