//! In-memory response cache.
//!
//! This module provides the pieces the fetch coordinator builds on:
//! - Canonical cache keys derived from query parameters, with a per-call TTL override
//! - A shared key -> entry store with no eviction beyond TTL
//! - Freshness checks against an injected `now`

pub mod key;
mod store;
mod traits;

pub use key::{
  normalize, normalize_with_default, CacheKey, Normalized, QueryParams, CACHE_TIME_PARAM,
  DEFAULT_TTL,
};
pub use store::CacheStore;
pub use traits::{CacheEntry, CacheSource};
