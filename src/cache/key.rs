//! Cache key derivation for collection queries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Reserved parameter carrying a per-call TTL override, in milliseconds.
/// It controls caching only and is never part of the key or the remote request.
pub const CACHE_TIME_PARAM: &str = "__cacheTime";

/// TTL used when a query does not override it.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Query parameters for a collection request.
///
/// Insertion order is irrelevant: two parameter sets with the same entries
/// always produce the same [`CacheKey`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(HashMap<String, Value>);

impl QueryParams {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style insert.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.insert(key, value);
    self
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    self.0.insert(key.into(), value.into());
  }

  pub fn remove(&mut self, key: &str) -> Option<Value> {
    self.0.remove(key)
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  /// Set the per-call TTL override.
  pub fn with_cache_time(self, ttl: Duration) -> Self {
    let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    self.with(CACHE_TIME_PARAM, millis)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Entries in stable (sorted) key order.
  pub fn sorted(&self) -> BTreeMap<&str, &Value> {
    self.0.iter().map(|(k, v)| (k.as_str(), v)).collect()
  }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for QueryParams {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(
      iter
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    )
  }
}

/// Canonical lookup key for the response cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for CacheKey {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

impl From<String> for CacheKey {
  fn from(s: String) -> Self {
    Self(s)
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
  pub key: CacheKey,
  pub ttl: Duration,
  /// The parameters with the control field removed, as sent to the source.
  pub params: QueryParams,
}

/// Derive the cache key and effective TTL for a collection query.
///
/// Absent params are treated as an empty set. The key is the compact JSON
/// object of the remaining entries with keys sorted.
pub fn normalize(params: Option<&QueryParams>) -> Normalized {
  normalize_with_default(params, DEFAULT_TTL)
}

/// Like [`normalize`], with `default_ttl` applied when there is no override.
pub fn normalize_with_default(params: Option<&QueryParams>, default_ttl: Duration) -> Normalized {
  let mut params = params.cloned().unwrap_or_default();

  let ttl = params
    .remove(CACHE_TIME_PARAM)
    .and_then(|v| ttl_from_value(&v))
    .unwrap_or(default_ttl);

  let object: Map<String, Value> = params
    .sorted()
    .into_iter()
    .map(|(k, v)| (k.to_string(), canonical(v)))
    .collect();
  let key = CacheKey(Value::Object(object).to_string());

  Normalized { key, ttl, params }
}

fn ttl_from_value(value: &Value) -> Option<Duration> {
  if let Some(millis) = value.as_u64() {
    return Some(Duration::from_millis(millis));
  }
  // Fractional milliseconds and numeric strings are accepted, negative values
  // are not. Values too large for a Duration saturate.
  let millis = match value {
    Value::String(s) => s.trim().parse::<f64>().ok()?,
    other => other.as_f64()?,
  };
  if !millis.is_finite() || millis < 0.0 {
    return None;
  }
  Some(Duration::try_from_secs_f64(millis / 1000.0).unwrap_or(Duration::MAX))
}

/// Render whole-number floats as integers so `2` and `2.0` share a key.
fn canonical(value: &Value) -> Value {
  match value {
    Value::Number(n) if !n.is_i64() && !n.is_u64() => match n.as_f64() {
      Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => Value::from(f as i64),
      _ => value.clone(),
    },
    Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
    Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), canonical(v))).collect()),
    _ => value.clone(),
  }
}

/// Largest integer an f64 holds exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
