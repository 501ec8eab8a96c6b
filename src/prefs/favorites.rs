//! Favorite recipes, stored as an ordered list of ids.

use color_eyre::{eyre::eyre, Result};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use super::storage::PreferenceStore;
use crate::api::cached_client::FetchCoordinator;
use crate::api::source::DataSource;

const FAVORITES_KEY: &str = "favorites";

/// Stored favorite ids in insertion order. Missing or malformed data is an
/// empty list.
pub fn favorite_ids(store: &dyn PreferenceStore) -> Result<Vec<String>> {
  let Some(Value::Array(values)) = store.get(FAVORITES_KEY)? else {
    return Ok(Vec::new());
  };

  // Ids may have been stored as numbers.
  Ok(
    values
      .iter()
      .filter_map(|v| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
      })
      .collect(),
  )
}

pub fn is_favorite(store: &dyn PreferenceStore, id: &str) -> Result<bool> {
  Ok(favorite_ids(store)?.iter().any(|fav| fav == id))
}

/// Add `id` at the end of the list. Returns `false` if it was already there.
pub fn add_favorite(store: &dyn PreferenceStore, id: &str) -> Result<bool> {
  let mut ids = favorite_ids(store)?;
  if ids.iter().any(|fav| fav == id) {
    return Ok(false);
  }
  ids.push(id.to_string());
  save(store, &ids)?;
  Ok(true)
}

/// Returns `false` if `id` was not a favorite.
pub fn remove_favorite(store: &dyn PreferenceStore, id: &str) -> Result<bool> {
  let mut ids = favorite_ids(store)?;
  let before = ids.len();
  ids.retain(|fav| fav != id);
  if ids.len() == before {
    return Ok(false);
  }
  save(store, &ids)?;
  Ok(true)
}

/// Flip the favorite flag for `id`, returning the new flag.
pub fn toggle_favorite(store: &dyn PreferenceStore, id: &str) -> Result<bool> {
  if is_favorite(store, id)? {
    remove_favorite(store, id)?;
    Ok(false)
  } else {
    add_favorite(store, id)?;
    Ok(true)
  }
}

fn save(store: &dyn PreferenceStore, ids: &[String]) -> Result<()> {
  debug!(count = ids.len(), "saving favorites");
  store.set(FAVORITES_KEY, &Value::from(ids.to_vec()))
}

/// Fetch every favorite concurrently through the single-item cache.
///
/// Items that fail to load are skipped. An error is returned only when every
/// favorite failed, carrying the first failure message.
pub async fn load_favorites<S: DataSource>(
  store: &dyn PreferenceStore,
  coordinator: &FetchCoordinator<S>,
) -> Result<Vec<S::Item>> {
  let ids = favorite_ids(store)?;
  if ids.is_empty() {
    return Ok(Vec::new());
  }

  let results = join_all(ids.iter().map(|id| coordinator.fetch_one(Some(id.as_str()), false))).await;

  let mut items = Vec::with_capacity(results.len());
  let mut first_error = None;
  for (id, state) in ids.iter().zip(results) {
    match (state.data, state.error) {
      (Some(item), _) => items.push(item),
      (None, error) => {
        let message = error.unwrap_or_else(|| format!("Recipe {} not found", id));
        warn!(%id, %message, "skipping favorite");
        first_error.get_or_insert(message);
      }
    }
  }

  match first_error {
    Some(message) if items.is_empty() => Err(eyre!(message)),
    _ => Ok(items),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::source::FetchResult;
  use crate::api::testing::{recipe, ScriptedSource};
  use crate::prefs::MemoryPreferences;
  use serde_json::json;

  #[test]
  fn test_missing_or_malformed_is_empty() {
    let store = MemoryPreferences::new();
    assert!(favorite_ids(&store).unwrap().is_empty());

    store.insert_raw(FAVORITES_KEY, "{oops").unwrap();
    assert!(favorite_ids(&store).unwrap().is_empty());

    store.set(FAVORITES_KEY, &json!({"id": "1"})).unwrap();
    assert!(favorite_ids(&store).unwrap().is_empty());
  }

  #[test]
  fn test_numeric_ids_are_read_as_strings() {
    let store = MemoryPreferences::new();
    store.set(FAVORITES_KEY, &json!([3, "7", null])).unwrap();

    assert_eq!(favorite_ids(&store).unwrap(), vec!["3", "7"]);
  }

  #[test]
  fn test_add_keeps_order_and_is_idempotent() {
    let store = MemoryPreferences::new();

    assert!(add_favorite(&store, "2").unwrap());
    assert!(add_favorite(&store, "1").unwrap());
    assert!(!add_favorite(&store, "2").unwrap());

    assert_eq!(favorite_ids(&store).unwrap(), vec!["2", "1"]);
    assert!(is_favorite(&store, "1").unwrap());
  }

  #[test]
  fn test_remove_and_toggle() {
    let store = MemoryPreferences::new();
    add_favorite(&store, "1").unwrap();

    assert!(!remove_favorite(&store, "9").unwrap());
    assert!(!toggle_favorite(&store, "1").unwrap());
    assert!(!is_favorite(&store, "1").unwrap());
    assert!(toggle_favorite(&store, "1").unwrap());
    assert_eq!(favorite_ids(&store).unwrap(), vec!["1"]);
  }

  #[tokio::test]
  async fn test_load_without_favorites_makes_no_calls() {
    let store = MemoryPreferences::new();
    let coordinator = FetchCoordinator::new(ScriptedSource::new());

    let items = load_favorites(&store, &coordinator).await.unwrap();

    assert!(items.is_empty());
    assert_eq!(coordinator.source().item_calls(), 0);
  }

  #[tokio::test]
  async fn test_load_skips_failures_and_keeps_order() {
    let store = MemoryPreferences::new();
    for id in ["3", "missing", "1"] {
      add_favorite(&store, id).unwrap();
    }
    let source = ScriptedSource::new()
      .with_item("1", FetchResult::Raw(recipe("1", "Soto Ayam")))
      .with_item("3", FetchResult::Raw(recipe("3", "Rendang")));
    let coordinator = FetchCoordinator::new(source);

    let items = load_favorites(&store, &coordinator).await.unwrap();

    let names: Vec<_> = items.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Rendang", "Soto Ayam"]);
  }

  #[tokio::test]
  async fn test_load_uses_item_cache() {
    let store = MemoryPreferences::new();
    add_favorite(&store, "1").unwrap();
    let coordinator =
      FetchCoordinator::new(ScriptedSource::new().with_item("1", FetchResult::Raw(recipe("1", "Soto Ayam"))));

    load_favorites(&store, &coordinator).await.unwrap();
    load_favorites(&store, &coordinator).await.unwrap();

    assert_eq!(coordinator.source().item_calls(), 1);
  }

  #[tokio::test]
  async fn test_load_reports_first_error_when_all_fail() {
    let store = MemoryPreferences::new();
    add_favorite(&store, "1").unwrap();
    add_favorite(&store, "2").unwrap();
    let source = ScriptedSource::new();
    source.fail_item("1", "connection reset");
    let coordinator = FetchCoordinator::new(source);

    let err = load_favorites(&store, &coordinator).await.unwrap_err();

    assert_eq!(err.to_string(), "connection reset");
  }
}
