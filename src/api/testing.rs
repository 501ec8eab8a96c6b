//! Scripted in-memory data source for tests.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::source::{DataSource, FetchResult};
use super::types::{Pagination, Recipe};
use crate::cache::QueryParams;

type Scripted<T> = std::result::Result<FetchResult<T>, String>;

/// A data source whose answers are set up front.
///
/// Every call is counted. Unscripted ids answer with a failure envelope
/// carrying "not found".
pub struct ScriptedSource {
  list: Mutex<Scripted<Vec<Recipe>>>,
  items: Mutex<HashMap<String, Scripted<Recipe>>>,
  delay: Mutex<Option<Duration>>,
  seen_params: Mutex<Vec<QueryParams>>,
  list_calls: AtomicUsize,
  item_calls: AtomicUsize,
}

impl ScriptedSource {
  pub fn new() -> Self {
    Self {
      list: Mutex::new(Ok(FetchResult::Raw(Vec::new()))),
      items: Mutex::new(HashMap::new()),
      delay: Mutex::new(None),
      seen_params: Mutex::new(Vec::new()),
      list_calls: AtomicUsize::new(0),
      item_calls: AtomicUsize::new(0),
    }
  }

  pub fn with_list(self, response: FetchResult<Vec<Recipe>>) -> Self {
    self.set_list(response);
    self
  }

  pub fn with_item(self, id: &str, response: FetchResult<Recipe>) -> Self {
    self.set_item(id, response);
    self
  }

  pub fn set_list(&self, response: FetchResult<Vec<Recipe>>) {
    *self.list.lock().unwrap() = Ok(response);
  }

  pub fn fail_list(&self, message: &str) {
    *self.list.lock().unwrap() = Err(message.to_string());
  }

  pub fn set_item(&self, id: &str, response: FetchResult<Recipe>) {
    self.items.lock().unwrap().insert(id.to_string(), Ok(response));
  }

  pub fn fail_item(&self, id: &str, message: &str) {
    self
      .items
      .lock()
      .unwrap()
      .insert(id.to_string(), Err(message.to_string()));
  }

  pub fn set_delay(&self, delay: Duration) {
    *self.delay.lock().unwrap() = Some(delay);
  }

  pub fn list_calls(&self) -> usize {
    self.list_calls.load(Ordering::SeqCst)
  }

  pub fn item_calls(&self) -> usize {
    self.item_calls.load(Ordering::SeqCst)
  }

  pub fn seen_params(&self) -> Vec<QueryParams> {
    self.seen_params.lock().unwrap().clone()
  }

  async fn pause(&self) {
    let delay = *self.delay.lock().unwrap();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
  }
}

#[async_trait]
impl DataSource for ScriptedSource {
  type Item = Recipe;

  async fn get_collection(&self, params: &QueryParams) -> Result<FetchResult<Vec<Recipe>>> {
    self.list_calls.fetch_add(1, Ordering::SeqCst);
    self.seen_params.lock().unwrap().push(params.clone());
    // Capture the answer before waiting, so a response rescripted mid-flight
    // only affects later calls.
    let response = self.list.lock().unwrap().clone();
    self.pause().await;
    response.map_err(|message| eyre!(message))
  }

  async fn get_by_id(&self, id: &str) -> Result<FetchResult<Recipe>> {
    self.item_calls.fetch_add(1, Ordering::SeqCst);
    let response = self.items.lock().unwrap().get(id).cloned();
    self.pause().await;
    match response {
      Some(response) => response.map_err(|message| eyre!(message)),
      None => Ok(FetchResult::WrappedFailure {
        message: Some("not found".to_string()),
      }),
    }
  }
}

pub fn recipe(id: &str, name: &str) -> Recipe {
  Recipe {
    id: id.to_string(),
    name: name.to_string(),
    category: None,
    description: None,
    image_url: None,
    prep_time: None,
    ingredients: Vec::new(),
    steps: Vec::new(),
    extra: HashMap::new(),
  }
}

pub fn page(page: u64, total_pages: u64) -> Pagination {
  Pagination {
    page: Some(page),
    limit: Some(10),
    total: None,
    total_pages: Some(total_pages),
  }
}
