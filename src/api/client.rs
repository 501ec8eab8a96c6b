use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::api::api_types::{classify_list, classify_one};
use crate::api::source::{DataSource, FetchResult};
use crate::api::types::Recipe;
use crate::cache::QueryParams;
use crate::config::Config;

/// HTTP client for the recipe API
#[derive(Clone)]
pub struct RecipeClient {
  http: reqwest::Client,
  base_url: Url,
  token: Option<String>,
}

impl RecipeClient {
  pub fn new(config: &Config) -> Result<Self> {
    let mut builder = reqwest::Client::builder().user_agent(concat!(
      env!("CARGO_PKG_NAME"),
      "/",
      env!("CARGO_PKG_VERSION")
    ));
    if let Some(secs) = config.api.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: parse_base_url(&config.api.url)?,
      token: Config::get_api_token(),
    })
  }

  /// URL for the recipe collection with query parameters appended in sorted order.
  fn collection_url(&self, params: &QueryParams) -> Result<Url> {
    let mut url = self
      .base_url
      .join("recipes")
      .map_err(|e| eyre!("Failed to build recipes URL: {}", e))?;

    let query: Vec<(&str, String)> = params
      .sorted()
      .into_iter()
      .filter_map(|(key, value)| match value {
        Value::Null => None,
        Value::String(s) => Some((key, s.clone())),
        other => Some((key, other.to_string())),
      })
      .collect();
    if !query.is_empty() {
      url.query_pairs_mut().extend_pairs(query);
    }

    Ok(url)
  }

  fn item_url(&self, id: &str) -> Result<Url> {
    let mut url = self
      .base_url
      .join("recipes/")
      .map_err(|e| eyre!("Failed to build recipe URL: {}", e))?;
    url
      .path_segments_mut()
      .map_err(|_| eyre!("Base URL cannot carry a path: {}", self.base_url))?
      .pop_if_empty()
      .push(id);
    Ok(url)
  }

  async fn get_json(&self, url: Url) -> Result<Value> {
    info!(%url, "GET");

    let mut request = self.http.get(url.clone());
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }

    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    let status = response.status();
    let body: Value = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to read response from {}: {}", url, e))?;

    // Error statuses usually still carry a failure envelope worth surfacing.
    if !status.is_success() && body.get("success").is_none() {
      return Err(eyre!("Server returned {} for {}", status, url));
    }

    Ok(body)
  }
}

#[async_trait]
impl DataSource for RecipeClient {
  type Item = Recipe;

  async fn get_collection(&self, params: &QueryParams) -> Result<FetchResult<Vec<Recipe>>> {
    let url = self.collection_url(params)?;
    let body = self.get_json(url).await?;
    classify_list(body)
  }

  async fn get_by_id(&self, id: &str) -> Result<FetchResult<Recipe>> {
    let url = self.item_url(id)?;
    let body = self.get_json(url).await?;
    classify_one(body)
  }
}

/// Parse the configured base URL so that relative joins append to its path.
fn parse_base_url(raw: &str) -> Result<Url> {
  let trimmed = raw.trim();
  let with_slash = if trimmed.ends_with('/') {
    trimmed.to_string()
  } else {
    format!("{}/", trimmed)
  };
  Url::parse(&with_slash).map_err(|e| eyre!("Invalid API url '{}': {}", raw, e))
}
