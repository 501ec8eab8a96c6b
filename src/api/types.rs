use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A recipe as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
  #[serde(deserialize_with = "id_as_string")]
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default, alias = "image")]
  pub image_url: Option<String>,
  #[serde(default, alias = "prepTime")]
  pub prep_time: Option<u32>,
  #[serde(default)]
  pub ingredients: Vec<Value>,
  #[serde(default)]
  pub steps: Vec<Value>,
  // Anything else the API sends along
  #[serde(flatten)]
  pub extra: HashMap<String, Value>,
}

/// Paging metadata attached to list responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  #[serde(default)]
  pub page: Option<u64>,
  #[serde(default)]
  pub limit: Option<u64>,
  #[serde(default)]
  pub total: Option<u64>,
  #[serde(default)]
  pub total_pages: Option<u64>,
}

impl Pagination {
  pub fn has_next(&self) -> bool {
    match (self.page, self.total_pages) {
      (Some(page), Some(total_pages)) => page < total_pages,
      _ => false,
    }
  }
}

/// Ids arrive as strings or numbers depending on the backend.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: serde::Deserializer<'de>,
{
  match Value::deserialize(deserializer)? {
    Value::String(s) => Ok(s),
    Value::Number(n) => Ok(n.to_string()),
    other => Err(serde::de::Error::custom(format!(
      "expected string or number id, got {}",
      other
    ))),
  }
}
