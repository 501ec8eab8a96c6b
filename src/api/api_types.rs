//! Serde-deserializable types matching recipe API responses.
//!
//! Response bodies are decoded into [`FetchResult`] here and nowhere else;
//! the coordinator never looks at raw JSON.

use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::warn;

use super::source::FetchResult;
use super::types::Pagination;

// ============================================================================
// Envelope
// ============================================================================

/// `{ success, data, message, pagination }` wrapper used by most endpoints.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
  success: Value,
  #[serde(default)]
  data: Option<Value>,
  #[serde(default)]
  message: Option<Value>,
  #[serde(default)]
  error: Option<Value>,
  #[serde(default)]
  pagination: Option<Value>,
}

enum Shape {
  Success {
    data: Option<Value>,
    pagination: Option<Pagination>,
  },
  Failure {
    message: Option<String>,
  },
  Raw(Value),
}

/// A body is wrapped iff it is an object carrying a `success` field.
fn shape_of(body: Value) -> Result<Shape> {
  let wrapped = body
    .as_object()
    .map(|obj| obj.contains_key("success"))
    .unwrap_or(false);
  if !wrapped {
    return Ok(Shape::Raw(body));
  }

  let envelope: ApiEnvelope =
    serde_json::from_value(body).map_err(|e| eyre!("Failed to parse response envelope: {}", e))?;

  if is_truthy(&envelope.success) {
    let pagination = envelope.pagination.and_then(|p| {
      if p.is_null() {
        return None;
      }
      serde_json::from_value::<Pagination>(p)
        .map_err(|e| warn!("Ignoring malformed pagination: {}", e))
        .ok()
    });
    Ok(Shape::Success {
      data: envelope.data.filter(|d| !d.is_null()),
      pagination,
    })
  } else {
    let message = envelope
      .message
      .or(envelope.error)
      .and_then(|m| m.as_str().map(String::from));
    Ok(Shape::Failure { message })
  }
}

/// Truthiness of the `success` flag; some backends send strings or numbers.
fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
    Value::String(s) => !s.is_empty(),
    Value::Array(_) | Value::Object(_) => true,
  }
}

// ============================================================================
// Classification
// ============================================================================

/// Decode a collection response. A missing or null payload is an empty list.
pub fn classify_list<T: DeserializeOwned>(body: Value) -> Result<FetchResult<Vec<T>>> {
  let decode = |value: Option<Value>| -> Result<Vec<T>> {
    match value {
      None | Some(Value::Null) => Ok(Vec::new()),
      Some(v) => serde_json::from_value(v).map_err(|e| eyre!("Failed to parse recipe list: {}", e)),
    }
  };

  Ok(match shape_of(body)? {
    Shape::Success { data, pagination } => FetchResult::WrappedSuccess {
      data: decode(data)?,
      pagination,
    },
    Shape::Failure { message } => FetchResult::WrappedFailure { message },
    Shape::Raw(body) => FetchResult::Raw(decode(Some(body))?),
  })
}

/// Decode a single-item response.
///
/// A null body is reported as a failure without a message rather than cached
/// as an empty item.
pub fn classify_one<T: DeserializeOwned>(body: Value) -> Result<FetchResult<T>> {
  let decode = |value: Value| -> Result<T> {
    serde_json::from_value(value).map_err(|e| eyre!("Failed to parse recipe: {}", e))
  };

  Ok(match shape_of(body)? {
    Shape::Success { data, pagination } => {
      let data = data.ok_or_else(|| eyre!("Response reported success but carried no data"))?;
      FetchResult::WrappedSuccess {
        data: decode(data)?,
        pagination,
      }
    }
    Shape::Failure { message } => FetchResult::WrappedFailure { message },
    Shape::Raw(Value::Null) => FetchResult::WrappedFailure { message: None },
    Shape::Raw(body) => FetchResult::Raw(decode(body)?),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Recipe;
  use serde_json::json;

  #[test]
  fn test_wrapped_list_with_pagination() {
    let body = json!({
      "success": true,
      "data": [{ "id": "1", "name": "Soto" }],
      "pagination": { "page": 1, "limit": 12, "total": 1, "totalPages": 1 }
    });

    match classify_list::<Recipe>(body).expect("should classify") {
      FetchResult::WrappedSuccess { data, pagination } => {
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].name, "Soto");
        assert_eq!(pagination.and_then(|p| p.total_pages), Some(1));
      }
      other => panic!("expected wrapped success, got {:?}", other),
    }
  }

  #[test]
  fn test_wrapped_list_missing_data_is_empty() {
    let result = classify_list::<Recipe>(json!({ "success": true })).expect("should classify");

    assert_eq!(
      result,
      FetchResult::WrappedSuccess {
        data: Vec::new(),
        pagination: None,
      }
    );
  }

  #[test]
  fn test_failure_envelope() {
    let result = classify_list::<Recipe>(json!({ "success": false, "message": "not found" }))
      .expect("should classify");

    assert_eq!(
      result,
      FetchResult::WrappedFailure {
        message: Some("not found".to_string())
      }
    );
  }

  #[test]
  fn test_failure_envelope_without_message() {
    let result =
      classify_one::<Recipe>(json!({ "success": false, "message": 500 })).expect("should classify");

    assert_eq!(result, FetchResult::WrappedFailure { message: None });
  }

  #[test]
  fn test_raw_array_is_raw() {
    let result = classify_list::<Recipe>(json!([{ "id": 3, "name": "Rawon" }]))
      .expect("should classify");

    match result {
      FetchResult::Raw(data) => assert_eq!(data[0].id, "3"),
      other => panic!("expected raw payload, got {:?}", other),
    }
  }

  #[test]
  fn test_raw_object_without_success_flag() {
    let result =
      classify_one::<Recipe>(json!({ "id": "9", "name": "Gado-gado" })).expect("should classify");

    match result {
      FetchResult::Raw(recipe) => assert_eq!(recipe.name, "Gado-gado"),
      other => panic!("expected raw payload, got {:?}", other),
    }
  }

  #[test]
  fn test_null_single_body_is_failure() {
    let result = classify_one::<Recipe>(Value::Null).expect("should classify");

    assert_eq!(result, FetchResult::WrappedFailure { message: None });
  }

  #[test]
  fn test_success_single_without_data_is_error() {
    assert!(classify_one::<Recipe>(json!({ "success": true })).is_err());
  }

  #[test]
  fn test_malformed_pagination_is_dropped() {
    let body = json!({ "success": 1, "data": [], "pagination": "page one" });

    assert_eq!(
      classify_list::<Recipe>(body).expect("should classify"),
      FetchResult::WrappedSuccess {
        data: Vec::new(),
        pagination: None,
      }
    );
  }
}
