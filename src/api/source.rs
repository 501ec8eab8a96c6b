//! The remote data source contract and its response shapes.

use async_trait::async_trait;
use color_eyre::Result;

use super::types::Pagination;
use crate::cache::QueryParams;

/// Outcome of a remote call that completed.
///
/// Backends disagree on envelopes: some wrap payloads in
/// `{ success, data, pagination }`, some report `{ success: false, message }`,
/// and some return the bare payload. Each shape gets its own variant so the
/// distinction is made exactly once, where the response is decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult<T> {
  WrappedSuccess {
    data: T,
    pagination: Option<Pagination>,
  },
  WrappedFailure {
    message: Option<String>,
  },
  Raw(T),
}

/// Normalized successful payload, the only shape that is ever cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
  pub data: T,
  pub pagination: Option<Pagination>,
}

impl<T> FetchResult<T> {
  /// Collapse the response shape into data or an error message.
  ///
  /// A failure without a usable message reports `fallback`.
  pub fn into_fetched(self, fallback: &str) -> Result<Fetched<T>, String> {
    match self {
      FetchResult::WrappedSuccess { data, pagination } => Ok(Fetched { data, pagination }),
      FetchResult::WrappedFailure { message } => Err(
        message
          .filter(|m| !m.trim().is_empty())
          .unwrap_or_else(|| fallback.to_string()),
      ),
      FetchResult::Raw(data) => Ok(Fetched {
        data,
        pagination: None,
      }),
    }
  }
}

/// A fetch-capable remote service.
///
/// `Err` means the call itself could not complete (network, decoding); a
/// source that answers with a failure envelope returns
/// `Ok(FetchResult::WrappedFailure { .. })` instead.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
  type Item: Clone + Send + Sync + 'static;

  /// Fetch a collection. `params` never contains the cache control field.
  async fn get_collection(&self, params: &QueryParams) -> Result<FetchResult<Vec<Self::Item>>>;

  /// Fetch a single item by id.
  async fn get_by_id(&self, id: &str) -> Result<FetchResult<Self::Item>>;
}
