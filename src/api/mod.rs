pub mod api_types;
pub mod cached_client;
pub mod client;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use cached_client::FetchCoordinator;
pub use client::RecipeClient;
pub use source::{DataSource, FetchResult, Fetched};
pub use types::{Pagination, Recipe};
