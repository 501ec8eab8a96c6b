pub mod api;
pub mod bindings;
pub mod cache;
pub mod config;
pub mod logging;
pub mod prefs;
pub mod query;

pub use api::{DataSource, FetchCoordinator, FetchResult, Fetched, Pagination, Recipe, RecipeClient};
pub use bindings::{use_collection, use_entity, CollectionQuery, EntityQuery};
pub use config::Config;
pub use query::{Query, QueryState, RequestState};
