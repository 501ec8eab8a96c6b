//! Local user preferences: favorites and the user profile.
//!
//! Values are JSON documents stored under string keys. A value that no
//! longer parses reads as absent.

pub mod favorites;
pub mod profile;
mod storage;

pub use favorites::{
  add_favorite, favorite_ids, is_favorite, load_favorites, remove_favorite, toggle_favorite,
};
pub use profile::{avatar_data_url, load_profile, update_avatar, update_username, ProfileUpdate, UserProfile};
pub use storage::{MemoryPreferences, PreferenceStore, SqlitePreferences};
