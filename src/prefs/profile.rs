//! The local user profile: a display name and an optional avatar image.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::storage::PreferenceStore;

const PROFILE_KEY: &str = "user_profile";
const DEFAULT_USERNAME: &str = "Guest";

/// Avatars larger than this are accepted but worth a warning.
pub const AVATAR_WARN_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  pub username: String,
  /// Image encoded as a `data:image/...;base64,` URL
  #[serde(default)]
  pub avatar: Option<String>,
  #[serde(default, rename = "updatedAt")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Default for UserProfile {
  fn default() -> Self {
    Self {
      username: DEFAULT_USERNAME.to_string(),
      avatar: None,
      updated_at: None,
    }
  }
}

/// Outcome of a profile edit.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileUpdate {
  Saved(UserProfile),
  Rejected(String),
}

/// Stored profile, or the default one if nothing usable is stored.
pub fn load_profile(store: &dyn PreferenceStore) -> Result<UserProfile> {
  let Some(value) = store.get(PROFILE_KEY)? else {
    return Ok(UserProfile::default());
  };

  match serde_json::from_value(value) {
    Ok(profile) => Ok(profile),
    Err(e) => {
      warn!(error = %e, "stored profile is unreadable, using default");
      Ok(UserProfile::default())
    }
  }
}

pub fn update_username(store: &dyn PreferenceStore, username: &str) -> Result<ProfileUpdate> {
  let username = username.trim();
  if username.is_empty() {
    return Ok(ProfileUpdate::Rejected("Username cannot be empty".to_string()));
  }

  let mut profile = load_profile(store)?;
  profile.username = username.to_string();
  save(store, profile)
}

pub fn update_avatar(store: &dyn PreferenceStore, data_url: &str) -> Result<ProfileUpdate> {
  if !data_url.starts_with("data:image/") {
    return Ok(ProfileUpdate::Rejected("Avatar must be an image".to_string()));
  }

  let mut profile = load_profile(store)?;
  profile.avatar = Some(data_url.to_string());
  save(store, profile)
}

fn save(store: &dyn PreferenceStore, mut profile: UserProfile) -> Result<ProfileUpdate> {
  profile.updated_at = Some(Utc::now());
  store.set(PROFILE_KEY, &serde_json::to_value(&profile)?)?;
  info!(username = %profile.username, "profile updated");
  Ok(ProfileUpdate::Saved(profile))
}

/// Encode image bytes as a data URL.
pub fn avatar_data_url(mime: &str, bytes: &[u8]) -> String {
  format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::prefs::MemoryPreferences;
  use serde_json::json;

  #[test]
  fn test_default_profile() {
    let store = MemoryPreferences::new();

    let profile = load_profile(&store).unwrap();

    assert_eq!(profile.username, "Guest");
    assert_eq!(profile.avatar, None);
  }

  #[test]
  fn test_unreadable_profile_falls_back_to_default() {
    let store = MemoryPreferences::new();
    store.set(PROFILE_KEY, &json!({"avatar": 12})).unwrap();

    assert_eq!(load_profile(&store).unwrap(), UserProfile::default());
  }

  #[test]
  fn test_update_username_trims_and_saves() {
    let store = MemoryPreferences::new();

    let ProfileUpdate::Saved(profile) = update_username(&store, "  Sari ").unwrap() else {
      panic!("expected the update to be saved");
    };

    assert_eq!(profile.username, "Sari");
    assert!(profile.updated_at.is_some());
    assert_eq!(load_profile(&store).unwrap(), profile);
  }

  #[test]
  fn test_blank_username_is_rejected() {
    let store = MemoryPreferences::new();

    assert_eq!(
      update_username(&store, "   ").unwrap(),
      ProfileUpdate::Rejected("Username cannot be empty".to_string())
    );
    assert_eq!(load_profile(&store).unwrap().username, "Guest");
  }

  #[test]
  fn test_update_avatar_keeps_username() {
    let store = MemoryPreferences::new();
    update_username(&store, "Sari").unwrap();
    let url = avatar_data_url("image/png", &[0x89, 0x50, 0x4e, 0x47]);

    let ProfileUpdate::Saved(profile) = update_avatar(&store, &url).unwrap() else {
      panic!("expected the update to be saved");
    };

    assert_eq!(url, "data:image/png;base64,iVBORw==");
    assert_eq!(profile.username, "Sari");
    assert_eq!(profile.avatar.as_deref(), Some(url.as_str()));
  }

  #[test]
  fn test_non_image_avatar_is_rejected() {
    let store = MemoryPreferences::new();

    let update = update_avatar(&store, "data:text/plain;base64,aGk=").unwrap();

    assert!(matches!(update, ProfileUpdate::Rejected(_)));
    assert_eq!(load_profile(&store).unwrap().avatar, None);
  }
}
