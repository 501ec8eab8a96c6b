//! Preference storage trait and its SQLite and in-memory implementations.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Key-value storage for JSON preferences.
pub trait PreferenceStore: Send + Sync {
  /// Read a value. Missing and unparseable values are both `None`.
  fn get(&self, key: &str) -> Result<Option<Value>>;

  /// Write a value, replacing any previous one.
  fn set(&self, key: &str, value: &Value) -> Result<()>;
}

/// SQLite-backed preferences.
pub struct SqlitePreferences {
  conn: Mutex<Connection>,
}

impl SqlitePreferences {
  /// Open (or create) the preferences database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create preferences directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open preferences at {}: {}", path.display(), e))?;

    let prefs = Self {
      conn: Mutex::new(conn),
    };
    prefs.run_migrations()?;

    Ok(prefs)
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(PREFERENCES_SCHEMA)
      .map_err(|e| eyre!("Failed to run preferences migrations: {}", e))?;

    Ok(())
  }

  /// Stored text for `key`, without parsing it.
  fn get_raw(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM preferences WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read preference {}: {}", key, e))
  }

  fn set_raw(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT INTO preferences (key, value, updated_at) VALUES (?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, Utc::now().to_rfc3339()],
      )
      .map_err(|e| eyre!("Failed to store preference {}: {}", key, e))?;

    Ok(())
  }
}

const PREFERENCES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

impl PreferenceStore for SqlitePreferences {
  fn get(&self, key: &str) -> Result<Option<Value>> {
    Ok(self.get_raw(key)?.and_then(|raw| parse_value(key, &raw)))
  }

  fn set(&self, key: &str, value: &Value) -> Result<()> {
    debug!(key, "storing preference");
    self.set_raw(key, &value.to_string())
  }
}

/// Preferences kept in memory for the lifetime of the process.
#[derive(Default)]
pub struct MemoryPreferences {
  values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store text as-is, bypassing serialization.
  pub fn insert_raw(&self, key: &str, raw: &str) -> Result<()> {
    self
      .values
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?
      .insert(key.to_string(), raw.to_string());
    Ok(())
  }
}

impl PreferenceStore for MemoryPreferences {
  fn get(&self, key: &str) -> Result<Option<Value>> {
    let values = self
      .values
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(values.get(key).and_then(|raw| parse_value(key, raw)))
  }

  fn set(&self, key: &str, value: &Value) -> Result<()> {
    self.insert_raw(key, &value.to_string())
  }
}

fn parse_value(key: &str, raw: &str) -> Option<Value> {
  match serde_json::from_str(raw) {
    Ok(value) => Some(value),
    Err(e) => {
      warn!(key, error = %e, "ignoring unreadable preference");
      None
    }
  }
}
