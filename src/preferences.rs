use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::selection::SortDirection;

pub const PREFERENCE_KEY: &str = "sorting";

/// The last sort or filter choice. Only one form is stored at a time;
/// writing either replaces the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preference {
    #[serde(rename = "byDate")]
    ByDate(SortDirection),
    #[serde(rename = "byTags")]
    ByTags(Vec<String>),
}

impl Preference {
    pub fn decode(raw: &str) -> Result<Self, PreferenceError> {
        serde_json::from_str(raw).map_err(PreferenceError::Parse)
    }

    pub fn encode(&self) -> Result<String, PreferenceError> {
        serde_json::to_string(self).map_err(PreferenceError::Encode)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("stored preference is corrupt: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("could not encode preference: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("preference storage failed: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub trait PreferenceStore: Send {
    fn load(&self) -> Result<Option<Preference>, PreferenceError>;
    fn save(&self, preference: &Preference) -> Result<(), PreferenceError>;
}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    slot: Mutex<Option<String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw<S: Into<String>>(raw: S) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.slot.lock().clone()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn load(&self) -> Result<Option<Preference>, PreferenceError> {
        self.slot.lock().as_deref().map(Preference::decode).transpose()
    }

    fn save(&self, preference: &Preference) -> Result<(), PreferenceError> {
        *self.slot.lock() = Some(preference.encode()?);
        Ok(())
    }
}

impl<T: PreferenceStore + Sync> PreferenceStore for Arc<T> {
    fn load(&self) -> Result<Option<Preference>, PreferenceError> {
        (**self).load()
    }

    fn save(&self, preference: &Preference) -> Result<(), PreferenceError> {
        (**self).save(preference)
    }
}

#[derive(Debug, Clone)]
pub struct SqlitePreferences {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
}

impl SqlitePreferences {
    pub fn open(opts: Options) -> Result<Self> {
        let path = if let Some(path) = opts.path {
            path
        } else {
            default_path().context("storage: resolve default path")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("storage: create directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("storage: open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("storage: set WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .context("storage: set busy timeout")?;
        migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("storage: open in-memory database")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn close(self) -> Result<()> {
        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow!("storage: connection still in use"))?
            .into_inner();
        conn.close()
            .map_err(|(_, err)| err)
            .context("storage: close connection")
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
INSERT INTO preferences (key, value, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
  value = excluded.value,
  updated_at = excluded.updated_at
"#,
            params![key, value, unix_now()],
        )?;
        Ok(())
    }
}

impl PreferenceStore for SqlitePreferences {
    fn load(&self) -> Result<Option<Preference>, PreferenceError> {
        self.get_raw(PREFERENCE_KEY)?
            .as_deref()
            .map(Preference::decode)
            .transpose()
    }

    fn save(&self, preference: &Preference) -> Result<(), PreferenceError> {
        self.put_raw(PREFERENCE_KEY, &preference.encode()?)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
)
"#,
        [],
    )?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    for (idx, sql) in migrations().iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }
        conn.execute_batch(sql)
            .with_context(|| format!("storage: apply migration {version}"))?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, unix_now()],
        )?;
    }
    Ok(())
}

fn migrations() -> Vec<&'static str> {
    vec![
        r#"
CREATE TABLE IF NOT EXISTS preferences (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);
"#,
    ]
}

pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("post-feed").join("state.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn encodes_the_two_stored_forms() {
        assert_eq!(
            Preference::ByDate(SortDirection::Ascending).encode().unwrap(),
            r#"{"byDate":"asc"}"#
        );
        assert_eq!(
            Preference::ByTags(vec!["a".into(), "b".into()])
                .encode()
                .unwrap(),
            r#"{"byTags":["a","b"]}"#
        );
    }

    #[test]
    fn decodes_stored_forms() {
        assert_eq!(
            Preference::decode(r#"{"byDate":"desc"}"#).unwrap(),
            Preference::ByDate(SortDirection::Descending)
        );
        assert_eq!(
            Preference::decode(r#"{ "byTags": ["news"] }"#).unwrap(),
            Preference::ByTags(vec!["news".into()])
        );
    }

    #[test]
    fn corrupt_blobs_are_parse_errors() {
        for raw in ["{oops", "[]", r#"{"byDate":"sideways"}"#, r#"{"other":1}"#] {
            assert!(
                matches!(Preference::decode(raw), Err(PreferenceError::Parse(_))),
                "input {raw}"
            );
        }
    }

    #[test]
    fn encode_failures_are_not_reported_as_corruption() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let message = PreferenceError::Encode(source).to_string();
        assert!(message.starts_with("could not encode preference"));
        assert!(!message.contains("corrupt"));
    }

    #[test]
    fn memory_store_replaces_previous_form() {
        let store = MemoryPreferences::new();
        assert!(store.load().unwrap().is_none());
        store
            .save(&Preference::ByTags(vec!["rust".into()]))
            .unwrap();
        store
            .save(&Preference::ByDate(SortDirection::Ascending))
            .unwrap();
        assert_eq!(
            store.load().unwrap(),
            Some(Preference::ByDate(SortDirection::Ascending))
        );
        assert_eq!(store.raw().as_deref(), Some(r#"{"byDate":"asc"}"#));
    }

    #[test]
    fn open_on_disk_and_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.db");
        let store = SqlitePreferences::open(Options {
            path: Some(path.clone()),
        })
        .unwrap();
        assert!(path.exists());
        assert!(store.load().unwrap().is_none());

        store
            .save(&Preference::ByTags(vec!["a".into()]))
            .unwrap();
        store.close().unwrap();

        let reopened = SqlitePreferences::open(Options { path: Some(path) }).unwrap();
        assert_eq!(
            reopened.load().unwrap(),
            Some(Preference::ByTags(vec!["a".into()]))
        );
    }

    #[test]
    fn corrupt_row_surfaces_as_parse_error() {
        let store = SqlitePreferences::open_in_memory().unwrap();
        store.put_raw(PREFERENCE_KEY, "not json").unwrap();
        assert!(matches!(store.load(), Err(PreferenceError::Parse(_))));
    }
}
