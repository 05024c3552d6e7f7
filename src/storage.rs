use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec;

/// Named documents persisted between sessions. Each slot holds one
/// codec-encoded JSON document that is rewritten wholesale on every save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Email -> outreach status ledger. Survives an app reset.
    Tracking,
    /// Append-only upload batch log. Survives an app reset.
    Batches,
    /// Session contact list cache. Cleared on reset.
    ContactsCache,
    /// Session generated-message cache. Cleared on reset.
    MessagesCache,
}

impl Slot {
    fn key(self) -> &'static str {
        match self {
            Slot::Tracking => "outreach_tracking_v2",
            Slot::Batches => "outreach_batches",
            Slot::ContactsCache => "outreach_contacts_cache",
            Slot::MessagesCache => "outreach_messages_cache",
        }
    }
}

/// Slot store over a single SQLite table in the app data dir.
///
/// All access is synchronous and whole-document, last-writer-wins; the store
/// assumes a single writer (one app instance). Load failures of any kind fall
/// back to the caller's default so a corrupt cache can never break startup.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

fn default_db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "example", "OutreachGtk")?;
    Some(proj.data_dir().join("slots.sqlite"))
}

fn ensure_dir(path: &PathBuf) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

impl Store {
    pub fn open_default() -> Result<Self, String> {
        let path = default_db_path().ok_or_else(|| "no data dir".to_string())?;
        Self::open_at(path)
    }

    pub fn open_at(path: PathBuf) -> Result<Self, String> {
        let store = Self { path };
        store.init()?;
        Ok(store)
    }

    fn conn(&self) -> rusqlite::Result<Connection> {
        let _ = ensure_dir(&self.path);
        Connection::open(&self.path)
    }

    fn init(&self) -> Result<(), String> {
        let conn = self.conn().map_err(|e| e.to_string())?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Read a slot, falling back to `default` on absence, storage errors, or
    /// a payload the codec cannot decode. Never surfaces an error to callers.
    pub fn load<T: DeserializeOwned>(&self, slot: Slot, default: T) -> T {
        let payload = match self.raw_payload(slot) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("slot {} read failed: {e}", slot.key());
                return default;
            }
        };
        match payload {
            Some(text) => match codec::decode(&text) {
                Some(value) => value,
                None => {
                    log::warn!("slot {} holds an undecodable payload, using default", slot.key());
                    default
                }
            },
            None => default,
        }
    }

    fn raw_payload(&self, slot: Slot) -> Result<Option<String>, String> {
        let conn = self.conn().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare("SELECT payload FROM slots WHERE key = ?1")
            .map_err(|e| e.to_string())?;
        stmt.query_row(params![slot.key()], |row| row.get(0))
            .optional()
            .map_err(|e| e.to_string())
    }

    pub fn save<T: Serialize>(&self, slot: Slot, value: &T) -> Result<(), String> {
        let payload = codec::encode(value).ok_or_else(|| "codec encode failed".to_string())?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| e.to_string())?
            .as_secs() as i64;
        let conn = self.conn().map_err(|e| e.to_string())?;
        conn.execute(
            r#"
            INSERT INTO slots (key, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                payload=excluded.payload,
                updated_at=excluded.updated_at
            "#,
            params![slot.key(), payload, now],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn clear(&self, slot: Slot) -> Result<(), String> {
        let conn = self.conn().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM slots WHERE key = ?1", params![slot.key()])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(dir.path().join("slots.sqlite")).unwrap();
        (dir, store)
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, store) = temp_store();
        store.save(Slot::ContactsCache, &vec!["a".to_string(), "b".to_string()]).unwrap();
        let loaded: Vec<String> = store.load(Slot::ContactsCache, Vec::new());
        assert_eq!(loaded, vec!["a", "b"]);
    }

    #[test]
    fn missing_slot_yields_default() {
        let (_dir, store) = temp_store();
        let loaded: Vec<String> = store.load(Slot::MessagesCache, vec!["fallback".to_string()]);
        assert_eq!(loaded, vec!["fallback"]);
    }

    #[test]
    fn save_rewrites_whole_document() {
        let (_dir, store) = temp_store();
        store.save(Slot::Batches, &vec![1, 2, 3]).unwrap();
        store.save(Slot::Batches, &vec![9]).unwrap();
        let loaded: Vec<i32> = store.load(Slot::Batches, Vec::new());
        assert_eq!(loaded, vec![9]);
    }

    #[test]
    fn corrupt_payload_yields_default() {
        let (_dir, store) = temp_store();
        store.save(Slot::Tracking, &vec![1, 2]).unwrap();
        let conn = Connection::open(store.path.clone()).unwrap();
        conn.execute(
            "UPDATE slots SET payload = 'definitely not encoded' WHERE key = ?1",
            params![Slot::Tracking.key()],
        )
        .unwrap();
        let loaded: Vec<i32> = store.load(Slot::Tracking, Vec::new());
        assert!(loaded.is_empty());
    }

    #[test]
    fn clear_removes_only_that_slot() {
        let (_dir, store) = temp_store();
        store.save(Slot::ContactsCache, &vec![1]).unwrap();
        store.save(Slot::Tracking, &vec![2]).unwrap();
        store.clear(Slot::ContactsCache).unwrap();
        let contacts: Vec<i32> = store.load(Slot::ContactsCache, Vec::new());
        let tracking: Vec<i32> = store.load(Slot::Tracking, Vec::new());
        assert!(contacts.is_empty());
        assert_eq!(tracking, vec![2]);
    }
}
