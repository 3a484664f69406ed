//! Persistence adapter: a tiny SQLite key-value store. The only key the
//! application uses is [`LAST_KEY`], the most recently picked root.

use anyhow::Result;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::fs::DirHandle;

pub const LAST_KEY: &str = "last";

#[derive(Clone)]
pub struct HandleStore(Arc<Mutex<Connection>>);

impl HandleStore {
    pub fn open(path: &Path) -> Result<Self> {
        log::debug!("opening store: {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        migrate(&conn)?;
        Ok(Self(Arc::new(Mutex::new(conn))))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self(Arc::new(Mutex::new(conn))))
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-query;
        // the connection itself is still usable.
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or overwrite `key`.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO handles (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = datetime('now')",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row("SELECT value FROM handles WHERE key = ?1", [key], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Insert or overwrite `key` with raw bytes, stored as a BLOB.
    pub fn put_bytes(&self, key: &str, value: &[u8]) -> Result<()> {
        self.conn().execute(
            "INSERT INTO handles (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = datetime('now')",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    /// Raw bytes of `key`, whether it was stored as text or BLOB.
    pub fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn()
            .query_row("SELECT value FROM handles WHERE key = ?1", [key], |r| {
                Ok(match r.get_ref(0)? {
                    ValueRef::Blob(b) | ValueRef::Text(b) => b.to_vec(),
                    _ => Vec::new(),
                })
            })
            .optional()?;
        Ok(value)
    }

    /// Remember `dir` byte for byte, so roots that aren't valid UTF-8
    /// come back unchanged.
    pub fn save_last(&self, dir: &DirHandle) -> Result<()> {
        self.put_bytes(LAST_KEY, &path_to_bytes(dir.path()))
    }

    /// The last saved root. Read errors are logged and treated as "none".
    pub fn last(&self) -> Option<DirHandle> {
        match self.get_bytes(LAST_KEY) {
            Ok(v) => v
                .filter(|b| !b.is_empty())
                .map(|b| DirHandle::new(path_from_bytes(b))),
            Err(e) => {
                log::warn!("store: cannot read {:?}: {}", LAST_KEY, e);
                None
            }
        }
    }
}

#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS handles (
            key           TEXT PRIMARY KEY,
            value         TEXT NOT NULL,
            updated_at    TEXT DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}
