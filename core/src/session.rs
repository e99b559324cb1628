//! Durable local storage for the auth session.
//!
//! Two key-value entries survive process restarts: `token` (the opaque
//! bearer string) and `user` (the JSON-serialized [`AuthUser`]). Each key is
//! written atomically on its own; the pair is written best-effort
//! sequentially, so a crash between the two writes can leave one key stale.
//! That small inconsistency window is accepted and documented rather than
//! hidden behind a transaction the platform does not give us.

use anyhow::{Context, Result};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::AuthUser;

/// Durable key for the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Durable key for the serialized user record.
pub const USER_KEY: &str = "user";

/// Abstraction over the platform's durable key-value storage, so the auth
/// slice can be exercised against an in-memory double in tests.
pub trait SessionStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, atomically for this single key.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Serialize a user record for the `user` key.
pub fn encode_user(user: &AuthUser) -> Result<String> {
    serde_json::to_string(user).context("failed to serialize session user")
}

/// Parse the `user` key back into a user record.
pub fn decode_user(raw: &str) -> Result<AuthUser> {
    serde_json::from_str(raw).context("failed to parse stored session user")
}

/// File-backed store: one file per key inside a dedicated directory.
/// Writes go through a temp file plus rename so a torn write never leaves a
/// half-written value under the real key.
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create session dir {}", dir.display()))?;
        Ok(FileSessionStore { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read session key {key}")),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.tmp"));
        fs::write(&tmp, value).with_context(|| format!("failed to write session key {key}"))?;
        fs::rename(&tmp, &path).with_context(|| format!("failed to commit session key {key}"))?;
        debug!("session key '{key}' written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove session key {key}")),
        }
    }
}

/// In-memory store, used as a test double and for ephemeral preview builds
/// that should not persist a session.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}
