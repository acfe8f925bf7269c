//! Persistent per-installation session IDs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::SessionResult;

/// Prefix of every generated session ID.
pub const SESSION_ID_PREFIX: &str = "sess_";

const RANDOM_LEN: usize = 8;

/// Local storage holding this installation's session ID.
///
/// The ID is generated on first use and then reused across logins, so one
/// device always maps to one session record.
pub trait SessionIdStore: Send + Sync {
    /// Stored ID, generating and persisting one if absent.
    fn get_or_create(&self) -> SessionResult<String>;
}

/// Generate `sess_<8 random base36 chars><millis in base36>`.
pub fn generate_session_id() -> String {
    let random = to_base36(uuid::Uuid::new_v4().as_u128());
    let random: String = random.chars().take(RANDOM_LEN).collect();
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u128;
    format!("{}{:0>width$}{}", SESSION_ID_PREFIX, random, to_base36(millis), width = RANDOM_LEN)
}

fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Session ID kept in a small text file.
#[derive(Debug)]
pub struct FileSessionIdStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionIdStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionIdStore for FileSessionIdStore {
    fn get_or_create(&self) -> SessionResult<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.path.exists() {
            let stored = fs::read_to_string(&self.path)?;
            let stored = stored.trim();
            if !stored.is_empty() {
                return Ok(stored.to_string());
            }
        }

        let id = generate_session_id();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, &id)?;
        tracing::info!(path = %self.path.display(), "generated session id");
        Ok(id)
    }
}

/// Session ID held in memory; lives as long as the store.
#[derive(Debug, Default)]
pub struct MemorySessionIdStore {
    id: Mutex<Option<String>>,
}

impl MemorySessionIdStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known ID.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Mutex::new(Some(id.into())),
        }
    }
}

impl SessionIdStore for MemorySessionIdStore {
    fn get_or_create(&self) -> SessionResult<String> {
        let mut id = self.id.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(id.get_or_insert_with(generate_session_id).clone())
    }
}
