//! Guest-mode session container.
//!
//! Guests never touch the record store. Their history lives under a single
//! key in a session-scoped key/value container that is discarded on logout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::types::{HistoryEntry, NewAnalysis, RecordId};

/// Key under which guest history is serialized.
pub const GUEST_HISTORY_KEY: &str = "analysis-history";

/// A string key/value container scoped to one session.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, SessionError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError>;

    fn remove_item(&self, key: &str) -> Result<(), SessionError>;
}

/// In-process container; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, SessionError> {
        let items = self.items.lock().map_err(|_| SessionError::Unavailable)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut items = self.items.lock().map_err(|_| SessionError::Unavailable)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), SessionError> {
        let mut items = self.items.lock().map_err(|_| SessionError::Unavailable)?;
        items.remove(key);
        Ok(())
    }
}

/// Container persisted as a JSON object in one file, so a guest session can
/// span several CLI invocations until `logout` deletes the file.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the whole session. Missing files are fine.
    pub fn destroy(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// A missing or corrupt session file reads as an empty session.
    fn read_all(&self) -> Result<HashMap<String, String>, SessionError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Discarding corrupt session file");
            HashMap::new()
        }))
    }

    fn write_all(&self, items: &HashMap<String, String>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(items)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl SessionStorage for FileSessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut items = self.read_all()?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), SessionError> {
        let mut items = self.read_all()?;
        if items.remove(key).is_some() {
            self.write_all(&items)?;
        }
        Ok(())
    }
}

/// Typed access to the guest history array stored under [`GUEST_HISTORY_KEY`].
#[derive(Clone)]
pub struct GuestHistory {
    storage: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for GuestHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestHistory").finish_non_exhaustive()
    }
}

impl GuestHistory {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Read the stored history, surfacing malformed content as an error.
    pub fn try_load(&self) -> Result<Vec<HistoryEntry>, SessionError> {
        match self.storage.get_item(GUEST_HISTORY_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Read the stored history. Missing or malformed content is an empty history.
    pub fn load(&self) -> Vec<HistoryEntry> {
        match self.try_load() {
            Ok(entries) => entries,
            Err(SessionError::MalformedLocalData(e)) => {
                debug!(error = %e, "Guest history is malformed, treating as empty");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Guest history unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    pub fn save(&self, entries: &[HistoryEntry]) -> Result<(), SessionError> {
        let raw = serde_json::to_string(entries)?;
        self.storage.set_item(GUEST_HISTORY_KEY, &raw)
    }

    /// Remove the history key entirely.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.storage.remove_item(GUEST_HISTORY_KEY)
    }

    /// Append a completed guest analysis, newest first.
    pub fn record(&self, analysis: &NewAnalysis) -> crate::error::Result<HistoryEntry> {
        analysis.validate()?;
        let entry = HistoryEntry {
            id: RecordId::generate(),
            input_text: analysis.input_text.clone(),
            techniques: analysis.techniques.clone(),
            timestamp: Utc::now(),
        };
        let mut entries = self.load();
        entries.insert(0, entry.clone());
        self.save(&entries)?;
        Ok(entry)
    }
}
