//! Recent topics and bookmarked topics, persisted through a small string
//! key-value store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};
use worldpulse_common::{Result, WorldPulseError};

pub const HISTORY_KEY: &str = "WP_TOPIC_HISTORY";
pub const BOOKMARK_KEY: &str = "WP_TOPIC_BOOKMARKS";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: String) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// All keys in one JSON object on disk. The file is read once on open and
/// replaced in full on every `set`. The in-memory map only changes once the
/// new file is in place.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values: HashMap<String, String> = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                WorldPulseError::Store(format!("failed to read {}: {e}", path.display()))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                WorldPulseError::Store(format!("failed to parse {}: {e}", path.display()))
            })?
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), keys = values.len(), "Opened state file");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a sibling temp file, then renames it over the target.
    fn replace_file(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                WorldPulseError::Store(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| {
            WorldPulseError::Store(format!("failed to write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            WorldPulseError::Store(format!("failed to replace {}: {e}", self.path.display()))
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = values.clone();
        next.insert(key.to_string(), value);
        let content = serde_json::to_string_pretty(&next)
            .map_err(|e| WorldPulseError::Store(e.to_string()))?;
        self.replace_file(&content)?;
        *values = next;
        Ok(())
    }
}

pub struct TopicHistory<S> {
    store: S,
    max_entries: usize,
}

impl<S: KeyValueStore> TopicHistory<S> {
    pub fn new(store: S, max_entries: usize) -> Self {
        Self { store, max_entries }
    }

    /// Move `topic` to the front, dropping any case-insensitive duplicate.
    pub fn push(&self, topic: &str) -> Result<()> {
        let mut entries = self.load(HISTORY_KEY)?;
        entries.retain(|t| !same_topic(t, topic));
        entries.insert(0, topic.to_string());
        entries.truncate(self.max_entries);
        self.save(HISTORY_KEY, &entries)
    }

    pub fn entries(&self) -> Result<Vec<String>> {
        self.load(HISTORY_KEY)
    }

    /// Returns whether `topic` is bookmarked afterwards.
    pub fn toggle_bookmark(&self, topic: &str) -> Result<bool> {
        let mut bookmarks = self.load(BOOKMARK_KEY)?;
        let bookmarked = match bookmarks.iter().position(|t| same_topic(t, topic)) {
            Some(idx) => {
                bookmarks.remove(idx);
                false
            }
            None => {
                bookmarks.insert(0, topic.to_string());
                true
            }
        };
        self.save(BOOKMARK_KEY, &bookmarks)?;
        Ok(bookmarked)
    }

    pub fn bookmarks(&self) -> Result<Vec<String>> {
        self.load(BOOKMARK_KEY)
    }

    pub fn is_bookmarked(&self, topic: &str) -> Result<bool> {
        if topic.is_empty() {
            return Ok(false);
        }
        Ok(self.load(BOOKMARK_KEY)?.iter().any(|t| same_topic(t, topic)))
    }

    /// A corrupt stored list reads as empty rather than failing.
    fn load(&self, key: &str) -> Result<Vec<String>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Option<Vec<String>>>(&raw) {
            Ok(list) => Ok(list.unwrap_or_default()),
            Err(e) => {
                warn!(key, error = %e, "Ignoring unreadable stored list");
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, key: &str, list: &[String]) -> Result<()> {
        let raw = serde_json::to_string(list).map_err(|e| WorldPulseError::Store(e.to_string()))?;
        self.store.set(key, raw)
    }
}

fn same_topic(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
