use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use tracing::warn;

pub const HISTORY_KEY: &str = "commandHistory";
pub const SOUND_KEY: &str = "soundEnabled";

/// Durable string key-value storage
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// JSON object on disk, rewritten on every `set`
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("ignoring unreadable storage file {}: {}", path.display(), e);
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, values })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// In-memory store
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub values: BTreeMap<String, String>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The two persisted preferences: command history and the sound flag
pub struct Preferences<S> {
    store: S,
}

impl<S: KeyValueStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load_history(&self) -> Vec<String> {
        let Some(raw) = self.store.get(HISTORY_KEY) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("discarding unreadable command history: {}", e);
            Vec::new()
        })
    }

    pub fn load_sound(&self) -> bool {
        self.store.get(SOUND_KEY).as_deref() == Some("true")
    }

    pub fn save_history(&mut self, history: &[String]) -> Result<()> {
        let value = serde_json::to_string(history)?;
        self.store.set(HISTORY_KEY, &value)
    }

    pub fn save_sound(&mut self, enabled: bool) -> Result<()> {
        self.store.set(SOUND_KEY, if enabled { "true" } else { "false" })
    }
}
