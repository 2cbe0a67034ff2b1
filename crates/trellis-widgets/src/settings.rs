#![forbid(unsafe_code)]

//! Hierarchically-keyed settings persistence.
//!
//! Keys are path strings like `"MainWindow/Splitter/Sizes"`. Entries put
//! with [`Settings::put_expiring`] carry their write time and are pruned on
//! load once older than the configured expiry; plain entries live forever.
//!
//! [`MemorySettings`] is the always-available in-memory store;
//! [`FileSettings`] (feature `state-persistence`) adds a JSON file backend.

use std::fmt;
use std::time::Duration;

use ahash::AHashMap;
use web_time::SystemTime;

/// Errors from settings stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Keys must be non-empty and free of `=` and line breaks.
    InvalidKey(String),
    /// Reading or writing the backing file failed.
    Io(String),
    /// The backing file was not valid settings data.
    Format(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "invalid settings key: '{key}'"),
            Self::Io(message) => write!(f, "settings io error: {message}"),
            Self::Format(message) => write!(f, "settings format error: {message}"),
        }
    }
}

impl std::error::Error for SettingsError {}

fn check_key(key: &str) -> Result<(), SettingsError> {
    if key.is_empty() || key.contains('=') || key.contains('\n') || key.contains('\r') {
        return Err(SettingsError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Key/value persistence with optional per-entry expiry.
pub trait Settings {
    fn get(&self, key: &str) -> Option<String>;

    /// The write time of an *expiring* entry.
    fn timestamp(&self, key: &str) -> Option<SystemTime>;

    fn put(&mut self, key: &str, value: &str) -> Result<(), SettingsError>;

    /// Store a value that expires once it has not been rewritten for the
    /// store's expiry duration.
    fn put_expiring(&mut self, key: &str, value: &str) -> Result<(), SettingsError>;

    fn remove(&mut self, key: &str) -> Result<(), SettingsError>;

    /// Load from the backing store, pruning expired entries.
    fn load(&mut self) -> Result<(), SettingsError>;

    /// Persist to the backing store.
    fn save(&self) -> Result<(), SettingsError>;
}

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    written: SystemTime,
    expiring: bool,
}

// ---------------------------------------------------------------------------
// MemorySettings
// ---------------------------------------------------------------------------

/// In-memory settings store; `load`/`save` only prune and validate.
#[derive(Debug)]
pub struct MemorySettings {
    entries: AHashMap<String, Entry>,
    expiry: Duration,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySettings {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: AHashMap::new(),
            // Session state older than a month is not worth restoring.
            expiry: Duration::from_secs(60 * 60 * 24 * 30),
        }
    }

    #[must_use]
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn set_expiry(&mut self, expiry: Duration) {
        self.expiry = expiry;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune_expired(&mut self) {
        let now = SystemTime::now();
        let expiry = self.expiry;
        self.entries.retain(|_, entry| {
            if !entry.expiring {
                return true;
            }
            match now.duration_since(entry.written) {
                Ok(age) => age <= expiry,
                // A write time in the future is kept; the clock moved.
                Err(_) => true,
            }
        });
    }

    fn put_entry(&mut self, key: &str, value: &str, expiring: bool) -> Result<(), SettingsError> {
        check_key(key)?;
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                written: SystemTime::now(),
                expiring,
            },
        );
        Ok(())
    }

    #[cfg(feature = "state-persistence")]
    fn to_stored(&self) -> Vec<StoredEntry> {
        let mut stored: Vec<StoredEntry> = self
            .entries
            .iter()
            .map(|(key, entry)| StoredEntry {
                key: key.clone(),
                value: entry.value.clone(),
                written_unix_secs: entry
                    .written
                    .duration_since(web_time::UNIX_EPOCH)
                    .map(|age| age.as_secs())
                    .unwrap_or(0),
                expiring: entry.expiring,
            })
            .collect();
        stored.sort_by(|a, b| a.key.cmp(&b.key));
        stored
    }

    #[cfg(feature = "state-persistence")]
    fn replace_from_stored(&mut self, stored: Vec<StoredEntry>) {
        self.entries = stored
            .into_iter()
            .map(|entry| {
                (
                    entry.key,
                    Entry {
                        value: entry.value,
                        written: web_time::UNIX_EPOCH
                            + Duration::from_secs(entry.written_unix_secs),
                        expiring: entry.expiring,
                    },
                )
            })
            .collect();
    }
}

impl Settings for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    fn timestamp(&self, key: &str) -> Option<SystemTime> {
        self.entries
            .get(key)
            .filter(|entry| entry.expiring)
            .map(|entry| entry.written)
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.put_entry(key, value, false)
    }

    fn put_expiring(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.put_entry(key, value, true)
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        check_key(key)?;
        self.entries.remove(key);
        Ok(())
    }

    fn load(&mut self) -> Result<(), SettingsError> {
        self.prune_expired();
        Ok(())
    }

    fn save(&self) -> Result<(), SettingsError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileSettings
// ---------------------------------------------------------------------------

#[cfg(feature = "state-persistence")]
#[derive(serde::Serialize, serde::Deserialize)]
struct StoredEntry {
    key: String,
    value: String,
    written_unix_secs: u64,
    expiring: bool,
}

/// JSON-file-backed settings store.
#[cfg(feature = "state-persistence")]
#[derive(Debug)]
pub struct FileSettings {
    memory: MemorySettings,
    path: std::path::PathBuf,
}

#[cfg(feature = "state-persistence")]
impl FileSettings {
    #[must_use]
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            memory: MemorySettings::new(),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn set_expiry(&mut self, expiry: Duration) {
        self.memory.set_expiry(expiry);
    }
}

#[cfg(feature = "state-persistence")]
impl Settings for FileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.memory.get(key)
    }

    fn timestamp(&self, key: &str) -> Option<SystemTime> {
        self.memory.timestamp(key)
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.memory.put(key, value)
    }

    fn put_expiring(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.memory.put_expiring(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        self.memory.remove(key)
    }

    fn load(&mut self) -> Result<(), SettingsError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                // First run: nothing stored yet.
                self.memory.entries.clear();
                return Ok(());
            }
            Err(err) => return Err(SettingsError::Io(err.to_string())),
        };
        let stored: Vec<StoredEntry> =
            serde_json::from_str(&data).map_err(|err| SettingsError::Format(err.to_string()))?;
        self.memory.replace_from_stored(stored);
        self.memory.prune_expired();
        Ok(())
    }

    fn save(&self) -> Result<(), SettingsError> {
        let stored = self.memory.to_stored();
        let data = serde_json::to_string_pretty(&stored)
            .map_err(|err| SettingsError::Format(err.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| SettingsError::Io(err.to_string()))?;
            }
        }
        std::fs::write(&self.path, data).map_err(|err| SettingsError::Io(err.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
