use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use crate::client::{StravaActivity, StravaStats};

/// The single persisted cache blob: last successful payload plus the
/// rolling last-call timestamp that drives the rate-limit gate.
/// `last_api_call_at` is independent of payload freshness on purpose: a
/// call may be gated even when the cached payload is stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaCacheEntry {
    pub stats: StravaStats,
    pub activities: Vec<StravaActivity>,
    pub cached_at: DateTime<Utc>,
    pub last_api_call_at: DateTime<Utc>,
}

/// Persistent tier of the Strava cache.
/// Load failures are not fatal: a missing or unreadable blob behaves like
/// a cold cache.
pub trait CacheStore: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<StravaCacheEntry>>;
    fn save(&self, entry: &StravaCacheEntry) -> anyhow::Result<()>;
}

/// File-backed store, one JSON document at a fixed path
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> anyhow::Result<Option<StravaCacheEntry>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(error) => {
                // A corrupt blob is indistinguishable from a cold cache
                tracing::warn!(error = %error, path = %self.path.display(), "Discarding unreadable Strava cache");
                Ok(None)
            }
        }
    }

    fn save(&self, entry: &StravaCacheEntry) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(entry)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// In-memory store for tests
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entry: Mutex<Option<StravaCacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(entry: StravaCacheEntry) -> Self {
        Self {
            entry: Mutex::new(Some(entry)),
        }
    }

    pub fn entry(&self) -> Option<StravaCacheEntry> {
        self.entry.lock().unwrap().clone()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self) -> anyhow::Result<Option<StravaCacheEntry>> {
        Ok(self.entry.lock().unwrap().clone())
    }

    fn save(&self, entry: &StravaCacheEntry) -> anyhow::Result<()> {
        *self.entry.lock().unwrap() = Some(entry.clone());
        Ok(())
    }
}
