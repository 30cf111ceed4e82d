use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::model::TempoResult;

/// Entries older than this are treated as absent and evicted on read
pub const CACHE_TTL_DAYS: i64 = 7;

/// A cached tempo lookup plus the bookkeeping needed to expire it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub bpm: f64,
    pub confidence: f64,
    pub source: String,
    pub key: Option<String>,
    pub time_signature: Option<String>,
    pub cached_at: DateTime<Utc>,
    pub track_key: String,
}

impl CacheEntry {
    #[must_use]
    pub fn new(result: &TempoResult, track_key: String, cached_at: DateTime<Utc>) -> Self {
        Self {
            bpm: result.bpm,
            confidence: result.confidence,
            source: result.source.clone(),
            key: result.key.clone(),
            time_signature: result.time_signature.clone(),
            cached_at,
            track_key,
        }
    }

    fn to_result(&self) -> TempoResult {
        TempoResult {
            bpm: self.bpm,
            confidence: self.confidence,
            source: self.source.clone(),
            key: self.key.clone(),
            time_signature: self.time_signature.clone(),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.cached_at >= Duration::days(CACHE_TTL_DAYS)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub total: usize,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

enum Backend {
    File(pickledb::PickleDb),
    Memory(HashMap<String, CacheEntry>),
}

/// Expiring key/value store for tempo lookups, keyed by normalized
/// (artist, title).
///
/// Persistence is best-effort: a corrupt or unavailable file degrades to an
/// in-memory cache for the session rather than failing.
pub struct TempoCache {
    backend: Backend,
}

impl TempoCache {
    /// Open a file-backed cache. A missing or corrupt file degrades to a
    /// fresh store; individual dump failures are logged, not surfaced.
    #[must_use]
    pub fn open(path: &str) -> Self {
        let db = pickledb::PickleDb::load_json(path, pickledb::PickleDbDumpPolicy::AutoDump)
            .unwrap_or_else(|e| {
                debug!("No usable tempo cache at {path} ({e}), starting fresh");
                pickledb::PickleDb::new_json(path, pickledb::PickleDbDumpPolicy::AutoDump)
            });
        Self {
            backend: Backend::File(db),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(HashMap::new()),
        }
    }

    /// Normalized lookup key so "Daft Punk" and "daft punk " collide
    #[must_use]
    pub fn track_key(artist: &str, title: &str) -> String {
        format!(
            "{}::{}",
            artist.to_lowercase().trim(),
            title.to_lowercase().trim()
        )
    }

    /// Look up a cached tempo. Expired entries are evicted as a side effect
    /// and reported as absent.
    pub fn get(&mut self, artist: &str, title: &str) -> Option<TempoResult> {
        let key = Self::track_key(artist, title);
        let entry = self.read_entry(&key)?;

        if entry.is_expired(Utc::now()) {
            self.remove_entry(&key);
            return None;
        }

        Some(entry.to_result())
    }

    pub fn set(&mut self, artist: &str, title: &str, result: &TempoResult) {
        let key = Self::track_key(artist, title);
        let entry = CacheEntry::new(result, key.clone(), Utc::now());
        self.insert(key, entry);
    }

    /// Store a fully-specified entry. Exists so callers (and tests) can
    /// control `cached_at`; `set` is the everyday path.
    pub fn insert(&mut self, key: String, entry: CacheEntry) {
        match &mut self.backend {
            Backend::File(db) => {
                if let Err(e) = db.set(&key, &entry) {
                    warn!("Failed to persist tempo cache entry for {key}: {e}");
                }
            }
            Backend::Memory(map) => {
                map.insert(key, entry);
            }
        }
    }

    pub fn clear(&mut self) {
        match &mut self.backend {
            Backend::File(db) => {
                let keys = db.get_all();
                for key in keys {
                    db.rem(&key).ok();
                }
            }
            Backend::Memory(map) => map.clear(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entries: Vec<CacheEntry> = match &self.backend {
            Backend::File(db) => db
                .get_all()
                .iter()
                .filter_map(|k| db.get::<CacheEntry>(k))
                .collect(),
            Backend::Memory(map) => map.values().cloned().collect(),
        };

        CacheStats {
            total: entries.len(),
            oldest_entry: entries.iter().map(|e| e.cached_at).min(),
            newest_entry: entries.iter().map(|e| e.cached_at).max(),
        }
    }

    fn read_entry(&self, key: &str) -> Option<CacheEntry> {
        match &self.backend {
            Backend::File(db) => db.get(key),
            Backend::Memory(map) => map.get(key).cloned(),
        }
    }

    fn remove_entry(&mut self, key: &str) {
        match &mut self.backend {
            Backend::File(db) => {
                db.rem(key).ok();
            }
            Backend::Memory(map) => {
                map.remove(key);
            }
        }
    }
}
