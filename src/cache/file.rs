//! Durable cache store backed by JSON files
//!
//! Each key is persisted as one JSON row in an XDG-compliant cache directory
//! (`~/.cache/footcache/` on Linux). Rows are written to a temporary file and
//! renamed into place, so readers never observe a half-written row and the
//! last concurrent writer wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CacheEntry, CacheStore, Clock, StoreError, SystemClock};
use crate::key::{make_key, EntityKey, EntityType};
use crate::normalize::NormalizedRecord;

/// Distinguishes temp files written by concurrent `put` calls
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Persisted row layout, one file per key
#[derive(Debug, Serialize, Deserialize)]
struct CacheRow {
    /// Entity type of the key
    entity: EntityType,
    /// Natural key columns, in `EntityType::key_parts` order
    natural_key: Vec<String>,
    /// The statistic kind, for team statistics rows
    stat_key: Option<String>,
    /// The normalized payload
    data: NormalizedRecord,
    /// When the row was cached
    cached_at: DateTime<Utc>,
    /// When the row stops being fresh
    expires_at: DateTime<Utc>,
}

/// Encodes an entry as a persisted JSON row
pub fn encode_row(entry: &CacheEntry) -> Result<String, StoreError> {
    let row = CacheRow {
        entity: entry.key.entity(),
        natural_key: entry.key.parts().to_vec(),
        stat_key: entry.key.part("stat_key").map(str::to_string),
        data: entry.payload.clone(),
        cached_at: entry.cached_at,
        expires_at: entry.expires_at,
    };
    Ok(serde_json::to_string_pretty(&row)?)
}

/// Decodes a persisted JSON row
///
/// Returns `None` if the row is malformed or its key does not rebuild.
pub fn decode_row(content: &str) -> Option<CacheEntry> {
    let row: CacheRow = serde_json::from_str(content).ok()?;
    let key = make_key(row.entity, &row.natural_key).ok()?;
    if row.data.entity() != key.entity() {
        return None;
    }
    Some(CacheEntry {
        key,
        payload: row.data,
        cached_at: row.cached_at,
        expires_at: row.expires_at,
    })
}

/// Stores cache rows as JSON files on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where rows are stored
    cache_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileStore {
    /// Creates a FileStore using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "footcache")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a FileStore rooted at a custom directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used to stamp and expire rows
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to the row file for the given key
    fn cache_path(&self, key: &EntityKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key.file_stem()))
    }

    fn temp_path(&self, key: &EntityKey) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.cache_dir
            .join(format!(".{}.{}.{}.tmp", key.file_stem(), std::process::id(), n))
    }

    fn read_row(path: &Path) -> Option<CacheEntry> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read cache row");
                return None;
            }
        };
        let entry = decode_row(&content);
        if entry.is_none() {
            warn!(path = %path.display(), "ignoring malformed cache row");
        }
        entry
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &EntityKey) -> Option<CacheEntry> {
        Self::read_row(&self.cache_path(key)).filter(|entry| entry.key == *key)
    }

    fn put(
        &self,
        key: &EntityKey,
        payload: &NormalizedRecord,
        ttl: Duration,
    ) -> Result<CacheEntry, StoreError> {
        let entry = CacheEntry::new(key, payload, self.clock.now(), ttl)?;
        let json = encode_row(&entry)?;

        fs::create_dir_all(&self.cache_dir)?;
        let temp = self.temp_path(key);
        let written = fs::write(&temp, json).and_then(|()| fs::rename(&temp, self.cache_path(key)));
        if let Err(e) = written {
            // A failed write can leave a partial temp file behind
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        debug!(key = %key, expires_at = %entry.expires_at, "wrote cache row");
        Ok(entry)
    }

    fn invalidate(&self, key: &EntityKey) -> Result<(), StoreError> {
        match fs::remove_file(self.cache_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn purge_expired(&self) -> Result<usize, StoreError> {
        let dir = match fs::read_dir(&self.cache_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let now = self.clock.now();
        let mut removed = 0;
        for dir_entry in dir {
            let path = dir_entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(entry) = Self::read_row(&path) else {
                continue;
            };
            if entry.is_fresh(now) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        debug!(removed, dir = %self.cache_dir.display(), "purged expired cache rows");
        Ok(removed)
    }
}
