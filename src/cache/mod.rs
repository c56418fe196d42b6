//! Three-tier result cache.
//!
//! Lookups go fast in-process map, then an optional shared external
//! cache, then an on-disk SQLite fallback at `~/.sqlloom/cache.db`;
//! writes go through all configured tiers. Each category carries its own
//! TTL: extraction results and dimension values survive schema-stable
//! restarts, generated SQL expires quickly because schema defaults can
//! change underneath it.

mod hash;
pub use hash::{compute_hash, sql_cache_key};

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

/// Bump when the on-disk format changes; a mismatch clears the disk tier.
const CACHE_VERSION: i32 = 1;

/// Errors from cache operations. Callers treat all of them as misses.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to determine cache directory")]
    NoCacheDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// What kind of value an entry holds. TTLs are per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Entity/LLM extraction results.
    Extraction,
    /// Discovered dimension value sets.
    DimensionValues,
    /// Generated SQL text.
    GeneratedSql,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Extraction,
        Category::DimensionValues,
        Category::GeneratedSql,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Extraction => "extraction",
            Category::DimensionValues => "dimension_values",
            Category::GeneratedSql => "generated_sql",
        }
    }

    pub fn default_ttl(&self) -> Duration {
        match self {
            Category::Extraction => Duration::from_secs(3600),
            Category::DimensionValues => Duration::from_secs(5400),
            Category::GeneratedSql => Duration::from_secs(600),
        }
    }

    fn index(&self) -> usize {
        match self {
            Category::Extraction => 0,
            Category::DimensionValues => 1,
            Category::GeneratedSql => 2,
        }
    }
}

/// An external shared cache tier (e.g. a network cache fronting several
/// processes). Failures must be absorbed as misses, never surfaced.
/// `get` reports the entry's remaining TTL so upper tiers expire it at
/// the same moment instead of restarting the clock.
pub trait SharedCache: Send + Sync {
    fn get(&self, category: Category, key: &str) -> Option<(String, Duration)>;
    fn put(&self, category: Category, key: &str, value: &str, ttl: Duration);
}

/// Per-category hit/miss/eviction counters.
#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// A point-in-time view of one category's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

struct DiskTier {
    conn: Connection,
}

impl DiskTier {
    fn open(path: &PathBuf) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let tier = Self { conn };
        tier.init()?;
        Ok(tier)
    }

    fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        let tier = Self { conn };
        tier.init()?;
        Ok(tier)
    }

    fn init(&self) -> CacheResult<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS cache (
                category TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                PRIMARY KEY (category, key)
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let version: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match version {
            Some(v) if v == CACHE_VERSION.to_string() => {}
            _ => {
                self.conn.execute("DELETE FROM cache", [])?;
                self.conn.execute(
                    "INSERT OR REPLACE INTO meta (key, value) VALUES ('version', ?1)",
                    params![CACHE_VERSION.to_string()],
                )?;
            }
        }
        Ok(())
    }

    fn get(&self, category: Category, key: &str) -> CacheResult<Option<(String, Duration)>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT value, expires_at FROM cache WHERE category = ?1 AND key = ?2",
                params![category.name(), key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let now = unix_now();
        match row {
            Some((value, expires_at)) if expires_at > now => {
                let remaining = Duration::from_secs((expires_at - now) as u64);
                Ok(Some((value, remaining)))
            }
            Some(_) => {
                self.conn.execute(
                    "DELETE FROM cache WHERE category = ?1 AND key = ?2",
                    params![category.name(), key],
                )?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, category: Category, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cache (category, key, value, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                category.name(),
                key,
                value,
                unix_now() + ttl.as_secs() as i64
            ],
        )?;
        Ok(())
    }

    fn clear(&self, category: Category) -> CacheResult<()> {
        self.conn.execute(
            "DELETE FROM cache WHERE category = ?1",
            params![category.name()],
        )?;
        Ok(())
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// The three-tier cache.
pub struct ResultCache {
    memory: DashMap<(Category, String), MemoryEntry>,
    shared: Option<Arc<dyn SharedCache>>,
    disk: Option<Mutex<DiskTier>>,
    counters: [Counters; 3],
}

impl ResultCache {
    /// Memory-only cache, no shared or disk tier.
    pub fn in_process() -> Self {
        Self {
            memory: DashMap::new(),
            shared: None,
            disk: None,
            counters: Default::default(),
        }
    }

    /// Cache with the on-disk tier at `~/.sqlloom/cache.db`.
    pub fn open() -> CacheResult<Self> {
        let base = dirs::home_dir().ok_or(CacheError::NoCacheDir)?;
        let path = base.join(".sqlloom").join("cache.db");
        let disk = DiskTier::open(&path)?;
        Ok(Self {
            memory: DashMap::new(),
            shared: None,
            disk: Some(Mutex::new(disk)),
            counters: Default::default(),
        })
    }

    /// Cache with an in-memory SQLite disk tier, for tests.
    pub fn open_in_memory() -> CacheResult<Self> {
        let disk = DiskTier::open_in_memory()?;
        Ok(Self {
            memory: DashMap::new(),
            shared: None,
            disk: Some(Mutex::new(disk)),
            counters: Default::default(),
        })
    }

    pub fn with_shared(mut self, shared: Arc<dyn SharedCache>) -> Self {
        self.shared = Some(shared);
        self
    }

    /// Look a value up, checking each tier in order and repopulating the
    /// in-process tier on a lower-tier hit.
    pub fn get<T: DeserializeOwned>(&self, category: Category, key: &str) -> Option<T> {
        if let Some(raw) = self.get_raw(category, key) {
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    self.counters[category.index()].hits.fetch_add(1, Ordering::Relaxed);
                    return Some(value);
                }
                Err(e) => {
                    warn!(category = category.name(), key, error = %e, "discarding undeserializable cache entry");
                }
            }
        }
        self.counters[category.index()].misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn get_raw(&self, category: Category, key: &str) -> Option<String> {
        let map_key = (category, key.to_string());
        if let Some(entry) = self.memory.get(&map_key) {
            if entry.expires_at > Instant::now() {
                return Some(entry.value.clone());
            }
            drop(entry);
            self.memory.remove(&map_key);
            self.counters[category.index()]
                .evictions
                .fetch_add(1, Ordering::Relaxed);
        }

        if let Some(shared) = &self.shared {
            if let Some((value, remaining)) = shared.get(category, key) {
                // Repopulate with the remaining TTL; a fresh one would
                // extend the entry's life past what it was stored with.
                self.store_memory(category, key, &value, remaining);
                return Some(value);
            }
        }

        if let Some(disk) = &self.disk {
            let Ok(disk) = disk.lock() else {
                return None;
            };
            match disk.get(category, key) {
                Ok(Some((value, remaining))) => {
                    self.store_memory(category, key, &value, remaining);
                    return Some(value);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(category = category.name(), key, error = %e, "disk cache read failed");
                }
            }
        }
        None
    }

    /// Write-through put into every configured tier.
    pub fn put<T: Serialize>(&self, category: Category, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(category = category.name(), key, error = %e, "value not cacheable");
                return;
            }
        };

        self.store_memory(category, key, &raw, ttl);

        if let Some(shared) = &self.shared {
            shared.put(category, key, &raw, ttl);
        }
        if let Some(disk) = &self.disk {
            if let Ok(disk) = disk.lock() {
                if let Err(e) = disk.put(category, key, &raw, ttl) {
                    warn!(category = category.name(), key, error = %e, "disk cache write failed");
                }
            }
        }
    }

    fn store_memory(&self, category: Category, key: &str, value: &str, ttl: Duration) {
        self.memory.insert(
            (category, key.to_string()),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop everything in one category, across tiers.
    pub fn clear(&self, category: Category) {
        self.memory.retain(|(cat, _), _| *cat != category);
        if let Some(disk) = &self.disk {
            if let Ok(disk) = disk.lock() {
                if let Err(e) = disk.clear(category) {
                    warn!(category = category.name(), error = %e, "disk cache clear failed");
                }
            }
        }
    }

    pub fn stats(&self, category: Category) -> CacheStats {
        let counters = &self.counters[category.index()];
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            evictions: counters.evictions.load(Ordering::Relaxed),
        }
    }
}
