//! Caller-owned memoization of [`compute`] results.
//!
//! The engine itself keeps no state between runs. A caller that recomputes
//! on unchanged inputs can hold a [`ResultCache`] keyed by a content hash of
//! both tables and the config, so a changed file or setting always misses.

use crate::engine::{ComputeOutput, compute};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::parser::RecordTable;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

fn hash_table(hasher: &mut Sha256, table: &RecordTable) {
    // Length prefixes keep ("ab", "c") distinct from ("a", "bc").
    let mut field = |s: &str| {
        hasher.update((s.len() as u64).to_le_bytes());
        hasher.update(s.as_bytes());
    };
    field(&table.headers.len().to_string());
    for h in &table.headers {
        field(h);
    }
    field(&table.rows.len().to_string());
    for row in &table.rows {
        field(&row.len().to_string());
        for cell in row {
            field(cell);
        }
    }
}

impl CacheKey {
    pub fn of(registry: &RecordTable, readings: &RecordTable, config: &EngineConfig) -> Self {
        let mut hasher = Sha256::new();
        hash_table(&mut hasher, registry);
        hash_table(&mut hasher, readings);
        hasher.update(format!("{config:?}").as_bytes());
        let digest = hasher.finalize();
        Self(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub trait ResultCache {
    fn get(&mut self, key: &CacheKey) -> Option<ComputeOutput>;
    fn put(&mut self, key: CacheKey, output: ComputeOutput);
}

/// In-process cache with an optional time-to-live.
#[derive(Debug, Default)]
pub struct MemoryCache {
    ttl: Option<Duration>,
    entries: HashMap<CacheKey, (Instant, ComputeOutput)>,
}

impl MemoryCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl ResultCache for MemoryCache {
    fn get(&mut self, key: &CacheKey) -> Option<ComputeOutput> {
        let (stored_at, output) = self.entries.get(key)?;
        if let Some(ttl) = self.ttl {
            if stored_at.elapsed() > ttl {
                self.entries.remove(key);
                return None;
            }
        }
        Some(output.clone())
    }

    /// Stores `output` and evicts every entry whose TTL has run out.
    fn put(&mut self, key: CacheKey, output: ComputeOutput) {
        if let Some(ttl) = self.ttl {
            self.entries.retain(|_, (stored_at, _)| stored_at.elapsed() <= ttl);
        }
        self.entries.insert(key, (Instant::now(), output));
    }
}

/// [`compute`] behind a cache lookup. Errors are never cached.
pub fn compute_cached(
    cache: &mut impl ResultCache,
    registry: &RecordTable,
    readings: &RecordTable,
    config: &EngineConfig,
) -> Result<ComputeOutput, EngineError> {
    let key = CacheKey::of(registry, readings, config);
    if let Some(hit) = cache.get(&key) {
        debug!(key = key.as_str(), "Cache hit");
        return Ok(hit);
    }
    debug!(key = key.as_str(), "Cache miss");
    let output = compute(registry, readings, config)?;
    cache.put(key, output.clone());
    Ok(output)
}
