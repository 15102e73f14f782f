//! Vertex-format registry.
//!
//! Formats are keyed by [`MeshFormat::hash_key`]; equal keys share a single
//! `Arc`. The registry is an ordinary value passed to the linker, so callers
//! decide its scope: one per parse, one per thread, or one shared by many
//! parallel parses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::mesh::MeshFormat;

/// Thread-safe, deduplicating store of [`MeshFormat`]s.
///
/// Uses `parking_lot::RwLock` so lookups of existing formats only take the
/// shared lock.
#[derive(Default)]
pub struct FormatCache {
    formats: RwLock<HashMap<String, Arc<MeshFormat>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl FormatCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached instance equal to `format`, registering it if new.
    pub fn intern(&self, format: MeshFormat) -> Arc<MeshFormat> {
        let key = format.hash_key();
        if let Some(found) = self.formats.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(found);
        }

        let mut formats = self.formats.write();
        // Another thread may have inserted it between the two locks.
        if let Some(found) = formats.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(found);
        }
        debug!(key = %key, "new vertex format");
        let shared = Arc::new(format);
        formats.insert(key, Arc::clone(&shared));
        self.misses.fetch_add(1, Ordering::Relaxed);
        shared
    }

    /// Look up a format by its hash key.
    pub fn get(&self, key: &str) -> Option<Arc<MeshFormat>> {
        self.formats.read().get(key).cloned()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.formats.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses) since creation or the last [`clear`](Self::clear).
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    pub fn clear(&self) {
        self.formats.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for FormatCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (hits, misses) = self.stats();
        f.debug_struct("FormatCache")
            .field("formats", &self.len())
            .field("hits", &hits)
            .field("misses", &misses)
            .finish()
    }
}
