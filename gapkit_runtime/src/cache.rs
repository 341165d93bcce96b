//! Bounded LRU cache of parsed dependency graphs.
//!
//! Entries are keyed by the resolved path, modification time and size of
//! both input files, so editing either file invalidates its entry.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use gapkit_core::parser::load_records;
use gapkit_core::{DependencyGraph, GapError};

use crate::error::{Result, RuntimeError};

pub const DEFAULT_GRAPH_CACHE_SIZE: usize = 8;

/// Identity of one input file at a point in time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileStamp {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl FileStamp {
    /// Stats `path`; a missing file is a [`GapError::MissingInput`].
    pub fn of(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(GapError::MissingInput(path.to_path_buf()).into());
        }
        let stat_err = |source| RuntimeError::Stat {
            path: path.to_path_buf(),
            source,
        };
        let resolved = path.canonicalize().map_err(stat_err)?;
        let meta = resolved.metadata().map_err(stat_err)?;
        Ok(Self {
            path: resolved,
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

/// Cache key over the premises and declaration-types files.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GraphCacheKey {
    pub premises: FileStamp,
    pub declarations: FileStamp,
}

impl GraphCacheKey {
    pub fn of(premises_path: &Path, decl_types_path: &Path) -> Result<Self> {
        Ok(Self {
            premises: FileStamp::of(premises_path)?,
            declarations: FileStamp::of(decl_types_path)?,
        })
    }
}

/// Internal cache storage.
#[derive(Default)]
struct CacheInner {
    entries: HashMap<GraphCacheKey, Arc<DependencyGraph>>,
    /// Least recently used first
    order: VecDeque<GraphCacheKey>,
}

impl CacheInner {
    fn touch(&mut self, key: &GraphCacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

/// Thread-safe graph cache with LRU eviction.
///
/// Lookup, load, insert and evict happen under one lock, so concurrent
/// callers never parse the same key twice or overfill the cache.
pub struct GraphCache {
    max_entries: usize,
    inner: Mutex<CacheInner>,
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new(DEFAULT_GRAPH_CACHE_SIZE)
    }
}

impl std::fmt::Debug for GraphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCache")
            .field("max_entries", &self.max_entries)
            .field("len", &self.len())
            .finish()
    }
}

impl GraphCache {
    /// Creates a cache holding at most `max_entries` graphs (at least one).
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        // entries are only replaced whole, a poisoned guard is still consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &GraphCacheKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Returns the graph for the two files and whether it was a cache hit.
    pub fn get_or_load(
        &self,
        premises_path: &Path,
        decl_types_path: &Path,
    ) -> Result<(Arc<DependencyGraph>, bool)> {
        let key = GraphCacheKey::of(premises_path, decl_types_path)?;
        let mut inner = self.lock();

        if let Some(graph) = inner.entries.get(&key).cloned() {
            inner.touch(&key);
            tracing::debug!(premises = %premises_path.display(), "graph cache hit");
            return Ok((graph, true));
        }

        let (premises, declarations) = load_records(premises_path, decl_types_path)?;
        let graph = Arc::new(DependencyGraph::from_records(&premises, &declarations));
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "dependency graph loaded"
        );

        while inner.order.len() >= self.max_entries {
            match inner.order.pop_front() {
                Some(old) => {
                    inner.entries.remove(&old);
                }
                None => break,
            }
        }
        inner.entries.insert(key.clone(), Arc::clone(&graph));
        inner.order.push_back(key);

        Ok((graph, false))
    }
}
