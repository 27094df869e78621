//! Process-wide caches shared by every build
//!
//! All caches are explicit objects handed to the scanner, extractor and graph
//! constructors. Each one wraps a single `Mutex`, so a read-modify-write on a
//! cache entry is atomic with respect to every other worker using the same
//! cache instance. Cloning a cache clones the handle, not the data.
//!
//! - [`ModificationCache`]: last-seen modification time per (purpose tag, path).
//! - [`DescriptorCache`]: parsed source descriptors per path.
//! - [`LibraryScanCache`]: file lists of the trusted library tree.
//!
//! [`BuildCaches`] bundles the three and knows how to persist the first two
//! (see [`snapshot`]).

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::source::SourceDescriptor;

pub mod modification;
pub mod snapshot;

pub use modification::ModificationCache;

/// Cache key combining a purpose tag and a file path
///
/// The same physical file gets independent staleness tracking per tag, so a
/// "compile" build and an "input" request never consume each other's
/// observations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub tag: String,
    pub path: PathBuf,
}

impl CacheKey {
    pub fn new(tag: &str, path: &Path) -> Self {
        Self {
            tag: tag.to_string(),
            path: path.to_path_buf(),
        }
    }
}

/// Mutex-guarded map shared between workers
#[derive(Debug)]
pub struct SharedCache<K, V> {
    name: &'static str,
    cache: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> Clone for SharedCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<K, V> SharedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new empty cache; `name` only shows up in lock errors.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, HashMap<K, V>>> {
        self.cache.lock().map_err(|_| Error::LockPoisoned {
            context: format!("{} cache", self.name),
        })
    }

    /// Get a cached value, or compute and cache it if not present
    ///
    /// The lock is not held while `processor` runs, so two workers racing on
    /// the same missing key may both compute it; the last insert wins.
    pub fn get_or_process<F>(&self, key: K, processor: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(cached) = self.get(&key)? {
            return Ok(cached);
        }

        let result = processor()?;
        self.insert(key, result.clone())?;
        Ok(result)
    }

    /// Return the cached value, creating and storing a default one when absent
    pub fn get_or_default(&self, key: K) -> Result<V>
    where
        V: Default,
    {
        let mut cache = self.lock()?;
        Ok(cache.entry(key).or_default().clone())
    }

    /// Manually insert a value into the cache
    pub fn insert(&self, key: K, value: V) -> Result<()> {
        self.lock()?.insert(key, value);
        Ok(())
    }

    /// Get a value from cache without computing
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        Ok(self.lock()?.get(key).cloned())
    }

    /// Drop a single entry, returning it if it was present
    pub fn remove(&self, key: &K) -> Result<Option<V>> {
        Ok(self.lock()?.remove(key))
    }

    /// Check if a key exists in cache
    pub fn contains(&self, key: &K) -> Result<bool> {
        Ok(self.lock()?.contains_key(key))
    }

    /// Clear all cached entries
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    /// Get the number of cached entries
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Copy every entry out of the cache
    pub fn entries(&self) -> Result<Vec<(K, V)>> {
        Ok(self
            .lock()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// Replace the whole content of the cache
    pub fn replace_all(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
        let mut cache = self.lock()?;
        cache.clear();
        cache.extend(entries);
        Ok(())
    }
}

/// Parsed descriptors, keyed by source path
pub type DescriptorCache = SharedCache<PathBuf, Arc<SourceDescriptor>>;

/// Library file lists, keyed by (extension, library root)
pub type LibraryScanCache = SharedCache<CacheKey, Vec<PathBuf>>;

/// Every cache a build server needs, created once at startup
#[derive(Debug, Clone)]
pub struct BuildCaches {
    pub modifications: ModificationCache,
    pub descriptors: DescriptorCache,
    pub library: LibraryScanCache,
}

impl BuildCaches {
    /// Empty caches; `no_cache` makes every modification lookup report a change
    pub fn new(no_cache: bool) -> Self {
        Self {
            modifications: ModificationCache::new(no_cache),
            descriptors: DescriptorCache::new("descriptor"),
            library: LibraryScanCache::new("library scan"),
        }
    }
}
