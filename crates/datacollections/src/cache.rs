//! Memoization of resolved lazy values.
//!
//! Every [`DatabaseRowCollection`](crate::DatabaseRowCollection) owns one
//! [`LazyCache`]. Entries are keyed by table, field and the owning row's
//! [`RowIdentity`], and store the outcome of a resolution including
//! "nothing found", so a cache hit is always authoritative:
//!
//! ```
//! use datacollections::{FieldValue, LazyCache, LazyKey, RowIdentity};
//! use datacollections_core::{FieldName, TableName};
//!
//! let key = LazyKey::new(
//!     TableName::new("tl_news").unwrap(),
//!     FieldName::new("author").unwrap(),
//!     RowIdentity::Id(7.into()),
//! );
//! let mut cache = LazyCache::in_memory();
//! assert!(cache.lookup(&key).is_none());
//!
//! cache.store(key.clone(), FieldValue::Null);
//! assert_eq!(cache.lookup(&key), Some(FieldValue::Null));
//! assert_eq!(cache.stats().hits, 1);
//! ```
//!
//! The storage behind the cache is pluggable through [`LazyStore`]. A store
//! may be shared by many rows (`Rc<RefCell<S>>` implements the trait): rows
//! with the same id share entries, unsaved rows never do.

use crate::field_value::FieldValue;
use datacollections_core::{FieldName, Key, TableName};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// The row a cached value belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowIdentity {
    /// Primary-key value of a stored row
    Id(Key),
    /// Process-unique number of a row instance that has no id
    Instance(u64),
}

impl fmt::Display for RowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIdentity::Id(id) => write!(f, "#{}", id),
            RowIdentity::Instance(n) => write!(f, "@{}", n),
        }
    }
}

/// Cache key of a resolved lazy value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LazyKey {
    pub table: TableName,
    pub field: FieldName,
    pub row: RowIdentity,
}

impl LazyKey {
    pub fn new(table: TableName, field: FieldName, row: RowIdentity) -> Self {
        Self { table, field, row }
    }
}

impl fmt::Display for LazyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.table, self.field, self.row)
    }
}

/// Storage backend of a [`LazyCache`].
pub trait LazyStore: fmt::Debug {
    fn contains(&self, key: &LazyKey) -> bool;

    fn get(&self, key: &LazyKey) -> Option<FieldValue>;

    fn set(&mut self, key: LazyKey, value: FieldValue);

    /// Remove an entry, returning whether it existed.
    fn remove(&mut self, key: &LazyKey) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Constructor for the store of each new row's cache.
pub type LazyStoreFactory = Rc<dyn Fn() -> Box<dyn LazyStore>>;

/// The default in-process store.
#[derive(Debug, Default)]
pub struct MemoryLazyStore {
    entries: HashMap<LazyKey, FieldValue>,
}

impl MemoryLazyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LazyStore for MemoryLazyStore {
    fn contains(&self, key: &LazyKey) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&self, key: &LazyKey) -> Option<FieldValue> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: LazyKey, value: FieldValue) {
        self.entries.insert(key, value);
    }

    fn remove(&mut self, key: &LazyKey) -> bool {
        self.entries.remove(key).is_some()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<S: LazyStore> LazyStore for Rc<RefCell<S>> {
    fn contains(&self, key: &LazyKey) -> bool {
        self.borrow().contains(key)
    }

    fn get(&self, key: &LazyKey) -> Option<FieldValue> {
        self.borrow().get(key)
    }

    fn set(&mut self, key: LazyKey, value: FieldValue) {
        self.borrow_mut().set(key, value);
    }

    fn remove(&mut self, key: &LazyKey) -> bool {
        self.borrow_mut().remove(key)
    }

    fn len(&self) -> usize {
        self.borrow().len()
    }
}

/// Counters for cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    /// Entries dropped by [`LazyCache::invalidate`] or [`LazyCache::reset`]
    pub invalidations: u64,
}

/// Per-row cache of resolved lazy values.
///
/// Tracks the keys it stored, so [`reset`](Self::reset) and
/// [`len`](Self::len) only concern this cache even over a shared store.
#[derive(Debug)]
pub struct LazyCache {
    store: Box<dyn LazyStore>,
    owned: HashSet<LazyKey>,
    stats: CacheStats,
}

impl LazyCache {
    pub fn new(store: Box<dyn LazyStore>) -> Self {
        Self {
            store,
            owned: HashSet::new(),
            stats: CacheStats::default(),
        }
    }

    /// A cache backed by a fresh [`MemoryLazyStore`].
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryLazyStore::new()))
    }

    /// Check for an entry without touching the statistics.
    pub fn contains(&self, key: &LazyKey) -> bool {
        self.store.contains(key)
    }

    /// Look up a resolved value, counting the hit or miss.
    pub fn lookup(&mut self, key: &LazyKey) -> Option<FieldValue> {
        let found = self.store.get(key);
        if found.is_some() {
            self.stats.hits += 1;
            tracing::debug!(key = %key, "Lazy cache hit");
        } else {
            self.stats.misses += 1;
            tracing::debug!(key = %key, "Lazy cache miss");
        }
        found
    }

    /// Remember the outcome of a resolution.
    pub fn store(&mut self, key: LazyKey, value: FieldValue) {
        tracing::trace!(key = %key, kind = value.kind(), "Caching lazy value");
        self.stats.stores += 1;
        self.owned.insert(key.clone());
        self.store.set(key, value);
    }

    /// Drop one entry. Returns whether it existed.
    pub fn invalidate(&mut self, key: &LazyKey) -> bool {
        self.owned.remove(key);
        let removed = self.store.remove(key);
        if removed {
            self.stats.invalidations += 1;
            tracing::trace!(key = %key, "Invalidated lazy value");
        }
        removed
    }

    /// Drop every entry this cache stored.
    ///
    /// Entries other caches put into a shared store are left alone.
    pub fn reset(&mut self) {
        let mut dropped = 0_u64;
        for key in self.owned.drain() {
            if self.store.remove(&key) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::trace!(dropped, "Resetting lazy cache");
        }
        self.stats.invalidations += dropped;
    }

    /// Number of live entries stored by this cache.
    pub fn len(&self) -> usize {
        self.owned.iter().filter(|key| self.store.contains(key)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl Default for LazyCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datacollections_core::Value;

    fn key(field: &str, row: i64) -> LazyKey {
        LazyKey::new(
            TableName::new("tl_news").unwrap(),
            FieldName::new(field).unwrap(),
            RowIdentity::Id(Key::Int(row)),
        )
    }

    #[test]
    fn cached_null_is_a_hit() {
        let mut cache = LazyCache::in_memory();
        cache.store(key("author", 1), FieldValue::Null);
        assert!(cache.contains(&key("author", 1)));
        assert_eq!(cache.lookup(&key("author", 1)), Some(FieldValue::Null));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn keys_are_scoped_by_row() {
        let mut cache = LazyCache::in_memory();
        cache.store(key("author", 1), FieldValue::Scalar(Value::Int(5)));
        assert!(cache.lookup(&key("author", 2)).is_none());
        assert!(cache.lookup(&key("tags", 1)).is_none());
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn invalidate_and_reset() {
        let mut cache = LazyCache::in_memory();
        cache.store(key("author", 1), FieldValue::Null);
        cache.store(key("tags", 1), FieldValue::Null);
        assert!(cache.invalidate(&key("author", 1)));
        assert!(!cache.invalidate(&key("author", 1)));
        assert_eq!(cache.len(), 1);

        cache.reset();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 2);
        assert_eq!(cache.stats().stores, 2);
    }

    #[test]
    fn key_display() {
        assert_eq!(key("author", 3).to_string(), "tl_news.author#3");
        let unsaved = LazyKey::new(
            TableName::new("tl_news").unwrap(),
            FieldName::new("author").unwrap(),
            RowIdentity::Instance(9),
        );
        assert_eq!(unsaved.to_string(), "tl_news.author@9");
    }

    #[test]
    fn reset_leaves_other_caches_in_a_shared_store() {
        let shared = Rc::new(RefCell::new(MemoryLazyStore::new()));
        let mut first = LazyCache::new(Box::new(Rc::clone(&shared)));
        let mut second = LazyCache::new(Box::new(Rc::clone(&shared)));
        first.store(key("author", 1), FieldValue::Null);
        second.store(key("author", 2), FieldValue::Null);
        assert_eq!(shared.borrow().len(), 2);
        assert_eq!(first.len(), 1);

        first.reset();
        assert!(first.is_empty());
        assert_eq!(first.stats().invalidations, 1);
        assert!(second.contains(&key("author", 2)));
        assert_eq!(shared.borrow().len(), 1);
    }
}
