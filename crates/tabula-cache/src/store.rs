//! Keyed store of fetched pages.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tabula_model::{AdminListParams, Page, ResourceTag, RowId};
use tokio::sync::watch;

/// Identity of one cached page: the resource plus every list parameter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    pub resource: ResourceTag,
    pub params: AdminListParams,
}

impl CacheKey {
    pub fn new(resource: ResourceTag, params: AdminListParams) -> Self {
        Self { resource, params }
    }
}

/// A cached page plus reconciliation bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry<R> {
    pub(crate) page: Arc<Page<R>>,
    /// Rows counted into `total` by realtime events but not placed in `rows`
    /// (entries past the first page cannot position them).
    pub(crate) off_page: BTreeSet<RowId>,
}

impl<R> CacheEntry<R> {
    pub fn new(page: Page<R>) -> Self {
        Self {
            page: Arc::new(page),
            off_page: BTreeSet::new(),
        }
    }

    pub fn page(&self) -> &Arc<Page<R>> {
        &self.page
    }

    pub fn off_page(&self) -> &BTreeSet<RowId> {
        &self.off_page
    }
}

/// Every page fetched so far, keyed by [`CacheKey`].
///
/// A monotonically increasing version is bumped once per write (a fetched
/// page, an invalidation, or one realtime event) and broadcast on a watch
/// channel so dependents re-render once per change.
#[derive(Debug)]
pub struct QueryCache<R> {
    entries: BTreeMap<CacheKey, CacheEntry<R>>,
    version: u64,
    version_tx: watch::Sender<u64>,
}

impl<R> Default for QueryCache<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> QueryCache<R> {
    pub fn new() -> Self {
        let (version_tx, _) = watch::channel(0);
        Self {
            entries: BTreeMap::new(),
            version: 0,
            version_tx,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Receives the version after every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Page<R>>> {
        self.entries.get(key).map(|e| Arc::clone(&e.page))
    }

    pub fn entry(&self, key: &CacheKey) -> Option<&CacheEntry<R>> {
        self.entries.get(key)
    }

    /// Stores a freshly fetched page, replacing any previous value for `key`.
    pub fn insert(&mut self, key: CacheKey, page: Page<R>) -> Arc<Page<R>> {
        tracing::debug!(
            resource = %key.resource,
            page = key.params.page,
            rows = page.rows.len(),
            total = page.total,
            "page cached"
        );
        let entry = CacheEntry::new(page);
        let shared = Arc::clone(&entry.page);
        self.entries.insert(key, entry);
        self.bump();
        shared
    }

    /// Explicit refresh of one entry; same as [`QueryCache::insert`].
    pub fn refresh(&mut self, key: CacheKey, page: Page<R>) -> Arc<Page<R>> {
        self.insert(key, page)
    }

    /// Drops every entry of `resource`; returns how many were dropped.
    pub fn invalidate(&mut self, resource: &ResourceTag) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| &key.resource != resource);
        let dropped = before - self.entries.len();
        if dropped > 0 {
            tracing::debug!(%resource, dropped, "cache entries invalidated");
            self.bump();
        }
        dropped
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.bump();
        }
    }

    /// Cached pages of one resource, in key order.
    pub fn entries_for<'a>(
        &'a self,
        resource: &'a ResourceTag,
    ) -> impl Iterator<Item = (&'a AdminListParams, &'a Arc<Page<R>>)> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| &key.resource == resource)
            .map(|(key, entry)| (&key.params, &entry.page))
    }

    /// Every entry with its key, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &Arc<Page<R>>)> {
        self.entries.iter().map(|(key, entry)| (key, &entry.page))
    }

    pub(crate) fn entries_mut_for<'a>(
        &'a mut self,
        resource: &'a ResourceTag,
    ) -> impl Iterator<Item = (&'a AdminListParams, &'a mut CacheEntry<R>)> + 'a {
        self.entries
            .iter_mut()
            .filter(move |(key, _)| &key.resource == resource)
            .map(|(key, entry)| (&key.params, entry))
    }

    pub(crate) fn bump(&mut self) {
        self.version += 1;
        self.version_tx.send_replace(self.version);
    }
}
