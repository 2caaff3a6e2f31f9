//! Loader backed by the shared query cache.

use std::sync::Arc;

use tabula_cache::{CacheKey, SharedCache, lock_cache};
use tabula_model::{Page, ResourceTag, Status};
use tabula_query::QueryState;

use crate::loader::{Loader, empty_page_for};

/// Serves pages from the cache and fills it on a miss.
///
/// The cache is the same one the realtime reconciler writes to, so a cached
/// page always reflects the events applied since it was fetched. Failed
/// fetches go through the failure boundary and are not cached.
pub struct CachedLoader<L, R> {
    loader: L,
    cache: SharedCache<R>,
    resource: ResourceTag,
    status: Status,
}

impl<L, R> CachedLoader<L, R>
where
    L: Loader<R>,
    R: Clone,
{
    pub fn new(loader: L, cache: SharedCache<R>, resource: ResourceTag) -> Self {
        Self {
            loader,
            cache,
            resource,
            status: Status::Active,
        }
    }

    /// Which status partition this grid lists (active list or trash).
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn key_for(&self, query: &QueryState) -> CacheKey {
        CacheKey::new(self.resource.clone(), query.to_params(self.status))
    }

    /// Current cached value for `query`, if any.
    pub fn cached(&self, query: &QueryState) -> Option<Arc<Page<R>>> {
        lock_cache(&self.cache).get(&self.key_for(query))
    }

    /// Cached page, or a fetch on a miss.
    pub async fn load(&self, query: &QueryState) -> Arc<Page<R>> {
        if let Some(page) = self.cached(query) {
            tracing::trace!(resource = %self.resource, page = query.page, "cache hit");
            return page;
        }
        self.fetch(query).await
    }

    /// Always asks the loader; a successful result replaces the cache entry.
    pub async fn fetch(&self, query: &QueryState) -> Arc<Page<R>> {
        match self.loader.load(query).await {
            Ok(mut page) => {
                page.recompute_total_pages();
                lock_cache(&self.cache).insert(self.key_for(query), page)
            }
            Err(error) => Arc::new(empty_page_for(query, &error)),
        }
    }
}
