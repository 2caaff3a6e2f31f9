//! Folds mutation events into cached pages.
//!
//! # Rules per cache entry
//!
//! For an upsert the row is *included* when its new status is the entry's
//! status and it passes the entry's search and filters.
//!
//! | row in `rows` | included | effect |
//! |---------------|----------|--------|
//! | yes | yes | replaced in place |
//! | yes | no  | removed, `total - 1` |
//! | no  | yes | first page: prepended, `total + 1`, rows past `limit` move off-page; later pages: `total + 1` if the row entered this status |
//! | no  | no  | `total - 1` if an earlier event counted it off-page, else untouched |
//!
//! A remove deletes the row from every entry holding it. Entries an event
//! does not change keep their `Arc`, so readers can compare by pointer.
//! Upserted rows without an id are skipped.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use tabula_model::{
    AdminListParams, MutationEvent, Page, RemoveEvent, ResourceTag, RowAccess, RowId, RowKey,
    UpsertEvent,
};

use crate::error::Result;
use crate::matcher::ResourceMatcher;
use crate::socket::{SocketMessage, decode_event};
use crate::store::{CacheEntry, QueryCache};

/// Applies decoded events to a [`QueryCache`], one resource rule set per tag.
#[derive(Debug, Clone)]
pub struct Reconciler<R> {
    fallback: ResourceMatcher<R>,
    resources: HashMap<ResourceTag, ResourceMatcher<R>>,
}

impl<R> Default for Reconciler<R> {
    fn default() -> Self {
        Self {
            fallback: ResourceMatcher::default(),
            resources: HashMap::new(),
        }
    }
}

impl<R: RowAccess + Clone> Reconciler<R> {
    /// `fallback` serves resources without their own matcher.
    pub fn new(fallback: ResourceMatcher<R>) -> Self {
        Self {
            fallback,
            resources: HashMap::new(),
        }
    }

    pub fn with_resource(mut self, resource: ResourceTag, matcher: ResourceMatcher<R>) -> Self {
        self.resources.insert(resource, matcher);
        self
    }

    pub fn matcher_for(&self, resource: &ResourceTag) -> &ResourceMatcher<R> {
        self.resources.get(resource).unwrap_or(&self.fallback)
    }

    /// Applies one event; returns how many entries changed.
    ///
    /// The cache version is bumped at most once, also for batches.
    pub fn apply(
        &self,
        cache: &mut QueryCache<R>,
        resource: &ResourceTag,
        event: &MutationEvent<R>,
    ) -> usize {
        let matcher = self.matcher_for(resource);
        let upserts = identified_upserts(resource, event, &matcher.key);
        let mut changed = 0;
        for (params, entry) in cache.entries_mut_for(resource) {
            let touched = match event {
                MutationEvent::Remove(remove) => remove_from(entry, remove, &matcher.key),
                _ => upserts.iter().fold(false, |touched, (id, upsert)| {
                    upsert_into(entry, params, id, upsert, matcher) | touched
                }),
            };
            if touched {
                tracing::trace!(
                    %resource,
                    status = %params.status,
                    page = params.page,
                    total = entry.page.total,
                    "cache entry reconciled"
                );
                changed += 1;
            }
        }
        if changed > 0 {
            cache.bump();
        }
        tracing::debug!(%resource, kind = event.kind(), changed, "mutation event applied");
        changed
    }
}

impl<R: RowAccess + Clone + DeserializeOwned> Reconciler<R> {
    /// Decodes a raw push message and applies it.
    pub fn apply_message(&self, cache: &mut QueryCache<R>, message: SocketMessage) -> Result<usize> {
        let (resource, event) = decode_event(message)?;
        Ok(self.apply(cache, &resource, &event))
    }
}

/// Upserts of `event` paired with their row ids; rows without an id are
/// skipped since they cannot be told apart from other id-less rows.
fn identified_upserts<'a, R: RowAccess>(
    resource: &ResourceTag,
    event: &'a MutationEvent<R>,
    key: &RowKey<R>,
) -> Vec<(RowId, &'a UpsertEvent<R>)> {
    let upserts: Vec<&UpsertEvent<R>> = match event {
        MutationEvent::Upsert(upsert) => vec![upsert],
        MutationEvent::BatchUpsert(batch) => batch.iter().collect(),
        MutationEvent::Remove(_) => Vec::new(),
    };
    upserts
        .into_iter()
        .filter_map(|upsert| match key.try_resolve(&upsert.row) {
            Some(id) => Some((id, upsert)),
            None => {
                tracing::warn!(%resource, "upserted row has no id, skipped");
                None
            }
        })
        .collect()
}

fn upsert_into<R: RowAccess + Clone>(
    entry: &mut CacheEntry<R>,
    params: &AdminListParams,
    id: &RowId,
    event: &UpsertEvent<R>,
    matcher: &ResourceMatcher<R>,
) -> bool {
    let included = event.new_status == params.status && matcher.includes(&event.row, params);
    let position = entry.page.position_of(id, &matcher.key);

    match (position, included) {
        (Some(index), true) => {
            edit(&mut entry.page, |page| page.rows[index] = event.row.clone());
        }
        (Some(index), false) => {
            edit(&mut entry.page, |page| {
                page.rows.remove(index);
                page.total = page.total.saturating_sub(1);
            });
        }
        (None, true) => {
            if entry.off_page.contains(id) {
                return false;
            }
            if params.is_first_page() {
                let limit = entry.page.limit.max(1);
                let mut pushed_off = Vec::new();
                edit(&mut entry.page, |page| {
                    page.rows.insert(0, event.row.clone());
                    if page.rows.len() > limit {
                        pushed_off = page.rows.split_off(limit);
                    }
                    page.total += 1;
                });
                // Still counted in `total`, so remember them like off-page rows.
                entry.off_page.extend(
                    pushed_off
                        .iter()
                        .enumerate()
                        .map(|(offset, row)| matcher.key.resolve(row, limit + offset)),
                );
            } else if event.previous_status != Some(params.status) {
                entry.off_page.insert(id.clone());
                edit(&mut entry.page, |page| page.total += 1);
            } else {
                return false;
            }
        }
        (None, false) => {
            if !entry.off_page.remove(id) {
                return false;
            }
            edit(&mut entry.page, |page| page.total = page.total.saturating_sub(1));
        }
    }
    true
}

fn remove_from<R: RowAccess + Clone>(
    entry: &mut CacheEntry<R>,
    event: &RemoveEvent,
    key: &RowKey<R>,
) -> bool {
    if let Some(index) = entry.page.position_of(&event.id, key) {
        edit(&mut entry.page, |page| {
            page.rows.remove(index);
            page.total = page.total.saturating_sub(1);
        });
        return true;
    }
    if entry.off_page.remove(&event.id) {
        edit(&mut entry.page, |page| page.total = page.total.saturating_sub(1));
        return true;
    }
    false
}

/// Copy-on-write edit that keeps `total_pages` consistent.
fn edit<R: Clone>(page: &mut Arc<Page<R>>, change: impl FnOnce(&mut Page<R>)) {
    let page = Arc::make_mut(page);
    change(page);
    page.recompute_total_pages();
}

/// Ids present in a page, for diagnostics and tests.
pub fn row_ids<R: RowAccess>(page: &Page<R>, key: &RowKey<R>) -> Vec<RowId> {
    page.rows
        .iter()
        .enumerate()
        .map(|(index, row)| key.resolve(row, index))
        .collect()
}
