//! Debounced editing of the query state.

use std::fmt;
use std::sync::Arc;

use tabula_model::Filters;
use tokio::time::Instant;

use crate::{Debouncer, NoopSanitizer, QueryError, QueryState, Result, Sanitizer};

/// Which part of the query an input edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputTarget {
    Search,
    Filter(String),
}

impl fmt::Display for InputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => f.write_str("search"),
            Self::Filter(key) => write!(f, "filters.{key}"),
        }
    }
}

/// Control values as the user currently sees them, ahead of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Draft {
    search: String,
    filters: Filters,
}

/// Owns the committed [`QueryState`] plus the not-yet-settled control values.
///
/// Free-text edits wait for the debounce delay; immediate edits (dropdowns,
/// date pickers) cancel the pending timer and commit at once together with
/// whatever text was already typed. Each commit reports the new query only if
/// it actually differs, so a loader driven by these results runs at most once
/// per settled value.
pub struct QueryController {
    committed: QueryState,
    draft: Draft,
    debouncer: Debouncer<()>,
    sanitizer: Arc<dyn Sanitizer>,
}

impl fmt::Debug for QueryController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryController")
            .field("committed", &self.committed)
            .field("draft", &self.draft)
            .field("pending", &self.debouncer.is_pending())
            .finish_non_exhaustive()
    }
}

impl QueryController {
    pub fn new(initial: QueryState, debounce: std::time::Duration) -> Self {
        let draft = Draft {
            search: initial.search.clone(),
            filters: initial.filters.clone(),
        };
        Self {
            committed: initial,
            draft,
            debouncer: Debouncer::new(debounce),
            sanitizer: Arc::new(NoopSanitizer),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.sanitizer = Arc::new(sanitizer);
        self
    }

    pub fn query(&self) -> &QueryState {
        &self.committed
    }

    /// Text currently shown in the search box.
    pub fn search_text(&self) -> &str {
        &self.draft.search
    }

    /// Raw value currently shown by the control for `key`.
    pub fn filter_text(&self, key: &str) -> &str {
        self.draft.filters.get(key).map_or("", String::as_str)
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Records a keystroke. Nothing is committed until the delay passes.
    pub fn type_text(&mut self, target: InputTarget, text: &str, now: Instant) -> Result<()> {
        let clean = self.sanitize(&target, text)?;
        self.write_draft(&target, clean);
        self.debouncer.push((), now);
        tracing::trace!(%target, "debounced input");
        Ok(())
    }

    /// Applies a value synchronously, cancelling any pending debounce.
    ///
    /// Returns the new query when it changed.
    pub fn set_immediate(&mut self, target: InputTarget, value: &str) -> Result<Option<QueryState>> {
        let clean = self.sanitize(&target, value)?;
        self.write_draft(&target, clean);
        self.debouncer.cancel();
        Ok(self.commit_draft())
    }

    /// Commits the draft if the debounce deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<QueryState> {
        self.debouncer.take_due(now)?;
        self.commit_draft()
    }

    /// Commits any pending draft right away.
    pub fn flush(&mut self) -> Option<QueryState> {
        self.debouncer.cancel()?;
        self.commit_draft()
    }

    /// Sleeps until the pending draft settles and commits it.
    ///
    /// Returns `None` when nothing was pending or the settled draft equals
    /// the committed query.
    pub async fn settled(&mut self) -> Option<QueryState> {
        self.debouncer.settled().await?;
        self.commit_draft()
    }

    pub fn go_to_page(&mut self, page: usize, total_pages_hint: usize) -> Option<QueryState> {
        self.committed
            .apply_page(page, total_pages_hint)
            .then(|| self.committed.clone())
    }

    pub fn set_limit(&mut self, limit: usize) -> Option<QueryState> {
        self.committed
            .apply_limit(limit)
            .then(|| self.committed.clone())
    }

    /// Clears search and filters (draft included) and cancels pending input.
    pub fn reset(&mut self) -> Option<QueryState> {
        self.debouncer.cancel();
        self.draft = Draft::default();
        self.committed.reset().then(|| self.committed.clone())
    }

    fn sanitize(&self, target: &InputTarget, value: &str) -> Result<String> {
        self.sanitizer
            .sanitize(target, value)
            .map_err(|reason| QueryError::Rejected {
                field: target.to_string(),
                reason,
            })
    }

    fn write_draft(&mut self, target: &InputTarget, value: String) {
        match target {
            InputTarget::Search => self.draft.search = value,
            InputTarget::Filter(key) => {
                if value.is_empty() {
                    self.draft.filters.remove(key);
                } else {
                    self.draft.filters.insert(key.clone(), value);
                }
            }
        }
    }

    fn commit_draft(&mut self) -> Option<QueryState> {
        let search_changed = self.committed.apply_search(&self.draft.search);
        let filters_changed = self.committed.apply_filters(self.draft.filters.clone());
        if search_changed || filters_changed {
            tracing::debug!(
                search = %self.committed.search,
                filters = self.committed.filters.len(),
                "query settled"
            );
            Some(self.committed.clone())
        } else {
            None
        }
    }
}
