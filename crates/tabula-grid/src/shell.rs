//! The grid shell: one state container wiring query, fetch, tree, selection
//! and columns into renderable rows.
//!
//! # Flow
//!
//! 1. Input goes through the [`QueryController`]; text is debounced.
//! 2. [`Grid::next_fetch`] hands out a ticket when the settled query differs
//!    from what is shown or in flight.
//! 3. [`Grid::finish_fetch`] lands the result only if the ticket is still the
//!    newest; the previous rows stay on screen until then.
//! 4. [`Grid::rows`] flattens the tree (if any) and marks selection.

use std::sync::Arc;

use tabula_model::{GridSettings, Page, RowAccess, RowId, RowKey};
use tabula_query::{
    CommitMode, FilterError, FilterSpec, InputTarget, QueryController, QueryError, QueryState,
    Sanitizer,
};
use tabula_selection::{HeaderState, Selection, SelectionAction, VisibleRow};
use tabula_tree::{TreeAction, TreeConfig, TreeNode, TreeState};
use tokio::time::Instant;

use crate::cached::CachedLoader;
use crate::column::ColumnDef;
use crate::fetch::{FetchTicket, FetchTracker};
use crate::footer::PaginationFooter;
use crate::loader::{Loader, SafeLoader};

// =============================================================================
// TYPES
// =============================================================================

/// What the shell shows around the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellPhase {
    /// Nothing requested yet.
    Idle,
    /// First fetch in flight, no rows to show.
    Loading,
    /// A fetch is in flight over previous rows; shown as an overlay.
    Refreshing,
    Ready,
}

/// One row as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub id: RowId,
    /// Index in the page's `rows`.
    pub index: usize,
    /// 1-based position across pages, in display order.
    pub number: usize,
    pub depth: usize,
    /// Left padding in pixels.
    pub indent: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub selected: bool,
    pub selectable: bool,
    /// Cell text per column, in column order.
    pub cells: Vec<String>,
}

/// A page row in display order, before rendering.
struct ViewRow<'a, R> {
    index: usize,
    id: RowId,
    row: &'a R,
    node: Option<&'a TreeNode>,
}

// =============================================================================
// GRID
// =============================================================================

pub struct Grid<R> {
    columns: Vec<ColumnDef<R>>,
    key: RowKey<R>,
    settings: GridSettings,
    query: QueryController,
    fetch: FetchTracker,
    page: Option<Arc<Page<R>>>,
    tree: Option<TreeState<R>>,
    selection: Option<Selection<R>>,
}

impl<R> std::fmt::Debug for Grid<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("columns", &self.columns.len())
            .field("query", &self.query)
            .field("fetch", &self.fetch)
            .field("rows", &self.page.as_ref().map(|p| p.rows.len()))
            .field("tree", &self.tree.is_some())
            .field("selection", &self.selection.is_some())
            .finish()
    }
}

impl<R: RowAccess + Clone> Grid<R> {
    pub fn new(columns: Vec<ColumnDef<R>>, settings: GridSettings) -> Self {
        let query = QueryController::new(QueryState::new(settings.default_limit), settings.debounce());
        Self {
            columns,
            key: RowKey::default(),
            settings,
            query,
            fetch: FetchTracker::new(),
            page: None,
            tree: None,
            selection: None,
        }
    }

    /// Row identity for flat mode and selection; call before
    /// [`Grid::with_tree`], which reuses it.
    pub fn with_key(mut self, key: RowKey<R>) -> Self {
        self.key = key;
        self
    }

    /// Shows rows as a hierarchy.
    pub fn with_tree(mut self, mut config: TreeConfig<R>) -> Self {
        config.key = self.key.clone();
        self.tree = Some(TreeState::new(config));
        self
    }

    pub fn with_selection(mut self, selection: Selection<R>) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.query = self.query.with_sanitizer(sanitizer);
        self
    }

    pub fn columns(&self) -> &[ColumnDef<R>] {
        &self.columns
    }

    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    /// The settled query.
    pub fn query(&self) -> &QueryState {
        self.query.query()
    }

    pub fn controller(&self) -> &QueryController {
        &self.query
    }

    pub fn page(&self) -> Option<&Arc<Page<R>>> {
        self.page.as_ref()
    }

    pub fn phase(&self) -> ShellPhase {
        match (self.fetch.is_pending(), self.page.is_some()) {
            (false, false) => ShellPhase::Idle,
            (true, false) => ShellPhase::Loading,
            (true, true) => ShellPhase::Refreshing,
            (false, true) => ShellPhase::Ready,
        }
    }

    pub fn shows_overlay(&self) -> bool {
        self.phase() == ShellPhase::Refreshing
    }

    fn total_pages(&self) -> usize {
        self.page.as_ref().map_or(0, |p| p.total_pages)
    }

    // -------------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------------

    /// Debounced edit of the search box or a text filter.
    pub fn type_text(&mut self, target: InputTarget, text: &str, now: Instant) -> Result<(), QueryError> {
        self.query.type_text(target, text, now)
    }

    /// Immediate edit (select, date pickers); returns whether the query changed.
    pub fn set_immediate(&mut self, target: InputTarget, value: &str) -> Result<bool, QueryError> {
        Ok(self.query.set_immediate(target, value)?.is_some())
    }

    /// Edit of a column's filter control, routed by the column's declared
    /// kind: text waits for the debounce delay, pickers commit at once.
    ///
    /// The value is stored in the control's canonical encoding; a value the
    /// control cannot decode is rejected before it reaches the query. Columns
    /// without a declared filter behave as text filters. Returns whether the
    /// query changed.
    pub fn edit_filter(&mut self, accessor_key: &str, raw: &str, now: Instant) -> Result<bool, QueryError> {
        let control = self
            .columns
            .iter()
            .find(|column| column.accessor_key == accessor_key)
            .and_then(|column| column.filter.as_ref())
            .map_or_else(|| FilterSpec::text().route(), FilterSpec::route);
        let rejected = |source: FilterError| QueryError::Filter {
            key: accessor_key.to_string(),
            source,
        };
        let value = control.decode(raw).map_err(rejected)?;
        let stored = control.encode(&value).map_err(rejected)?;
        let target = InputTarget::Filter(accessor_key.to_string());
        match control.commit_mode() {
            CommitMode::Debounced => {
                self.query.type_text(target, &stored, now)?;
                Ok(false)
            }
            CommitMode::Immediate => self.set_immediate(target, &stored),
        }
    }

    /// Commits due debounced input; returns whether the query changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.query.poll(now).is_some()
    }

    /// Waits for pending debounced input to settle.
    pub async fn settled(&mut self) -> bool {
        self.query.settled().await.is_some()
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        let hint = self.total_pages();
        self.query.go_to_page(page, hint).is_some()
    }

    pub fn set_limit(&mut self, limit: usize) -> bool {
        self.query.set_limit(limit).is_some()
    }

    pub fn reset(&mut self) -> bool {
        self.query.reset().is_some()
    }

    // -------------------------------------------------------------------------
    // Fetching
    // -------------------------------------------------------------------------

    /// Ticket for the settled query, unless it is already shown or in flight.
    pub fn next_fetch(&mut self) -> Option<FetchTicket> {
        self.fetch.begin(self.query.query())
    }

    /// Ticket that refetches the current query regardless.
    pub fn refresh(&mut self) -> FetchTicket {
        self.fetch.begin_refresh(self.query.query())
    }

    /// Lands a fetch result; stale tickets are ignored.
    pub fn finish_fetch(&mut self, ticket: &FetchTicket, page: Arc<Page<R>>) -> bool {
        if !self.fetch.commit(ticket) {
            return false;
        }
        self.show(page);
        true
    }

    /// Replaces the displayed page, e.g. with a cache value the reconciler
    /// updated.
    pub fn show(&mut self, page: Arc<Page<R>>) {
        if self.page.as_ref().is_some_and(|current| Arc::ptr_eq(current, &page)) {
            return;
        }
        if let Some(tree) = &mut self.tree {
            tree.load(&page.rows);
        }
        tracing::debug!(
            page = page.page,
            rows = page.rows.len(),
            total = page.total,
            "grid page shown"
        );
        self.page = Some(page);
    }

    /// Fetches the settled query through the failure boundary if needed.
    pub async fn sync<L: Loader<R>>(&mut self, loader: &SafeLoader<L>) -> bool {
        let Some(ticket) = self.next_fetch() else {
            return false;
        };
        let page = loader.load(&ticket.query).await;
        self.finish_fetch(&ticket, Arc::new(page))
    }

    /// Like [`Grid::sync`], reading through the shared cache.
    pub async fn sync_cached<L: Loader<R>>(&mut self, loader: &CachedLoader<L, R>) -> bool {
        let Some(ticket) = self.next_fetch() else {
            return false;
        };
        let page = loader.load(&ticket.query).await;
        self.finish_fetch(&ticket, page)
    }

    // -------------------------------------------------------------------------
    // Tree and selection
    // -------------------------------------------------------------------------

    pub fn tree(&self) -> Option<&TreeState<R>> {
        self.tree.as_ref()
    }

    pub fn dispatch_tree(&mut self, action: TreeAction) -> bool {
        self.tree.as_mut().is_some_and(|tree| tree.dispatch(action))
    }

    pub fn selection(&self) -> Option<&Selection<R>> {
        self.selection.as_ref()
    }

    /// Applies a selection action against the rows currently shown.
    pub fn dispatch_selection(&mut self, action: SelectionAction) -> bool {
        let Some(selection) = self.selection.as_mut() else {
            return false;
        };
        let view = view_rows(self.page.as_deref(), self.tree.as_ref(), &self.key);
        let visible = to_visible(&view);
        selection.dispatch(action, &visible)
    }

    pub fn header_state(&self) -> HeaderState {
        self.selection.as_ref().map_or(HeaderState::Unchecked, |selection| {
            let view = view_rows(self.page.as_deref(), self.tree.as_ref(), &self.key);
            selection.header_state(&to_visible(&view))
        })
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    pub fn rows(&self) -> Vec<RenderedRow> {
        let Some(page) = self.page.as_deref() else {
            return Vec::new();
        };
        let first = page.first_row_number();
        view_rows(Some(page), self.tree.as_ref(), &self.key)
            .into_iter()
            .enumerate()
            .map(|(position, view)| {
                let (depth, indent, has_children, expanded) = match (view.node, &self.tree) {
                    (Some(node), Some(tree)) => (
                        node.depth,
                        node.indent(tree.config().indent_size),
                        node.has_children,
                        tree.is_expanded(&node.id),
                    ),
                    _ => (0, 0, false, false),
                };
                let (selected, selectable) = match &self.selection {
                    Some(selection) => (
                        selection.is_selected(&view.id),
                        selection.is_row_selectable(view.row),
                    ),
                    None => (false, false),
                };
                RenderedRow {
                    index: view.index,
                    number: first + position,
                    depth,
                    indent,
                    has_children,
                    expanded,
                    selected,
                    selectable,
                    cells: self.columns.iter().map(|c| c.render(view.row)).collect(),
                    id: view.id,
                }
            })
            .collect()
    }

    pub fn footer(&self) -> PaginationFooter {
        PaginationFooter::build(
            self.query.query(),
            self.page.as_deref(),
            &self.settings.page_size_options,
        )
    }
}

/// Rows in display order: tree order with collapsed subtrees removed, or
/// page order.
fn view_rows<'a, R: RowAccess>(
    page: Option<&'a Page<R>>,
    tree: Option<&'a TreeState<R>>,
    key: &RowKey<R>,
) -> Vec<ViewRow<'a, R>> {
    let Some(page) = page else {
        return Vec::new();
    };
    match tree {
        Some(tree) => tree
            .visible()
            .into_iter()
            .filter_map(|node| {
                page.rows.get(node.index).map(|row| ViewRow {
                    index: node.index,
                    id: node.id.clone(),
                    row,
                    node: Some(node),
                })
            })
            .collect(),
        None => page
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| ViewRow {
                index,
                id: key.resolve(row, index),
                row,
                node: None,
            })
            .collect(),
    }
}

fn to_visible<'a, R>(view: &[ViewRow<'a, R>]) -> Vec<VisibleRow<'a, R>> {
    view.iter()
        .map(|v| VisibleRow::new(v.id.clone(), v.row))
        .collect()
}
