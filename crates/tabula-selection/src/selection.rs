use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tabula_model::RowId;

use crate::SelectionSet;

type SelectableFn<R> = dyn Fn(&R) -> bool + Send + Sync;
type ChangeFn<R> = dyn FnMut(SelectionChange<R>) + Send;

// =============================================================================
// TYPES
// =============================================================================

/// Who owns the selected set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// The engine's set is authoritative.
    Internal,
    /// The caller's set is authoritative; the engine mirrors it.
    External,
}

/// A row of the current view together with its resolved id.
#[derive(Debug)]
pub struct VisibleRow<'a, R> {
    pub id: RowId,
    pub row: &'a R,
}

impl<'a, R> VisibleRow<'a, R> {
    pub fn new(id: RowId, row: &'a R) -> Self {
        Self { id, row }
    }
}

/// Payload of the change callback.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChange<R> {
    /// Every selected id, including rows outside the current view.
    pub ids: Vec<RowId>,
    /// Selected rows of the current view.
    pub rows: Vec<R>,
}

/// Checkbox state of the "select all" header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderState {
    #[default]
    Unchecked,
    Indeterminate,
    Checked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionAction {
    /// Flip one row.
    Toggle(RowId),
    /// Force one row on or off.
    Set(RowId, bool),
    /// Select or unselect every selectable row of the view.
    SelectAllVisible(bool),
    Clear,
}

// =============================================================================
// SELECTION
// =============================================================================

/// Selection state container for one grid.
pub struct Selection<R> {
    mode: SelectionMode,
    selected: SelectionSet,
    disabled: bool,
    selectable: Option<Arc<SelectableFn<R>>>,
    on_change: Option<Box<ChangeFn<R>>>,
}

impl<R> fmt::Debug for Selection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("mode", &self.mode)
            .field("selected", &self.selected)
            .field("disabled", &self.disabled)
            .field("selectable", &self.selectable.is_some())
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl<R: Clone> Selection<R> {
    /// Engine-owned selection, starting empty.
    pub fn internal() -> Self {
        Self {
            mode: SelectionMode::Internal,
            selected: SelectionSet::new(),
            disabled: false,
            selectable: None,
            on_change: None,
        }
    }

    /// Caller-owned selection starting from `ids`; every change is reported to
    /// `on_change`.
    pub fn external(
        ids: impl IntoIterator<Item = RowId>,
        on_change: impl FnMut(SelectionChange<R>) + Send + 'static,
    ) -> Self {
        Self {
            mode: SelectionMode::External,
            selected: SelectionSet::from_ids(ids),
            disabled: false,
            selectable: None,
            on_change: Some(Box::new(on_change)),
        }
    }

    /// Reports internal changes too.
    pub fn with_callback(mut self, on_change: impl FnMut(SelectionChange<R>) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(on_change));
        self
    }

    /// Rows failing `predicate` are skipped by bulk selection and cannot be
    /// toggled on.
    pub fn with_selectable(mut self, predicate: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
        self.selectable = Some(Arc::new(predicate));
        self
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn selected(&self) -> &SelectionSet {
        &self.selected
    }

    pub fn is_selected(&self, id: &RowId) -> bool {
        self.selected.contains(id)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// While disabled every action is ignored.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_row_selectable(&self, row: &R) -> bool {
        self.selectable.as_ref().is_none_or(|f| f(row))
    }

    /// Selected rows of the view, in view order.
    pub fn selected_rows<'a>(&self, visible: &[VisibleRow<'a, R>]) -> Vec<&'a R> {
        visible
            .iter()
            .filter(|v| self.selected.contains(&v.id))
            .map(|v| v.row)
            .collect()
    }

    pub fn header_state(&self, visible: &[VisibleRow<'_, R>]) -> HeaderState {
        let (total, selected) = visible
            .iter()
            .filter(|v| self.is_row_selectable(v.row))
            .fold((0usize, 0usize), |(total, selected), v| {
                (total + 1, selected + usize::from(self.selected.contains(&v.id)))
            });
        match selected {
            0 => HeaderState::Unchecked,
            n if n == total => HeaderState::Checked,
            _ => HeaderState::Indeterminate,
        }
    }

    /// Overwrites the mirror with the caller's current value.
    ///
    /// Does not invoke the callback. Ignored in internal mode.
    pub fn sync_external(&mut self, ids: impl IntoIterator<Item = RowId>) -> bool {
        if self.mode != SelectionMode::External {
            tracing::warn!("sync_external called on an internally owned selection");
            return false;
        }
        let next = SelectionSet::from_ids(ids);
        if next == self.selected {
            return false;
        }
        self.selected = next;
        true
    }

    /// Applies `action` against the current view; returns whether the set
    /// changed.
    pub fn dispatch(&mut self, action: SelectionAction, visible: &[VisibleRow<'_, R>]) -> bool {
        if self.disabled {
            tracing::trace!(?action, "selection disabled, action ignored");
            return false;
        }

        let next = match &action {
            SelectionAction::Toggle(id) => {
                let on = !self.selected.contains(id);
                self.set_one(id, on, visible)
            }
            SelectionAction::Set(id, on) => self.set_one(id, *on, visible),
            SelectionAction::SelectAllVisible(checked) => self.selected.edited(|ids| {
                for v in visible.iter().filter(|v| self.is_row_selectable(v.row)) {
                    if *checked {
                        ids.insert(v.id.clone());
                    } else {
                        ids.remove(&v.id);
                    }
                }
            }),
            SelectionAction::Clear => self.selected.edited(BTreeSet::clear),
        };

        if next.same_as(&self.selected) {
            return false;
        }
        tracing::debug!(?action, mode = ?self.mode, selected = next.len(), "selection changed");
        self.selected = next;
        self.report(visible);
        true
    }

    /// Turning a row on requires it to be in the view and selectable; turning
    /// it off is always allowed.
    fn set_one(&self, id: &RowId, on: bool, visible: &[VisibleRow<'_, R>]) -> SelectionSet {
        if on {
            let allowed = visible
                .iter()
                .find(|v| &v.id == id)
                .is_some_and(|v| self.is_row_selectable(v.row));
            if !allowed {
                return self.selected.clone();
            }
        }
        self.selected.edited(|ids| {
            if on {
                ids.insert(id.clone());
            } else {
                ids.remove(id);
            }
        })
    }

    fn report(&mut self, visible: &[VisibleRow<'_, R>]) {
        let Some(on_change) = self.on_change.as_mut() else {
            return;
        };
        let change = SelectionChange {
            ids: self.selected.to_vec(),
            rows: visible
                .iter()
                .filter(|v| self.selected.contains(&v.id))
                .map(|v| v.row.clone())
                .collect(),
        };
        on_change(change);
    }
}
