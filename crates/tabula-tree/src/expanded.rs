use std::collections::BTreeSet;
use std::sync::Arc;

use tabula_model::RowId;

/// Ids of rows whose children are shown.
///
/// Every mutation returns a new set; an unchanged set keeps its allocation so
/// callers can skip work with [`ExpandedSet::same_as`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedSet(Arc<BTreeSet<RowId>>);

impl ExpandedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = RowId>) -> Self {
        Self(Arc::new(ids.into_iter().collect()))
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowId> {
        self.0.iter()
    }

    /// Same allocation, i.e. no mutation happened in between.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn toggled(&self, id: &RowId) -> Self {
        let mut next = (*self.0).clone();
        if !next.remove(id) {
            next.insert(id.clone());
        }
        Self(Arc::new(next))
    }

    pub fn with(&self, id: &RowId, expanded: bool) -> Self {
        if self.contains(id) == expanded {
            return self.clone();
        }
        self.toggled(id)
    }
}
