use std::collections::BTreeSet;
use std::sync::Arc;

use tabula_model::RowId;

/// Immutable set of selected row ids.
///
/// Cloning shares the allocation; [`SelectionSet::same_as`] tells whether two
/// values are the same snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet(Arc<BTreeSet<RowId>>);

impl SelectionSet {
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

    /// Ids in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &RowId> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<RowId> {
        self.0.iter().cloned().collect()
    }

    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Applies `edit` to a copy; returns `self` untouched if the copy is equal.
    pub(crate) fn edited(&self, edit: impl FnOnce(&mut BTreeSet<RowId>)) -> Self {
        let mut next = (*self.0).clone();
        edit(&mut next);
        if next == *self.0 {
            self.clone()
        } else {
            Self(Arc::new(next))
        }
    }
}

impl FromIterator<RowId> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = RowId>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_edit_keeps_allocation() {
        let set = SelectionSet::from_ids([RowId::from("a")]);
        let same = set.edited(|ids| {
            ids.insert(RowId::from("a"));
        });
        assert!(same.same_as(&set));

        let grown = set.edited(|ids| {
            ids.insert(RowId::from("b"));
        });
        assert!(!grown.same_as(&set));
        assert_eq!(grown.len(), 2);
        assert_eq!(set.len(), 1);
    }
}
