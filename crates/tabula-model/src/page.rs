//! Paginated result slices.

use serde::{Deserialize, Serialize};

use crate::{RowAccess, RowId, RowKey};

/// Number of pages needed for `total` rows at `limit` rows per page.
///
/// Zero rows (or a zero limit) means zero pages.
pub fn total_pages_for(total: usize, limit: usize) -> usize {
    if total == 0 || limit == 0 {
        0
    } else {
        total.div_ceil(limit)
    }
}

/// One fetched page of rows plus its pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<R> {
    pub rows: Vec<R>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<R> Page<R> {
    /// Builds a page, deriving `total_pages` from `total` and `limit`.
    pub fn new(rows: Vec<R>, page: usize, limit: usize, total: usize) -> Self {
        Self {
            rows,
            page,
            limit,
            total,
            total_pages: total_pages_for(total, limit),
        }
    }

    /// The well-formed "no data" page for a request.
    pub fn empty(page: usize, limit: usize) -> Self {
        Self::new(Vec::new(), page, limit, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Re-derives `total_pages` after `total` changed.
    pub fn recompute_total_pages(&mut self) {
        self.total_pages = total_pages_for(self.total, self.limit);
    }

    /// 1-based index of the first row on this page, 0 when empty.
    pub fn first_row_number(&self) -> usize {
        if self.rows.is_empty() {
            0
        } else {
            self.page.saturating_sub(1) * self.limit + 1
        }
    }

    /// 1-based index of the last row on this page, 0 when empty.
    pub fn last_row_number(&self) -> usize {
        if self.rows.is_empty() {
            0
        } else {
            self.first_row_number() + self.rows.len() - 1
        }
    }
}

impl<R: RowAccess> Page<R> {
    /// Position of the row with `id`, resolved with `key`.
    pub fn position_of(&self, id: &RowId, key: &RowKey<R>) -> Option<usize> {
        self.rows
            .iter()
            .enumerate()
            .position(|(index, row)| &key.resolve(row, index) == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages_for(0, 10), 0);
        assert_eq!(total_pages_for(23, 10), 3);
        assert_eq!(total_pages_for(20, 10), 2);
        assert_eq!(total_pages_for(1, 10), 1);
        assert_eq!(total_pages_for(5, 0), 0);
    }

    #[test]
    fn row_numbers_follow_page() {
        let page = Page::new(vec![1, 2, 3], 3, 10, 23);
        assert_eq!(page.first_row_number(), 21);
        assert_eq!(page.last_row_number(), 23);
        assert_eq!(Page::<u8>::empty(1, 10).first_row_number(), 0);
    }
}
