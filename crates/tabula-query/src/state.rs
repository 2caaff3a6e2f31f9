//! The normalized query tuple and its transition rules.

use serde::{Deserialize, Serialize};
use tabula_model::{AdminListParams, Filters, Status};

/// Which page of data is wanted.
///
/// Invariants kept by every transition:
/// - `page >= 1` and `limit >= 1`
/// - changing `search`, `filters` or `limit` puts the query back on page 1
/// - `filters` never holds empty values; an empty string means "no filter"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState {
    pub page: usize,
    pub limit: usize,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub filters: Filters,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Structural equality: same page, limit, search and filter values,
/// regardless of the order filters were inserted in.
pub fn are_queries_equal(a: &QueryState, b: &QueryState) -> bool {
    a == b
}

impl QueryState {
    pub fn new(limit: usize) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            search: String::new(),
            filters: Filters::new(),
        }
    }

    /// Replaces the filter map. No-op when the values are unchanged.
    pub fn apply_filters(&mut self, next: Filters) -> bool {
        let next = normalize_filters(next);
        if next == self.filters {
            return false;
        }
        self.filters = next;
        self.page = 1;
        true
    }

    /// Sets or clears (`""`) a single filter value.
    pub fn set_filter(&mut self, key: &str, value: &str) -> bool {
        let mut next = self.filters.clone();
        if value.is_empty() {
            next.remove(key);
        } else {
            next.insert(key.to_string(), value.to_string());
        }
        self.apply_filters(next)
    }

    pub fn clear_filter(&mut self, key: &str) -> bool {
        self.set_filter(key, "")
    }

    pub fn apply_search(&mut self, search: &str) -> bool {
        if self.search == search {
            return false;
        }
        self.search = search.to_string();
        self.page = 1;
        true
    }

    /// Changes the page size and returns to page 1.
    pub fn apply_limit(&mut self, limit: usize) -> bool {
        let limit = limit.max(1);
        if self.limit == limit && self.page == 1 {
            return false;
        }
        self.limit = limit;
        self.page = 1;
        true
    }

    /// Moves to page `n`, clamped to `[1, max(total_pages_hint, 1)]`.
    pub fn apply_page(&mut self, n: usize, total_pages_hint: usize) -> bool {
        let target = n.clamp(1, total_pages_hint.max(1));
        if target == self.page {
            return false;
        }
        self.page = target;
        true
    }

    /// Drops search and filters and returns to page 1, keeping the limit.
    pub fn reset(&mut self) -> bool {
        let fresh = Self::new(self.limit);
        if *self == fresh {
            return false;
        }
        *self = fresh;
        true
    }

    pub fn has_criteria(&self) -> bool {
        !self.search.is_empty() || !self.filters.is_empty()
    }

    /// Cache key parameters for this query within a status partition.
    pub fn to_params(&self, status: Status) -> AdminListParams {
        AdminListParams {
            status,
            page: self.page,
            limit: self.limit,
            search: self.search.clone(),
            filters: self.filters.clone(),
        }
    }
}

fn normalize_filters(filters: Filters) -> Filters {
    filters.into_iter().filter(|(_, v)| !v.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(pairs: &[(&str, &str)]) -> Filters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn filter_change_resets_page() {
        let mut query = QueryState::new(10);
        query.apply_page(3, 5);
        assert!(query.apply_filters(filters(&[("category", "tools")])));
        assert_eq!(query.page, 1);
    }

    #[test]
    fn equal_filters_are_a_no_op() {
        let mut query = QueryState::new(10);
        query.apply_filters(filters(&[("a", "1"), ("b", "2")]));
        query.apply_page(2, 4);
        assert!(!query.apply_filters(filters(&[("b", "2"), ("a", "1"), ("c", "")])));
        assert_eq!(query.page, 2);
    }

    #[test]
    fn page_is_clamped_to_hint() {
        let mut query = QueryState::new(10);
        assert!(query.apply_page(9, 3));
        assert_eq!(query.page, 3);
        assert!(query.apply_page(0, 3));
        assert_eq!(query.page, 1);
        assert!(!query.apply_page(4, 0));
    }

    #[test]
    fn limit_change_resets_page() {
        let mut query = QueryState::new(10);
        query.apply_page(2, 2);
        assert!(query.apply_limit(10));
        assert_eq!(query.page, 1);
        assert!(!query.apply_limit(10));
        assert!(query.apply_limit(0));
        assert_eq!(query.limit, 1);
    }

    #[test]
    fn reset_keeps_limit() {
        let mut query = QueryState::new(20);
        query.apply_search("lamp");
        query.set_filter("brand", "acme");
        assert!(query.reset());
        assert_eq!(query, QueryState::new(20));
        assert!(!query.has_criteria());
    }
}
