use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Status;

/// Filter values keyed by column accessor key.
///
/// A `BTreeMap` keeps equality and hashing independent of insertion order.
pub type Filters = BTreeMap<String, String>;

/// Parameters of one admin list request; one cache entry per distinct value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListParams {
    pub status: Status,
    pub page: usize,
    pub limit: usize,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub filters: Filters,
}

impl AdminListParams {
    /// First page of the active list with no search or filters.
    pub fn first_page(status: Status, limit: usize) -> Self {
        Self {
            status,
            page: 1,
            limit,
            search: String::new(),
            filters: Filters::new(),
        }
    }

    pub fn is_first_page(&self) -> bool {
        self.page <= 1
    }
}
