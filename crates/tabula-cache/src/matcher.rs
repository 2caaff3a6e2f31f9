//! Decides whether a row belongs to a cached list view.

use std::collections::BTreeMap;

use tabula_model::{AdminListParams, GridSettings, RowAccess, RowKey};
use tabula_query::{FilterSpec, contains_ignore_case};

/// Per-resource rules for evaluating a cache entry's search and filters on
/// the client.
///
/// Filter keys without a declared [`FilterSpec`] are compared as text.
#[derive(Debug, Clone)]
pub struct ResourceMatcher<R> {
    pub key: RowKey<R>,
    /// Fields searched by the free-text `search` parameter.
    pub search_fields: Vec<String>,
    pub filters: BTreeMap<String, FilterSpec>,
}

impl<R> Default for ResourceMatcher<R> {
    fn default() -> Self {
        Self::from_settings(&GridSettings::default())
    }
}

impl<R> ResourceMatcher<R> {
    pub fn from_settings(settings: &GridSettings) -> Self {
        Self {
            key: RowKey::default(),
            search_fields: settings.search_fields.clone(),
            filters: BTreeMap::new(),
        }
    }

    pub fn with_key(mut self, key: RowKey<R>) -> Self {
        self.key = key;
        self
    }

    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, spec: FilterSpec) -> Self {
        self.filters.insert(key.into(), spec);
        self
    }
}

impl<R: RowAccess> ResourceMatcher<R> {
    /// Search and filter predicates only; status is checked by the caller.
    pub fn includes(&self, row: &R, params: &AdminListParams) -> bool {
        self.matches_search(row, &params.search) && self.matches_filters(row, params)
    }

    pub fn matches_search(&self, row: &R, search: &str) -> bool {
        let search = search.trim();
        if search.is_empty() {
            return true;
        }
        self.search_fields.iter().any(|field| {
            row.field_text(field)
                .is_some_and(|text| contains_ignore_case(&text, search))
        })
    }

    pub fn matches_filters(&self, row: &R, params: &AdminListParams) -> bool {
        params.filters.iter().all(|(key, raw)| {
            let control = self
                .filters
                .get(key)
                .map_or_else(|| FilterSpec::text().route(), FilterSpec::route);
            let field = row.field_text(key);
            control.matches(raw, field.as_deref())
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tabula_model::{Row, Status};
    use tabula_query::FilterOption;

    use super::*;

    fn row(value: serde_json::Value) -> Row {
        Row::from_value(value).unwrap()
    }

    #[test]
    fn search_spans_configured_fields() {
        let matcher: ResourceMatcher<Row> =
            ResourceMatcher::default().with_search_fields(["name", "email"]);
        let user = row(json!({"id": "1", "name": "Ada", "email": "ada@EXAMPLE.org"}));
        assert!(matcher.matches_search(&user, "example"));
        assert!(matcher.matches_search(&user, "  "));
        assert!(!matcher.matches_search(&user, "bob"));
    }

    #[test]
    fn filters_use_declared_controls() {
        let matcher: ResourceMatcher<Row> = ResourceMatcher::default().with_filter(
            "role",
            FilterSpec::multi_select(vec![
                FilterOption::new("admin", "Admin"),
                FilterOption::new("editor", "Editor"),
            ]),
        );
        let mut params = AdminListParams::first_page(Status::Active, 10);
        params.filters.insert("role".into(), "admin,editor".into());
        params.filters.insert("city".into(), "par".into());

        let hit = row(json!({"role": "editor", "city": "Paris"}));
        let miss = row(json!({"role": "viewer", "city": "Paris"}));
        assert!(matcher.includes(&hit, &params));
        assert!(!matcher.includes(&miss, &params));
    }
}
