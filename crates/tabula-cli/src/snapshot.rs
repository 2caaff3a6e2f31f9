//! On-disk formats read by `tabula replay`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tabula_cache::{CacheKey, QueryCache, Reconciler, ResourceMatcher, SocketMessage};
use tabula_grid::decode_page;
use tabula_model::{AdminListParams, GridSettings, ResourceTag, Row, RowKey};
use tabula_query::{FilterSpec, QueryState};

/// A cache dump: per-resource matching rules plus the cached pages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub resources: BTreeMap<ResourceTag, ResourceRules>,
    #[serde(default)]
    pub entries: Vec<SnapshotEntry>,
}

/// How a resource's rows are identified and matched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceRules {
    pub id_key: Option<String>,
    /// Overrides the settings' search fields.
    pub search_fields: Option<Vec<String>>,
    pub filters: BTreeMap<String, FilterSpec>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotEntry {
    pub resource: ResourceTag,
    pub params: AdminListParams,
    /// Page body as the loader returned it; decoded leniently.
    pub page: Value,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read snapshot {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parse snapshot {}", path.display()))
    }

    /// Reconciler with one matcher per declared resource.
    pub fn reconciler(&self, settings: &GridSettings) -> Reconciler<Row> {
        self.resources.iter().fold(
            Reconciler::new(ResourceMatcher::from_settings(settings)),
            |reconciler, (resource, rules)| {
                reconciler.with_resource(resource.clone(), rules.matcher(settings))
            },
        )
    }

    /// Fills a fresh cache with the snapshot's pages.
    pub fn into_cache(self) -> Result<QueryCache<Row>> {
        let mut cache = QueryCache::new();
        for entry in self.entries {
            let SnapshotEntry {
                resource,
                params,
                page,
            } = entry;
            let query = QueryState {
                page: params.page.max(1),
                limit: params.limit.max(1),
                search: params.search.clone(),
                filters: params.filters.clone(),
            };
            let page = decode_page::<Row>(page, &query)
                .with_context(|| format!("cached page for {resource} (page {})", params.page))?;
            cache.insert(CacheKey::new(resource, params), page);
        }
        Ok(cache)
    }
}

impl ResourceRules {
    pub fn matcher(&self, settings: &GridSettings) -> ResourceMatcher<Row> {
        let mut matcher = ResourceMatcher::from_settings(settings);
        if let Some(id_key) = &self.id_key {
            matcher = matcher.with_key(RowKey::field(id_key.clone()));
        }
        if let Some(fields) = &self.search_fields {
            matcher = matcher.with_search_fields(fields.iter().cloned());
        }
        self.filters
            .iter()
            .fold(matcher, |matcher, (key, spec)| matcher.with_filter(key.clone(), spec.clone()))
    }
}

/// One line of the events file that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadLine {
    pub line: usize,
    pub error: String,
}

/// Reads a JSON-lines events file. Blank lines and `#` comments are skipped;
/// lines that are not JSON messages are reported, not fatal.
pub fn read_events(path: &Path) -> Result<(Vec<SocketMessage>, Vec<BadLine>)> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read events {}", path.display()))?;
    let mut messages = Vec::new();
    let mut bad = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line_text = line.trim();
        if line_text.is_empty() || line_text.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<SocketMessage>(line_text) {
            Ok(message) => messages.push(message),
            Err(error) => {
                tracing::warn!(line = index + 1, %error, "unreadable event line skipped");
                bad.push(BadLine {
                    line: index + 1,
                    error: error.to_string(),
                });
            }
        }
    }
    Ok((messages, bad))
}
