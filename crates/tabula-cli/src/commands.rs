use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tabula_cache::{CacheKey, ReconcileStats, SharedCache, lock_cache, spawn_reconciler};
use tabula_grid::decode_page;
use tabula_model::{GridSettings, Page, Row, RowAccess, RowId};
use tabula_query::QueryState;
use tabula_tree::{TreeAction, TreeConfig, TreeState};
use tracing::{info, info_span, warn};

use crate::snapshot::{BadLine, Snapshot, read_events};

/// Queue depth between the event reader and the reconciler task.
const EVENT_QUEUE: usize = 64;

/// Settings from `path`, or defaults when no path is given.
pub fn load_settings(path: Option<&Path>) -> Result<GridSettings> {
    match path {
        Some(path) => GridSettings::load(path).with_context(|| format!("load settings {}", path.display())),
        None => Ok(GridSettings::default()),
    }
}

// =============================================================================
// replay
// =============================================================================

#[derive(Debug)]
pub struct ReplayReport {
    pub stats: ReconcileStats,
    /// Event lines that were not JSON messages.
    pub unreadable: Vec<BadLine>,
    /// Cache version bumps caused by the events.
    pub version_bumps: u64,
    pub pages: Vec<(CacheKey, Arc<Page<Row>>)>,
}

/// Loads a cache snapshot, feeds every event through the reconciler task and
/// returns the resulting pages.
pub fn run_replay(snapshot_path: &Path, events_path: &Path, settings: &GridSettings) -> Result<ReplayReport> {
    let span = info_span!("replay", snapshot = %snapshot_path.display());
    let _guard = span.enter();

    let snapshot = Snapshot::load(snapshot_path)?;
    let reconciler = snapshot.reconciler(settings);
    let cache: SharedCache<Row> = Arc::new(Mutex::new(snapshot.into_cache()?));
    let start_version = lock_cache(&cache).version();
    let (messages, unreadable) = read_events(events_path)?;
    info!(
        entries = lock_cache(&cache).len(),
        events = messages.len(),
        "snapshot loaded"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("start event runtime")?;
    let stats = runtime.block_on(async {
        let handle = spawn_reconciler(Arc::clone(&cache), reconciler, EVENT_QUEUE);
        for message in messages {
            if !handle.send(message).await {
                warn!("reconciler stopped early");
                break;
            }
        }
        handle.shutdown().await
    });

    let guard = lock_cache(&cache);
    let report = ReplayReport {
        stats,
        unreadable,
        version_bumps: guard.version() - start_version,
        pages: guard
            .iter()
            .map(|(key, page)| (key.clone(), Arc::clone(page)))
            .collect(),
    };
    info!(
        applied = report.stats.applied,
        skipped = report.stats.skipped,
        changed = report.stats.entries_changed,
        "replay finished"
    );
    Ok(report)
}

// =============================================================================
// tree
// =============================================================================

#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub rows: PathBuf,
    pub parent_key: String,
    pub id_key: String,
    pub label: String,
    pub expand_all: bool,
}

/// One visible row of the printed hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    pub id: RowId,
    pub label: String,
    pub depth: usize,
    pub indent: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub orphan: bool,
}

/// Reads rows from a JSON array or a page object.
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read rows {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&content).with_context(|| format!("parse rows {}", path.display()))?;
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let row = Row::from_value(item);
                if row.is_none() {
                    warn!(index, "non-object row skipped");
                }
                row
            })
            .collect()),
        object @ Value::Object(_) => {
            let page = decode_page::<Row>(object, &QueryState::default())
                .with_context(|| format!("decode page {}", path.display()))?;
            Ok(page.rows)
        }
        _ => bail!("{}: expected an array of rows or a page object", path.display()),
    }
}

pub fn run_tree(options: &TreeOptions, settings: &GridSettings) -> Result<Vec<TreeLine>> {
    let rows = read_rows(&options.rows)?;
    let config =
        TreeConfig::from_settings(options.parent_key.clone(), settings).with_id_key(options.id_key.clone());
    let indent_size = config.indent_size;
    let mut state = TreeState::new(config);
    state.load(&rows);
    if options.expand_all {
        state.dispatch(TreeAction::ExpandAll);
    }

    let lines = state
        .visible()
        .into_iter()
        .map(|node| TreeLine {
            id: node.id.clone(),
            label: rows
                .get(node.index)
                .and_then(|row| row.field_text(&options.label))
                .map(|label| label.into_owned())
                .unwrap_or_default(),
            depth: node.depth,
            indent: node.indent(indent_size),
            has_children: node.has_children,
            expanded: state.is_expanded(&node.id),
            orphan: node.orphan,
        })
        .collect::<Vec<_>>();
    info!(rows = rows.len(), visible = lines.len(), "tree built");
    Ok(lines)
}
