use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tabula_cache::{QueryCache, Reconciler, ResourceMatcher, SocketMessage, lock_cache};
use tabula_grid::{
    CachedLoader, ColumnDef, Grid, JsonLoader, LoaderError, PageLink, SafeLoader, ShellPhase,
};
use tabula_model::{GridSettings, Page, ResourceTag, Row, RowAccess};
use tabula_query::{DatePrecision, FilterSpec, InputTarget, QueryError, QueryState};
use tabula_selection::{HeaderState, Selection, SelectionAction};
use tabula_tree::{TreeAction, TreeConfig};
use tokio::time::{Instant, advance};

fn row(value: Value) -> Row {
    Row::from_value(value).unwrap()
}

fn columns() -> Vec<ColumnDef<Row>> {
    vec![
        ColumnDef::new("name", "Name"),
        ColumnDef::new("role", "Role").with_cell(|row: &Row| {
            row.field_text("role")
                .map_or_else(|| "-".to_string(), |r| r.to_uppercase())
        }),
    ]
}

type Ready = std::future::Ready<Result<Page<Row>, LoaderError>>;

/// Loader over a fixed list that records every query it receives.
#[derive(Clone, Default)]
struct Recorder {
    queries: Arc<Mutex<Vec<QueryState>>>,
}

impl Recorder {
    fn loader(
        &self,
        rows: Vec<Row>,
    ) -> impl Fn(QueryState) -> Ready + Send + Sync + 'static {
        let queries = Arc::clone(&self.queries);
        move |query: QueryState| {
            queries.lock().unwrap().push(query.clone());
            let matching: Vec<Row> = rows
                .iter()
                .filter(|r| {
                    r.field_text("name")
                        .is_some_and(|n| n.to_lowercase().contains(&query.search.to_lowercase()))
                })
                .cloned()
                .collect();
            let total = matching.len();
            let start = (query.page - 1) * query.limit;
            let slice = matching.into_iter().skip(start).take(query.limit).collect();
            std::future::ready(Ok(Page::new(slice, query.page, query.limit, total)))
        }
    }

    fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    fn last(&self) -> QueryState {
        self.queries.lock().unwrap().last().cloned().unwrap()
    }
}

fn people() -> Vec<Row> {
    ["Alice", "Abc Corp", "Bob", "Carol", "Abcd"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| row(json!({"id": i.to_string(), "name": name, "role": "user"})))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn keystrokes_inside_the_debounce_window_fetch_once() {
    let recorder = Recorder::default();
    let loader = SafeLoader::new(recorder.loader(people()));
    let mut grid = Grid::new(columns(), GridSettings::default());

    assert_eq!(grid.phase(), ShellPhase::Idle);
    assert!(grid.sync(&loader).await);
    assert_eq!(recorder.calls(), 1);

    for text in ["a", "ab", "abc"] {
        grid.type_text(InputTarget::Search, text, Instant::now()).unwrap();
        assert!(!grid.poll(Instant::now()));
        assert!(!grid.sync(&loader).await);
        advance(Duration::from_millis(100)).await;
    }
    assert_eq!(recorder.calls(), 1);

    assert!(grid.settled().await);
    assert!(grid.sync(&loader).await);
    assert!(!grid.sync(&loader).await);

    assert_eq!(recorder.calls(), 2);
    assert_eq!(recorder.last().search, "abc");
    let names: Vec<String> = grid.rows().into_iter().map(|r| r.cells[0].clone()).collect();
    assert_eq!(names, vec!["Abc Corp", "Abcd"]);
}

#[tokio::test]
async fn stale_results_never_replace_newer_ones() {
    let mut grid = Grid::new(columns(), GridSettings::default());
    let slow = grid.next_fetch().unwrap();
    assert_eq!(grid.phase(), ShellPhase::Loading);

    assert!(grid.set_immediate(InputTarget::Filter("role".into()), "admin").unwrap());
    let fast = grid.next_fetch().unwrap();
    assert!(fast.generation > slow.generation);

    let newer = Arc::new(Page::new(vec![row(json!({"id": "n", "name": "new"}))], 1, 10, 1));
    let older = Arc::new(Page::new(vec![row(json!({"id": "o", "name": "old"}))], 1, 10, 1));
    assert!(grid.finish_fetch(&fast, newer));
    assert!(!grid.finish_fetch(&slow, older));

    assert_eq!(grid.phase(), ShellPhase::Ready);
    assert_eq!(grid.rows()[0].cells[0], "new");

    // A later refetch keeps the old rows under an overlay.
    let again = grid.refresh();
    assert_eq!(grid.phase(), ShellPhase::Refreshing);
    assert!(grid.shows_overlay());
    assert_eq!(grid.rows().len(), 1);
    assert!(grid.finish_fetch(&again, Arc::new(Page::empty(1, 10))));
    assert!(grid.rows().is_empty());
}

#[tokio::test]
async fn failed_fetch_degrades_to_an_empty_page() {
    let loader = SafeLoader::new(|_query: QueryState| async {
        Err::<Page<Row>, _>(LoaderError::request("503 Service Unavailable"))
    });
    let mut grid = Grid::new(columns(), GridSettings::default());
    grid.set_limit(20);
    assert!(grid.sync(&loader).await);

    let page = grid.page().unwrap();
    assert!(page.rows.is_empty());
    assert_eq!((page.page, page.limit, page.total, page.total_pages), (1, 20, 0, 0));
    assert_eq!(grid.footer().range_label(), "No results");
}

#[tokio::test]
async fn json_loader_tolerates_malformed_rows() {
    let loader = SafeLoader::new(JsonLoader::<_, Row>::new(|query: QueryState| async move {
        Ok::<_, LoaderError>(json!({"rows": "nope", "page": query.page, "limit": query.limit, "total": 3}))
    }));
    let page: Page<Row> = loader.load(&QueryState::new(10)).await;
    assert!(page.rows.is_empty());
    assert_eq!(page.total_pages, 1);

    let broken = SafeLoader::new(JsonLoader::<_, Row>::new(|_query: QueryState| async {
        Ok::<_, LoaderError>(json!("not a page"))
    }));
    assert_eq!(broken.load(&QueryState::new(10)).await, Page::empty(1, 10));
}

#[tokio::test]
async fn tree_mode_renders_visible_rows_with_indentation() {
    let rows = vec![
        row(json!({"id": "root", "name": "Root", "parentId": null})),
        row(json!({"id": "child", "name": "Child", "parentId": "root"})),
        row(json!({"id": "leaf", "name": "Leaf", "parentId": "child"})),
        row(json!({"id": "other", "name": "Other", "parentId": null})),
    ];
    let recorder = Recorder::default();
    let loader = SafeLoader::new(recorder.loader(rows));
    let mut grid = Grid::new(columns(), GridSettings::default()).with_tree(TreeConfig::new("parentId"));
    grid.sync(&loader).await;

    let outline = |grid: &Grid<Row>| {
        grid.rows()
            .iter()
            .map(|r| {
                let marker = match (r.has_children, r.expanded) {
                    (false, _) => "-",
                    (true, true) => "v",
                    (true, false) => ">",
                };
                format!("{marker} {}{} ({}px)", "  ".repeat(r.depth), r.cells[0], r.indent)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    insta::assert_snapshot!(outline(&grid), @r"
    > Root (0px)
    - Other (0px)
    ");
    let numbers = |grid: &Grid<Row>| grid.rows().iter().map(|r| r.number).collect::<Vec<_>>();
    assert_eq!(numbers(&grid), [1, 2]);

    assert!(grid.dispatch_tree(TreeAction::ExpandAll));
    insta::assert_snapshot!(outline(&grid), @r"
    v Root (0px)
    v   Child (16px)
    -     Leaf (32px)
    - Other (0px)
    ");
    assert_eq!(numbers(&grid), [1, 2, 3, 4]);
}

#[tokio::test]
async fn selection_follows_the_rows_on_screen() {
    let recorder = Recorder::default();
    let loader = SafeLoader::new(recorder.loader(people()));
    let selection = Selection::internal()
        .with_selectable(|row: &Row| row.field_text("name").as_deref() != Some("Bob"));
    let mut grid = Grid::new(columns(), GridSettings::default()).with_selection(selection);
    grid.sync(&loader).await;

    assert!(grid.dispatch_selection(SelectionAction::SelectAllVisible(true)));
    assert_eq!(grid.header_state(), HeaderState::Checked);
    let rows = grid.rows();
    assert_eq!(rows.iter().filter(|r| r.selected).count(), 4);
    assert!(!rows[2].selectable && !rows[2].selected);

    assert!(grid.dispatch_selection(SelectionAction::Toggle("0".into())));
    assert_eq!(grid.header_state(), HeaderState::Indeterminate);
}

#[tokio::test]
async fn cached_pages_reflect_realtime_updates_without_refetching() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let loader = move |query: QueryState| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            Ok::<_, LoaderError>(Page::new(
                vec![Row::from_value(json!({"id": "1", "name": "A"})).unwrap()],
                query.page,
                query.limit,
                1,
            ))
        }
    };
    let cache = Arc::new(Mutex::new(QueryCache::new()));
    let resource = ResourceTag::new("user").unwrap();
    let cached = CachedLoader::new(loader, Arc::clone(&cache), resource);
    let mut grid = Grid::new(columns(), GridSettings::default());

    assert!(grid.sync_cached(&cached).await);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let reconciler = Reconciler::new(ResourceMatcher::default());
    let message = SocketMessage::new(
        "user:upsert",
        json!({"user": {"id": "1", "name": "B"}, "previousStatus": "active", "newStatus": "active"}),
    );
    reconciler
        .apply_message(&mut lock_cache(&cache), message)
        .unwrap();

    let updated = cached.load(grid.query()).await;
    grid.show(updated);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(grid.rows()[0].cells[0], "B");
    assert_eq!(grid.page().unwrap().total, 1);

    let footer = grid.footer();
    assert_eq!(footer.range_label(), "1-1 of 1");
    assert_eq!(
        footer.links,
        vec![PageLink::Page {
            number: 1,
            current: true
        }]
    );
}

fn filtered_columns() -> Vec<ColumnDef<Row>> {
    vec![
        ColumnDef::new("name", "Name").with_filter(FilterSpec::text()),
        ColumnDef::new("createdAt", "Created")
            .with_filter(FilterSpec::date_range(DatePrecision::Day)),
        ColumnDef::new("role", "Role"),
    ]
}

#[tokio::test(start_paused = true)]
async fn declared_filters_route_to_their_controls() {
    let mut grid = Grid::new(filtered_columns(), GridSettings::default());

    // Date pickers commit at once, in the control's own encoding.
    assert!(
        grid.edit_filter("createdAt", "2024-01-01|2024-03-01T10:30", Instant::now())
            .unwrap()
    );
    assert_eq!(grid.query().filters["createdAt"], "2024-01-01|2024-03-01");
    assert!(!grid.controller().is_pending());

    // Text waits for the debounce delay.
    assert!(!grid.edit_filter("name", "ali", Instant::now()).unwrap());
    assert!(!grid.query().filters.contains_key("name"));
    advance(Duration::from_millis(299)).await;
    assert!(!grid.poll(Instant::now()));
    advance(Duration::from_millis(1)).await;
    assert!(grid.poll(Instant::now()));
    assert_eq!(grid.query().filters["name"], "ali");

    // Values the control cannot read never reach the query.
    let error = grid
        .edit_filter("createdAt", "yesterday|today", Instant::now())
        .unwrap_err();
    assert!(matches!(error, QueryError::Filter { ref key, .. } if key == "createdAt"));
    assert_eq!(grid.query().filters["createdAt"], "2024-01-01|2024-03-01");

    // Clearing a picker is immediate too.
    assert!(grid.edit_filter("createdAt", "", Instant::now()).unwrap());
    assert!(!grid.query().filters.contains_key("createdAt"));

    // Columns without a declared filter behave as text.
    assert!(!grid.edit_filter("role", "admin", Instant::now()).unwrap());
    assert!(grid.controller().is_pending());
}
