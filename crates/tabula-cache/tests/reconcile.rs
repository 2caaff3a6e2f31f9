use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use serde_json::{Value, json};
use tabula_cache::{
    CacheKey, QueryCache, Reconciler, ResourceMatcher, SocketMessage, lock_cache,
    spawn_reconciler,
};
use tabula_model::{
    AdminListParams, MutationEvent, Page, RemoveEvent, ResourceTag, Row, RowAccess, RowId, Status,
    UpsertEvent,
};
use tabula_query::{FilterOption, FilterSpec};

fn user() -> ResourceTag {
    ResourceTag::new("user").unwrap()
}

fn row(value: Value) -> Row {
    Row::from_value(value).unwrap()
}

fn params(status: Status, page: usize) -> AdminListParams {
    AdminListParams {
        page,
        ..AdminListParams::first_page(status, 10)
    }
}

fn key(params: AdminListParams) -> CacheKey {
    CacheKey::new(user(), params)
}

fn upsert(row: Row, previous: Option<Status>, new: Status) -> MutationEvent<Row> {
    MutationEvent::Upsert(UpsertEvent {
        row,
        previous_status: previous,
        new_status: new,
    })
}

fn names(page: &Page<Row>) -> Vec<String> {
    page.rows
        .iter()
        .map(|r| r.field_text("name").unwrap_or_default().into_owned())
        .collect()
}

fn reconciler() -> Reconciler<Row> {
    Reconciler::new(ResourceMatcher::default()).with_resource(
        user(),
        ResourceMatcher::default().with_filter(
            "role",
            FilterSpec::select(vec![
                FilterOption::new("admin", "Admin"),
                FilterOption::new("guest", "Guest"),
            ]),
        ),
    )
}

#[test]
fn upsert_replaces_an_existing_row_in_place() {
    let mut cache = QueryCache::new();
    let first = key(params(Status::Active, 1));
    cache.insert(
        first.clone(),
        Page::new(vec![row(json!({"id": "1", "name": "A"}))], 1, 10, 1),
    );

    let changed = reconciler().apply(
        &mut cache,
        &user(),
        &upsert(
            row(json!({"id": "1", "name": "B"})),
            Some(Status::Active),
            Status::Active,
        ),
    );

    assert_eq!(changed, 1);
    let page = cache.get(&first).unwrap();
    assert_eq!(names(&page), vec!["B"]);
    assert_eq!(page.total, 1);
    assert_eq!(page.total_pages, 1);
}

#[test]
fn remove_only_touches_entries_holding_the_row() {
    let mut cache = QueryCache::new();
    let first = key(params(Status::Active, 1));
    let second = key(params(Status::Active, 2));
    let first_rows: Vec<Row> = (0..10)
        .map(|i| row(json!({"id": format!("p1-{i}"), "name": "x"})))
        .collect();
    cache.insert(first.clone(), Page::new(first_rows, 1, 10, 12));
    cache.insert(
        second.clone(),
        Page::new(
            vec![
                row(json!({"id": "p2-0", "name": "y"})),
                row(json!({"id": "p2-1", "name": "z"})),
            ],
            2,
            10,
            12,
        ),
    );
    let first_before = cache.get(&first).unwrap();
    let version = cache.version();

    let event = MutationEvent::Remove(RemoveEvent {
        id: "p2-1".into(),
        previous_status: Status::Active,
    });
    assert_eq!(reconciler().apply(&mut cache, &user(), &event), 1);

    assert!(Arc::ptr_eq(&first_before, &cache.get(&first).unwrap()));
    let page_two = cache.get(&second).unwrap();
    assert_eq!(names(&page_two), vec!["y"]);
    assert_eq!(page_two.total, 11);
    assert_eq!(page_two.total_pages, 2);
    assert_eq!(cache.version(), version + 1);

    // Nothing left to remove.
    assert_eq!(reconciler().apply(&mut cache, &user(), &event), 0);
    assert_eq!(cache.version(), version + 1);
}

#[test]
fn new_rows_are_only_placed_on_first_pages() {
    let mut cache = QueryCache::new();
    let first = key(params(Status::Active, 1));
    let second = key(params(Status::Active, 2));
    let filler = |prefix: &str| -> Vec<Row> {
        (0..10)
            .map(|i| row(json!({"id": format!("{prefix}{i}"), "name": "n"})))
            .collect()
    };
    cache.insert(first.clone(), Page::new(filler("a"), 1, 10, 20));
    cache.insert(second.clone(), Page::new(filler("b"), 2, 10, 20));

    let event = upsert(row(json!({"id": "new", "name": "N"})), None, Status::Active);
    assert_eq!(reconciler().apply(&mut cache, &user(), &event), 2);

    let page_one = cache.get(&first).unwrap();
    assert_eq!(page_one.rows.len(), 10);
    assert_eq!(page_one.rows[0].id().unwrap().as_str(), "new");
    assert_eq!(page_one.total, 21);
    assert_eq!(page_one.total_pages, 3);

    let page_two = cache.get(&second).unwrap();
    assert!(page_two.rows.iter().all(|r| r.id().unwrap().as_str() != "new"));
    assert_eq!(page_two.total, 21);
    assert_eq!(page_two.total_pages, 3);
}

#[test]
fn rows_pushed_off_a_full_first_page_stay_counted_once() {
    let mut cache = QueryCache::new();
    let first = key(AdminListParams::first_page(Status::Active, 2));
    cache.insert(
        first.clone(),
        Page::new(
            vec![
                row(json!({"id": "a", "name": "A"})),
                row(json!({"id": "b", "name": "B"})),
            ],
            1,
            2,
            2,
        ),
    );

    let created = upsert(row(json!({"id": "c", "name": "C"})), None, Status::Active);
    assert_eq!(reconciler().apply(&mut cache, &user(), &created), 1);
    let page = cache.get(&first).unwrap();
    assert_eq!(names(&page), vec!["C", "A"]);
    assert_eq!(page.total, 3);
    assert!(cache.entry(&first).unwrap().off_page().contains::<RowId>(&"b".into()));

    // An edit of the row that fell off the page is not a new row.
    let edited = upsert(
        row(json!({"id": "b", "name": "B2"})),
        Some(Status::Active),
        Status::Active,
    );
    assert_eq!(reconciler().apply(&mut cache, &user(), &edited), 0);
    let page = cache.get(&first).unwrap();
    assert_eq!(names(&page), vec!["C", "A"]);
    assert_eq!(page.total, 3);

    // Moving it to the trash still takes it out of the count.
    let deleted = upsert(
        row(json!({"id": "b", "name": "B2"})),
        Some(Status::Active),
        Status::Deleted,
    );
    assert_eq!(reconciler().apply(&mut cache, &user(), &deleted), 1);
    assert_eq!(cache.get(&first).unwrap().total, 2);
}

#[test]
fn upserted_rows_without_an_id_are_skipped() {
    let mut cache = QueryCache::new();
    let first = key(params(Status::Active, 1));
    cache.insert(
        first.clone(),
        Page::new(vec![row(json!({"name": "legacy"}))], 1, 10, 1),
    );
    let version = cache.version();

    let event = upsert(row(json!({"name": "anonymous"})), None, Status::Active);
    assert_eq!(reconciler().apply(&mut cache, &user(), &event), 0);
    assert_eq!(cache.version(), version);
    let page = cache.get(&first).unwrap();
    assert_eq!(names(&page), vec!["legacy"]);
    assert_eq!(page.total, 1);

    let batch = MutationEvent::BatchUpsert(vec![
        UpsertEvent {
            row: row(json!({"name": "anonymous"})),
            previous_status: None,
            new_status: Status::Active,
        },
        UpsertEvent {
            row: row(json!({"id": "2", "name": "named"})),
            previous_status: None,
            new_status: Status::Active,
        },
    ]);
    assert_eq!(reconciler().apply(&mut cache, &user(), &batch), 1);
    assert_eq!(names(&cache.get(&first).unwrap()), vec!["named", "legacy"]);
}

#[test]
fn status_and_filters_decide_membership() {
    let mut cache = QueryCache::new();
    let active = key(params(Status::Active, 1));
    let trash = key(params(Status::Deleted, 1));
    let mut admins = params(Status::Active, 1);
    admins.filters.insert("role".into(), "admin".into());
    let admins = key(admins);

    let ada = json!({"id": "7", "name": "Ada", "role": "admin"});
    cache.insert(active.clone(), Page::new(vec![row(ada.clone())], 1, 10, 1));
    cache.insert(admins.clone(), Page::new(vec![row(ada.clone())], 1, 10, 1));
    cache.insert(trash.clone(), Page::new(vec![], 1, 10, 0));

    // Demoted: leaves the admin view, stays in the active list.
    let mut demoted = ada.clone();
    demoted["role"] = json!("guest");
    reconciler().apply(
        &mut cache,
        &user(),
        &upsert(row(demoted), Some(Status::Active), Status::Active),
    );
    assert_eq!(cache.get(&admins).unwrap().total, 0);
    assert_eq!(cache.get(&active).unwrap().total, 1);

    // Soft-deleted: moves from the active list to the trash.
    reconciler().apply(
        &mut cache,
        &user(),
        &upsert(row(ada), Some(Status::Active), Status::Deleted),
    );
    assert!(cache.get(&active).unwrap().rows.is_empty());
    assert_eq!(cache.get(&active).unwrap().total_pages, 0);
    assert_eq!(cache.get(&trash).unwrap().total, 1);
}

#[test]
fn batch_upsert_bumps_the_version_once() {
    let mut cache = QueryCache::new();
    let first = key(params(Status::Active, 1));
    cache.insert(first.clone(), Page::new(vec![], 1, 10, 0));
    let versions = cache.subscribe();
    let version = cache.version();

    let batch = MutationEvent::BatchUpsert(
        ["1", "2", "3"]
            .into_iter()
            .map(|id| UpsertEvent {
                row: row(json!({"id": id, "name": id})),
                previous_status: None,
                new_status: Status::Active,
            })
            .collect(),
    );
    assert_eq!(reconciler().apply(&mut cache, &user(), &batch), 1);
    assert_eq!(cache.version(), version + 1);
    assert!(versions.has_changed().unwrap());

    let page = cache.get(&first).unwrap();
    assert_eq!(names(&page), vec!["3", "2", "1"]);
    assert_eq!(page.total, 3);
}

#[test]
fn other_resources_are_left_alone() {
    let mut cache = QueryCache::new();
    let role = CacheKey::new(
        ResourceTag::new("role").unwrap(),
        params(Status::Active, 1),
    );
    cache.insert(role.clone(), Page::new(vec![], 1, 10, 0));
    let event = upsert(row(json!({"id": "1", "name": "A"})), None, Status::Active);
    assert_eq!(reconciler().apply(&mut cache, &user(), &event), 0);
    assert_eq!(cache.get(&role).unwrap().total, 0);
}

#[test]
fn raw_messages_are_decoded_before_applying() {
    let mut cache = QueryCache::new();
    let first = key(params(Status::Active, 1));
    cache.insert(first.clone(), Page::new(vec![], 1, 10, 0));

    let message = SocketMessage::new(
        "user:upsert",
        json!({"user": {"id": "1", "name": "A"}, "previousStatus": null, "newStatus": "active"}),
    );
    assert_eq!(reconciler().apply_message(&mut cache, message).unwrap(), 1);
    assert!(
        reconciler()
            .apply_message(&mut cache, SocketMessage::new("user:explode", json!({})))
            .is_err()
    );
    assert_eq!(cache.get(&first).unwrap().total, 1);
}

#[tokio::test]
async fn actor_applies_messages_in_order_and_skips_bad_ones() {
    let cache = Arc::new(Mutex::new(QueryCache::<Row>::new()));
    let first = key(params(Status::Active, 1));
    lock_cache(&cache).insert(
        first.clone(),
        Page::new(vec![row(json!({"id": "1", "name": "A"}))], 1, 10, 1),
    );

    let handle = spawn_reconciler(Arc::clone(&cache), reconciler(), 8);
    let messages = [
        SocketMessage::new(
            "user:upsert",
            json!({"user": {"id": "1", "name": "B"}, "previousStatus": "active", "newStatus": "active"}),
        ),
        SocketMessage::new("user", json!({})),
        SocketMessage::new("user:remove", json!({"id": "1", "previousStatus": "active"})),
    ];
    for message in messages {
        assert!(handle.send(message).await);
    }
    let stats = handle.shutdown().await;

    assert_eq!(stats.applied, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.entries_changed, 2);
    let page = lock_cache(&cache).get(&first).unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.total, 0);
}

fn arbitrary_upsert() -> impl Strategy<Value = MutationEvent<Row>> {
    let status = prop_oneof![Just(Status::Active), Just(Status::Deleted)];
    (
        0u8..6,
        "[a-c]{1,3}",
        prop_oneof![Just("admin"), Just("guest")],
        prop::option::of(status.clone()),
        status,
    )
        .prop_map(|(id, name, role, previous, new)| {
            upsert(
                row(json!({"id": id.to_string(), "name": name, "role": role})),
                previous,
                new,
            )
        })
}

fn seeded_cache() -> QueryCache<Row> {
    let mut cache = QueryCache::new();
    let rows = |ids: &[u8]| -> Vec<Row> {
        ids.iter()
            .map(|id| row(json!({"id": id.to_string(), "name": "ab", "role": "admin"})))
            .collect()
    };
    cache.insert(key(params(Status::Active, 1)), Page::new(rows(&[0, 1]), 1, 2, 5));
    cache.insert(key(params(Status::Active, 2)), Page::new(rows(&[2, 3]), 2, 2, 5));
    let mut searched = params(Status::Active, 1);
    searched.search = "b".into();
    searched.filters.insert("role".into(), "admin".into());
    cache.insert(key(searched), Page::new(rows(&[1]), 1, 10, 1));
    cache.insert(key(params(Status::Deleted, 1)), Page::new(vec![], 1, 10, 0));
    cache
}

fn snapshot(cache: &QueryCache<Row>) -> Vec<(CacheKey, Page<Row>)> {
    cache
        .iter()
        .map(|(key, page)| (key.clone(), (**page).clone()))
        .collect()
}

/// A change to one row, applied both to the cache and to a plain model.
#[derive(Debug, Clone)]
enum Change {
    Upsert { id: u8, status: Status, role: &'static str },
    Remove { id: u8 },
}

fn arbitrary_change() -> impl Strategy<Value = Change> {
    let status = prop_oneof![Just(Status::Active), Just(Status::Deleted)];
    prop_oneof![
        3 => (0u8..8, status, prop_oneof![Just("admin"), Just("guest")])
            .prop_map(|(id, status, role)| Change::Upsert { id, status, role }),
        1 => (0u8..8).prop_map(|id| Change::Remove { id }),
    ]
}

/// Ids per status as the server would hold them.
#[derive(Default)]
struct Partitions(BTreeMap<u8, Status>);

impl Partitions {
    fn event(&mut self, change: &Change) -> Option<MutationEvent<Row>> {
        match *change {
            Change::Upsert { id, status, role } => {
                let previous = self.0.insert(id, status);
                Some(upsert(
                    row(json!({"id": id.to_string(), "name": "n", "role": role})),
                    previous,
                    status,
                ))
            }
            Change::Remove { id } => self.0.remove(&id).map(|previous| {
                MutationEvent::Remove(RemoveEvent {
                    id: id.to_string().into(),
                    previous_status: previous,
                })
            }),
        }
    }

    fn count(&self, status: Status) -> usize {
        self.0.values().filter(|s| **s == status).count()
    }

    fn ids(&self, status: Status) -> BTreeSet<String> {
        self.0
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(id, _)| id.to_string())
            .collect()
    }
}

proptest! {
    #[test]
    fn first_page_totals_follow_the_partitions(
        changes in prop::collection::vec(arbitrary_change(), 0..24),
    ) {
        let reconciler = reconciler();
        let mut partitions = Partitions::default();
        let mut cache = QueryCache::new();
        let seed: Vec<Row> = [0u8, 1]
            .iter()
            .map(|&id| {
                partitions.0.insert(id, Status::Active);
                row(json!({"id": id.to_string(), "name": "n", "role": "admin"}))
            })
            .collect();
        cache.insert(key(AdminListParams::first_page(Status::Active, 2)), Page::new(seed, 1, 2, 2));
        cache.insert(key(AdminListParams::first_page(Status::Deleted, 2)), Page::new(vec![], 1, 2, 0));

        for change in &changes {
            if let Some(event) = partitions.event(change) {
                reconciler.apply(&mut cache, &user(), &event);
            }
        }

        for (key, page) in cache.iter() {
            let status = key.params.status;
            prop_assert_eq!(page.total, partitions.count(status));
            let expected = partitions.ids(status);
            for row in &page.rows {
                prop_assert!(expected.contains(row.id().unwrap().as_str()));
            }
        }
    }

    #[test]
    fn applying_an_upsert_twice_equals_applying_it_once(
        history in prop::collection::vec(arbitrary_upsert(), 0..4),
        event in arbitrary_upsert(),
    ) {
        let reconciler = reconciler();
        let mut cache = seeded_cache();
        for earlier in &history {
            reconciler.apply(&mut cache, &user(), earlier);
        }

        reconciler.apply(&mut cache, &user(), &event);
        let once = snapshot(&cache);
        reconciler.apply(&mut cache, &user(), &event);
        prop_assert_eq!(snapshot(&cache), once);
    }

    #[test]
    fn totals_and_page_counts_stay_consistent(
        events in prop::collection::vec(arbitrary_upsert(), 0..8),
    ) {
        let reconciler = reconciler();
        let mut cache = seeded_cache();
        for event in &events {
            reconciler.apply(&mut cache, &user(), event);
        }
        for (_, page) in cache.iter() {
            prop_assert_eq!(page.total_pages, tabula_model::total_pages_for(page.total, page.limit));
            prop_assert!(page.rows.len() <= page.limit);
        }
    }
}
