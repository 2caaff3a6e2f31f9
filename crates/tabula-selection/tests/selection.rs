use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use serde_json::json;
use tabula_model::{Row, RowAccess, RowId};
use tabula_selection::{
    HeaderState, Selection, SelectionAction, SelectionChange, SelectionMode, SelectionSet,
    VisibleRow,
};

fn rows(ids: &[&str]) -> Vec<Row> {
    ids.iter()
        .map(|id| Row::from_value(json!({"id": id, "locked": id.starts_with('x')})).unwrap())
        .collect()
}

fn view(rows: &[Row]) -> Vec<VisibleRow<'_, Row>> {
    rows.iter()
        .map(|row| VisibleRow::new(row.id().unwrap(), row))
        .collect()
}

fn unlocked(row: &Row) -> bool {
    row.field_text("locked").as_deref() != Some("true")
}

fn ids(set: &SelectionSet) -> Vec<&str> {
    set.iter().map(RowId::as_str).collect()
}

#[test]
fn select_all_only_touches_selectable_visible_rows() {
    let page = rows(&["a", "b", "x1"]);
    let visible = view(&page);
    let mut selection = Selection::internal().with_selectable(unlocked);
    selection.sync_external([RowId::from("ignored")]);
    assert!(selection.selected().is_empty());

    assert!(selection.dispatch(SelectionAction::SelectAllVisible(true), &visible));
    assert_eq!(ids(selection.selected()), vec!["a", "b"]);
    assert_eq!(selection.header_state(&visible), HeaderState::Checked);

    assert!(selection.dispatch(SelectionAction::Toggle(RowId::from("a")), &visible));
    assert_eq!(selection.header_state(&visible), HeaderState::Indeterminate);

    assert!(selection.dispatch(SelectionAction::SelectAllVisible(false), &visible));
    assert_eq!(selection.header_state(&visible), HeaderState::Unchecked);
}

#[test]
fn toggling_a_non_selectable_row_is_a_no_op() {
    let page = rows(&["a", "x1"]);
    let visible = view(&page);
    let mut selection = Selection::internal().with_selectable(unlocked);
    let before = selection.selected().clone();

    assert!(!selection.dispatch(SelectionAction::Toggle(RowId::from("x1")), &visible));
    assert!(selection.selected().same_as(&before));
    // Not in the view, so it cannot be switched on either.
    assert!(!selection.dispatch(SelectionAction::Toggle(RowId::from("zz")), &visible));
}

#[test]
fn header_is_unchecked_without_selectable_rows() {
    let page = rows(&["x1", "x2"]);
    let visible = view(&page);
    let selection = Selection::internal().with_selectable(unlocked);
    assert_eq!(selection.header_state(&visible), HeaderState::Unchecked);
    assert_eq!(selection.header_state(&[]), HeaderState::Unchecked);
}

#[test]
fn selection_survives_page_changes() {
    let first = rows(&["a", "b"]);
    let second = rows(&["c", "d"]);
    let mut selection = Selection::internal();

    selection.dispatch(SelectionAction::Toggle(RowId::from("a")), &view(&first));
    selection.dispatch(SelectionAction::SelectAllVisible(true), &view(&second));
    assert_eq!(ids(selection.selected()), vec!["a", "c", "d"]);

    selection.dispatch(SelectionAction::SelectAllVisible(false), &view(&second));
    assert_eq!(ids(selection.selected()), vec!["a"]);

    // Off-page rows can still be switched off by id.
    assert!(selection.dispatch(SelectionAction::Set(RowId::from("a"), false), &view(&second)));
    assert!(selection.selected().is_empty());
}

#[test]
fn external_mode_reports_every_change_and_mirrors_the_caller() {
    let page = rows(&["a", "b"]);
    let visible = view(&page);
    let seen: Arc<Mutex<Vec<SelectionChange<Row>>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let mut selection = Selection::external([RowId::from("off-page")], move |change| {
        sink.lock().unwrap().push(change);
    });
    assert_eq!(selection.mode(), SelectionMode::External);

    selection.dispatch(SelectionAction::Toggle(RowId::from("b")), &visible);
    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].ids, vec![RowId::from("b"), RowId::from("off-page")]);
        assert_eq!(seen[0].rows, vec![page[1].clone()]);
    }

    // The caller answers with its own value; syncing does not echo back.
    assert!(selection.sync_external([RowId::from("a")]));
    assert!(!selection.sync_external([RowId::from("a")]));
    assert!(selection.is_selected(&RowId::from("a")));
    assert_eq!(seen.lock().unwrap().len(), 1);

    assert!(selection.dispatch(SelectionAction::Clear, &visible));
    assert!(!selection.dispatch(SelectionAction::Clear, &visible));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[1].ids.is_empty());
}

#[test]
fn disabled_selection_ignores_everything() {
    let page = rows(&["a"]);
    let visible = view(&page);
    let mut selection = Selection::internal();
    selection.dispatch(SelectionAction::Toggle(RowId::from("a")), &visible);
    selection.set_disabled(true);

    assert!(!selection.dispatch(SelectionAction::Clear, &visible));
    assert!(!selection.dispatch(SelectionAction::SelectAllVisible(false), &visible));
    assert_eq!(ids(selection.selected()), vec!["a"]);
    assert_eq!(selection.selected_rows(&visible), vec![&page[0]]);
}

proptest! {
    #[test]
    fn select_all_then_unselect_all_restores_off_page_selection(
        page_len in 0usize..12,
        off_page in prop::collection::btree_set("[p-z][0-9]", 0..6),
    ) {
        let page_ids: Vec<String> = (0..page_len).map(|i| format!("a{i}")).collect();
        let page_refs: Vec<&str> = page_ids.iter().map(String::as_str).collect();
        let page = rows(&page_refs);
        let visible = view(&page);

        let mut selection = Selection::internal();
        let off_rows = rows(&off_page.iter().map(String::as_str).collect::<Vec<_>>());
        selection.dispatch(SelectionAction::SelectAllVisible(true), &view(&off_rows));
        let original = selection.selected().clone();

        selection.dispatch(SelectionAction::SelectAllVisible(true), &visible);
        selection.dispatch(SelectionAction::SelectAllVisible(false), &visible);
        prop_assert_eq!(selection.selected(), &original);
    }
}
