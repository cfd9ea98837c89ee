/// Tracked list operations and child re-indexing
mod common;

use common::new_list;
use datatrack_core::errors::TrackingError;
use datatrack_core::{list_ops, map_ops, Action, Location, Tracker, Value};
use serde_json::json;

fn auto_list(tracker: &mut Tracker) -> datatrack_core::ItemId {
    tracker
        .create_list(Vec::new(), tracker.options().auto_convert(true))
        .expect("Should create list")
}

#[test]
fn test_set_replaces_and_records_update() {
    let mut tracker = Tracker::new();
    let list = new_list(&mut tracker);
    list_ops::push(&mut tracker, &list, "a").unwrap();

    list_ops::set(&mut tracker, &list, 0, "b").unwrap();

    let entry = &tracker.tracking_changes(&list, Some(1)).unwrap()[0];
    assert_eq!(entry.action(), Action::Update);
    assert_eq!(entry.location(), Some("0"));
    assert_eq!(entry.value(), Some("b"));
    assert_eq!(entry.removed_items(), Some(r#"["a"]"#));
    assert_eq!(entry.container_type(), Some("TrackedList"));
}

#[test]
fn test_set_out_of_range() {
    let mut tracker = Tracker::new();
    let list = new_list(&mut tracker);

    let result = list_ops::set(&mut tracker, &list, 3, "x");

    assert!(matches!(
        result,
        Err(TrackingError::IndexOutOfRange { index: 3, len: 0, .. })
    ));
    assert!(list_ops::is_empty(&tracker, &list).unwrap());
}

#[test]
fn test_remove_shifts_child_locations() {
    // GIVEN a list holding a plain value followed by a tracked child
    let mut tracker = Tracker::new();
    let list = auto_list(&mut tracker);
    list_ops::push(&mut tracker, &list, "head").unwrap();
    list_ops::push(&mut tracker, &list, json!({"state": "draft"})).unwrap();
    let child = list_ops::get(&tracker, &list, 1)
        .unwrap()
        .and_then(|value| value.as_tracked().cloned())
        .unwrap();

    // WHEN the head is removed and the child is mutated
    let removed = list_ops::remove(&mut tracker, &list, 0).unwrap();
    map_ops::set(&mut tracker, &child, "state", "final").unwrap();

    // THEN the propagated location uses the child's new index
    assert_eq!(removed, Value::from("head"));
    let entry = &tracker.tracking_changes(&list, Some(1)).unwrap()[0];
    assert_eq!(entry.location(), Some("0:state"));
    assert_eq!(entry.container_type(), Some("TrackedList"));
}

#[test]
fn test_reverse_relocates_children() {
    let mut tracker = Tracker::new();
    let list = auto_list(&mut tracker);
    list_ops::extend(
        &mut tracker,
        &list,
        vec![Value::from(json!([1])), Value::from("x"), Value::from("y")],
    )
    .unwrap();
    let child = list_ops::get(&tracker, &list, 0)
        .unwrap()
        .and_then(|value| value.as_tracked().cloned())
        .unwrap();

    list_ops::reverse(&mut tracker, &list).unwrap();

    assert_eq!(
        tracker.item(&child).unwrap().parent().unwrap().location,
        Location::Index(2)
    );
    assert_eq!(tracker.to_plain(&list).unwrap(), json!(["y", "x", [1]]));
}

#[test]
fn test_pop_detaches_child() {
    let mut tracker = Tracker::new();
    let list = auto_list(&mut tracker);
    list_ops::push(&mut tracker, &list, json!({"a": 1})).unwrap();

    let popped = list_ops::pop(&mut tracker, &list, Some(0)).unwrap();
    let child = popped.as_tracked().unwrap();

    assert!(tracker.item(child).unwrap().parent().is_none());
    let entry = &tracker.tracking_changes(&list, Some(1)).unwrap()[0];
    assert_eq!(entry.extra("passed_index"), Some("0"));
    assert_eq!(entry.removed_items(), Some(r#"[{"a":1}]"#));
}

#[test]
fn test_clear_records_removed_items() {
    let mut tracker = Tracker::new();
    let list = tracker
        .create_list(vec![Value::from(1i64), Value::from(2i64)], tracker.options())
        .unwrap();

    list_ops::clear(&mut tracker, &list).unwrap();

    let entry = &tracker.tracking_changes(&list, Some(1)).unwrap()[0];
    assert_eq!(entry.action(), Action::Remove);
    assert_eq!(entry.removed_items(), Some("[1,2]"));
    assert_eq!(list_ops::len(&tracker, &list).unwrap(), 0);
}

#[test]
fn test_extend_rejects_same_child_twice() {
    let mut tracker = Tracker::new();
    let list = new_list(&mut tracker);
    let child = common::new_map(&mut tracker);

    let result = list_ops::extend(
        &mut tracker,
        &list,
        vec![Value::Tracked(child.clone()), Value::Tracked(child)],
    );

    assert!(matches!(result, Err(TrackingError::AlreadyOwned { .. })));
    assert!(list_ops::is_empty(&tracker, &list).unwrap());
}

#[test]
fn test_copy_untracked_renders_children() {
    let mut tracker = Tracker::new();
    let list = auto_list(&mut tracker);
    list_ops::push(&mut tracker, &list, json!({"a": [1, 2]})).unwrap();

    let copy = list_ops::copy(&mut tracker, &list, true).unwrap();

    assert_eq!(
        copy.as_list().unwrap(),
        &vec![Value::from(json!({"a": [1, 2]}))]
    );
    let entry = &tracker.tracking_changes(&list, Some(1)).unwrap()[0];
    assert_eq!(entry.action(), Action::Copy);
    assert_eq!(entry.extra("untracked"), Some("true"));
}

#[test]
fn test_iter_reads_in_order() {
    let mut tracker = Tracker::new();
    let list = new_list(&mut tracker);
    for n in 0..3i64 {
        list_ops::push(&mut tracker, &list, n).unwrap();
    }

    let values: Vec<&Value> = list_ops::iter(&tracker, &list).unwrap().collect();
    assert_eq!(values, vec![&Value::from(0i64), &Value::from(1i64), &Value::from(2i64)]);
}

#[test]
fn test_inserting_a_resident_child_is_refused() {
    // GIVEN a list holding one tracked child at index 0
    let mut tracker = Tracker::new();
    let list = auto_list(&mut tracker);
    list_ops::push(&mut tracker, &list, json!({"n": 1})).unwrap();
    let child = list_ops::get(&tracker, &list, 0)
        .unwrap()
        .and_then(|value| value.as_tracked().cloned())
        .unwrap();

    // WHEN the same child is inserted at its own index, or pushed again
    let inserted = list_ops::insert(&mut tracker, &list, 0, Value::Tracked(child.clone()));
    let pushed = list_ops::push(&mut tracker, &list, Value::Tracked(child.clone()));

    // THEN both are refused and the list still holds it once
    assert!(matches!(inserted, Err(TrackingError::AlreadyOwned { .. })));
    assert!(matches!(pushed, Err(TrackingError::AlreadyOwned { .. })));
    assert_eq!(list_ops::len(&tracker, &list).unwrap(), 1);

    // AND mutations of the child still reach the list
    let before = tracker.tracking_changes(&list, None).unwrap().len();
    map_ops::set(&mut tracker, &child, "n", 2i64).unwrap();
    let history = tracker.tracking_changes(&list, None).unwrap();
    assert_eq!(history.len(), before + 1);
    assert_eq!(history[before].location(), Some("0:n"));
}

#[test]
fn test_set_with_resident_child_at_same_index_is_a_no_op_move() {
    let mut tracker = Tracker::new();
    let list = auto_list(&mut tracker);
    list_ops::push(&mut tracker, &list, json!({})).unwrap();
    list_ops::push(&mut tracker, &list, "tail").unwrap();
    let child = list_ops::get(&tracker, &list, 0)
        .unwrap()
        .and_then(|value| value.as_tracked().cloned())
        .unwrap();

    list_ops::set(&mut tracker, &list, 0, Value::Tracked(child.clone())).unwrap();
    let moved = list_ops::set(&mut tracker, &list, 1, Value::Tracked(child.clone()));

    assert!(matches!(moved, Err(TrackingError::AlreadyOwned { .. })));
    let link = tracker.item(&child).unwrap().parent().unwrap().clone();
    assert_eq!(link.location, Location::Index(0));
    assert_eq!(tracker.to_plain(&list).unwrap(), json!([{}, "tail"]));
}
