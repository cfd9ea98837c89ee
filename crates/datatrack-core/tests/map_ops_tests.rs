/// Tracked map operations: recorded actions, locations and values
mod common;

use common::{new_auto_map, new_map};
use datatrack_core::errors::TrackingError;
use datatrack_core::{map_ops, Action, Tracker, Value};
use serde_json::json;

#[test]
fn test_set_then_update_then_pop_status() {
    // GIVEN an empty map
    let mut tracker = Tracker::new();
    let map = new_map(&mut tracker);

    // WHEN status is set, updated and popped
    map_ops::set(&mut tracker, &map, "status", "pending").unwrap();
    let added = tracker.tracking_changes(&map, Some(1)).unwrap()[0].clone();
    map_ops::set(&mut tracker, &map, "status", "complete").unwrap();
    let updated = tracker.tracking_changes(&map, Some(1)).unwrap()[0].clone();
    let popped = map_ops::pop(&mut tracker, &map, "status", None).unwrap();
    let removed = tracker.tracking_changes(&map, Some(1)).unwrap()[0].clone();

    // THEN each call is recorded with the matching action
    assert_eq!(added.action(), Action::Add);
    assert_eq!(added.location(), Some("status"));
    assert_eq!(updated.action(), Action::Update);
    assert_eq!(removed.action(), Action::Remove);
    assert_eq!(removed.value(), Some("complete"));
    assert!(removed.removed_items().unwrap().contains("complete"));
    assert_eq!(popped, Some(Value::from("complete")));
    assert!(map_ops::is_empty(&tracker, &map).unwrap());
}

#[test]
fn test_every_entry_carries_type_method_and_locked() {
    let mut tracker = Tracker::new();
    let map = new_map(&mut tracker);

    map_ops::set(&mut tracker, &map, "a", 1i64).unwrap();

    let entry = &tracker.tracking_changes(&map, Some(1)).unwrap()[0];
    assert_eq!(entry.container_type(), Some("TrackedMap"));
    assert_eq!(entry.extra("method"), Some("set"));
    assert_eq!(entry.extra("locked"), Some("false"));
    assert_eq!(entry.subject_id(), &map);
    assert!(entry.tree().is_empty());
}

#[test]
fn test_remove_missing_key_fails_without_changing_content() {
    let mut tracker = Tracker::new();
    let map = new_map(&mut tracker);
    map_ops::set(&mut tracker, &map, "a", 1i64).unwrap();

    let result = map_ops::remove(&mut tracker, &map, "b");

    assert!(matches!(result, Err(TrackingError::KeyNotFound { .. })));
    assert_eq!(tracker.to_plain(&map).unwrap(), json!({"a": 1}));
}

#[test]
fn test_update_records_single_entry_with_replaced_values() {
    let mut tracker = Tracker::new();
    let map = new_map(&mut tracker);
    map_ops::set(&mut tracker, &map, "a", 1i64).unwrap();
    let before = tracker.tracking_changes(&map, None).unwrap().len();

    map_ops::update(
        &mut tracker,
        &map,
        vec![
            ("a".to_string(), Value::from(10i64)),
            ("b".to_string(), Value::from(20i64)),
        ],
    )
    .unwrap();

    let history = tracker.tracking_changes(&map, None).unwrap();
    assert_eq!(history.len(), before + 1);
    let entry = history.last().unwrap();
    assert_eq!(entry.action(), Action::Update);
    assert_eq!(entry.removed_items(), Some("[1]"));
    assert_eq!(entry.value(), Some(r#"{"a":10,"b":20}"#));
    assert_eq!(tracker.to_plain(&map).unwrap(), json!({"a": 10, "b": 20}));
}

#[test]
fn test_update_with_foreign_child_leaves_map_untouched() {
    let mut tracker = Tracker::new();
    let owner = new_map(&mut tracker);
    let other = new_map(&mut tracker);
    let child = new_map(&mut tracker);
    map_ops::set(&mut tracker, &owner, "c", child.clone()).unwrap();

    let result = map_ops::update(
        &mut tracker,
        &other,
        vec![
            ("x".to_string(), Value::from(1i64)),
            ("c".to_string(), Value::Tracked(child)),
        ],
    );

    assert!(matches!(result, Err(TrackingError::AlreadyOwned { .. })));
    assert!(map_ops::is_empty(&tracker, &other).unwrap());
}

#[test]
fn test_clear_detaches_children() {
    let mut tracker = Tracker::new();
    let map = new_auto_map(&mut tracker);
    map_ops::set(&mut tracker, &map, "nested", json!({"k": "v"})).unwrap();
    let child = common::child_at(&tracker, &map, "nested");

    map_ops::clear(&mut tracker, &map).unwrap();

    let entry = &tracker.tracking_changes(&map, Some(1)).unwrap()[0];
    assert_eq!(entry.action(), Action::Remove);
    assert_eq!(entry.removed_items(), Some(r#"[{"k":"v"}]"#));
    assert!(tracker.item(&child).unwrap().parent().is_none());
    assert!(tracker.item(&map).unwrap().children().is_empty());
}

#[test]
fn test_overwriting_child_detaches_previous() {
    let mut tracker = Tracker::new();
    let map = new_auto_map(&mut tracker);
    map_ops::set(&mut tracker, &map, "slot", json!({"v": 1})).unwrap();
    let first = common::child_at(&tracker, &map, "slot");

    map_ops::set(&mut tracker, &map, "slot", json!({"v": 2})).unwrap();
    let second = common::child_at(&tracker, &map, "slot");

    assert_ne!(first, second);
    assert!(tracker.item(&first).unwrap().parent().is_none());
    let before = tracker.tracking_changes(&map, None).unwrap().len();

    // mutating the detached child no longer reaches the map
    map_ops::set(&mut tracker, &first, "v", 99i64).unwrap();
    assert_eq!(tracker.tracking_changes(&map, None).unwrap().len(), before);
}

#[test]
fn test_reassigning_owned_child_is_rejected() {
    let mut tracker = Tracker::new();
    let first = new_map(&mut tracker);
    let second = new_map(&mut tracker);
    let child = new_map(&mut tracker);
    map_ops::set(&mut tracker, &first, "c", child.clone()).unwrap();

    let result = map_ops::set(&mut tracker, &second, "c", child.clone());
    assert!(matches!(result, Err(TrackingError::AlreadyOwned { .. })));

    // after detaching, the child can move
    map_ops::remove(&mut tracker, &first, "c").unwrap();
    map_ops::set(&mut tracker, &second, "c", child.clone()).unwrap();
    assert_eq!(tracker.item(&child).unwrap().parent().unwrap().parent_id, second);
}

#[test]
fn test_storing_ancestor_is_a_cycle() {
    let mut tracker = Tracker::new();
    let root = new_auto_map(&mut tracker);
    map_ops::set(&mut tracker, &root, "child", json!({})).unwrap();
    let child = common::child_at(&tracker, &root, "child");

    let result = map_ops::set(&mut tracker, &child, "loop", root.clone());
    assert!(matches!(result, Err(TrackingError::CycleDetected { .. })));
}

#[test]
fn test_copy_untracked_shares_no_ids() {
    // GIVEN a map with a tracked child and a collector on it
    let mut tracker = Tracker::new();
    let map = new_auto_map(&mut tracker);
    map_ops::set(&mut tracker, &map, "child", json!({"state": "draft"})).unwrap();
    let collector = common::attach_collector(&mut tracker, &map);

    // WHEN it is copied untracked and the copy is turned into a new map
    let copy = map_ops::copy(&mut tracker, &map, true).unwrap();
    let values = copy.as_map().unwrap().clone();
    assert!(values.values().all(|value| !value.is_tracked()));
    let seen = collector.len();
    let replica = tracker.create_map(values, tracker.options()).unwrap();
    map_ops::set(&mut tracker, &replica, "extra", true).unwrap();

    // THEN only the copy call itself reached the original's observers
    assert_eq!(seen, 1);
    assert_eq!(collector.len(), 1);
    assert_eq!(collector.last().unwrap().action(), Action::Copy);
    assert_ne!(replica, map);
    assert!(tracker.item(&replica).unwrap().children().is_empty());
}

#[test]
fn test_shallow_copy_keeps_children_registered() {
    let mut tracker = Tracker::new();
    let map = new_auto_map(&mut tracker);
    map_ops::set(&mut tracker, &map, "child", json!([1])).unwrap();
    let child = common::child_at(&tracker, &map, "child");

    let copy = map_ops::copy(&mut tracker, &map, false).unwrap();

    assert_eq!(copy.as_map().unwrap()["child"], Value::Tracked(child.clone()));
    assert!(tracker.item(&child).unwrap().parent().is_some());
}

#[test]
fn test_capture_snapshots_off_omits_pre_and_post() {
    let mut tracker = Tracker::new();
    let map = tracker
        .create_map(Vec::new(), tracker.options().capture_snapshots(false))
        .unwrap();

    map_ops::set(&mut tracker, &map, "a", 1i64).unwrap();

    let entry = &tracker.tracking_changes(&map, Some(1)).unwrap()[0];
    assert!(entry.extra("data_pre_change").is_none());
    assert!(entry.extra("data_post_change").is_none());
    assert_eq!(entry.value(), Some("1"));
}

#[test]
fn test_initial_content_is_converted() {
    let mut tracker = Tracker::new();
    let map = tracker
        .create_from_json(
            json!({"name": "x", "tags": ["a", "b"]}),
            tracker.options().auto_convert(true),
        )
        .unwrap();

    let tags = common::child_at(&tracker, &map, "tags");
    assert_eq!(tracker.to_plain(&tags).unwrap(), json!(["a", "b"]));
    assert_eq!(
        tracker.render(&map).unwrap(),
        r#"{"name":"x","tags":["a","b"]}"#
    );
    // init only: populating the initial content is not a mutation
    assert_eq!(tracker.tracking_changes(&map, None).unwrap().len(), 1);
}
