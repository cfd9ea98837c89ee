/// Lock gating of structural mutations
mod common;

use common::{child_at, new_auto_map, new_list, new_map};
use datatrack_core::errors::TrackingError;
use datatrack_core::{list_ops, map_ops, Action, Tracker, TrackerConfig, Value};
use serde_json::json;

#[test]
fn test_set_on_locked_map_is_refused_and_content_unchanged() {
    // GIVEN a locked map with content
    let mut tracker = Tracker::new();
    let map = new_map(&mut tracker);
    map_ops::set(&mut tracker, &map, "status", "pending").unwrap();
    tracker.lock(&map).unwrap();

    // WHEN set is attempted
    let result = map_ops::set(&mut tracker, &map, "status", "complete");

    // THEN it fails and nothing changed
    assert!(matches!(result, Err(TrackingError::ContainerLocked { .. })));
    assert_eq!(tracker.to_plain(&map).unwrap(), json!({"status": "pending"}));
}

#[test]
fn test_refused_call_is_logged_with_outcome() {
    let mut tracker = Tracker::new();
    let map = new_map(&mut tracker);
    tracker.lock(&map).unwrap();

    let _ = map_ops::set(&mut tracker, &map, "k", 1i64);

    let entry = &tracker.tracking_changes(&map, Some(1)).unwrap()[0];
    assert_eq!(entry.action(), Action::Add);
    assert_eq!(entry.extra("locked"), Some("true"));
    assert!(entry.extra("outcome").unwrap().contains("locked"));
    assert_eq!(entry.extra("data_pre_change"), entry.extra("data_post_change"));
}

#[test]
fn test_refused_calls_not_logged_when_disabled() {
    let config = TrackerConfig {
        log_refused_mutations: false,
        ..TrackerConfig::default()
    };
    let mut tracker = Tracker::with_config(config);
    let map = new_map(&mut tracker);
    tracker.lock(&map).unwrap();
    let before = tracker.tracking_changes(&map, None).unwrap().len();

    let result = map_ops::remove(&mut tracker, &map, "k");

    assert!(matches!(result, Err(TrackingError::ContainerLocked { .. })));
    assert_eq!(tracker.tracking_changes(&map, None).unwrap().len(), before);
}

#[test]
fn test_lock_and_unlock_are_recorded() {
    let mut tracker = Tracker::new();
    let list = new_list(&mut tracker);

    tracker.lock(&list).unwrap();
    assert!(tracker.is_locked(&list).unwrap());
    tracker.unlock(&list).unwrap();
    assert!(!tracker.is_locked(&list).unwrap());

    let actions: Vec<Action> = tracker
        .tracking_changes(&list, None)
        .unwrap()
        .iter()
        .map(|entry| entry.action())
        .collect();
    assert_eq!(actions, vec![Action::Init, Action::Lock, Action::Unlock]);
    list_ops::push(&mut tracker, &list, 1i64).unwrap();
}

#[test]
fn test_every_list_write_is_gated() {
    let mut tracker = Tracker::new();
    let list = tracker
        .create_list(vec![Value::from(1i64), Value::from(2i64)], tracker.options())
        .unwrap();
    tracker.lock(&list).unwrap();

    let locked = |result: datatrack_core::Result<()>| {
        matches!(result, Err(TrackingError::ContainerLocked { .. }))
    };
    assert!(locked(list_ops::push(&mut tracker, &list, 3i64)));
    assert!(locked(list_ops::insert(&mut tracker, &list, 0, 3i64)));
    assert!(locked(list_ops::set(&mut tracker, &list, 0, 3i64)));
    assert!(locked(list_ops::extend(&mut tracker, &list, vec![Value::from(3i64)])));
    assert!(locked(list_ops::remove(&mut tracker, &list, 0).map(|_| ())));
    assert!(locked(list_ops::pop(&mut tracker, &list, None).map(|_| ())));
    assert!(locked(list_ops::clear(&mut tracker, &list)));
    assert!(locked(list_ops::reverse(&mut tracker, &list)));

    assert_eq!(tracker.to_plain(&list).unwrap(), json!([1, 2]));
}

#[test]
fn test_copy_and_reads_allowed_while_locked() {
    let mut tracker = Tracker::new();
    let map = new_map(&mut tracker);
    map_ops::set(&mut tracker, &map, "a", 1i64).unwrap();
    tracker.lock(&map).unwrap();

    assert!(map_ops::copy(&mut tracker, &map, true).is_ok());
    assert_eq!(map_ops::get(&tracker, &map, "a").unwrap(), Some(&Value::from(1i64)));
    assert_eq!(map_ops::keys(&tracker, &map).unwrap(), vec!["a"]);
}

#[test]
fn test_lock_is_not_inherited_by_children() {
    let mut tracker = Tracker::new();
    let root = new_auto_map(&mut tracker);
    map_ops::set(&mut tracker, &root, "child", json!({})).unwrap();
    let child = child_at(&tracker, &root, "child");

    tracker.lock(&root).unwrap();
    map_ops::set(&mut tracker, &child, "k", "v").unwrap();

    // the locked root still records the rebroadcast entry
    let entry = &tracker.tracking_changes(&root, Some(1)).unwrap()[0];
    assert_eq!(entry.location(), Some("child:k"));
}
