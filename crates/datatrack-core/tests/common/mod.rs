use std::sync::Arc;

use datatrack_core::sinks::ChangeCollector;
use datatrack_core::{ItemId, Tracker};

/// Create a tracked map with the tracker's default options
#[allow(dead_code)]
pub fn new_map(tracker: &mut Tracker) -> ItemId {
    tracker
        .create_map(Vec::new(), tracker.options())
        .expect("Should create map")
}

/// Create a tracked map that wraps nested objects/arrays on write
#[allow(dead_code)]
pub fn new_auto_map(tracker: &mut Tracker) -> ItemId {
    tracker
        .create_map(Vec::new(), tracker.options().auto_convert(true))
        .expect("Should create map")
}

/// Create a tracked list with the tracker's default options
#[allow(dead_code)]
pub fn new_list(tracker: &mut Tracker) -> ItemId {
    tracker
        .create_list(Vec::new(), tracker.options())
        .expect("Should create list")
}

/// Attach a fresh collector to an item and return a handle to it
#[allow(dead_code)]
pub fn attach_collector(tracker: &mut Tracker, id: &ItemId) -> Arc<ChangeCollector> {
    let collector = Arc::new(ChangeCollector::new());
    tracker
        .add_sink(id, collector.clone())
        .expect("Should add sink");
    collector
}

/// Resolve the tracked child stored under `key`
#[allow(dead_code)]
pub fn child_at(tracker: &Tracker, map_id: &ItemId, key: &str) -> ItemId {
    datatrack_core::map_ops::get(tracker, map_id, key)
        .expect("Should read map")
        .and_then(|value| value.as_tracked().cloned())
        .expect("Value should be tracked")
}
