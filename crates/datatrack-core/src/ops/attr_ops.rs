//! Intercepted operations on tracked-attributes containers
//!
//! A tracked-attributes container holds named fields. Writes to a field are
//! only recorded once the field is monitored; monitoring also adopts the
//! field's composite value as a child, so its entries propagate with the
//! field name as location. Fields can be locked one at a time.

use crate::errors::{Result, TrackingError};
use crate::model::{Action, AttributeSet, ContainerKind, Content, Extra, Location, Value};
use crate::ops::convert;
use crate::ops::store::{wrong_kind, Tracker};
use datatrack_core_types::schema::{
    EXTRA_ATTRIBUTE_LOCKED, EXTRA_ATTRIBUTE_NAME, EXTRA_LOCATION, EXTRA_VALUE,
};
use datatrack_core_types::ItemId;

fn attrs_ref<'a>(tracker: &'a Tracker, attrs_id: &ItemId) -> Result<&'a AttributeSet> {
    match &tracker.item(attrs_id)?.content {
        Content::Attributes(attributes) => Ok(attributes),
        other => Err(wrong_kind(attrs_id, ContainerKind::Attributes, other.kind())),
    }
}

fn attrs_mut<'a>(tracker: &'a mut Tracker, attrs_id: &ItemId) -> Result<&'a mut AttributeSet> {
    match &mut tracker.item_mut(attrs_id)?.content {
        Content::Attributes(attributes) => Ok(attributes),
        other => Err(wrong_kind(attrs_id, ContainerKind::Attributes, other.kind())),
    }
}

fn missing_attribute(attrs_id: &ItemId, name: &str) -> TrackingError {
    TrackingError::KeyNotFound {
        item_id: attrs_id.to_string(),
        key: name.to_string(),
    }
}

// ===== Writes =====

/// Assign `value` to the field `name`
///
/// An unmonitored field is stored as given and nothing is recorded. A
/// monitored field is converted like a map value and records `update` when
/// the stored value changes; a tracked value it held is detached.
///
/// # Errors
///
/// * `AttributeLocked` - the field is locked
/// * `ContainerLocked` - the field is monitored and the container is locked
/// * `AlreadyOwned` / `CycleDetected` - a tracked value cannot be adopted
/// * `ItemNotFound` / `WrongContainerKind` - `attrs_id` is not a live attributes container
pub fn set(
    tracker: &mut Tracker,
    attrs_id: &ItemId,
    name: impl Into<String>,
    value: impl Into<Value>,
) -> Result<()> {
    let name = name.into();
    let value = value.into();
    let icpt = tracker.intercept(attrs_id, ContainerKind::Attributes, "set")?;

    let attributes = attrs_ref(tracker, attrs_id)?;
    let monitored = attributes.is_monitored(&name);
    let attribute_locked = attributes.is_locked(&name);
    let previous = attributes.get(&name).cloned();
    let mut extra = Extra::new()
        .text(EXTRA_LOCATION, name.clone())
        .snapshot(EXTRA_VALUE, &tracker.snapshot_value(&value))
        .text(EXTRA_ATTRIBUTE_LOCKED, attribute_locked.to_string());

    if attribute_locked {
        let err = TrackingError::AttributeLocked {
            item_id: attrs_id.to_string(),
            attribute: name,
        };
        return tracker.refuse(icpt, Action::Update, extra, err);
    }
    if !monitored {
        attrs_mut(tracker, attrs_id)?.insert(name, value);
        tracker.pass(icpt);
        return Ok(());
    }
    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Update, extra, err);
    }

    let location = Location::Key(name.clone());
    let stored = match convert::convert(tracker, attrs_id, &location, value) {
        Ok(stored) => stored,
        Err(err) => return tracker.refuse(icpt, Action::Update, extra, err),
    };
    if previous.as_ref() == Some(&stored) {
        tracker.pass(icpt);
        return Ok(());
    }
    if let Some(previous) = &previous {
        convert::release(tracker, attrs_id, previous)?;
    }

    extra.insert_snapshot(EXTRA_VALUE, &tracker.snapshot_value(&stored));
    attrs_mut(tracker, attrs_id)?.insert(name, stored);
    tracker.complete(icpt, Action::Update, extra)
}

/// Start monitoring the existing field `name`
///
/// The current value is kept as the field's original value, then converted
/// and adopted like a monitored write. Records `start monitoring`. Returns
/// false, recording nothing, if the field is already monitored.
///
/// # Errors
///
/// * `KeyNotFound` - no field is named `name`
/// * `AlreadyOwned` / `CycleDetected` - the field's tracked value cannot be adopted
/// * `ItemNotFound` / `WrongContainerKind` - `attrs_id` is not a live attributes container
pub fn monitor(tracker: &mut Tracker, attrs_id: &ItemId, name: &str) -> Result<bool> {
    let icpt = tracker.intercept(attrs_id, ContainerKind::Attributes, "monitor")?;
    let extra = Extra::new().text(EXTRA_LOCATION, name);

    let attributes = attrs_ref(tracker, attrs_id)?;
    if attributes.is_monitored(name) {
        tracker.pass(icpt);
        return Ok(false);
    }
    let Some(original) = attributes.get(name).cloned() else {
        let err = missing_attribute(attrs_id, name);
        return tracker.refuse(icpt, Action::StartMonitoring, extra, err);
    };
    let extra = extra.snapshot(EXTRA_VALUE, &tracker.snapshot_value(&original));

    let location = Location::Key(name.to_string());
    let stored = match convert::convert(tracker, attrs_id, &location, original.clone()) {
        Ok(stored) => stored,
        Err(err) => return tracker.refuse(icpt, Action::StartMonitoring, extra, err),
    };

    let attributes = attrs_mut(tracker, attrs_id)?;
    attributes.insert(name.to_string(), stored);
    attributes.monitor(name.to_string(), original);
    tracker.complete(icpt, Action::StartMonitoring, extra)?;
    Ok(true)
}

/// Lock the field `name`; a tracked value it holds is locked too
///
/// Returns false, recording nothing, if the field is already locked.
///
/// # Errors
///
/// * `KeyNotFound` - no field is named `name`
/// * `ItemNotFound` / `WrongContainerKind` - `attrs_id` is not a live attributes container
pub fn lock_attribute(tracker: &mut Tracker, attrs_id: &ItemId, name: &str) -> Result<bool> {
    let icpt = tracker.intercept(attrs_id, ContainerKind::Attributes, "lock_attribute")?;
    let extra = Extra::new().text(EXTRA_ATTRIBUTE_NAME, name);

    let attributes = attrs_ref(tracker, attrs_id)?;
    if attributes.is_locked(name) {
        tracker.pass(icpt);
        return Ok(false);
    }
    let Some(value) = attributes.get(name).cloned() else {
        let err = missing_attribute(attrs_id, name);
        return tracker.refuse(icpt, Action::Lock, extra, err);
    };

    if let Value::Tracked(child_id) = &value {
        tracker.lock(child_id)?;
    }
    attrs_mut(tracker, attrs_id)?.lock(name);
    let extra = extra.text(EXTRA_ATTRIBUTE_LOCKED, "true");
    tracker.complete(icpt, Action::Lock, extra)?;
    Ok(true)
}

/// Unlock the field `name`; a tracked value it holds is unlocked too
///
/// Returns false, recording nothing, if the field was not locked.
///
/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `attrs_id` is not a live attributes container
pub fn unlock_attribute(tracker: &mut Tracker, attrs_id: &ItemId, name: &str) -> Result<bool> {
    let icpt = tracker.intercept(attrs_id, ContainerKind::Attributes, "unlock_attribute")?;

    let attributes = attrs_ref(tracker, attrs_id)?;
    if !attributes.is_locked(name) {
        tracker.pass(icpt);
        return Ok(false);
    }
    let held = attributes.get(name).cloned();
    if let Some(Value::Tracked(child_id)) = held {
        tracker.unlock(&child_id)?;
    }
    attrs_mut(tracker, attrs_id)?.unlock(name);
    let extra = Extra::new()
        .text(EXTRA_ATTRIBUTE_NAME, name)
        .text(EXTRA_ATTRIBUTE_LOCKED, "false");
    tracker.complete(icpt, Action::Unlock, extra)?;
    Ok(true)
}

/// Lock every monitored field, then the container itself
///
/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `attrs_id` is not a live attributes container
pub fn lock(tracker: &mut Tracker, attrs_id: &ItemId) -> Result<()> {
    let names = attrs_ref(tracker, attrs_id)?.monitored().to_vec();
    for name in names {
        lock_attribute(tracker, attrs_id, &name)?;
    }
    tracker.lock(attrs_id)
}

/// Unlock the container, then every monitored field
///
/// Fields locked without being monitored stay locked.
///
/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `attrs_id` is not a live attributes container
pub fn unlock(tracker: &mut Tracker, attrs_id: &ItemId) -> Result<()> {
    let names = attrs_ref(tracker, attrs_id)?.monitored().to_vec();
    tracker.unlock(attrs_id)?;
    for name in names {
        unlock_attribute(tracker, attrs_id, &name)?;
    }
    Ok(())
}

// ===== Reads =====

/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `attrs_id` is not a live attributes container
pub fn get<'a>(tracker: &'a Tracker, attrs_id: &ItemId, name: &str) -> Result<Option<&'a Value>> {
    Ok(attrs_ref(tracker, attrs_id)?.get(name))
}

/// Value the field held when monitoring started
///
/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `attrs_id` is not a live attributes container
pub fn original_value<'a>(
    tracker: &'a Tracker,
    attrs_id: &ItemId,
    name: &str,
) -> Result<Option<&'a Value>> {
    Ok(attrs_ref(tracker, attrs_id)?.original(name))
}

/// Monitored field names in the order monitoring started
///
/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `attrs_id` is not a live attributes container
pub fn monitored<'a>(tracker: &'a Tracker, attrs_id: &ItemId) -> Result<&'a [String]> {
    Ok(attrs_ref(tracker, attrs_id)?.monitored())
}

/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `attrs_id` is not a live attributes container
pub fn is_monitored(tracker: &Tracker, attrs_id: &ItemId, name: &str) -> Result<bool> {
    Ok(attrs_ref(tracker, attrs_id)?.is_monitored(name))
}

/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `attrs_id` is not a live attributes container
pub fn is_attribute_locked(tracker: &Tracker, attrs_id: &ItemId, name: &str) -> Result<bool> {
    Ok(attrs_ref(tracker, attrs_id)?.is_locked(name))
}

/// Field names in sorted order
///
/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `attrs_id` is not a live attributes container
pub fn names(tracker: &Tracker, attrs_id: &ItemId) -> Result<Vec<String>> {
    Ok(attrs_ref(tracker, attrs_id)?.names().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_attrs(tracker: &mut Tracker, fields: serde_json::Value) -> ItemId {
        let initial: Vec<(String, Value)> = fields
            .as_object()
            .unwrap()
            .iter()
            .map(|(name, value)| (name.clone(), Value::from(value.clone())))
            .collect();
        tracker
            .create_attributes(initial, tracker.attribute_options())
            .unwrap()
    }

    #[test]
    fn test_unmonitored_write_records_nothing() {
        let mut tracker = Tracker::new();
        let attrs = new_attrs(&mut tracker, json!({"host": "a"}));

        set(&mut tracker, &attrs, "host", "b").unwrap();
        set(&mut tracker, &attrs, "fresh", 1i64).unwrap();

        assert_eq!(tracker.tracking_changes(&attrs, None).unwrap().len(), 1);
        assert_eq!(tracker.to_plain(&attrs).unwrap(), json!({"host": "b", "fresh": 1}));
    }

    #[test]
    fn test_monitored_write_records_update() {
        let mut tracker = Tracker::new();
        let attrs = new_attrs(&mut tracker, json!({"port": 80}));
        assert!(monitor(&mut tracker, &attrs, "port").unwrap());

        set(&mut tracker, &attrs, "port", 443i64).unwrap();

        let last = &tracker.tracking_changes(&attrs, Some(1)).unwrap()[0];
        assert_eq!(last.action(), Action::Update);
        assert_eq!(last.location(), Some("port"));
        assert_eq!(last.value(), Some("443"));
        assert_eq!(last.extra("attribute_locked"), Some("false"));
        assert_eq!(last.container_type(), Some("TrackedAttributes"));
    }

    #[test]
    fn test_unchanged_monitored_write_records_nothing() {
        let mut tracker = Tracker::new();
        let attrs = new_attrs(&mut tracker, json!({"port": 80}));
        monitor(&mut tracker, &attrs, "port").unwrap();
        let before = tracker.tracking_changes(&attrs, None).unwrap().len();

        set(&mut tracker, &attrs, "port", 80i64).unwrap();

        assert_eq!(tracker.tracking_changes(&attrs, None).unwrap().len(), before);
    }

    #[test]
    fn test_monitor_records_start_and_keeps_original() {
        let mut tracker = Tracker::new();
        let attrs = new_attrs(&mut tracker, json!({"port": 80}));

        assert!(monitor(&mut tracker, &attrs, "port").unwrap());
        assert!(!monitor(&mut tracker, &attrs, "port").unwrap());
        set(&mut tracker, &attrs, "port", 8080i64).unwrap();

        let history = tracker.tracking_changes(&attrs, None).unwrap();
        assert_eq!(history[1].action(), Action::StartMonitoring);
        assert_eq!(history[1].extra("action"), Some("start monitoring"));
        assert_eq!(history[1].value(), Some("80"));
        assert_eq!(
            original_value(&tracker, &attrs, "port").unwrap(),
            Some(&Value::from(80i64))
        );
        assert_eq!(monitored(&tracker, &attrs).unwrap(), ["port".to_string()]);
    }

    #[test]
    fn test_monitor_missing_field() {
        let mut tracker = Tracker::new();
        let attrs = new_attrs(&mut tracker, json!({}));

        let result = monitor(&mut tracker, &attrs, "ghost");
        assert!(matches!(result, Err(TrackingError::KeyNotFound { .. })));
    }

    #[test]
    fn test_locked_field_refuses_writes() {
        let mut tracker = Tracker::new();
        let attrs = new_attrs(&mut tracker, json!({"host": "a", "port": 80}));
        monitor(&mut tracker, &attrs, "port").unwrap();

        assert!(lock_attribute(&mut tracker, &attrs, "host").unwrap());
        assert!(!lock_attribute(&mut tracker, &attrs, "host").unwrap());

        let result = set(&mut tracker, &attrs, "host", "b");
        assert!(matches!(result, Err(TrackingError::AttributeLocked { .. })));
        set(&mut tracker, &attrs, "port", 81i64).unwrap();

        assert!(unlock_attribute(&mut tracker, &attrs, "host").unwrap());
        set(&mut tracker, &attrs, "host", "b").unwrap();
        assert_eq!(tracker.to_plain(&attrs).unwrap(), json!({"host": "b", "port": 81}));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let mut tracker = Tracker::new();
        let map = tracker.create_map(Vec::new(), tracker.options()).unwrap();

        let result = set(&mut tracker, &map, "x", 1i64);
        assert!(matches!(result, Err(TrackingError::WrongContainerKind { .. })));
    }
}
