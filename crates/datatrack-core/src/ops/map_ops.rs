//! Intercepted operations on tracked maps
//!
//! Every structural mutation records exactly one entry on the map (and its
//! ancestors). A call on a locked map is refused with `ContainerLocked`.
//! `copy` and the plain reads work on locked maps.

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde_json::json;

use crate::errors::{Result, TrackingError};
use crate::model::{Action, ContainerKind, Content, Extra, Location, Value};
use crate::ops::convert;
use crate::ops::store::{wrong_kind, Tracker};
use datatrack_core_types::schema::{
    EXTRA_DEFAULT, EXTRA_LOCATION, EXTRA_REMOVED_ITEMS, EXTRA_RETURN_VALUE, EXTRA_UNTRACKED,
    EXTRA_VALUE,
};
use datatrack_core_types::ItemId;

fn map_ref<'a>(tracker: &'a Tracker, map_id: &ItemId) -> Result<&'a BTreeMap<String, Value>> {
    match &tracker.item(map_id)?.content {
        Content::Map(map) => Ok(map),
        other => Err(wrong_kind(map_id, ContainerKind::Map, other.kind())),
    }
}

fn map_mut<'a>(
    tracker: &'a mut Tracker,
    map_id: &ItemId,
) -> Result<&'a mut BTreeMap<String, Value>> {
    match &mut tracker.item_mut(map_id)?.content {
        Content::Map(map) => Ok(map),
        other => Err(wrong_kind(map_id, ContainerKind::Map, other.kind())),
    }
}

fn key_not_found(map_id: &ItemId, key: &str) -> TrackingError {
    TrackingError::KeyNotFound {
        item_id: map_id.to_string(),
        key: key.to_string(),
    }
}

// ===== Writes =====

/// Store `value` under `key`
///
/// Records `add` for a new key and `update` for an existing one. A tracked
/// value previously stored under the key is detached.
///
/// # Errors
///
/// * `ContainerLocked` - the map is locked
/// * `AlreadyOwned` / `CycleDetected` - a tracked value cannot be adopted
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn set(
    tracker: &mut Tracker,
    map_id: &ItemId,
    key: impl Into<String>,
    value: impl Into<Value>,
) -> Result<()> {
    let key = key.into();
    let value = value.into();
    let icpt = tracker.intercept(map_id, ContainerKind::Map, "set")?;

    let existing = map_ref(tracker, map_id)?.get(&key).cloned();
    let action = if existing.is_some() {
        Action::Update
    } else {
        Action::Add
    };
    let mut extra = Extra::new().text(EXTRA_LOCATION, key.clone());

    if let Some(err) = tracker.lock_violation(&icpt) {
        extra.insert_snapshot(EXTRA_VALUE, &tracker.snapshot_value(&value));
        return tracker.refuse(icpt, action, extra, err);
    }

    let location = Location::Key(key.clone());
    let stored = match convert::convert(tracker, map_id, &location, value) {
        Ok(stored) => stored,
        Err(err) => return tracker.refuse(icpt, action, extra, err),
    };
    if let Some(previous) = existing.as_ref().filter(|previous| **previous != stored) {
        convert::release(tracker, map_id, previous)?;
    }

    extra.insert_snapshot(EXTRA_VALUE, &tracker.snapshot_value(&stored));
    map_mut(tracker, map_id)?.insert(key, stored);
    tracker.complete(icpt, action, extra)
}

/// Remove `key` and return its value, detached from the map
///
/// # Errors
///
/// * `ContainerLocked` - the map is locked
/// * `KeyNotFound` - the key is absent
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn remove(tracker: &mut Tracker, map_id: &ItemId, key: &str) -> Result<Value> {
    let icpt = tracker.intercept(map_id, ContainerKind::Map, "remove")?;
    let extra = Extra::new().text(EXTRA_LOCATION, key);

    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Remove, extra, err);
    }
    let Some(existing) = map_ref(tracker, map_id)?.get(key).cloned() else {
        return tracker.refuse(icpt, Action::Remove, extra, key_not_found(map_id, key));
    };

    let extra = removal_extra(tracker, extra, &existing);
    convert::release(tracker, map_id, &existing)?;
    map_mut(tracker, map_id)?.remove(key);
    tracker.complete(icpt, Action::Remove, extra)?;
    Ok(existing)
}

/// Remove `key` and return its value, or `default` when the key is absent
///
/// An absent key is not an error; the call still records a `remove` entry.
///
/// # Errors
///
/// * `ContainerLocked` - the map is locked
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn pop(
    tracker: &mut Tracker,
    map_id: &ItemId,
    key: &str,
    default: Option<Value>,
) -> Result<Option<Value>> {
    let icpt = tracker.intercept(map_id, ContainerKind::Map, "pop")?;
    let mut extra = Extra::new().text(EXTRA_LOCATION, key);
    if let Some(default) = &default {
        extra.insert_snapshot(EXTRA_DEFAULT, &tracker.snapshot_value(default));
    }

    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Remove, extra, err);
    }
    let Some(existing) = map_ref(tracker, map_id)?.get(key).cloned() else {
        tracker.complete(icpt, Action::Remove, extra)?;
        return Ok(default);
    };

    let extra = removal_extra(tracker, extra, &existing);
    convert::release(tracker, map_id, &existing)?;
    map_mut(tracker, map_id)?.remove(key);
    tracker.complete(icpt, Action::Remove, extra)?;
    Ok(Some(existing))
}

/// Remove and return the entry with the greatest key
///
/// # Errors
///
/// * `ContainerLocked` - the map is locked
/// * `EmptyContainer` - the map is empty
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn popitem(tracker: &mut Tracker, map_id: &ItemId) -> Result<(String, Value)> {
    let icpt = tracker.intercept(map_id, ContainerKind::Map, "popitem")?;

    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Remove, Extra::new(), err);
    }
    let Some((key, existing)) = map_ref(tracker, map_id)?
        .last_key_value()
        .map(|(key, value)| (key.clone(), value.clone()))
    else {
        let err = TrackingError::EmptyContainer {
            item_id: map_id.to_string(),
        };
        return tracker.refuse(icpt, Action::Remove, Extra::new(), err);
    };

    let extra = removal_extra(tracker, Extra::new().text(EXTRA_LOCATION, key.clone()), &existing);
    convert::release(tracker, map_id, &existing)?;
    map_mut(tracker, map_id)?.remove(&key);
    tracker.complete(icpt, Action::Remove, extra)?;
    Ok((key, existing))
}

/// Store several pairs as one `update` entry
///
/// The batch is validated before anything is written, so a failure leaves
/// the map untouched. Values replaced by the batch are listed in
/// `removed_items`.
///
/// # Errors
///
/// * `ContainerLocked` - the map is locked
/// * `AlreadyOwned` / `CycleDetected` - a tracked value cannot be adopted
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn update(
    tracker: &mut Tracker,
    map_id: &ItemId,
    pairs: impl IntoIterator<Item = (String, Value)>,
) -> Result<()> {
    let pairs: Vec<(String, Value)> = pairs.into_iter().collect();
    let icpt = tracker.intercept(map_id, ContainerKind::Map, "update")?;

    let keys: Vec<&str> = pairs.iter().map(|(key, _)| key.as_str()).collect();
    let mut extra = Extra::new().text(EXTRA_LOCATION, keys.join(","));
    let incoming: serde_json::Map<String, serde_json::Value> = pairs
        .iter()
        .map(|(key, value)| (key.clone(), tracker.snapshot_value(value)))
        .collect();
    extra.insert_snapshot(EXTRA_VALUE, &serde_json::Value::Object(incoming));

    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Update, extra, err);
    }
    let batch: Vec<(Location, &Value)> = pairs
        .iter()
        .map(|(key, value)| (Location::Key(key.clone()), value))
        .collect();
    if let Err(err) = convert::validate_incoming(tracker, map_id, &batch) {
        return tracker.refuse(icpt, Action::Update, extra, err);
    }

    let mut replaced = Vec::new();
    for (key, value) in pairs {
        let location = Location::Key(key.clone());
        let stored = convert::convert(tracker, map_id, &location, value)?;
        let previous = map_mut(tracker, map_id)?.insert(key, stored.clone());
        if let Some(previous) = previous {
            replaced.push(tracker.snapshot_value(&previous));
            if previous != stored {
                convert::release(tracker, map_id, &previous)?;
            }
        }
    }
    extra.insert_snapshot(EXTRA_REMOVED_ITEMS, &serde_json::Value::Array(replaced));
    tracker.complete(icpt, Action::Update, extra)
}

/// Return the value under `key`, storing `default` first if the key is absent
///
/// # Errors
///
/// * `ContainerLocked` - the map is locked
/// * `AlreadyOwned` / `CycleDetected` - a tracked default cannot be adopted
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn setdefault(
    tracker: &mut Tracker,
    map_id: &ItemId,
    key: impl Into<String>,
    default: impl Into<Value>,
) -> Result<Value> {
    let key = key.into();
    let default = default.into();
    let icpt = tracker.intercept(map_id, ContainerKind::Map, "setdefault")?;
    let mut extra = Extra::new()
        .text(EXTRA_LOCATION, key.clone())
        .snapshot(EXTRA_DEFAULT, &tracker.snapshot_value(&default));

    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Update, extra, err);
    }

    let value = match map_ref(tracker, map_id)?.get(&key).cloned() {
        Some(existing) => existing,
        None => {
            let location = Location::Key(key.clone());
            let stored = match convert::convert(tracker, map_id, &location, default) {
                Ok(stored) => stored,
                Err(err) => return tracker.refuse(icpt, Action::Update, extra, err),
            };
            map_mut(tracker, map_id)?.insert(key, stored.clone());
            stored
        }
    };
    extra.insert_snapshot(EXTRA_RETURN_VALUE, &tracker.snapshot_value(&value));
    tracker.complete(icpt, Action::Update, extra)?;
    Ok(value)
}

/// Remove every entry, detaching tracked children
///
/// # Errors
///
/// * `ContainerLocked` - the map is locked
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn clear(tracker: &mut Tracker, map_id: &ItemId) -> Result<()> {
    let icpt = tracker.intercept(map_id, ContainerKind::Map, "clear")?;

    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Remove, Extra::new(), err);
    }

    let removed: Vec<Value> = std::mem::take(map_mut(tracker, map_id)?)
        .into_values()
        .collect();
    let snapshots: Vec<serde_json::Value> =
        removed.iter().map(|value| tracker.snapshot_value(value)).collect();
    for value in &removed {
        convert::release(tracker, map_id, value)?;
    }
    let extra = Extra::new().snapshot(EXTRA_REMOVED_ITEMS, &serde_json::Value::Array(snapshots));
    tracker.complete(icpt, Action::Remove, extra)
}

/// Shallow or untracked copy of the map's content
///
/// Allowed on a locked map. With `untracked`, tracked children are replaced
/// by deep plain renderings; otherwise the copy holds the same handles.
/// Neither form detaches anything.
///
/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn copy(tracker: &mut Tracker, map_id: &ItemId, untracked: bool) -> Result<Content> {
    let icpt = tracker.intercept(map_id, ContainerKind::Map, "copy")?;

    let content = map_ref(tracker, map_id)?.clone();
    let content = if untracked {
        content
            .iter()
            .map(|(key, value)| -> Result<(String, Value)> {
                Ok((key.clone(), Value::Plain(convert::unwrap(tracker, value)?)))
            })
            .collect::<Result<BTreeMap<_, _>>>()?
    } else {
        content
    };

    let extra = Extra::new().text(EXTRA_UNTRACKED, untracked.to_string());
    tracker.complete(icpt, Action::Copy, extra)?;
    Ok(Content::Map(content))
}

fn removal_extra(tracker: &Tracker, extra: Extra, existing: &Value) -> Extra {
    let snapshot = tracker.snapshot_value(existing);
    extra
        .snapshot(EXTRA_REMOVED_ITEMS, &json!([snapshot.clone()]))
        .snapshot(EXTRA_VALUE, &snapshot)
}

// ===== Reads =====

/// Value stored under `key`
///
/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn get<'a>(tracker: &'a Tracker, map_id: &ItemId, key: &str) -> Result<Option<&'a Value>> {
    Ok(map_ref(tracker, map_id)?.get(key))
}

/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn contains_key(tracker: &Tracker, map_id: &ItemId, key: &str) -> Result<bool> {
    Ok(map_ref(tracker, map_id)?.contains_key(key))
}

/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn len(tracker: &Tracker, map_id: &ItemId) -> Result<usize> {
    Ok(map_ref(tracker, map_id)?.len())
}

/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn is_empty(tracker: &Tracker, map_id: &ItemId) -> Result<bool> {
    Ok(map_ref(tracker, map_id)?.is_empty())
}

/// Keys in sorted order
///
/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn keys(tracker: &Tracker, map_id: &ItemId) -> Result<Vec<String>> {
    Ok(map_ref(tracker, map_id)?.keys().cloned().collect())
}

/// Iterate entries in key order
///
/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `map_id` is not a live map
pub fn iter<'a>(
    tracker: &'a Tracker,
    map_id: &ItemId,
) -> Result<btree_map::Iter<'a, String, Value>> {
    Ok(map_ref(tracker, map_id)?.iter())
}
