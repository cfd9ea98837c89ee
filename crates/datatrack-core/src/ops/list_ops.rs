//! Intercepted operations on tracked lists
//!
//! Same contract as [`crate::ops::map_ops`] with integer locations. After any
//! call that shifts positions, tracked children are re-registered at their
//! new index so propagated locations stay correct.

use std::slice;

use crate::errors::{Result, TrackingError};
use crate::model::{Action, ContainerKind, Content, Extra, Location, Value};
use crate::ops::convert;
use crate::ops::intercept::Interception;
use crate::ops::store::{wrong_kind, Tracker};
use datatrack_core_types::schema::{
    EXTRA_LOCATION, EXTRA_PASSED_INDEX, EXTRA_REMOVED_ITEMS, EXTRA_UNTRACKED, EXTRA_VALUE,
};
use datatrack_core_types::ItemId;

fn list_ref<'a>(tracker: &'a Tracker, list_id: &ItemId) -> Result<&'a Vec<Value>> {
    match &tracker.item(list_id)?.content {
        Content::List(list) => Ok(list),
        other => Err(wrong_kind(list_id, ContainerKind::List, other.kind())),
    }
}

fn list_mut<'a>(tracker: &'a mut Tracker, list_id: &ItemId) -> Result<&'a mut Vec<Value>> {
    match &mut tracker.item_mut(list_id)?.content {
        Content::List(list) => Ok(list),
        other => Err(wrong_kind(list_id, ContainerKind::List, other.kind())),
    }
}

fn out_of_range(list_id: &ItemId, index: usize, len: usize) -> TrackingError {
    TrackingError::IndexOutOfRange {
        item_id: list_id.to_string(),
        index,
        len,
    }
}

/// Re-register every tracked child at its current index
fn reindex(tracker: &mut Tracker, list_id: &ItemId) -> Result<()> {
    let positions: Vec<(ItemId, usize)> = list_ref(tracker, list_id)?
        .iter()
        .enumerate()
        .filter_map(|(index, value)| value.as_tracked().map(|id| (id.clone(), index)))
        .collect();
    for (child_id, index) in positions {
        tracker.relocate_child(list_id, &child_id, Location::Index(index));
    }
    Ok(())
}

fn removed_extra(tracker: &Tracker, extra: Extra, removed: &[Value]) -> Extra {
    let snapshots: Vec<serde_json::Value> =
        removed.iter().map(|value| tracker.snapshot_value(value)).collect();
    extra.snapshot(EXTRA_REMOVED_ITEMS, &serde_json::Value::Array(snapshots))
}

// ===== Writes =====

/// Append `value`
///
/// # Errors
///
/// * `ContainerLocked` - the list is locked
/// * `AlreadyOwned` / `CycleDetected` - a tracked value cannot be adopted
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn push(tracker: &mut Tracker, list_id: &ItemId, value: impl Into<Value>) -> Result<()> {
    let value = value.into();
    let icpt = tracker.intercept(list_id, ContainerKind::List, "push")?;
    let index = list_ref(tracker, list_id)?.len();
    let mut extra = Extra::new().text(EXTRA_LOCATION, index.to_string());

    if let Some(err) = tracker.lock_violation(&icpt) {
        extra.insert_snapshot(EXTRA_VALUE, &tracker.snapshot_value(&value));
        return tracker.refuse(icpt, Action::Add, extra, err);
    }
    let location = Location::Index(index);
    let stored = match convert::convert_inserted(tracker, list_id, &location, value) {
        Ok(stored) => stored,
        Err(err) => return tracker.refuse(icpt, Action::Add, extra, err),
    };

    extra.insert_snapshot(EXTRA_VALUE, &tracker.snapshot_value(&stored));
    list_mut(tracker, list_id)?.push(stored);
    tracker.complete(icpt, Action::Add, extra)
}

/// Insert `value` before position `index`; `index == len` appends
///
/// # Errors
///
/// * `ContainerLocked` - the list is locked
/// * `IndexOutOfRange` - `index` is greater than the length
/// * `AlreadyOwned` - a tracked value is owned elsewhere or already in this list
/// * `CycleDetected` - a tracked value is an ancestor of the list
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn insert(
    tracker: &mut Tracker,
    list_id: &ItemId,
    index: usize,
    value: impl Into<Value>,
) -> Result<()> {
    let value = value.into();
    let icpt = tracker.intercept(list_id, ContainerKind::List, "insert")?;
    let len = list_ref(tracker, list_id)?.len();
    let mut extra = Extra::new()
        .text(EXTRA_LOCATION, index.to_string())
        .snapshot(EXTRA_VALUE, &tracker.snapshot_value(&value));

    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Add, extra, err);
    }
    if index > len {
        return tracker.refuse(icpt, Action::Add, extra, out_of_range(list_id, index, len));
    }
    let location = Location::Index(index);
    let stored = match convert::convert_inserted(tracker, list_id, &location, value) {
        Ok(stored) => stored,
        Err(err) => return tracker.refuse(icpt, Action::Add, extra, err),
    };

    extra.insert_snapshot(EXTRA_VALUE, &tracker.snapshot_value(&stored));
    list_mut(tracker, list_id)?.insert(index, stored);
    reindex(tracker, list_id)?;
    tracker.complete(icpt, Action::Add, extra)
}

/// Replace the value at `index`, detaching a tracked value it held
///
/// # Errors
///
/// * `ContainerLocked` - the list is locked
/// * `IndexOutOfRange` - no element at `index`
/// * `AlreadyOwned` / `CycleDetected` - a tracked value cannot be adopted
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn set(
    tracker: &mut Tracker,
    list_id: &ItemId,
    index: usize,
    value: impl Into<Value>,
) -> Result<()> {
    let value = value.into();
    let icpt = tracker.intercept(list_id, ContainerKind::List, "set")?;
    let mut extra = Extra::new()
        .text(EXTRA_LOCATION, index.to_string())
        .snapshot(EXTRA_VALUE, &tracker.snapshot_value(&value));

    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Update, extra, err);
    }
    let list = list_ref(tracker, list_id)?;
    let Some(previous) = list.get(index).cloned() else {
        let err = out_of_range(list_id, index, list.len());
        return tracker.refuse(icpt, Action::Update, extra, err);
    };
    let stored = match convert::convert(tracker, list_id, &Location::Index(index), value) {
        Ok(stored) => stored,
        Err(err) => return tracker.refuse(icpt, Action::Update, extra, err),
    };
    if previous != stored {
        convert::release(tracker, list_id, &previous)?;
    }

    extra.insert_snapshot(EXTRA_VALUE, &tracker.snapshot_value(&stored));
    extra = removed_extra(tracker, extra, &[previous]);
    list_mut(tracker, list_id)?[index] = stored;
    tracker.complete(icpt, Action::Update, extra)
}

/// Append every value as one `add` entry
///
/// The batch is validated first, so a failure leaves the list untouched.
///
/// # Errors
///
/// * `ContainerLocked` - the list is locked
/// * `AlreadyOwned` / `CycleDetected` - a tracked value cannot be adopted
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn extend(
    tracker: &mut Tracker,
    list_id: &ItemId,
    values: impl IntoIterator<Item = Value>,
) -> Result<()> {
    let values: Vec<Value> = values.into_iter().collect();
    let icpt = tracker.intercept(list_id, ContainerKind::List, "extend")?;
    let start = list_ref(tracker, list_id)?.len();

    let indices: Vec<String> = (start..start + values.len())
        .map(|index| index.to_string())
        .collect();
    let snapshots: Vec<serde_json::Value> =
        values.iter().map(|value| tracker.snapshot_value(value)).collect();
    let extra = Extra::new()
        .text(EXTRA_LOCATION, indices.join(","))
        .snapshot(EXTRA_VALUE, &serde_json::Value::Array(snapshots));

    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Add, extra, err);
    }
    let batch: Vec<(Location, &Value)> = values
        .iter()
        .enumerate()
        .map(|(offset, value)| (Location::Index(start + offset), value))
        .collect();
    if let Err(err) = convert::validate_incoming(tracker, list_id, &batch) {
        return tracker.refuse(icpt, Action::Add, extra, err);
    }

    for (offset, value) in values.into_iter().enumerate() {
        let stored = convert::convert(tracker, list_id, &Location::Index(start + offset), value)?;
        list_mut(tracker, list_id)?.push(stored);
    }
    tracker.complete(icpt, Action::Add, extra)
}

/// Remove and return the value at `index`, detached from the list
///
/// # Errors
///
/// * `ContainerLocked` - the list is locked
/// * `IndexOutOfRange` - no element at `index`
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn remove(tracker: &mut Tracker, list_id: &ItemId, index: usize) -> Result<Value> {
    let icpt = tracker.intercept(list_id, ContainerKind::List, "remove")?;
    let extra = Extra::new().text(EXTRA_LOCATION, index.to_string());
    take_at(tracker, icpt, list_id, index, extra)
}

/// Remove and return the value at `index`, or the last value for `None`
///
/// # Errors
///
/// * `ContainerLocked` - the list is locked
/// * `EmptyContainer` - `index` is `None` and the list is empty
/// * `IndexOutOfRange` - no element at `index`
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn pop(tracker: &mut Tracker, list_id: &ItemId, index: Option<usize>) -> Result<Value> {
    let icpt = tracker.intercept(list_id, ContainerKind::List, "pop")?;
    let len = list_ref(tracker, list_id)?.len();
    let passed = index.map_or_else(|| "-1".to_string(), |index| index.to_string());
    let mut extra = Extra::new().text(EXTRA_PASSED_INDEX, passed);

    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Remove, extra, err);
    }
    let index = match index {
        Some(index) => index,
        None if len == 0 => {
            let err = TrackingError::EmptyContainer {
                item_id: list_id.to_string(),
            };
            return tracker.refuse(icpt, Action::Remove, extra, err);
        }
        None => len - 1,
    };
    extra.insert_text(EXTRA_LOCATION, index.to_string());
    take_at(tracker, icpt, list_id, index, extra)
}

fn take_at(
    tracker: &mut Tracker,
    icpt: Interception,
    list_id: &ItemId,
    index: usize,
    extra: Extra,
) -> Result<Value> {
    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Remove, extra, err);
    }
    let list = list_ref(tracker, list_id)?;
    let Some(existing) = list.get(index).cloned() else {
        let err = out_of_range(list_id, index, list.len());
        return tracker.refuse(icpt, Action::Remove, extra, err);
    };

    let extra = removed_extra(tracker, extra, slice::from_ref(&existing))
        .snapshot(EXTRA_VALUE, &tracker.snapshot_value(&existing));
    convert::release(tracker, list_id, &existing)?;
    list_mut(tracker, list_id)?.remove(index);
    reindex(tracker, list_id)?;
    tracker.complete(icpt, Action::Remove, extra)?;
    Ok(existing)
}

/// Remove every element, detaching tracked children
///
/// # Errors
///
/// * `ContainerLocked` - the list is locked
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn clear(tracker: &mut Tracker, list_id: &ItemId) -> Result<()> {
    let icpt = tracker.intercept(list_id, ContainerKind::List, "clear")?;

    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Remove, Extra::new(), err);
    }

    let removed = std::mem::take(list_mut(tracker, list_id)?);
    let extra = removed_extra(tracker, Extra::new(), &removed);
    for value in &removed {
        convert::release(tracker, list_id, value)?;
    }
    tracker.complete(icpt, Action::Remove, extra)
}

/// Reverse the list in place
///
/// # Errors
///
/// * `ContainerLocked` - the list is locked
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn reverse(tracker: &mut Tracker, list_id: &ItemId) -> Result<()> {
    let icpt = tracker.intercept(list_id, ContainerKind::List, "reverse")?;

    if let Some(err) = tracker.lock_violation(&icpt) {
        return tracker.refuse(icpt, Action::Update, Extra::new(), err);
    }

    list_mut(tracker, list_id)?.reverse();
    reindex(tracker, list_id)?;
    tracker.complete(icpt, Action::Update, Extra::new())
}

/// Shallow or untracked copy of the list's content
///
/// Allowed on a locked list and never detaches anything.
///
/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn copy(tracker: &mut Tracker, list_id: &ItemId, untracked: bool) -> Result<Content> {
    let icpt = tracker.intercept(list_id, ContainerKind::List, "copy")?;

    let list = list_ref(tracker, list_id)?;
    let content = if untracked {
        list.iter()
            .map(|value| convert::unwrap(tracker, value).map(Value::Plain))
            .collect::<Result<Vec<_>>>()?
    } else {
        list.clone()
    };

    let extra = Extra::new().text(EXTRA_UNTRACKED, untracked.to_string());
    tracker.complete(icpt, Action::Copy, extra)?;
    Ok(Content::List(content))
}

// ===== Reads =====

/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn get<'a>(tracker: &'a Tracker, list_id: &ItemId, index: usize) -> Result<Option<&'a Value>> {
    Ok(list_ref(tracker, list_id)?.get(index))
}

/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn len(tracker: &Tracker, list_id: &ItemId) -> Result<usize> {
    Ok(list_ref(tracker, list_id)?.len())
}

/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn is_empty(tracker: &Tracker, list_id: &ItemId) -> Result<bool> {
    Ok(list_ref(tracker, list_id)?.is_empty())
}

/// Iterate values in order
///
/// # Errors
///
/// * `ItemNotFound` / `WrongContainerKind` - `list_id` is not a live list
pub fn iter<'a>(tracker: &'a Tracker, list_id: &ItemId) -> Result<slice::Iter<'a, Value>> {
    Ok(list_ref(tracker, list_id)?.iter())
}
