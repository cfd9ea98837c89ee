//! Conversion of values entering and leaving tracked containers

use std::collections::HashSet;

use crate::config::ItemOptions;
use crate::errors::{Result, TrackingError};
use crate::model::{Location, Value};
use crate::ops::store::Tracker;
use datatrack_core_types::ItemId;

/// Decide how a value written at `location` of `owner_id` is stored
///
/// A tracked value is adopted as a child of the owner. When the owner has
/// `auto_convert` set, a plain JSON object or array becomes a new tracked
/// child (with `auto_convert` off, inheriting the owner's delimiter and
/// snapshot setting). Anything else is stored as is.
///
/// # Errors
///
/// * `ItemNotFound` - the owner or the tracked value does not exist
/// * `AlreadyOwned` / `CycleDetected` - the tracked value cannot be adopted
pub fn convert(
    tracker: &mut Tracker,
    owner_id: &ItemId,
    location: &Location,
    value: Value,
) -> Result<Value> {
    if let Value::Tracked(child_id) = &value {
        tracker.check_adoption(owner_id, child_id, location)?;
        tracker.link(owner_id, child_id, location.clone());
        return Ok(value);
    }

    let owner = tracker.item(owner_id)?;
    if !owner.auto_convert || value.composite_kind().is_none() {
        return Ok(value);
    }
    let options = ItemOptions {
        auto_convert: false,
        delimiter: owner.delimiter.clone(),
        capture_snapshots: owner.capture_snapshots,
        parent: Some((owner_id.clone(), location.clone())),
    };

    match value {
        Value::Plain(json) => tracker.create_from_json(json, options).map(Value::Tracked),
        tracked => Ok(tracked),
    }
}

/// [`convert`] for a write that opens a new position in the owner
///
/// A tracked value already registered anywhere in the owner is refused, even
/// at the position being opened: after the shift it would sit in two places.
///
/// # Errors
///
/// * `AlreadyOwned` - the tracked value is already a child of the owner
/// * anything [`convert`] returns
pub fn convert_inserted(
    tracker: &mut Tracker,
    owner_id: &ItemId,
    location: &Location,
    value: Value,
) -> Result<Value> {
    if let Value::Tracked(child_id) = &value {
        if tracker.item(owner_id)?.children.contains_key(child_id) {
            return Err(TrackingError::AlreadyOwned {
                item_id: child_id.to_string(),
                owner_id: owner_id.to_string(),
            });
        }
    }
    convert(tracker, owner_id, location, value)
}

/// Check that every tracked value in a batch can be adopted by `owner_id`
///
/// Run before a multi-value write so the batch is applied whole or not at all.
///
/// # Errors
///
/// * `AlreadyOwned` - a value is owned elsewhere, or appears twice in the batch
/// * anything [`convert`] returns for a single tracked value
pub fn validate_incoming(
    tracker: &Tracker,
    owner_id: &ItemId,
    incoming: &[(Location, &Value)],
) -> Result<()> {
    let mut seen = HashSet::new();
    for (location, value) in incoming {
        let Some(child_id) = value.as_tracked() else {
            continue;
        };
        if !seen.insert(child_id) {
            return Err(TrackingError::AlreadyOwned {
                item_id: child_id.to_string(),
                owner_id: owner_id.to_string(),
            });
        }
        tracker.check_adoption(owner_id, child_id, location)?;
    }
    Ok(())
}

/// Deep, untracked equivalent of a stored value
///
/// Only reads: tracked children stay registered with their owner.
///
/// # Errors
///
/// Returns `ItemNotFound` if a tracked value refers to a missing item.
pub fn unwrap(tracker: &Tracker, value: &Value) -> Result<serde_json::Value> {
    tracker.plain_value(value)
}

/// Detach a value that is leaving `owner_id`
///
/// A tracked value is deregistered so later mutations of it no longer reach
/// the owner. Plain values need nothing.
///
/// # Errors
///
/// Returns `ItemNotFound` if the owner does not exist.
pub fn release(tracker: &mut Tracker, owner_id: &ItemId, value: &Value) -> Result<()> {
    if let Value::Tracked(child_id) = value {
        tracker.deregister_child(owner_id, child_id)?;
    }
    Ok(())
}
