//! datatrack Core - mutation-tracking engine
//!
//! This crate provides identity-tagged trackable containers that record every
//! structural change as an immutable change-log entry, including:
//! - Tracked map, list and attributes containers with an intercepted write surface
//! - An arena (`Tracker`) owning every item, with id-based parent/child links
//! - Propagation of child entries up the ownership tree with rewritten
//!   locations and provenance trails
//! - Lock gating, observer registries and reference sinks
//!
//! # Example
//!
//! ```
//! use datatrack_core::{map_ops, Tracker};
//! use serde_json::json;
//!
//! let mut tracker = Tracker::new();
//! let root = tracker.create_map(Vec::new(), tracker.options().auto_convert(true)).unwrap();
//! map_ops::set(&mut tracker, &root, "child", json!({"state": "draft"})).unwrap();
//!
//! let child = map_ops::get(&tracker, &root, "child").unwrap().unwrap().as_tracked().unwrap().clone();
//! map_ops::set(&mut tracker, &child, "state", "final").unwrap();
//!
//! let last = tracker.tracking_changes(&root, Some(1)).unwrap()[0].clone();
//! assert_eq!(last.location(), Some("child:state"));
//! assert_eq!(last.tree(), &[root.clone()]);
//! ```

pub mod config;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod observers;
pub mod ops;
pub mod origin;
pub mod sinks;

// Re-export commonly used types
pub use config::{ItemOptions, TrackerConfig};
pub use datatrack_core_types::{with_origin, EntryId, ItemId, Origin, OriginScope};
pub use errors::{ExError, ExErrorKind, Result, TrackingError};
pub use model::{
    Action, Actor, AttributeSet, ChangeLogEntry, ChangeRecord, ContainerKind, Content, Location,
    TrackableItem, Value,
};
pub use observers::{Observer, ObserverRegistry, Sink, SinkError};
pub use ops::{attr_ops, list_ops, map_ops, Tracker};
pub use origin::{OriginResolver, ScopedOriginResolver};
