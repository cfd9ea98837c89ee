//! Core types shared across the datatrack facilities
//!
//! This crate provides the foundational types used by the tracking engine
//! and by its logging output:
//!
//! - **Identifiers**: ItemId, EntryId
//! - **Origins**: Origin descriptors and the scoped origin context
//! - **Schema constants**: Canonical field keys, event names and change-log keys

pub mod ids;
pub mod origin;
pub mod schema;

pub use ids::{EntryId, ItemId};
pub use origin::{current_origins, with_origin, Origin, OriginScope};
