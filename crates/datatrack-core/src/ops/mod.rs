//! Operations on tracked containers
//!
//! `store` holds the [`Tracker`] arena and propagation; `map_ops`,
//! `list_ops` and `attr_ops` are the intercepted surfaces of each container
//! kind.

pub mod attr_ops;
pub mod convert;
mod intercept;
pub mod list_ops;
pub mod map_ops;
pub mod store;

pub use store::Tracker;
