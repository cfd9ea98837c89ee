pub mod attributes;
pub mod entry;
pub mod item;
pub mod value;

pub use attributes::AttributeSet;
pub use entry::{Action, Actor, ChangeLogEntry, ChangeRecord, Extra, ExtraField};
pub use item::{ChildLink, ParentLink, TrackableItem};
pub use value::{ContainerKind, Content, Location, Value};
