//! Observer registry and the sink contract
//!
//! Each item keeps an ordered list of observers. An observer is either an
//! external [`Sink`] or the subscription of the item's parent, through which
//! entries climb the ownership tree.

use std::sync::Arc;

use thiserror::Error;

use crate::model::ChangeLogEntry;
use datatrack_core_types::ItemId;

/// Failure reported by a sink
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct SinkError {
    message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::new(err.to_string())
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::new(err.to_string())
    }
}

/// Consumer of emitted change-log entries
///
/// Sinks run synchronously inside the triggering mutation. A failing sink is
/// reported and skipped; it never aborts the mutation or later observers.
pub trait Sink {
    /// Name used in logs and failure reports
    fn name(&self) -> &str {
        "sink"
    }

    /// Handle one entry
    ///
    /// # Errors
    ///
    /// Any error is caught by the registry and recorded as a sink failure.
    fn accept(&self, entry: &ChangeLogEntry) -> Result<(), SinkError>;
}

impl<F> Sink for F
where
    F: Fn(&ChangeLogEntry) -> Result<(), SinkError>,
{
    fn name(&self) -> &str {
        "closure"
    }

    fn accept(&self, entry: &ChangeLogEntry) -> Result<(), SinkError> {
        self(entry)
    }
}

/// One registered observer
#[derive(Clone)]
pub enum Observer {
    /// The owning item's rebroadcast subscription
    Parent(ItemId),
    Sink(Arc<dyn Sink>),
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Observer::Parent(id) => f.debug_tuple("Parent").field(id).finish(),
            Observer::Sink(sink) => f.debug_tuple("Sink").field(&sink.name()).finish(),
        }
    }
}

/// Ordered, duplicate-free set of observers
#[derive(Debug, Clone, Default)]
pub struct ObserverRegistry {
    observers: Vec<Observer>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink; returns false if this exact sink is already registered
    pub fn add_sink(&mut self, sink: Arc<dyn Sink>) -> bool {
        let present = self.observers.iter().any(|observer| match observer {
            Observer::Sink(existing) => Arc::ptr_eq(existing, &sink),
            Observer::Parent(_) => false,
        });
        if present {
            return false;
        }
        self.observers.push(Observer::Sink(sink));
        true
    }

    pub fn remove_sink(&mut self, sink: &Arc<dyn Sink>) -> bool {
        let before = self.observers.len();
        self.observers.retain(|observer| match observer {
            Observer::Sink(existing) => !Arc::ptr_eq(existing, sink),
            Observer::Parent(_) => true,
        });
        self.observers.len() != before
    }

    pub(crate) fn subscribe_parent(&mut self, parent_id: ItemId) -> bool {
        if self.parent() == Some(&parent_id) {
            return false;
        }
        self.observers.push(Observer::Parent(parent_id));
        true
    }

    pub(crate) fn unsubscribe_parent(&mut self, parent_id: &ItemId) -> bool {
        let before = self.observers.len();
        self.observers
            .retain(|observer| !matches!(observer, Observer::Parent(id) if id == parent_id));
        self.observers.len() != before
    }

    /// The parent subscription, if any
    pub fn parent(&self) -> Option<&ItemId> {
        self.observers.iter().find_map(|observer| match observer {
            Observer::Parent(id) => Some(id),
            Observer::Sink(_) => None,
        })
    }

    /// Registered sinks in registration order
    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        self.observers
            .iter()
            .filter_map(|observer| match observer {
                Observer::Sink(sink) => Some(sink.clone()),
                Observer::Parent(_) => None,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observer> {
        self.observers.iter()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
