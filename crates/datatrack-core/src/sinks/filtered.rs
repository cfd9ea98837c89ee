use std::collections::HashSet;
use std::sync::Arc;

use crate::model::{Action, ChangeLogEntry};
use crate::observers::{Sink, SinkError};

/// Forwards only entries that match an allow-list
///
/// An empty action list or location list matches everything. Location
/// matching is exact against the entry's (propagated) location.
pub struct FilteredSink {
    inner: Arc<dyn Sink>,
    actions: HashSet<Action>,
    locations: HashSet<String>,
}

impl FilteredSink {
    pub fn new(inner: Arc<dyn Sink>) -> Self {
        Self {
            inner,
            actions: HashSet::new(),
            locations: HashSet::new(),
        }
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub fn locations<S: Into<String>>(mut self, locations: impl IntoIterator<Item = S>) -> Self {
        self.locations.extend(locations.into_iter().map(Into::into));
        self
    }

    fn matches(&self, entry: &ChangeLogEntry) -> bool {
        let action_ok = self.actions.is_empty() || self.actions.contains(&entry.action());
        let location_ok = self.locations.is_empty()
            || entry
                .location()
                .is_some_and(|location| self.locations.contains(location));
        action_ok && location_ok
    }
}

impl Sink for FilteredSink {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn accept(&self, entry: &ChangeLogEntry) -> Result<(), SinkError> {
        if self.matches(entry) {
            self.inner.accept(entry)
        } else {
            Ok(())
        }
    }
}
