use std::collections::VecDeque;
use std::sync::Mutex;

use crate::model::{Action, ChangeLogEntry};
use crate::observers::{Sink, SinkError};

/// In-memory FIFO of received entries
///
/// With a capacity, the oldest entry is dropped once the buffer is full.
/// `init` entries are skipped unless `include_init_events` is set.
#[derive(Debug, Default)]
pub struct ChangeCollector {
    entries: Mutex<VecDeque<ChangeLogEntry>>,
    capacity: Option<usize>,
    include_init_events: bool,
}

impl ChangeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn include_init_events(mut self, include: bool) -> Self {
        self.include_init_events = include;
        self
    }

    fn snapshot(&self) -> Vec<ChangeLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every held entry, oldest first
    pub fn as_list(&self) -> Vec<ChangeLogEntry> {
        self.snapshot()
    }

    /// Held entries with the given action, oldest first
    pub fn filtered(&self, action: Action) -> Vec<ChangeLogEntry> {
        self.snapshot()
            .into_iter()
            .filter(|entry| entry.action() == action)
            .collect()
    }

    pub fn last(&self) -> Option<ChangeLogEntry> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.back().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().map(|mut entries| entries.clear()).ok();
    }
}

impl Sink for ChangeCollector {
    fn name(&self) -> &str {
        "collector"
    }

    fn accept(&self, entry: &ChangeLogEntry) -> Result<(), SinkError> {
        if entry.action() == Action::Init && !self.include_init_events {
            return Ok(());
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SinkError::new("collector buffer poisoned"))?;
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return Ok(());
            }
            while entries.len() >= capacity {
                entries.pop_front();
            }
        }
        entries.push_back(entry.clone());
        Ok(())
    }
}
