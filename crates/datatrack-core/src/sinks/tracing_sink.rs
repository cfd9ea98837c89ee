use crate::model::ChangeLogEntry;
use crate::observers::{Sink, SinkError};
use datatrack_core_types::schema::TARGET_CHANGES;

/// Emits one `info` event per entry under the `datatrack::changes` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl Sink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn accept(&self, entry: &ChangeLogEntry) -> Result<(), SinkError> {
        tracing::info!(
            target: TARGET_CHANGES,
            entry_id = %entry.id(),
            item_id = %entry.subject_id(),
            action = %entry.action(),
            actor = %entry.actor(),
            location = entry.location().unwrap_or(""),
            depth = entry.tree().len(),
            "change recorded"
        );
        Ok(())
    }
}
