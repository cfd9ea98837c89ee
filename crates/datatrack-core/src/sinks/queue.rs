use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::model::{ChangeLogEntry, ChangeRecord};
use crate::observers::{Sink, SinkError};

/// Forwards records into an unbounded tokio channel
///
/// Sending never blocks, so the sink is safe to call from synchronous
/// mutation paths while an async task drains the receiver.
#[derive(Debug, Clone)]
pub struct QueueSink {
    sender: UnboundedSender<ChangeRecord>,
}

impl QueueSink {
    pub fn new(sender: UnboundedSender<ChangeRecord>) -> Self {
        Self { sender }
    }

    /// A sink paired with the receiving end of a fresh channel
    pub fn channel() -> (Self, UnboundedReceiver<ChangeRecord>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl Sink for QueueSink {
    fn name(&self) -> &str {
        "queue"
    }

    fn accept(&self, entry: &ChangeLogEntry) -> Result<(), SinkError> {
        self.sender
            .send(ChangeRecord::from(entry))
            .map_err(|_| SinkError::new("queue receiver dropped"))
    }
}
