//! Broadcast-backed event sink.
//!
//! Hosts subscribe to receive [`OrchestratorEvent`]s. With no subscribers the
//! event is dropped, which is the expected state once a UI has gone away.

use tokio::sync::broadcast;
use tracing::trace;
use wrangler_core::{EventSink, OrchestratorEvent};

/// Broadcast channel capacity for orchestrator events
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<OrchestratorEvent>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: OrchestratorEvent) {
        if self.sender.receiver_count() > 0 {
            trace!(?event, "broadcasting orchestrator event");
            let _ = self.sender.send(event);
        }
    }
}
