//! Event sink trait for pushing orchestrator events to hosts.
//!
//! Implementations handle transport details (broadcast channels, a terminal
//! renderer, SSE). The orchestrator never learns who is listening.

use crate::events::OrchestratorEvent;

/// Trait for emitting orchestrator events.
///
/// `emit` must not block and must not fail. A sink with no listeners drops the
/// event.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: OrchestratorEvent);
}

/// A no-op sink for tests and one-shot CLI commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NoopSink {
    pub const fn new() -> Self {
        Self
    }
}

impl EventSink for NoopSink {
    fn emit(&self, _event: OrchestratorEvent) {}
}
