//! Event sinks for workflow observation.

use std::sync::Arc;

use fiscorelay_core::{EventLevel, EventSink, WorkflowEvent};
use tracing::{error, info, warn};

/// Sink that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn observe(&self, event: &WorkflowEvent) {
        let payload = event.payload();
        match event.level() {
            EventLevel::Info => info!(data = %payload, "{}", event.message()),
            EventLevel::Warn => warn!(data = %payload, "{}", event.message()),
            EventLevel::Error => error!(data = %payload, "{}", event.message()),
        }
    }
}

/// Sink that forwards every event to several sinks, in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    /// Creates an empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the number of sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if no sink is attached.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink").field("sinks", &self.sinks.len()).finish()
    }
}

impl EventSink for FanoutSink {
    fn observe(&self, event: &WorkflowEvent) {
        for sink in &self.sinks {
            sink.observe(event);
        }
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: std::sync::Mutex<Vec<WorkflowEvent>>,
}

impl RecordingSink {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for RecordingSink {
    fn observe(&self, event: &WorkflowEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = Arc::new(RecordingSink::new());
        let second = Arc::new(RecordingSink::new());
        let fanout = FanoutSink::new()
            .with(first.clone())
            .with(Arc::new(TracingSink))
            .with(second.clone());

        fanout.observe(&WorkflowEvent::SessionCleared {
            reason: "401".to_string(),
        });

        assert_eq!(fanout.len(), 3);
        assert_eq!(first.events().len(), 1);
        assert_eq!(second.events().len(), 1);
    }
}
