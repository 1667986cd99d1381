//! Audit trail for allocation lifecycle events.

use std::collections::VecDeque;

use crate::util::clock::TimestampMs;

/// Lifecycle action recorded for an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    /// Request entered the queue.
    Enqueue,
    /// Queued request was promoted onto a unit.
    Promote,
    /// Unrecognized client-asserted state was trusted during startup.
    Adopt,
    /// Allocation or queue entry expired for lack of heartbeats.
    Expire,
    /// Client released its allocation or queue spot.
    Release,
}

/// One audit record.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Related invocation identifier.
    pub invocation_id: String,
    /// Unit name, when the action concerns a specific unit.
    pub unit: Option<String>,
    /// Invocation owner.
    pub owner: String,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: TimestampMs,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink with a bounded buffer, for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink holding at most `max_events` records.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, action: AuditAction) -> AuditEvent {
        AuditEvent {
            invocation_id: id.to_string(),
            unit: None,
            owner: "owner".to_string(),
            action,
            created_at_ms: 0,
        }
    }

    #[test]
    fn test_bounded_buffer_drops_oldest() {
        let mut sink = InMemoryAuditSink::new(2);
        sink.record(event("a", AuditAction::Enqueue));
        sink.record(event("b", AuditAction::Promote));
        sink.record(event("c", AuditAction::Release));
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].invocation_id, "b");
        assert_eq!(events[1].invocation_id, "c");
    }
}
