use chrono::{DateTime, Utc};
use log::info;
use parking_lot::Mutex;
use serde::Serialize;

use crate::model::{Id, OperationKind, RecordKind, UserContext};

/// A completed mutation of one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordEvent {
    pub kind: RecordKind,
    pub record_id: Id,
    pub display_name: String,
    pub operation: OperationKind,
    pub actor: UserContext,
    pub occurred_at: DateTime<Utc>,
}

impl RecordEvent {
    /// Audit phrase such as "archived the tool"
    pub fn summary(&self) -> String {
        format!("{} the {}", self.operation.past_tense(), self.kind.noun())
    }
}

/// Receives notifications after records change, e.g. for an audit log
pub trait RecordObserver: Send + Sync {
    /// Called after each successful per-record mutation
    fn record_changed(&self, event: &RecordEvent);

    /// Called once after a set-based update touched `affected` rows
    fn records_changed(
        &self,
        _kind: RecordKind,
        _operation: OperationKind,
        _ids: &[Id],
        _affected: u64,
        _actor: &UserContext,
    ) {
    }
}

/// Writes every change to the application log
#[derive(Debug, Default, Clone, Copy)]
pub struct AuditLog;

impl RecordObserver for AuditLog {
    fn record_changed(&self, event: &RecordEvent) {
        info!(
            "{} {} \"{}\" (id {})",
            event.actor.label(),
            event.summary(),
            event.display_name,
            event.record_id
        );
    }

    fn records_changed(
        &self,
        kind: RecordKind,
        operation: OperationKind,
        ids: &[Id],
        affected: u64,
        actor: &UserContext,
    ) {
        info!(
            "{} {} {} of {} requested {} ({:?})",
            actor.label(),
            operation.past_tense(),
            affected,
            ids.len(),
            kind.plural(),
            ids
        );
    }
}

/// Keeps events in memory so callers can inspect what happened
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<RecordEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordEvent> {
        self.events.lock().clone()
    }
}

impl RecordObserver for EventRecorder {
    fn record_changed(&self, event: &RecordEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_summary() {
        let event = RecordEvent {
            kind: RecordKind::Tool,
            record_id: 4,
            display_name: "Jigsaw".to_string(),
            operation: OperationKind::Publish,
            actor: UserContext::system(),
            occurred_at: Utc::now(),
        };
        assert_eq!(event.summary(), "published the tool");
    }
}
