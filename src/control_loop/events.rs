//! Structured events emitted while a query runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{LoopState, QueryId};
use crate::types::{OperationRequest, OperationResult};

/// Callback receiving loop events.
pub type LoopEventSink = Arc<dyn Fn(LoopEvent) + Send + Sync>;

/// Concrete event payloads emitted by the control loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEventPayload {
    Started { query: String },
    StateChanged { state: LoopState },
    DecisionRequested { iteration: usize },
    OperationsRequested { requests: Vec<OperationRequest> },
    OperationCompleted { result: OperationResult },
    Completed { answer: String },
    Failed { error: String },
    Cancelled,
}

/// Envelope for loop events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopEvent {
    pub query_id: QueryId,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: LoopEventPayload,
}

pub(crate) struct LoopEventEmitter {
    query_id: QueryId,
    seq: AtomicU64,
    sink: Option<LoopEventSink>,
}

impl LoopEventEmitter {
    pub(crate) fn new(query_id: QueryId, sink: Option<LoopEventSink>) -> Self {
        Self {
            query_id,
            seq: AtomicU64::new(1),
            sink,
        }
    }

    pub(crate) fn emit(&self, payload: LoopEventPayload) {
        let Some(sink) = &self.sink else { return };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        (sink)(LoopEvent {
            query_id: self.query_id,
            seq,
            timestamp: Utc::now(),
            payload,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn emitter_numbers_events_from_one() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let emitter = LoopEventEmitter::new(
            QueryId::new_v4(),
            Some(Arc::new(move |event: LoopEvent| {
                sink_seen.lock().unwrap().push(event.seq);
            })),
        );
        emitter.emit(LoopEventPayload::Cancelled);
        emitter.emit(LoopEventPayload::Completed { answer: "12".into() });
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn payload_serializes_with_type_tag() {
        let value = serde_json::to_value(LoopEventPayload::StateChanged {
            state: LoopState::ExecutingOperations,
        })
        .unwrap();
        assert_eq!(value["type"], "state_changed");
        assert_eq!(value["state"], "executing_operations");
    }
}
