//! Engine event emitter port.
//!
//! Lets the engine announce lifecycle changes without knowing the transport
//! (log lines, server-sent events, a desktop shell bridge).

use serde::{Deserialize, Serialize};

use crate::item::WorkshopItemId;
use crate::session::DownloadStatus;

/// Lifecycle events emitted by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A fetch was launched.
    DownloadStarted { item_id: WorkshopItemId },
    /// A fetch reached a terminal status.
    DownloadFinished {
        item_id: WorkshopItemId,
        status: DownloadStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Queue contents changed.
    QueueChanged { items: Vec<WorkshopItemId> },
    /// A queued item was dropped without fetching.
    ItemSkipped {
        item_id: WorkshopItemId,
        reason: String,
    },
    /// The background queue loop exited.
    QueueRunFinished { completed: usize, failed: usize },
    /// A library scan produced a fresh item list.
    LibraryChanged { count: usize },
}

/// Port for emitting engine events. Must not block.
pub trait EngineEventEmitter: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Emitter that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EngineEventEmitter for NoopEmitter {
    fn emit(&self, _event: EngineEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct CapturingEmitter {
        events: Arc<Mutex<Vec<EngineEvent>>>,
    }

    impl EngineEventEmitter for CapturingEmitter {
        fn emit(&self, event: EngineEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_emitter_is_object_safe() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let emitters: Vec<Box<dyn EngineEventEmitter>> = vec![
            Box::new(NoopEmitter::new()),
            Box::new(CapturingEmitter {
                events: Arc::clone(&events),
            }),
        ];
        for emitter in &emitters {
            emitter.emit(EngineEvent::LibraryChanged { count: 3 });
        }
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[EngineEvent::LibraryChanged { count: 3 }]
        );
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(EngineEvent::QueueRunFinished {
            completed: 2,
            failed: 1,
        })
        .unwrap();
        assert_eq!(json["type"], "queue_run_finished");
        assert_eq!(json["completed"], 2);
    }
}
