//! SSE event broadcaster for real-time event streaming.
//!
//! Implements [`EngineEventEmitter`] so the engine's queue, download and
//! library events reach every connected web client.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use workdl_core::{EngineEvent, EngineEventEmitter};

/// Broadcast fan-out of [`EngineEvent`]s to SSE clients.
///
/// Slow clients may miss events if the buffer overflows.
#[derive(Debug, Clone)]
pub struct SseBroadcaster {
    sender: broadcast::Sender<EngineEvent>,
}

impl SseBroadcaster {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcaster with room for 256 buffered events.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(256)
    }

    /// SSE stream for a new client, with a keep-alive ping every 30 seconds.
    pub fn subscribe(
        self: Arc<Self>,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
        let receiver = self.sender.subscribe();
        let stream = BroadcastStream::new(receiver).filter_map(|result| match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().data(json))),
                Err(e) => {
                    tracing::warn!(target: "workdl.http", error = %e, "Failed to serialize event");
                    None
                }
            },
            Err(e) => {
                tracing::debug!(target: "workdl.http", error = %e, "SSE stream lagged");
                None
            }
        });

        Sse::new(stream).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(30))
                .text("ping"),
        )
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EngineEventEmitter for SseBroadcaster {
    fn emit(&self, event: EngineEvent) {
        // no subscribers is fine
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let sse = SseBroadcaster::with_defaults();
        let mut rx = sse.sender.subscribe();
        assert_eq!(sse.subscriber_count(), 1);

        sse.emit(EngineEvent::LibraryChanged { count: 3 });
        assert_eq!(rx.recv().await.unwrap(), EngineEvent::LibraryChanged { count: 3 });
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let sse = SseBroadcaster::new(4);
        sse.emit(EngineEvent::QueueRunFinished {
            completed: 0,
            failed: 0,
        });
        assert_eq!(sse.subscriber_count(), 0);
    }
}
