use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::response::sse::Event;
use futures::Stream;
use tokio::sync::mpsc;

use easel_core::events::ProgressEvent;
use easel_core::ids::SessionId;
use easel_pipeline::registry::{SessionRegistry, SubscriberHandle};

/// SSE body for one progress subscription. Dropping the stream (the
/// observer went away) releases the registry entry for this subscription
/// only; a replacement subscriber is never evicted by a stale drop.
pub struct SubscriberStream {
    session_id: SessionId,
    epoch: u64,
    rx: mpsc::Receiver<ProgressEvent>,
    registry: Arc<SessionRegistry>,
}

impl SubscriberStream {
    pub fn new(handle: SubscriberHandle, registry: Arc<SessionRegistry>) -> Self {
        let epoch = handle.epoch();
        Self {
            session_id: handle.session_id,
            epoch,
            rx: handle.rx,
            registry,
        }
    }
}

impl Stream for SubscriberStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => match Event::default().json_data(&event) {
                Ok(frame) => Poll::Ready(Some(Ok(frame))),
                Err(e) => {
                    tracing::warn!(
                        session_id = %this.session_id,
                        error = %e,
                        "Failed to frame progress event"
                    );
                    Poll::Ready(None)
                }
            },
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SubscriberStream {
    fn drop(&mut self) {
        if self.registry.release(&self.session_id, self.epoch) {
            tracing::info!(session_id = %self.session_id, "Progress subscriber disconnected");
        }
    }
}
