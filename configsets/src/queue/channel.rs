use super::{QueueError, QueueEvent, WatchedEvent, WorkQueue};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, timeout_at};

/// Watch state reported when the worker went away without responding.
const STATE_CLOSED: &str = "Closed";
const TYPE_RESPONDER_DROPPED: &str = "ResponderDropped";

/// A message taken off the queue by a worker, paired with its response slot.
#[derive(Debug)]
pub struct QueueTask {
    message: Bytes,
    responder: oneshot::Sender<Bytes>,
}

impl QueueTask {
    pub fn message(&self) -> &Bytes {
        &self.message
    }

    /// Returns false if the submitter has already stopped waiting.
    pub fn respond(self, payload: impl Into<Bytes>) -> bool {
        self.responder.send(payload.into()).is_ok()
    }
}

/// In-process work queue backed by a bounded channel.
///
/// Workers drain the receiver returned by [`ChannelWorkQueue::new`]. Used for
/// single-node deployments and tests.
#[derive(Clone, Debug)]
pub struct ChannelWorkQueue {
    sender: mpsc::Sender<QueueTask>,
}

impl ChannelWorkQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<QueueTask>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (ChannelWorkQueue { sender }, receiver)
    }
}

#[async_trait]
impl WorkQueue for ChannelWorkQueue {
    async fn submit(&self, message: Bytes, timeout: Duration) -> Result<QueueEvent, QueueError> {
        let deadline = Instant::now() + timeout;
        let (responder, response) = oneshot::channel();
        let task = QueueTask { message, responder };

        match timeout_at(deadline, self.sender.send(task)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(QueueError::Closed),
            Err(_) => return Ok(QueueEvent::default()),
        }

        match timeout_at(deadline, response).await {
            Ok(Ok(payload)) => Ok(QueueEvent::delivered(payload)),
            Ok(Err(_)) => Ok(QueueEvent::watched(WatchedEvent {
                path: "in-process".to_string(),
                state: STATE_CLOSED.to_string(),
                event_type: TYPE_RESPONDER_DROPPED.to_string(),
            })),
            Err(_) => Ok(QueueEvent::default()),
        }
    }
}
