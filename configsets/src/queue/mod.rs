//! Submission of operations to the cluster's distributed work queue.

mod bridge;
mod channel;
mod remote;
pub mod protocol;

pub use bridge::{QueueBridge, QueueOutcome};
pub use channel::{ChannelWorkQueue, QueueTask};
pub use remote::HttpWorkQueue;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum QueueError {
    #[error("work queue is closed")]
    Closed,

    #[error("work queue request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("work queue returned status {0}")]
    Status(u16),

    #[error("invalid work queue reply: {0}")]
    InvalidReply(#[from] serde_json::Error),
}

/// Notification that something the queue was watching changed while the
/// submitter was waiting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedEvent {
    pub path: String,
    pub state: String,
    #[serde(rename = "type")]
    pub event_type: String,
}

/// What a submission produced before the submitter stopped waiting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueEvent {
    /// Serialized response written by the worker, if one arrived.
    pub payload: Option<Bytes>,
    pub watched_event: Option<WatchedEvent>,
}

impl QueueEvent {
    pub fn delivered(payload: impl Into<Bytes>) -> Self {
        QueueEvent {
            payload: Some(payload.into()),
            watched_event: None,
        }
    }

    pub fn watched(event: WatchedEvent) -> Self {
        QueueEvent {
            payload: None,
            watched_event: Some(event),
        }
    }
}

/// A FIFO, cluster-replicated queue with a correlated response channel.
///
/// Implementations return an empty event when `timeout` passes without a
/// response; errors are reserved for failures to talk to the queue at all.
/// A submitted message is never retracted.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn submit(&self, message: Bytes, timeout: Duration) -> Result<QueueEvent, QueueError>;
}
