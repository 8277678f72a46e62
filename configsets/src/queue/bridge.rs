use super::protocol::{QUEUE_OPERATION, QueueResponse, encode_message, opcode};
use super::{QueueEvent, WatchedEvent, WorkQueue};
use crate::action::ConfigSetAction;
use crate::errors::{ConfigSetError, ErrorCode, Result};
use crate::metrics_defs::{QUEUE_INTERRUPTIONS, QUEUE_TIMEOUTS, QUEUE_WAIT_DURATION};
use crate::types::{OperationIntent, Reply};
use bytes::Bytes;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Classified result of one submit-and-wait call.
#[derive(Clone, Debug, PartialEq)]
pub enum QueueOutcome {
    Delivered(Bytes),
    TimedOut,
    Interrupted(WatchedEvent),
    /// No response, no timeout and no watch notification.
    Unclassified,
}

impl QueueOutcome {
    /// Success is checked before timeout, and timeout before the watch
    /// notification, so a slow response that did arrive is never reported as
    /// an interruption.
    pub fn classify(event: QueueEvent, elapsed: Duration, timeout: Duration) -> Self {
        match event {
            QueueEvent {
                payload: Some(payload),
                ..
            } => QueueOutcome::Delivered(payload),
            _ if elapsed >= timeout => QueueOutcome::TimedOut,
            QueueEvent {
                watched_event: Some(event),
                ..
            } => QueueOutcome::Interrupted(event),
            _ => QueueOutcome::Unclassified,
        }
    }

    /// Turns the outcome into the reply for the caller, or the error to surface.
    pub fn into_reply(self, operation: &str, timeout: Duration) -> Result<Reply> {
        match self {
            QueueOutcome::Delivered(payload) => {
                let response: QueueResponse = serde_json::from_slice(&payload).map_err(|e| {
                    ConfigSetError::server_error(format!(
                        "{operation} the configset returned an unreadable response: {e}"
                    ))
                })?;

                match response.exception {
                    Some(exception) => Err(ConfigSetError::Remote {
                        code: ErrorCode::from_code(exception.rsp_code),
                        msg: exception
                            .msg
                            .unwrap_or_else(|| format!("{operation} the configset failed")),
                    }),
                    None => Ok(response.values),
                }
            }
            QueueOutcome::TimedOut => Err(ConfigSetError::server_error(format!(
                "{operation} the configset timed out after {}s",
                timeout.as_secs()
            ))),
            QueueOutcome::Interrupted(event) => Err(ConfigSetError::server_error(format!(
                "{operation} the configset error [Watcher fired on path: {} state: {} type {}]",
                event.path, event.state, event.event_type
            ))),
            QueueOutcome::Unclassified => Err(ConfigSetError::server_error(format!(
                "{operation} the configset unknown case"
            ))),
        }
    }
}

/// Turns a queue-mediated operation into a synchronous reply.
///
/// The calling task waits for up to `timeout`. Giving up is purely local: the
/// queued operation may still be applied by a worker afterwards.
#[derive(Clone)]
pub struct QueueBridge {
    queue: Arc<dyn WorkQueue>,
    timeout: Duration,
}

impl QueueBridge {
    pub fn new(queue: Arc<dyn WorkQueue>, timeout: Duration) -> Self {
        QueueBridge { queue, timeout }
    }

    pub async fn submit(&self, action: ConfigSetAction, intent: OperationIntent) -> Result<Reply> {
        let operation = action.to_lower();
        let intent = intent.with(QUEUE_OPERATION, opcode(action));
        let message = encode_message(&intent).map_err(|e| {
            ConfigSetError::server_error(format!("Failed to serialize {operation} message: {e}"))
        })?;

        let start = Instant::now();
        let event = self.queue.submit(message, self.timeout).await?;
        let elapsed = start.elapsed();
        histogram!(QUEUE_WAIT_DURATION, "operation" => operation).record(elapsed.as_secs_f64());

        let outcome = QueueOutcome::classify(event, elapsed, self.timeout);
        match &outcome {
            QueueOutcome::Delivered(_) => {}
            QueueOutcome::TimedOut => {
                counter!(QUEUE_TIMEOUTS).increment(1);
                tracing::warn!(operation, ?elapsed, "Timed out waiting for queued operation");
            }
            QueueOutcome::Interrupted(event) => {
                counter!(QUEUE_INTERRUPTIONS).increment(1);
                tracing::warn!(operation, watched_event = ?event, "Queued operation interrupted");
            }
            QueueOutcome::Unclassified => {
                tracing::error!(operation, "Queue returned no response, timeout or watch event");
            }
        }

        outcome.into_reply(operation, self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::ScriptedQueue;
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(300);

    fn watched() -> WatchedEvent {
        WatchedEvent {
            path: "/overseer/collection-queue-work/qnr-0000000042".into(),
            state: "Disconnected".into(),
            event_type: "None".into(),
        }
    }

    #[test]
    fn test_classify_priority() {
        let payload = Bytes::from_static(b"{}");

        // A payload wins even if it arrived after the deadline with a watch event attached
        let event = QueueEvent {
            payload: Some(payload.clone()),
            watched_event: Some(watched()),
        };
        assert_eq!(
            QueueOutcome::classify(event, TIMEOUT * 2, TIMEOUT),
            QueueOutcome::Delivered(payload)
        );

        assert_eq!(
            QueueOutcome::classify(QueueEvent::watched(watched()), TIMEOUT, TIMEOUT),
            QueueOutcome::TimedOut
        );
        assert_eq!(
            QueueOutcome::classify(QueueEvent::watched(watched()), Duration::from_secs(1), TIMEOUT),
            QueueOutcome::Interrupted(watched())
        );
        assert_eq!(
            QueueOutcome::classify(QueueEvent::default(), Duration::from_secs(1), TIMEOUT),
            QueueOutcome::Unclassified
        );
    }

    #[test]
    fn test_delivered_reply() {
        let payload = serde_json::to_vec(&json!({"success": "ok", "nodes": 3})).unwrap();
        let reply = QueueOutcome::Delivered(payload.into())
            .into_reply("create", TIMEOUT)
            .unwrap();

        assert_eq!(reply.len(), 2);
        assert_eq!(reply["success"], json!("ok"));
        assert_eq!(reply["nodes"], json!(3));
    }

    #[test]
    fn test_delivered_exception() {
        let payload = json!({"exception": {"rspCode": 400, "msg": "ConfigSet already exists: conf"}});
        let err = QueueOutcome::Delivered(serde_json::to_vec(&payload).unwrap().into())
            .into_reply("create", TIMEOUT)
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert_eq!(err.to_string(), "ConfigSet already exists: conf");

        for exception in [json!({"rspCode": -1, "msg": "boom"}), json!({"msg": "boom"})] {
            let payload = json!({ "exception": exception });
            let err = QueueOutcome::Delivered(serde_json::to_vec(&payload).unwrap().into())
                .into_reply("delete", TIMEOUT)
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::ServerError);
            assert_eq!(err.to_string(), "boom");
        }
    }

    #[test]
    fn test_failure_messages() {
        let err = QueueOutcome::TimedOut.into_reply("create", TIMEOUT).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ServerError);
        assert_eq!(err.to_string(), "create the configset timed out after 300s");

        let err = QueueOutcome::Interrupted(watched())
            .into_reply("delete", TIMEOUT)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ServerError);
        assert_eq!(
            err.to_string(),
            "delete the configset error [Watcher fired on path: /overseer/collection-queue-work/qnr-0000000042 state: Disconnected type None]"
        );

        let err = QueueOutcome::Unclassified.into_reply("delete", TIMEOUT).unwrap_err();
        assert_eq!(err.to_string(), "delete the configset unknown case");

        let err = QueueOutcome::Delivered(Bytes::from_static(b"not json"))
            .into_reply("delete", TIMEOUT)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ServerError);
    }

    #[tokio::test]
    async fn test_submit_tags_message() {
        let queue = Arc::new(ScriptedQueue::responding(json!({"success": "ok"})));
        let bridge = QueueBridge::new(queue.clone(), TIMEOUT);

        let intent = OperationIntent::new().with("name", "conf");
        let reply = bridge.submit(ConfigSetAction::Delete, intent).await.unwrap();
        assert_eq!(reply["success"], json!("ok"));

        let messages = queue.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0],
            json!({"name": "conf", "operation": "configsets_delete"})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_times_out() {
        let bridge = QueueBridge::new(Arc::new(ScriptedQueue::silent()), TIMEOUT);

        let err = bridge
            .submit(ConfigSetAction::Create, OperationIntent::new().with("name", "conf"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "create the configset timed out after 300s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_interrupted() {
        let queue = ScriptedQueue::interrupted(watched(), Duration::from_secs(5));
        let bridge = QueueBridge::new(Arc::new(queue), TIMEOUT);

        let err = bridge
            .submit(ConfigSetAction::Delete, OperationIntent::new().with("name", "conf"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("delete the configset error [Watcher fired"));
    }
}
