use super::{QueueError, QueueEvent, WatchedEvent, WorkQueue};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Tells the queue service how long the submitter is willing to wait.
pub const TIMEOUT_HEADER: &str = "x-queue-timeout-ms";

#[derive(Debug, Deserialize)]
struct SubmitReply {
    #[serde(default)]
    response: Option<serde_json::Value>,
    #[serde(default)]
    watched_event: Option<WatchedEvent>,
}

/// Work queue reached over HTTP.
///
/// The service holds the request open until a worker responds, a watch fires
/// or the timeout passes, and answers with `{"response": .., "watched_event": ..}`.
#[derive(Clone, Debug)]
pub struct HttpWorkQueue {
    client: reqwest::Client,
    url: Url,
}

impl HttpWorkQueue {
    pub fn new(url: Url) -> Self {
        HttpWorkQueue {
            client: reqwest::Client::new(),
            url,
        }
    }

    async fn post(&self, message: Bytes, timeout: Duration) -> Result<QueueEvent, QueueError> {
        let response = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "application/json")
            .header(TIMEOUT_HEADER, timeout.as_millis().to_string())
            .body(message)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(QueueError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let reply: SubmitReply = serde_json::from_slice(&body)?;
        let payload = reply
            .response
            .filter(|value| !value.is_null())
            .map(|value| serde_json::to_vec(&value).map(Bytes::from))
            .transpose()?;

        Ok(QueueEvent {
            payload,
            watched_event: reply.watched_event,
        })
    }
}

#[async_trait]
impl WorkQueue for HttpWorkQueue {
    async fn submit(&self, message: Bytes, timeout: Duration) -> Result<QueueEvent, QueueError> {
        match tokio::time::timeout(timeout, self.post(message, timeout)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(url = %self.url, ?timeout, "Queue service did not answer in time");
                Ok(QueueEvent::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn queue_for(server: &MockServer) -> HttpWorkQueue {
        HttpWorkQueue::new(Url::parse(&format!("{}/queue", server.uri())).unwrap())
    }

    #[tokio::test]
    async fn test_submit_delivered() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/queue"))
            .and(header(TIMEOUT_HEADER, "5000"))
            .and(body_string(r#"{"name":"conf"}"#))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"response": {"success": "ok"}})),
            )
            .mount(&mock_server)
            .await;

        let event = queue_for(&mock_server)
            .submit(Bytes::from_static(br#"{"name":"conf"}"#), Duration::from_secs(5))
            .await
            .unwrap();

        let payload: serde_json::Value = serde_json::from_slice(&event.payload.unwrap()).unwrap();
        assert_eq!(payload, json!({"success": "ok"}));
        assert!(event.watched_event.is_none());
    }

    #[tokio::test]
    async fn test_submit_watched() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/queue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": null,
                "watched_event": {"path": "/q/qn-1", "state": "Expired", "type": "NodeDeleted"}
            })))
            .mount(&mock_server)
            .await;

        let event = queue_for(&mock_server)
            .submit(Bytes::from_static(b"{}"), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(event.payload.is_none());
        assert_eq!(
            event.watched_event,
            Some(WatchedEvent {
                path: "/q/qn-1".into(),
                state: "Expired".into(),
                event_type: "NodeDeleted".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_submit_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/queue"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let result = queue_for(&mock_server)
            .submit(Bytes::from_static(b"{}"), Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(QueueError::Status(503))));
    }

    #[tokio::test]
    async fn test_submit_local_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/queue"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": {"success": "ok"}}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let event = queue_for(&mock_server)
            .submit(Bytes::from_static(b"{}"), Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(event, QueueEvent::default());
    }
}
