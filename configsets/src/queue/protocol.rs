//! Message and response shapes exchanged with the work queue.

use crate::action::ConfigSetAction;
use crate::types::{OperationIntent, Reply};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Reserved key carrying the compound opcode of a queued message.
pub const QUEUE_OPERATION: &str = "operation";

/// Distinguishes configset operations from other traffic sharing the queue.
pub const CONFIGSETS_ACTION_PREFIX: &str = "configsets_";

pub fn opcode(action: ConfigSetAction) -> String {
    format!("{CONFIGSETS_ACTION_PREFIX}{}", action.to_lower())
}

pub fn encode_message(intent: &OperationIntent) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(intent).map(Bytes::from)
}

/// Response written by the worker that applied an operation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<RemoteException>,

    #[serde(flatten)]
    pub values: Reply,
}

/// Application-level failure reported by the worker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteException {
    #[serde(rename = "rspCode", default)]
    pub rsp_code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_opcode() {
        assert_eq!(opcode(ConfigSetAction::Create), "configsets_create");
        assert_eq!(opcode(ConfigSetAction::Delete), "configsets_delete");
    }

    #[test]
    fn test_encode_message_keeps_order() {
        let intent = OperationIntent::new()
            .with("name", "conf")
            .with("baseConfigSet", "_default")
            .with(QUEUE_OPERATION, opcode(ConfigSetAction::Create));

        let encoded = encode_message(&intent).unwrap();
        assert_eq!(
            encoded.as_ref(),
            br#"{"name":"conf","baseConfigSet":"_default","operation":"configsets_create"}"#
        );
    }

    #[test]
    fn test_parse_response() {
        let response: QueueResponse = serde_json::from_value(json!({
            "success": {"node1": "ok"},
            "exception": {"rspCode": 400, "msg": "ConfigSet already exists"}
        }))
        .unwrap();

        assert_eq!(
            response.exception,
            Some(RemoteException {
                rsp_code: Some(400),
                msg: Some("ConfigSet already exists".into()),
            })
        );
        assert_eq!(response.values.len(), 1);
        assert_eq!(response.values["success"], json!({"node1": "ok"}));

        let response: QueueResponse = serde_json::from_value(json!({"exception": {}})).unwrap();
        assert_eq!(response.exception, Some(RemoteException::default()));
    }
}
