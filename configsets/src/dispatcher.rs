//! Entry point for every configset action.

use crate::action::ConfigSetAction;
use crate::config::HandlerConfig;
use crate::errors::{ConfigSetError, Result};
use crate::metrics_defs::REQUESTS;
use crate::operations::{Operation, OperationContext, OperationOutput};
use crate::params::Params;
use crate::queue::QueueBridge;
use crate::store::ConfigStore;
use crate::trust::AuthContext;
use crate::types::Reply;
use crate::upload::{UploadReconciler, UploadRequest};
use bytes::Bytes;
use shared::counter;
use std::sync::Arc;

/// One inbound admin request, independent of transport.
#[derive(Clone, Debug, Default)]
pub struct ConfigSetRequest {
    pub params: Params,
    pub auth: AuthContext,
    /// Uploaded content; `None` when the request carried no body.
    pub body: Option<Bytes>,
}

#[derive(Clone)]
pub struct RequestDispatcher {
    store: Arc<dyn ConfigStore>,
    /// Absent in deployments without cluster coordination.
    bridge: Option<QueueBridge>,
    settings: HandlerConfig,
}

impl RequestDispatcher {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        bridge: Option<QueueBridge>,
        settings: HandlerConfig,
    ) -> Self {
        RequestDispatcher {
            store,
            bridge,
            settings,
        }
    }

    pub fn is_coordinated(&self) -> bool {
        self.bridge.is_some()
    }

    pub async fn handle(&self, request: ConfigSetRequest) -> Result<Reply> {
        let Some(bridge) = &self.bridge else {
            return Err(ConfigSetError::bad_request(
                "Instance is not running in cluster coordination mode.",
            ));
        };

        let action = ConfigSetAction::from_params(&request.params)?;
        counter!(REQUESTS, "action" => action.to_lower()).increment(1);
        let request_trusted = request.auth.is_trusted();

        if action == ConfigSetAction::Upload {
            let upload = UploadRequest::from_params(&request.params, request.body, request_trusted)?;
            UploadReconciler::new(self.store.as_ref(), self.settings.upload_enabled)
                .with_max_extracted_bytes(self.settings.max_extracted_bytes)
                .upload(upload)
                .await?;
            return Ok(Reply::new());
        }

        let operation = Operation::for_action(action).ok_or_else(|| {
            ConfigSetError::server_error(format!("No such action: {}", action.as_str()))
        })?;

        tracing::info!(
            action = action.to_lower(),
            params = %request.params.to_query_string(),
            "Invoked ConfigSet action"
        );

        let ctx = OperationContext {
            params: &request.params,
            store: self.store.as_ref(),
            request_trusted,
            disable_create_auth_checks: self.settings.disable_create_auth_checks,
        };

        match operation.call(&ctx).await? {
            OperationOutput::Respond(reply) => Ok(reply),
            OperationOutput::Enqueue(intent) => bridge.submit(action, intent).await,
        }
    }
}
