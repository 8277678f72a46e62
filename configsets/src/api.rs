//! HTTP surface of the configsets API.

use crate::ConfigSetsError;
use crate::action::permission_for;
use crate::config::AuthenticationConfig;
use crate::dispatcher::{ConfigSetRequest, RequestDispatcher};
use crate::errors::{ConfigSetError, Result};
use crate::metrics_defs::REQUEST_DURATION;
use crate::params::{ACTION, Params};
use crate::trust::AuthContext;
use crate::types::Reply;
use http::HeaderMap;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use serde_json::{Value, json};
use shared::histogram;
use shared::http::{make_boxed_error_response, make_json_response};
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tracing::Instrument;

pub const CONFIGS_PATH: &str = "/admin/configs";

const RESPONSE_HEADER: &str = "responseHeader";

#[derive(Clone)]
pub struct ConfigSetsService {
    dispatcher: RequestDispatcher,
    /// Set when an authentication layer fronts the service
    principal_header: Option<String>,
    max_upload_bytes: usize,
}

impl ConfigSetsService {
    pub fn new(
        dispatcher: RequestDispatcher,
        authentication: Option<&AuthenticationConfig>,
        max_upload_bytes: usize,
    ) -> Self {
        ConfigSetsService {
            dispatcher,
            principal_header: authentication.map(|auth| auth.principal_header.clone()),
            max_upload_bytes,
        }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<BoxBody<Bytes, ConfigSetsError>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let start = Instant::now();

        if req.uri().path() != CONFIGS_PATH {
            return make_boxed_error_response(StatusCode::NOT_FOUND);
        }

        let params = Params::from_query(req.uri().query().unwrap_or_default());
        let auth = self.auth_context(req.headers());
        let span = tracing::info_span!(
            "configsets_request",
            action = params.get(ACTION).unwrap_or_default(),
            permission = permission_for(&params).map(|p| p.as_str()).unwrap_or("none"),
        );

        let result = self
            .dispatch(params, auth, req.into_body())
            .instrument(span)
            .await;

        let qtime = start.elapsed().as_millis() as u64;
        let (status, value) = match result {
            Ok(reply) => (StatusCode::OK, success_body(reply, qtime)),
            Err(e) => {
                let code = e.code();
                if code.code() >= 500 {
                    tracing::error!(error = %e, "Configset request failed");
                } else {
                    tracing::info!(error = %e, "Configset request rejected");
                }
                (code.status(), error_body(&e, qtime))
            }
        };

        histogram!(REQUEST_DURATION, "status" => status.as_u16().to_string())
            .record(start.elapsed().as_secs_f64());

        make_json_response(status, &value).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize response");
            make_boxed_error_response(StatusCode::INTERNAL_SERVER_ERROR)
        })
    }

    async fn dispatch<B>(&self, params: Params, auth: AuthContext, body: B) -> Result<Reply>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let body = self.read_body(body).await?;
        self.dispatcher
            .handle(ConfigSetRequest { params, auth, body })
            .await
    }

    fn auth_context(&self, headers: &HeaderMap) -> AuthContext {
        let Some(header) = &self.principal_header else {
            return AuthContext::anonymous();
        };

        AuthContext {
            auth_plugin_enabled: true,
            principal: headers
                .get(header.as_str())
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|principal| !principal.is_empty())
                .map(String::from),
        }
    }

    /// Collects the request body. An empty body is treated as no body at all.
    async fn read_body<B>(&self, body: B) -> Result<Option<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let collected = Limited::new(body, self.max_upload_bytes)
            .collect()
            .await
            .map_err(|e| {
                if e.is::<LengthLimitError>() {
                    ConfigSetError::bad_request(format!(
                        "Request body exceeds the limit of {} bytes",
                        self.max_upload_bytes
                    ))
                } else {
                    ConfigSetError::bad_request(format!("Failed to read request body: {e}"))
                }
            })?
            .to_bytes();

        Ok(Some(collected).filter(|bytes| !bytes.is_empty()))
    }
}

fn success_body(reply: Reply, qtime: u64) -> Value {
    let mut body = serde_json::Map::new();
    body.insert(RESPONSE_HEADER.into(), json!({"status": 0, "QTime": qtime}));
    body.extend(reply.into_iter().filter(|(key, _)| key != RESPONSE_HEADER));
    Value::Object(body)
}

fn error_body(error: &ConfigSetError, qtime: u64) -> Value {
    let code = error.code().code();
    json!({
        (RESPONSE_HEADER): {"status": code, "QTime": qtime},
        "error": {"code": code, "msg": error.to_string()},
    })
}

impl Service<Request<Incoming>> for ConfigSetsService {
    type Response = Response<BoxBody<Bytes, ConfigSetsError>>;
    type Error = ConfigSetsError;
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
