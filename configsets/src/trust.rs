//! Trust decisions for requests and stored configsets.
//!
//! A configset is trusted when it was created, or fully overwritten, by an
//! authenticated caller. Configsets that predate trust tracking carry no
//! metadata and are treated as trusted.

use crate::store::ConfigSetMetadata;
use serde_json::Value;

pub const TRUSTED: &str = "trusted";

/// Authentication state of a single request, as supplied by the auth layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub auth_plugin_enabled: bool,
    pub principal: Option<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(principal: impl Into<String>) -> Self {
        AuthContext {
            auth_plugin_enabled: true,
            principal: Some(principal.into()),
        }
    }

    pub fn is_trusted(&self) -> bool {
        request_is_trusted(self.auth_plugin_enabled, self.principal.is_some())
    }
}

pub fn request_is_trusted(has_auth_plugin: bool, has_authenticated_principal: bool) -> bool {
    let trusted = has_auth_plugin && has_authenticated_principal;
    if trusted {
        tracing::debug!("Trusted configset request");
    } else {
        tracing::debug!("Untrusted configset request");
    }
    trusted
}

/// False only when the metadata explicitly marks the configset untrusted.
pub fn config_set_is_trusted(metadata: Option<&ConfigSetMetadata>) -> bool {
    match metadata.and_then(|m| m.get(TRUSTED)) {
        Some(Value::Bool(trusted)) => *trusted,
        Some(Value::String(s)) => !s.eq_ignore_ascii_case("false"),
        _ => true,
    }
}

pub fn trust_metadata(trusted: bool) -> ConfigSetMetadata {
    let mut metadata = ConfigSetMetadata::new();
    metadata.insert(TRUSTED.to_string(), Value::Bool(trusted));
    metadata
}
