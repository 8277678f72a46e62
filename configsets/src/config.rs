use crate::upload::DEFAULT_MAX_EXTRACTED_BYTES;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Queue timeout cannot be 0")]
    InvalidTimeout,

    #[error("Principal header cannot be empty")]
    EmptyPrincipalHeader,

    #[error("Upload size limit cannot be 0")]
    InvalidUploadLimit,

    #[error("Archive extraction limit cannot be 0")]
    InvalidExtractLimit,
}

/// Configsets service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for configset API requests
    pub listener: Listener,
    /// Listener for health and readiness checks
    pub admin_listener: Listener,
    pub store: StoreConfig,
    /// Without coordination every action is rejected
    #[serde(default)]
    pub coordination: Option<CoordinationConfig>,
    /// Without authentication every request is untrusted
    #[serde(default)]
    pub authentication: Option<AuthenticationConfig>,
    #[serde(default)]
    pub handler: HandlerConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if let Some(coordination) = &self.coordination {
            coordination.validate()?;
        }
        if let Some(authentication) = &self.authentication {
            authentication.validate()?;
        }
        self.handler.validate()
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum StoreConfig {
    Memory,
    Filesystem { base_dir: String },
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum QueueConfig {
    /// Queue service reached over HTTP
    Http { url: Url },
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CoordinationConfig {
    pub queue: QueueConfig,
    /// How long a request waits for a queued operation to be applied
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    300_000
}

impl CoordinationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AuthenticationConfig {
    /// Header set by the fronting auth layer to the authenticated principal
    pub principal_header: String,
}

impl AuthenticationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.principal_header.trim().is_empty() {
            return Err(ValidationError::EmptyPrincipalHeader);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HandlerConfig {
    pub upload_enabled: bool,
    /// Lets untrusted requests clone trusted base configsets
    pub disable_create_auth_checks: bool,
    pub max_upload_bytes: usize,
    /// Total bytes an uploaded archive may decompress to
    pub max_extracted_bytes: u64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        HandlerConfig {
            upload_enabled: true,
            disable_create_auth_checks: false,
            max_upload_bytes: 50 * 1024 * 1024,
            max_extracted_bytes: DEFAULT_MAX_EXTRACTED_BYTES,
        }
    }
}

impl HandlerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_upload_bytes == 0 {
            return Err(ValidationError::InvalidUploadLimit);
        }
        if self.max_extracted_bytes == 0 {
            return Err(ValidationError::InvalidExtractLimit);
        }
        Ok(())
    }
}
