//! Durable storage of configset files and their metadata.

mod filesystem;
mod memory;

pub use filesystem::FilesystemConfigStore;
pub use memory::MemoryConfigStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeSet;

/// Small opaque metadata map stored alongside a configset.
pub type ConfigSetMetadata = serde_json::Map<String, serde_json::Value>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("The path {0} already exists in the configset")]
    FileExists(String),

    #[error("Invalid configset path: {0}")]
    InvalidPath(String),
}

impl StoreError {
    /// Whether the failure was caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(self, StoreError::FileExists(_) | StoreError::InvalidPath(_))
    }
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Names of every stored configset, sorted.
    async fn list_config_sets(&self) -> Result<Vec<String>, StoreError>;

    /// Relative paths of every file stored for `name`.
    async fn list_files(&self, name: &str) -> Result<BTreeSet<String>, StoreError>;

    /// Writes one file. Fails with `FileExists` when the file is present and
    /// `overwrite` is false.
    async fn put_file(
        &self,
        name: &str,
        path: &str,
        bytes: Bytes,
        overwrite: bool,
    ) -> Result<(), StoreError>;

    async fn delete_files(&self, name: &str, paths: &BTreeSet<String>) -> Result<(), StoreError>;

    async fn get_metadata(&self, name: &str) -> Result<Option<ConfigSetMetadata>, StoreError>;

    /// Replaces the metadata, creating the configset if it does not exist yet.
    async fn set_metadata(&self, name: &str, metadata: &ConfigSetMetadata)
    -> Result<(), StoreError>;
}

/// Rejects names that could escape the store root.
pub(crate) fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
    {
        return Err(StoreError::InvalidPath(name.to_string()));
    }
    Ok(())
}

/// Checks that `path` is relative and stays within its configset.
pub(crate) fn validate_path(path: &str) -> Result<(), StoreError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}
