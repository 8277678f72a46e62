use super::{ConfigSetMetadata, ConfigStore, StoreError, validate_name, validate_path};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Default)]
struct StoredConfigSet {
    files: BTreeMap<String, Bytes>,
    metadata: Option<ConfigSetMetadata>,
}

/// Process-local store, used for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryConfigStore {
    config_sets: RwLock<BTreeMap<String, StoredConfigSet>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of a stored file, if present.
    pub fn file(&self, name: &str, path: &str) -> Option<Bytes> {
        self.config_sets
            .read()
            .get(name)
            .and_then(|config_set| config_set.files.get(path).cloned())
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.config_sets.read().contains_key(name))
    }

    async fn list_config_sets(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.config_sets.read().keys().cloned().collect())
    }

    async fn list_files(&self, name: &str) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .config_sets
            .read()
            .get(name)
            .map(|config_set| config_set.files.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn put_file(
        &self,
        name: &str,
        path: &str,
        bytes: Bytes,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        validate_name(name)?;
        validate_path(path)?;

        let mut guard = self.config_sets.write();
        let config_set = guard.entry(name.to_string()).or_default();
        if !overwrite && config_set.files.contains_key(path) {
            return Err(StoreError::FileExists(path.to_string()));
        }
        config_set.files.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn delete_files(&self, name: &str, paths: &BTreeSet<String>) -> Result<(), StoreError> {
        if let Some(config_set) = self.config_sets.write().get_mut(name) {
            config_set.files.retain(|path, _| !paths.contains(path));
        }
        Ok(())
    }

    async fn get_metadata(&self, name: &str) -> Result<Option<ConfigSetMetadata>, StoreError> {
        Ok(self
            .config_sets
            .read()
            .get(name)
            .and_then(|config_set| config_set.metadata.clone()))
    }

    async fn set_metadata(
        &self,
        name: &str,
        metadata: &ConfigSetMetadata,
    ) -> Result<(), StoreError> {
        validate_name(name)?;
        self.config_sets
            .write()
            .entry(name.to_string())
            .or_default()
            .metadata = Some(metadata.clone());
        Ok(())
    }
}
