use super::{ConfigSetMetadata, ConfigStore, StoreError, validate_name, validate_path};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const METADATA_DIR: &str = ".metadata";

/// Stores each configset as a directory under `base_dir`.
///
/// Metadata lives outside the configset directories in
/// `base_dir/.metadata/<name>.json` so it never shows up as a configset file.
pub struct FilesystemConfigStore {
    base_dir: PathBuf,
}

impl FilesystemConfigStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FilesystemConfigStore {
            base_dir: base_dir.into(),
        }
    }

    fn config_set_dir(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.base_dir.join(name))
    }

    fn metadata_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self
            .base_dir
            .join(METADATA_DIR)
            .join(format!("{name}.json")))
    }
}

#[async_trait]
impl ConfigStore for FilesystemConfigStore {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let dir = self.config_set_dir(name)?;
        match fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_config_sets(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') && entry.file_type().await?.is_dir() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn list_files(&self, name: &str) -> Result<BTreeSet<String>, StoreError> {
        let root = self.config_set_dir(name)?;
        let mut files = BTreeSet::new();
        let mut pending = vec![root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Some(relative) = relative_path(&root, &path) {
                    files.insert(relative);
                }
            }
        }

        Ok(files)
    }

    async fn put_file(
        &self,
        name: &str,
        path: &str,
        bytes: Bytes,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        validate_path(path)?;
        let target = self.config_set_dir(name)?.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let mut file = match options.open(&target).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::FileExists(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }

    async fn delete_files(&self, name: &str, paths: &BTreeSet<String>) -> Result<(), StoreError> {
        let root = self.config_set_dir(name)?;
        for path in paths {
            validate_path(path)?;
            match fs::remove_file(root.join(path)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn get_metadata(&self, name: &str) -> Result<Option<ConfigSetMetadata>, StoreError> {
        match fs::read(self.metadata_path(name)?).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_metadata(
        &self,
        name: &str,
        metadata: &ConfigSetMetadata,
    ) -> Result<(), StoreError> {
        fs::create_dir_all(self.config_set_dir(name)?).await?;

        let path = self.metadata_path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, serde_json::to_vec(metadata)?).await?;
        Ok(())
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_filesystem_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemConfigStore::new(dir.path());

        assert!(!store.exists("conf").await.unwrap());
        assert!(store.list_config_sets().await.unwrap().is_empty());

        store
            .put_file("conf", "solrconfig.xml", Bytes::from_static(b"<config/>"), false)
            .await
            .unwrap();
        store
            .put_file("conf", "lang/stopwords.txt", Bytes::from_static(b"a\nthe"), false)
            .await
            .unwrap();

        assert!(store.exists("conf").await.unwrap());
        assert_eq!(
            store.list_files("conf").await.unwrap(),
            BTreeSet::from([
                "lang/stopwords.txt".to_string(),
                "solrconfig.xml".to_string()
            ])
        );

        let err = store
            .put_file("conf", "solrconfig.xml", Bytes::from_static(b"x"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::FileExists(_)));

        store
            .put_file("conf", "solrconfig.xml", Bytes::from_static(b"x"), true)
            .await
            .unwrap();
        let contents = std::fs::read(dir.path().join("conf/solrconfig.xml")).unwrap();
        assert_eq!(contents, b"x");

        store
            .delete_files(
                "conf",
                &BTreeSet::from(["lang/stopwords.txt".to_string(), "missing".to_string()]),
            )
            .await
            .unwrap();
        assert_eq!(
            store.list_files("conf").await.unwrap(),
            BTreeSet::from(["solrconfig.xml".to_string()])
        );
    }

    #[tokio::test]
    async fn test_filesystem_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemConfigStore::new(dir.path());
        let metadata = json!({"trusted": true}).as_object().unwrap().clone();

        assert_eq!(store.get_metadata("conf").await.unwrap(), None);
        store.set_metadata("conf", &metadata).await.unwrap();

        assert!(store.exists("conf").await.unwrap());
        assert_eq!(store.get_metadata("conf").await.unwrap(), Some(metadata));
        // The metadata directory is not a configset and holds no configset files
        assert_eq!(store.list_config_sets().await.unwrap(), vec!["conf"]);
        assert!(store.list_files("conf").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filesystem_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemConfigStore::new(dir.path());

        let err = store
            .put_file("conf", "../outside.txt", Bytes::new(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
        assert!(store.exists("../conf").await.is_err());
    }
}
