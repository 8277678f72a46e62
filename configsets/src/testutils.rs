//! Fixtures shared by the unit tests of this crate.

use crate::queue::{QueueError, QueueEvent, WatchedEvent, WorkQueue};
use crate::store::{ConfigSetMetadata, ConfigStore, MemoryConfigStore, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use zip::write::SimpleFileOptions;

pub fn file_set(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|path| path.to_string()).collect()
}

pub enum ZipEntry<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
}

pub fn build_zip(entries: &[ZipEntry]) -> Bytes {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for entry in entries {
        match entry {
            ZipEntry::File(path, contents) => {
                writer.start_file(*path, options).unwrap();
                writer.write_all(contents).unwrap();
            }
            ZipEntry::Dir(path) => writer.add_directory(*path, options).unwrap(),
        }
    }

    Bytes::from(writer.finish().unwrap().into_inner())
}

/// Memory store that counts every mutating call.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryConfigStore,
    writes: AtomicUsize,
    metadata_unavailable: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryConfigStore {
        &self.inner
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset_counts(&self) {
        self.writes.store(0, Ordering::SeqCst);
    }

    /// Makes every later `get_metadata` call fail.
    pub fn fail_metadata_reads(&self) {
        self.metadata_unavailable.store(true, Ordering::SeqCst);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConfigStore for RecordingStore {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        self.inner.exists(name).await
    }

    async fn list_config_sets(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list_config_sets().await
    }

    async fn list_files(&self, name: &str) -> Result<BTreeSet<String>, StoreError> {
        self.inner.list_files(name).await
    }

    async fn put_file(
        &self,
        name: &str,
        path: &str,
        bytes: Bytes,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        self.record_write();
        self.inner.put_file(name, path, bytes, overwrite).await
    }

    async fn delete_files(&self, name: &str, paths: &BTreeSet<String>) -> Result<(), StoreError> {
        self.record_write();
        self.inner.delete_files(name, paths).await
    }

    async fn get_metadata(&self, name: &str) -> Result<Option<ConfigSetMetadata>, StoreError> {
        if self.metadata_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("metadata unavailable")));
        }
        self.inner.get_metadata(name).await
    }

    async fn set_metadata(
        &self,
        name: &str,
        metadata: &ConfigSetMetadata,
    ) -> Result<(), StoreError> {
        self.record_write();
        self.inner.set_metadata(name, metadata).await
    }
}

enum Script {
    Respond(serde_json::Value),
    Silent,
    Interrupt(WatchedEvent, Duration),
}

/// Work queue that answers every submission the same way and keeps the
/// decoded messages it was given.
pub struct ScriptedQueue {
    script: Script,
    messages: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedQueue {
    fn new(script: Script) -> Self {
        ScriptedQueue {
            script,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn responding(response: serde_json::Value) -> Self {
        Self::new(Script::Respond(response))
    }

    /// Never answers; waits out the full timeout.
    pub fn silent() -> Self {
        Self::new(Script::Silent)
    }

    pub fn interrupted(event: WatchedEvent, after: Duration) -> Self {
        Self::new(Script::Interrupt(event, after))
    }

    pub fn messages(&self) -> Vec<serde_json::Value> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl WorkQueue for ScriptedQueue {
    async fn submit(&self, message: Bytes, timeout: Duration) -> Result<QueueEvent, QueueError> {
        self.messages.lock().push(serde_json::from_slice(&message)?);

        match &self.script {
            Script::Respond(response) => Ok(QueueEvent::delivered(serde_json::to_vec(response)?)),
            Script::Silent => {
                tokio::time::sleep(timeout).await;
                Ok(QueueEvent::default())
            }
            Script::Interrupt(event, after) => {
                tokio::time::sleep(*after).await;
                Ok(QueueEvent::watched(event.clone()))
            }
        }
    }
}
