//! Applies an uploaded configset bundle directly to the store.
//!
//! Uploads never go through the work queue. The trust gate runs once, before any
//! file is written, and a trusted full overwrite (`overwrite` + `cleanup`) of an
//! untrusted configset promotes it to trusted only after reconciliation succeeded.
//!
//! Files written before a mid-stream failure are not rolled back; callers that
//! need an all-or-nothing result re-upload with `cleanup=true`.

mod archive;

pub use archive::{ArchiveEntry, ArchiveError, UploadArchive};

use crate::errors::{ConfigSetError, Result};
use crate::metrics_defs::{TRUST_PROMOTIONS, UPLOAD_FILES_DELETED, UPLOAD_FILES_WRITTEN};
use crate::params::{CLEANUP, FILE_PATH, NAME, OVERWRITE, Params};
use crate::store::ConfigStore;
use crate::trust::{config_set_is_trusted, trust_metadata};
use bytes::Bytes;
use shared::counter;
use std::collections::BTreeSet;

/// Parameters of one upload request.
#[derive(Clone, Debug, Default)]
pub struct UploadRequest {
    pub name: Option<String>,
    pub file_path: Option<String>,
    pub overwrite: bool,
    pub cleanup: bool,
    pub body: Option<Bytes>,
    pub request_trusted: bool,
}

impl UploadRequest {
    pub fn from_params(params: &Params, body: Option<Bytes>, request_trusted: bool) -> Result<Self> {
        Ok(UploadRequest {
            name: params.get(NAME).map(String::from),
            file_path: params
                .get(FILE_PATH)
                .filter(|path| !path.is_empty())
                .map(String::from),
            overwrite: params.get_bool(OVERWRITE, false)?,
            cleanup: params.get_bool(CLEANUP, false)?,
            body,
            request_trusted,
        })
    }
}

/// What an upload asks to write.
#[derive(Clone, Debug)]
pub enum UploadIntent {
    SingleFile {
        relative_path: String,
        bytes: Bytes,
        allow_overwrite: bool,
    },
    Archive(UploadArchive),
}

impl UploadIntent {
    /// Validates the upload parameters and decodes the body.
    pub fn build(file_path: Option<&str>, overwrite: bool, cleanup: bool, body: Bytes) -> Result<Self> {
        if let Some(file_path) = file_path {
            let relative_path = file_path.strip_prefix('/').unwrap_or(file_path);
            if relative_path.is_empty() {
                return Err(ConfigSetError::bad_request(format!(
                    "The file path provided for upload, '{file_path}', is not valid."
                )));
            }
            if cleanup {
                return Err(ConfigSetError::bad_request(
                    "ConfigSet uploads do not allow cleanup=true when file path is used.",
                ));
            }
            return Ok(UploadIntent::SingleFile {
                relative_path: relative_path.to_string(),
                bytes: body,
                allow_overwrite: overwrite,
            });
        }

        let invalid_archive = || {
            ConfigSetError::bad_request(
                "Either empty zipped data, or non-zipped data was uploaded. In order to upload a configSet, you must zip a non-empty directory to upload.",
            )
        };

        let archive = UploadArchive::open(body).map_err(|e| {
            tracing::debug!(error = %e, "Could not read uploaded archive");
            invalid_archive()
        })?;
        if !archive.has_files() {
            return Err(invalid_archive());
        }

        Ok(UploadIntent::Archive(archive))
    }
}

/// Outcome of a successful upload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UploadSummary {
    pub files_written: usize,
    pub files_deleted: usize,
    pub trust_promoted: bool,
}

/// Default cap on the bytes an archive may expand to.
pub const DEFAULT_MAX_EXTRACTED_BYTES: u64 = 256 * 1024 * 1024;

pub struct UploadReconciler<'a> {
    store: &'a dyn ConfigStore,
    upload_enabled: bool,
    max_extracted_bytes: u64,
}

impl<'a> UploadReconciler<'a> {
    pub fn new(store: &'a dyn ConfigStore, upload_enabled: bool) -> Self {
        Self {
            store,
            upload_enabled,
            max_extracted_bytes: DEFAULT_MAX_EXTRACTED_BYTES,
        }
    }

    pub fn with_max_extracted_bytes(mut self, limit: u64) -> Self {
        self.max_extracted_bytes = limit;
        self
    }

    pub async fn upload(&self, request: UploadRequest) -> Result<UploadSummary> {
        if !self.upload_enabled {
            return Err(ConfigSetError::bad_request(
                "Configset upload feature is disabled. To enable it, set handler.upload_enabled to true.",
            ));
        }

        let name = request
            .name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                ConfigSetError::bad_request(
                    "The configuration name should be provided in the \"name\" parameter",
                )
            })?;

        let body = request.body.clone().ok_or_else(|| {
            ConfigSetError::bad_request("No stream found for the config data to be uploaded")
        })?;

        let intent = UploadIntent::build(
            request.file_path.as_deref(),
            request.overwrite,
            request.cleanup,
            body,
        )?;

        let overwrites_existing = self.store.exists(name).await?;
        let currently_trusted = overwrites_existing && self.is_currently_trusted(name).await;

        let summary = match intent {
            UploadIntent::SingleFile {
                relative_path,
                bytes,
                allow_overwrite,
            } => {
                self.ensure_base(name, overwrites_existing, currently_trusted, &request)
                    .await?;
                self.store
                    .put_file(name, &relative_path, bytes, allow_overwrite)
                    .await?;
                counter!(UPLOAD_FILES_WRITTEN).increment(1);
                UploadSummary {
                    files_written: 1,
                    ..Default::default()
                }
            }
            UploadIntent::Archive(archive) => {
                if overwrites_existing && !request.overwrite {
                    return Err(ConfigSetError::bad_request(format!(
                        "The configuration {name} already exists"
                    )));
                }

                let files_to_delete = if overwrites_existing && request.cleanup {
                    self.store.list_files(name).await?
                } else {
                    BTreeSet::new()
                };

                self.ensure_base(name, overwrites_existing, currently_trusted, &request)
                    .await?;

                let mut summary = self.reconcile(name, archive, files_to_delete).await?;

                if request.cleanup
                    && request.request_trusted
                    && overwrites_existing
                    && !currently_trusted
                {
                    self.store.set_metadata(name, &trust_metadata(true)).await?;
                    counter!(TRUST_PROMOTIONS).increment(1);
                    tracing::info!(config_set = name, "Trusted overwrite, configset is now trusted");
                    summary.trust_promoted = true;
                }
                summary
            }
        };

        tracing::info!(
            config_set = name,
            files_written = summary.files_written,
            files_deleted = summary.files_deleted,
            "Uploaded configset"
        );
        Ok(summary)
    }

    /// Writes every archive entry and removes the files the new bundle no longer contains.
    /// Entries are decompressed one at a time against the extraction budget.
    async fn reconcile(
        &self,
        name: &str,
        mut archive: UploadArchive,
        mut files_to_delete: BTreeSet<String>,
    ) -> Result<UploadSummary> {
        let mut summary = UploadSummary::default();
        let mut budget = self.max_extracted_bytes;

        for index in 0..archive.entry_count() {
            let entry = archive
                .entry(index, &mut budget, self.max_extracted_bytes)
                .map_err(|e| match e {
                    ArchiveError::TooLarge { .. } => ConfigSetError::bad_request(e.to_string()),
                    e => ConfigSetError::bad_request(format!(
                        "Could not read uploaded archive entry: {e}"
                    )),
                })?;
            files_to_delete.remove(entry.normalized_path());
            if !entry.is_directory {
                self.store.put_file(name, &entry.path, entry.bytes, true).await?;
                counter!(UPLOAD_FILES_WRITTEN).increment(1);
                summary.files_written += 1;
            }
        }

        if !files_to_delete.is_empty() {
            tracing::info!(config_set = name, "Cleaning up {} unused files", files_to_delete.len());
            tracing::debug!(config_set = name, files = ?files_to_delete, "Cleaning up unused files");
            self.store.delete_files(name, &files_to_delete).await?;
            counter!(UPLOAD_FILES_DELETED).increment(files_to_delete.len() as u64);
            summary.files_deleted = files_to_delete.len();
        }

        Ok(summary)
    }

    /// Writes the initial trust metadata of a new configset, or refuses an
    /// untrusted request against an existing trusted one.
    async fn ensure_base(
        &self,
        name: &str,
        overwrites_existing: bool,
        currently_trusted: bool,
        request: &UploadRequest,
    ) -> Result<()> {
        if !overwrites_existing {
            self.store
                .set_metadata(name, &trust_metadata(request.request_trusted))
                .await?;
            return Ok(());
        }

        // A trusted full overwrite is promoted after reconciliation instead
        if !request.request_trusted && currently_trusted {
            return Err(ConfigSetError::bad_request(
                "Trying to make an untrusted ConfigSet update on a trusted configSet",
            ));
        }
        Ok(())
    }

    /// Metadata read failures count as trusted, which refuses untrusted updates
    /// and skips promotion.
    async fn is_currently_trusted(&self, name: &str) -> bool {
        match self.store.get_metadata(name).await {
            Ok(metadata) => config_set_is_trusted(metadata.as_ref()),
            Err(e) => {
                tracing::warn!(config_set = name, error = %e, "Could not read configset metadata");
                true
            }
        }
    }
}
