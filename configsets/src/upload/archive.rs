use bytes::Bytes;
use std::io::{Cursor, Read};
use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("invalid archive: {0}")]
    Zip(#[from] ZipError),

    #[error("could not decompress archive entry: {0}")]
    Io(#[from] std::io::Error),

    #[error("Uploaded archive expands to more than {limit} bytes")]
    TooLarge { limit: u64 },
}

/// One entry of an uploaded zip archive.
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveEntry {
    pub path: String,
    pub bytes: Bytes,
    pub is_directory: bool,
}

impl ArchiveEntry {
    /// Entry path with a directory marker's trailing separator removed.
    pub fn normalized_path(&self) -> &str {
        self.path.strip_suffix('/').unwrap_or(&self.path)
    }
}

/// A zip archive held in memory, decompressed one entry at a time.
///
/// Directory entries are recognized by a trailing `/` in the entry name.
#[derive(Clone, Debug)]
pub struct UploadArchive {
    archive: ZipArchive<Cursor<Bytes>>,
}

impl UploadArchive {
    /// Parses the central directory only; no entry is decompressed.
    pub fn open(data: Bytes) -> Result<Self, ArchiveError> {
        Ok(UploadArchive {
            archive: ZipArchive::new(Cursor::new(data))?,
        })
    }

    pub fn entry_count(&self) -> usize {
        self.archive.len()
    }

    /// Whether the archive names at least one non-directory entry.
    pub fn has_files(&self) -> bool {
        self.archive.file_names().any(|name| !name.ends_with('/'))
    }

    /// Decompresses the entry at `index`, charging its size against `budget`.
    ///
    /// Fails with `TooLarge` once the entries read so far expand beyond
    /// `limit`; at most `budget + 1` bytes are buffered for the entry.
    pub fn entry(
        &mut self,
        index: usize,
        budget: &mut u64,
        limit: u64,
    ) -> Result<ArchiveEntry, ArchiveError> {
        let file = self.archive.by_index(index)?;
        let path = file.name().to_string();
        let is_directory = path.ends_with('/');

        if is_directory {
            return Ok(ArchiveEntry {
                path,
                bytes: Bytes::new(),
                is_directory,
            });
        }

        let mut buf = Vec::new();
        file.take(budget.saturating_add(1)).read_to_end(&mut buf)?;
        let read = buf.len() as u64;
        if read > *budget {
            return Err(ArchiveError::TooLarge { limit });
        }
        *budget -= read;

        Ok(ArchiveEntry {
            path,
            bytes: Bytes::from(buf),
            is_directory,
        })
    }
}
