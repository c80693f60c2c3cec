//! Collaborator traits at the host-platform boundary.
//!
//! The worker never talks to the host platform directly; it goes through
//! these traits so the pipeline can be driven by the real platform glue in
//! production and by in-memory fakes in tests.

use std::path::Path;

use async_trait::async_trait;
use tracing::{error, info};

use crate::classifier::HEADER_LEN;
use crate::error::{Error, Result};
use crate::models::{FileRecord, SearchPage};

/// Saved-search query service.
///
/// `query` runs the saved search and returns the first page plus the total
/// result count and a continuation token; `query_subset` retrieves a later
/// page by token and running offset. Offsets are 1-based, matching the host
/// service's convention.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn query(&self, search_id: i64, page_size: i64) -> Result<SearchPage>;

    async fn query_subset(&self, token: &str, offset: i64, page_size: i64) -> Result<Vec<i64>>;
}

/// Authoritative file-record store.
#[async_trait]
pub trait FileRecordStore: Send + Sync {
    /// File records belonging to one document. With `images_only`, restricted
    /// to records whose type marker denotes an image/production file.
    async fn files_for_document(
        &self,
        workspace_id: i64,
        document_id: i64,
        images_only: bool,
    ) -> Result<Vec<FileRecord>>;

    /// Bulk-update stored filenames, matching by file id.
    async fn update_filenames(&self, workspace_id: i64, renames: &[(i64, String)]) -> Result<()>;
}

/// Byte source for classification reads.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Read up to `len` bytes from the start of the content at `location`.
    /// May return fewer bytes than requested; truncation is not an error.
    async fn read_prefix(&self, location: &str, len: usize) -> Result<Vec<u8>>;
}

/// Host status/error channel.
///
/// The host surfaces these to operators; the worker calls `report_idle` when
/// no job is claimable and `report_error` when an activation fails.
pub trait HostChannel: Send + Sync {
    fn report_idle(&self, message: &str, interval_hint_secs: u32);

    fn report_error(&self, summary: &str, detail: &str);
}

/// [`ContentSource`] over the local filesystem.
///
/// The population table's `location` column is interpreted as a plain path.
#[derive(Debug, Clone, Default)]
pub struct FsContentSource;

#[async_trait]
impl ContentSource for FsContentSource {
    async fn read_prefix(&self, location: &str, len: usize) -> Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let mut file =
            tokio::fs::File::open(Path::new(location))
                .await
                .map_err(|e| Error::ContentRead {
                    location: location.to_string(),
                    source: e,
                })?;

        let mut buffer = vec![0u8; len.max(HEADER_LEN)];
        let mut read = 0;
        while read < len {
            let n = file
                .read(&mut buffer[read..len])
                .await
                .map_err(|e| Error::ContentRead {
                    location: location.to_string(),
                    source: e,
                })?;
            if n == 0 {
                break;
            }
            read += n;
        }
        buffer.truncate(read);
        Ok(buffer)
    }
}

/// [`HostChannel`] that maps host reporting onto structured log events.
///
/// Used when the worker runs outside the platform's agent framework.
#[derive(Debug, Clone, Default)]
pub struct TracingHostChannel;

impl HostChannel for TracingHostChannel {
    fn report_idle(&self, message: &str, interval_hint_secs: u32) {
        info!(
            subsystem = "worker",
            op = "idle",
            interval_hint_secs,
            "{message}"
        );
    }

    fn report_error(&self, summary: &str, detail: &str) {
        error!(subsystem = "worker", op = "error", detail, "{summary}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_fs_content_source_reads_prefix() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46])
            .expect("write");

        let source = FsContentSource;
        let bytes = source
            .read_prefix(file.path().to_str().unwrap(), HEADER_LEN)
            .await
            .expect("read");
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46]);
    }

    #[tokio::test]
    async fn test_fs_content_source_short_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&[0x49, 0x49]).expect("write");

        let source = FsContentSource;
        let bytes = source
            .read_prefix(file.path().to_str().unwrap(), HEADER_LEN)
            .await
            .expect("read");
        assert_eq!(bytes, vec![0x49, 0x49]);
    }

    #[tokio::test]
    async fn test_fs_content_source_empty_file() {
        let file = tempfile::NamedTempFile::new().expect("temp file");

        let source = FsContentSource;
        let bytes = source
            .read_prefix(file.path().to_str().unwrap(), HEADER_LEN)
            .await
            .expect("read");
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_fs_content_source_missing_file_is_content_read_error() {
        let source = FsContentSource;
        let err = source
            .read_prefix("/definitely/not/here", HEADER_LEN)
            .await
            .expect_err("should fail");
        match err {
            Error::ContentRead { location, .. } => {
                assert_eq!(location, "/definitely/not/here");
            }
            other => panic!("expected ContentRead, got {other:?}"),
        }
    }
}
