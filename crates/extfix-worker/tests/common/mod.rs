//! Shared in-memory fakes for the host-platform collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use extfix_core::{
    ContentSource, Error, FileRecord, FileRecordStore, HostChannel, Result, SearchPage,
    SearchService,
};

/// JPEG JFIF header (`FFD8FFE0`) padded to a realistic prefix.
pub const JPEG_HEADER: [u8; 8] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];

/// Little-endian TIFF header (`49492A`).
pub const TIFF_HEADER: [u8; 8] = [0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];

/// PDF magic; recognized by nothing in the signature table.
pub const PDF_HEADER: [u8; 8] = [0x25, 0x50, 0x44, 0x46, 0x2D, 0x31, 0x2E, 0x34];

#[derive(Default)]
struct SearchInner {
    results: HashMap<i64, Vec<i64>>,
    fail_initial: bool,
    /// Remaining failures per subset offset.
    page_failures: HashMap<i64, u32>,
    subset_calls: u32,
}

/// Scriptable [`SearchService`] backed by per-search id lists.
#[derive(Default)]
pub struct MockSearchService {
    inner: Mutex<SearchInner>,
}

impl MockSearchService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_results(&self, search_id: i64, ids: Vec<i64>) {
        self.inner.lock().unwrap().results.insert(search_id, ids);
    }

    pub fn fail_initial_query(&self) {
        self.inner.lock().unwrap().fail_initial = true;
    }

    /// Make `query_subset` at `offset` fail the next `count` times.
    pub fn fail_page(&self, offset: i64, count: u32) {
        self.inner.lock().unwrap().page_failures.insert(offset, count);
    }

    pub fn subset_calls(&self) -> u32 {
        self.inner.lock().unwrap().subset_calls
    }
}

#[async_trait]
impl SearchService for MockSearchService {
    async fn query(&self, search_id: i64, page_size: i64) -> Result<SearchPage> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_initial {
            return Err(Error::Search("search service unavailable".into()));
        }
        let ids = inner.results.get(&search_id).cloned().unwrap_or_default();
        let first: Vec<i64> = ids.iter().take(page_size as usize).copied().collect();
        Ok(SearchPage {
            document_ids: first,
            total_count: ids.len() as i64,
            continuation_token: format!("tok-{search_id}"),
        })
    }

    async fn query_subset(&self, token: &str, offset: i64, page_size: i64) -> Result<Vec<i64>> {
        let mut inner = self.inner.lock().unwrap();
        inner.subset_calls += 1;

        if let Some(remaining) = inner.page_failures.get_mut(&offset) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::Search(format!("page at offset {offset} failed")));
            }
        }

        let search_id: i64 = token
            .strip_prefix("tok-")
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::Search(format!("bad continuation token: {token}")))?;
        let ids = inner.results.get(&search_id).cloned().unwrap_or_default();

        let start = (offset - 1).max(0) as usize;
        let end = (start + page_size as usize).min(ids.len());
        Ok(if start < end {
            ids[start..end].to_vec()
        } else {
            Vec::new()
        })
    }
}

#[derive(Default)]
struct StoreInner {
    files: Vec<FileRecord>,
    update_calls: u32,
}

/// In-memory [`FileRecordStore`].
#[derive(Default)]
pub struct MockFileRecordStore {
    inner: Mutex<StoreInner>,
}

impl MockFileRecordStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_file(&self, record: FileRecord) {
        self.inner.lock().unwrap().files.push(record);
    }

    pub fn filename_of(&self, file_id: i64) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .files
            .iter()
            .find(|f| f.file_id == file_id)
            .map(|f| f.filename.clone())
    }

    pub fn update_calls(&self) -> u32 {
        self.inner.lock().unwrap().update_calls
    }
}

#[async_trait]
impl FileRecordStore for MockFileRecordStore {
    async fn files_for_document(
        &self,
        _workspace_id: i64,
        document_id: i64,
        images_only: bool,
    ) -> Result<Vec<FileRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .files
            .iter()
            .filter(|f| f.document_id == document_id)
            .filter(|f| !images_only || f.is_image())
            .cloned()
            .collect())
    }

    async fn update_filenames(&self, _workspace_id: i64, renames: &[(i64, String)]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.update_calls += 1;
        for (file_id, filename) in renames {
            if let Some(record) = inner.files.iter_mut().find(|f| f.file_id == *file_id) {
                record.filename = filename.clone();
            }
        }
        Ok(())
    }
}

/// In-memory [`ContentSource`] keyed by location.
#[derive(Default)]
pub struct MockContentSource {
    contents: Mutex<HashMap<String, Vec<u8>>>,
}

impl MockContentSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_content(&self, location: &str, bytes: &[u8]) {
        self.contents
            .lock()
            .unwrap()
            .insert(location.to_string(), bytes.to_vec());
    }
}

#[async_trait]
impl ContentSource for MockContentSource {
    async fn read_prefix(&self, location: &str, len: usize) -> Result<Vec<u8>> {
        let contents = self.contents.lock().unwrap();
        match contents.get(location) {
            Some(bytes) => Ok(bytes.iter().take(len).copied().collect()),
            None => Err(Error::ContentRead {
                location: location.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such content"),
            }),
        }
    }
}

/// [`HostChannel`] that records every report for assertions.
#[derive(Default)]
pub struct RecordingHostChannel {
    idle: Mutex<Vec<String>>,
    errors: Mutex<Vec<(String, String)>>,
}

impl RecordingHostChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn idle_reports(&self) -> Vec<String> {
        self.idle.lock().unwrap().clone()
    }

    pub fn error_reports(&self) -> Vec<(String, String)> {
        self.errors.lock().unwrap().clone()
    }
}

impl HostChannel for RecordingHostChannel {
    fn report_idle(&self, message: &str, _interval_hint_secs: u32) {
        self.idle.lock().unwrap().push(message.to_string());
    }

    fn report_error(&self, summary: &str, detail: &str) {
        self.errors
            .lock()
            .unwrap()
            .push((summary.to_string(), detail.to_string()));
    }
}

/// An image file record with no extension in its name.
pub fn image_file(file_id: i64, document_id: i64, filename: &str) -> FileRecord {
    FileRecord {
        file_id,
        document_id,
        filename: filename.to_string(),
        location: format!("loc-{file_id}"),
        type_marker: 1,
    }
}
