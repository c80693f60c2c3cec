//! Domain types for the extension-repair pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a queued repair job.
///
/// Integer codes are stable storage values shared with the host platform;
/// do not renumber. A claimed job sits in `Populating` until its search is
/// expanded into the working set, then `InProgress` until drained.
/// `ReadyForImport` is a reserved code the shipped pipeline does not
/// traverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    NotStarted,
    Populating,
    InProgress,
    ReadyForImport,
    Complete,
    Error,
}

impl JobStatus {
    /// Stable integer code used in the queue table.
    pub fn code(self) -> i64 {
        match self {
            JobStatus::NotStarted => 0,
            JobStatus::Populating => 1,
            JobStatus::InProgress => 2,
            JobStatus::ReadyForImport => 3,
            JobStatus::Complete => 4,
            JobStatus::Error => 5,
        }
    }

    /// Decode a stored status code. Unknown codes fall back to `NotStarted`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => JobStatus::Populating,
            2 => JobStatus::InProgress,
            3 => JobStatus::ReadyForImport,
            4 => JobStatus::Complete,
            5 => JobStatus::Error,
            _ => JobStatus::NotStarted,
        }
    }

    /// A job is finished once it reaches `Complete` or `Error`; anything
    /// else can be resumed by its owner.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

/// One extension-repair job claimed from the shared queue.
///
/// Uniquely addressed by `(workspace_id, job_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub workspace_id: i64,
    pub job_id: i64,
    /// Saved search defining which documents are in scope.
    pub source_search_id: i64,
    /// Set once a worker claims the job; cleared only by queue purge.
    pub assigned_worker_id: Option<i64>,
    pub status: JobStatus,
    /// Owner's claim expires at this instant; an expired claim may be
    /// reclaimed by another worker.
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

/// Processing state of one working-set row.
///
/// Code 2 is intentionally unassigned; the stored values predate this
/// implementation and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryStatus {
    Pending,
    Claimed,
    Updated,
    Done,
}

impl EntryStatus {
    pub fn code(self) -> i64 {
        match self {
            EntryStatus::Pending => 0,
            EntryStatus::Claimed => 1,
            EntryStatus::Updated => 3,
            EntryStatus::Done => 4,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => EntryStatus::Claimed,
            3 => EntryStatus::Updated,
            4 => EntryStatus::Done,
            _ => EntryStatus::Pending,
        }
    }
}

/// One file record awaiting repair, scoped to a single job's working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationEntry {
    pub workspace_id: i64,
    pub job_id: i64,
    /// Unique within the job's working set.
    pub file_id: i64,
    /// Current, possibly extension-less filename.
    pub filename: String,
    /// Path or content reference used to read header bytes.
    pub location: String,
    pub status: EntryStatus,
}

/// A file record as seen in the authoritative file-record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: i64,
    pub document_id: i64,
    pub filename: String,
    pub location: String,
    /// Host type marker; 1 and 3 denote image/production files.
    pub type_marker: i64,
}

impl FileRecord {
    /// Whether the stored filename already carries an extension.
    pub fn has_extension(&self) -> bool {
        self.filename.contains('.')
    }

    /// Whether the type marker denotes an image/production file.
    pub fn is_image(&self) -> bool {
        matches!(self.type_marker, 1 | 3)
    }
}

/// One page of saved-search results from the host search service.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub document_ids: Vec<i64>,
    /// Total result count the search reports across all pages.
    pub total_count: i64,
    /// Opaque handle for retrieving subsequent pages.
    pub continuation_token: String,
}
