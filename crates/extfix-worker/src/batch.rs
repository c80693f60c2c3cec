//! Batch claiming, classification, and commit.
//!
//! One batch per activation: claim a bounded slice of the working set,
//! classify each entry's content, write repaired names back, and propagate
//! them into the authoritative file-record store.

use std::time::Instant;

use tracing::{info, warn};

use extfix_core::{
    classify, repaired_filename, ContentSource, FileRecordStore, Job, PopulationEntry, Result,
    HEADER_LEN,
};
use extfix_db::SqlitePopulationRepository;

/// Processes one bounded batch of working-set entries.
pub struct BatchProcessor<'a> {
    population: &'a SqlitePopulationRepository,
    files: &'a dyn FileRecordStore,
    content: &'a dyn ContentSource,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(
        population: &'a SqlitePopulationRepository,
        files: &'a dyn FileRecordStore,
        content: &'a dyn ContentSource,
    ) -> Self {
        Self {
            population,
            files,
            content,
        }
    }

    /// Claim up to `batch_size` entries, marked `Claimed`, ascending
    /// `file_id`. Empty means the working set is drained.
    pub async fn claim_batch(&self, job: &Job, batch_size: i64) -> Result<Vec<PopulationEntry>> {
        self.population.claim_batch(job, batch_size).await
    }

    /// Classify every entry in the batch, producing `(file_id, filename)`
    /// pairs with repaired names.
    ///
    /// A content-read failure is isolated to its entry: the file is logged
    /// and treated as unknown format (name kept as-is), never aborting the
    /// batch. Unknown formats keep their exact name; no trailing dot.
    pub async fn classify(&self, batch: &[PopulationEntry]) -> Vec<(i64, String)> {
        let mut renames = Vec::with_capacity(batch.len());

        for entry in batch {
            let extension = match self.content.read_prefix(&entry.location, HEADER_LEN).await {
                Ok(header) => classify(&header),
                Err(e) => {
                    warn!(
                        subsystem = "batch",
                        op = "classify",
                        file_id = entry.file_id,
                        location = %entry.location,
                        error = %e,
                        "Content unreadable; leaving filename unchanged"
                    );
                    None
                }
            };
            renames.push((entry.file_id, repaired_filename(&entry.filename, extension)));
        }

        renames
    }

    /// Commit a classified batch: write repaired names as `Updated`, then
    /// drain every `Updated` row into the file-record store.
    pub async fn commit(&self, job: &Job, renames: &[(i64, String)]) -> Result<u64> {
        self.population.mark_updated(job, renames).await?;
        self.propagate_updated(job).await
    }

    /// Push all `Updated` rows for the job into the authoritative store and
    /// remove them from the working set.
    ///
    /// Deliberately not limited to the current batch: rows a crashed
    /// activation marked `Updated` but never propagated are carried along
    /// here, so a partially applied commit converges on re-run. Returns the
    /// number of rows drained.
    pub async fn propagate_updated(&self, job: &Job) -> Result<u64> {
        let start = Instant::now();
        let updated = self.population.updated_entries(job).await?;
        if updated.is_empty() {
            return Ok(0);
        }

        let renames: Vec<(i64, String)> = updated
            .iter()
            .map(|entry| (entry.file_id, entry.filename.clone()))
            .collect();
        self.files
            .update_filenames(job.workspace_id, &renames)
            .await?;

        let drained = self.population.finish_updated(job).await?;
        info!(
            subsystem = "batch",
            op = "commit",
            workspace_id = job.workspace_id,
            job_id = job.job_id,
            row_count = drained,
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch committed to file store"
        );
        Ok(drained)
    }
}
