//! Working-set materialization.
//!
//! Joins the expanded document list against the authoritative file-record
//! store and fills the job's population table with candidate rows: files
//! whose current name carries no extension and which are not already in the
//! working set.

use std::time::Instant;

use tracing::info;

use extfix_core::{FileRecord, FileRecordStore, Job, Result};
use extfix_db::SqlitePopulationRepository;

/// Builds (or appends to) a job's working set.
pub struct PopulationTableBuilder<'a> {
    population: &'a SqlitePopulationRepository,
    files: &'a dyn FileRecordStore,
}

impl<'a> PopulationTableBuilder<'a> {
    pub fn new(population: &'a SqlitePopulationRepository, files: &'a dyn FileRecordStore) -> Self {
        Self { population, files }
    }

    /// Materialize candidate rows for every document in the list.
    ///
    /// Inserts are per document to bound memory on large result sets, and
    /// deduplicated against rows already present, so calling this again on
    /// the same job neither duplicates nor resets previously inserted work.
    /// Returns the number of rows newly inserted.
    pub async fn materialize(
        &self,
        job: &Job,
        document_ids: &[i64],
        images_only: bool,
    ) -> Result<u64> {
        let start = Instant::now();
        let mut inserted = 0u64;

        for &document_id in document_ids {
            let records = self
                .files
                .files_for_document(job.workspace_id, document_id, images_only)
                .await?;

            let candidates: Vec<FileRecord> = records
                .into_iter()
                .filter(|record| !record.has_extension())
                .collect();

            if !candidates.is_empty() {
                inserted += self.population.insert_candidates(job, &candidates).await?;
            }
        }

        info!(
            subsystem = "population",
            op = "materialize",
            workspace_id = job.workspace_id,
            job_id = job.job_id,
            document_count = document_ids.len(),
            row_count = inserted,
            duration_ms = start.elapsed().as_millis() as u64,
            "Working set materialized"
        );
        Ok(inserted)
    }
}
