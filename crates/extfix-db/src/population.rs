//! Population (working-set) repository.
//!
//! One durable table keyed by `(workspace_id, job_id, file_id)` holds every
//! job's candidate rows; the composite key gives per-job isolation and makes
//! repeated materialization idempotent. Rows drain through
//! `Pending → Claimed → Updated → Done` and are deleted once `Done`.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use extfix_core::{EntryStatus, Error, FileRecord, Job, PopulationEntry, Result};

/// SQLite implementation of the per-job working set.
#[derive(Debug, Clone)]
pub struct SqlitePopulationRepository {
    pool: SqlitePool,
}

impl SqlitePopulationRepository {
    /// Create a new population repository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_entry_row(row: SqliteRow) -> PopulationEntry {
        PopulationEntry {
            workspace_id: row.get("workspace_id"),
            job_id: row.get("job_id"),
            file_id: row.get("file_id"),
            filename: row.get("filename"),
            location: row.get("location"),
            status: EntryStatus::from_code(row.get("status")),
        }
    }

    /// Insert candidate file records for a job as `Pending` rows.
    ///
    /// Rows already present for the job are skipped via the composite
    /// primary key, so re-running an interrupted expansion never duplicates
    /// or resets work. Returns the number of rows actually inserted.
    pub async fn insert_candidates(&self, job: &Job, records: &[FileRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut inserted = 0u64;

        for record in records {
            let result = sqlx::query(
                "INSERT INTO fixer_population
                     (workspace_id, job_id, file_id, filename, location, status)
                 VALUES (?, ?, ?, ?, ?, 0)
                 ON CONFLICT (workspace_id, job_id, file_id) DO NOTHING",
            )
            .bind(job.workspace_id)
            .bind(job.job_id)
            .bind(record.file_id)
            .bind(&record.filename)
            .bind(&record.location)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "population",
            op = "insert_candidates",
            workspace_id = job.workspace_id,
            job_id = job.job_id,
            row_count = inserted,
            "Inserted candidate rows"
        );
        Ok(inserted)
    }

    /// Atomically claim up to `batch_size` entries, marking them `Claimed`.
    ///
    /// Selects in ascending `file_id` order for deterministic, reproducible
    /// batches. Rows left `Claimed` by a crashed activation are picked up
    /// again, so re-running a partially applied batch converges. An empty
    /// return is the job-completion signal.
    pub async fn claim_batch(&self, job: &Job, batch_size: i64) -> Result<Vec<PopulationEntry>> {
        let rows = sqlx::query(
            "UPDATE fixer_population
             SET status = 1
             WHERE (workspace_id, job_id, file_id) IN (
                 SELECT workspace_id, job_id, file_id FROM fixer_population
                 WHERE workspace_id = ? AND job_id = ? AND status IN (0, 1)
                 ORDER BY file_id ASC
                 LIMIT ?
             )
             RETURNING workspace_id, job_id, file_id, filename, location, status",
        )
        .bind(job.workspace_id)
        .bind(job.job_id)
        .bind(batch_size)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut batch: Vec<PopulationEntry> =
            rows.into_iter().map(Self::parse_entry_row).collect();
        // RETURNING row order is unspecified.
        batch.sort_by_key(|entry| entry.file_id);
        Ok(batch)
    }

    /// Write repaired filenames and mark the rows `Updated`, in one
    /// transaction.
    pub async fn mark_updated(&self, job: &Job, renames: &[(i64, String)]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        for (file_id, filename) in renames {
            sqlx::query(
                "UPDATE fixer_population
                 SET filename = ?, status = 3
                 WHERE workspace_id = ? AND job_id = ? AND file_id = ?",
            )
            .bind(filename)
            .bind(job.workspace_id)
            .bind(job.job_id)
            .bind(file_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    /// All `Updated` rows for a job, ascending `file_id`.
    ///
    /// Spans batches on purpose: rows a crashed activation updated but never
    /// propagated are retried by the next commit.
    pub async fn updated_entries(&self, job: &Job) -> Result<Vec<PopulationEntry>> {
        let rows = sqlx::query(
            "SELECT workspace_id, job_id, file_id, filename, location, status
             FROM fixer_population
             WHERE workspace_id = ? AND job_id = ? AND status = 3
             ORDER BY file_id ASC",
        )
        .bind(job.workspace_id)
        .bind(job.job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_entry_row).collect())
    }

    /// Mark every `Updated` row `Done` and delete all `Done` rows, in one
    /// transaction. Returns the number of rows removed.
    pub async fn finish_updated(&self, job: &Job) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "UPDATE fixer_population SET status = 4
             WHERE workspace_id = ? AND job_id = ? AND status = 3",
        )
        .bind(job.workspace_id)
        .bind(job.job_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let deleted = sqlx::query(
            "DELETE FROM fixer_population
             WHERE workspace_id = ? AND job_id = ? AND status = 4",
        )
        .bind(job.workspace_id)
        .bind(job.job_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(deleted.rows_affected())
    }

    /// Total rows currently in a job's working set, any status.
    pub async fn entry_count(&self, job: &Job) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM fixer_population WHERE workspace_id = ? AND job_id = ?",
        )
        .bind(job.workspace_id)
        .bind(job.job_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::create_in_memory_pool;
    use crate::queue::SqliteJobQueue;
    use crate::schema;

    async fn setup() -> (SqliteJobQueue, SqlitePopulationRepository) {
        let pool = create_in_memory_pool().await.expect("pool");
        schema::bootstrap(&pool).await.expect("schema");
        (
            SqliteJobQueue::new(pool.clone()),
            SqlitePopulationRepository::new(pool),
        )
    }

    async fn claimed_job(queue: &SqliteJobQueue) -> Job {
        queue.enqueue(101, 7, 55).await.expect("enqueue");
        queue.claim(9, 600).await.expect("claim").expect("job")
    }

    fn record(file_id: i64, filename: &str) -> FileRecord {
        FileRecord {
            file_id,
            document_id: 1000 + file_id,
            filename: filename.to_string(),
            location: format!("/mnt/files/{file_id:04}"),
            type_marker: 1,
        }
    }

    #[tokio::test]
    async fn test_insert_candidates_is_idempotent() {
        let (queue, population) = setup().await;
        let job = claimed_job(&queue).await;
        let records = vec![record(1, "IMG_0001"), record(2, "IMG_0002")];

        assert_eq!(
            population
                .insert_candidates(&job, &records)
                .await
                .expect("insert"),
            2
        );
        assert_eq!(
            population
                .insert_candidates(&job, &records)
                .await
                .expect("reinsert"),
            0
        );
        assert_eq!(population.entry_count(&job).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn test_reinsert_does_not_reset_progress() {
        let (queue, population) = setup().await;
        let job = claimed_job(&queue).await;
        let records = vec![record(1, "IMG_0001")];
        population
            .insert_candidates(&job, &records)
            .await
            .expect("insert");
        population
            .mark_updated(&job, &[(1, "IMG_0001.jpg".to_string())])
            .await
            .expect("update");

        population
            .insert_candidates(&job, &records)
            .await
            .expect("reinsert");

        let updated = population.updated_entries(&job).await.expect("updated");
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].filename, "IMG_0001.jpg");
    }

    #[tokio::test]
    async fn test_claim_batch_bounded_and_ordered() {
        let (queue, population) = setup().await;
        let job = claimed_job(&queue).await;
        let records: Vec<FileRecord> = [5, 3, 9, 1, 7]
            .iter()
            .map(|&id| record(id, &format!("IMG_{id:04}")))
            .collect();
        population
            .insert_candidates(&job, &records)
            .await
            .expect("insert");

        let batch = population.claim_batch(&job, 3).await.expect("claim");
        assert_eq!(batch.len(), 3);
        let ids: Vec<i64> = batch.iter().map(|e| e.file_id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
        assert!(batch.iter().all(|e| e.status == EntryStatus::Claimed));
    }

    #[tokio::test]
    async fn test_claim_batch_reclaims_stuck_claimed_rows() {
        let (queue, population) = setup().await;
        let job = claimed_job(&queue).await;
        population
            .insert_candidates(&job, &[record(1, "IMG_0001"), record(2, "IMG_0002")])
            .await
            .expect("insert");

        let first = population.claim_batch(&job, 10).await.expect("claim");
        assert_eq!(first.len(), 2);

        // A crashed activation never committed; the next claim converges on
        // the same rows instead of seeing an empty (falsely complete) set.
        let second = population.claim_batch(&job, 10).await.expect("reclaim");
        assert_eq!(second.len(), 2);
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_claim_batch_empty_when_drained() {
        let (queue, population) = setup().await;
        let job = claimed_job(&queue).await;
        assert!(population
            .claim_batch(&job, 10)
            .await
            .expect("claim")
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_finish_cycle_drains_rows() {
        let (queue, population) = setup().await;
        let job = claimed_job(&queue).await;
        population
            .insert_candidates(&job, &[record(1, "IMG_0001"), record(2, "IMG_0002")])
            .await
            .expect("insert");

        population.claim_batch(&job, 10).await.expect("claim");
        population
            .mark_updated(
                &job,
                &[
                    (1, "IMG_0001.jpg".to_string()),
                    (2, "IMG_0002.tif".to_string()),
                ],
            )
            .await
            .expect("update");

        let updated = population.updated_entries(&job).await.expect("updated");
        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0].filename, "IMG_0001.jpg");

        assert_eq!(population.finish_updated(&job).await.expect("finish"), 2);
        assert_eq!(population.entry_count(&job).await.expect("count"), 0);
        // Re-running the drain over already-Done rows is a no-op.
        assert_eq!(population.finish_updated(&job).await.expect("again"), 0);
    }

    #[tokio::test]
    async fn test_jobs_are_isolated_by_composite_key() {
        let (queue, population) = setup().await;
        let job_a = claimed_job(&queue).await;
        queue.enqueue(101, 8, 56).await.expect("enqueue");
        let job_b = queue.claim(10, 600).await.expect("claim").expect("job");

        population
            .insert_candidates(&job_a, &[record(1, "IMG_0001")])
            .await
            .expect("insert a");
        population
            .insert_candidates(&job_b, &[record(1, "IMG_0001")])
            .await
            .expect("insert b");

        let batch_a = population.claim_batch(&job_a, 10).await.expect("claim a");
        assert_eq!(batch_a.len(), 1);
        assert_eq!(population.entry_count(&job_b).await.expect("count"), 1);

        let batch_b = population.claim_batch(&job_b, 10).await.expect("claim b");
        assert_eq!(batch_b.len(), 1);
        assert_eq!(batch_b[0].job_id, 8);
    }
}
