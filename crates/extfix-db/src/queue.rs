//! Job queue repository.
//!
//! Owns job claiming, status transitions, and cleanup of finished jobs.
//! Claims are single conditional `UPDATE ... RETURNING` statements, so two
//! workers polling concurrently can never both own the same job. Each claim
//! carries a lease; a job whose lease expired (crashed owner) becomes
//! reclaimable by any worker.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use extfix_core::{Error, Job, JobStatus, Result};

/// SQLite implementation of the shared job queue.
#[derive(Debug, Clone)]
pub struct SqliteJobQueue {
    pool: SqlitePool,
}

const JOB_COLUMNS: &str = "workspace_id, job_id, source_search_id, assigned_worker_id, \
                           status, lease_expires_at, created_at, last_modified_at";

impl SqliteJobQueue {
    /// Create a new queue repository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_job_row(row: SqliteRow) -> Job {
        let lease_secs: Option<i64> = row.get("lease_expires_at");
        Job {
            workspace_id: row.get("workspace_id"),
            job_id: row.get("job_id"),
            source_search_id: row.get("source_search_id"),
            assigned_worker_id: row.get("assigned_worker_id"),
            status: JobStatus::from_code(row.get("status")),
            lease_expires_at: lease_secs.and_then(|s| DateTime::from_timestamp(s, 0)),
            created_at: row.get("created_at"),
            last_modified_at: row.get("last_modified_at"),
        }
    }

    /// Insert a `NotStarted` job if the `(workspace_id, job_id)` pair is
    /// absent. Returns whether a row was inserted.
    ///
    /// This is the enqueue UI's single touch point on the queue.
    pub async fn enqueue(
        &self,
        workspace_id: i64,
        job_id: i64,
        source_search_id: i64,
    ) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO fixer_queue
                 (workspace_id, job_id, source_search_id, status, created_at, last_modified_at)
             VALUES (?, ?, ?, 0, ?, ?)
             ON CONFLICT (workspace_id, job_id) DO NOTHING",
        )
        .bind(workspace_id)
        .bind(job_id)
        .bind(source_search_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        let inserted = result.rows_affected() > 0;
        if inserted {
            info!(
                subsystem = "queue",
                op = "enqueue",
                workspace_id,
                job_id,
                search_id = source_search_id,
                "Job enqueued"
            );
        }
        Ok(inserted)
    }

    /// Claim or resume a job for `worker_id`, holding it for `lease_secs`.
    ///
    /// Order of preference: a job this worker already owns and has not
    /// finished; the oldest `NotStarted` job (ascending `job_id`), advanced
    /// to `Populating`; the oldest unfinished job whose lease has expired.
    /// `None` means the queue has no claimable work.
    pub async fn claim(&self, worker_id: i64, lease_secs: i64) -> Result<Option<Job>> {
        let lease_until = Utc::now().timestamp() + lease_secs;

        if let Some(job) = self.resume_own(worker_id, lease_until).await? {
            debug!(
                subsystem = "queue",
                op = "claim",
                workspace_id = job.workspace_id,
                job_id = job.job_id,
                worker_id,
                "Resumed owned job"
            );
            return Ok(Some(job));
        }

        if let Some(job) = self.claim_not_started(worker_id, lease_until).await? {
            info!(
                subsystem = "queue",
                op = "claim",
                workspace_id = job.workspace_id,
                job_id = job.job_id,
                worker_id,
                "Claimed new job"
            );
            return Ok(Some(job));
        }

        if let Some(job) = self.reclaim_expired(worker_id, lease_until).await? {
            info!(
                subsystem = "queue",
                op = "claim",
                workspace_id = job.workspace_id,
                job_id = job.job_id,
                worker_id,
                "Reclaimed job with expired lease"
            );
            return Ok(Some(job));
        }

        Ok(None)
    }

    /// Resume the unfinished job this worker already owns, extending its
    /// lease. Status is left unchanged.
    async fn resume_own(&self, worker_id: i64, lease_until: i64) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "UPDATE fixer_queue
             SET lease_expires_at = ?, last_modified_at = ?
             WHERE rowid = (
                 SELECT rowid FROM fixer_queue
                 WHERE assigned_worker_id = ? AND status NOT IN (4, 5)
                 ORDER BY job_id ASC
                 LIMIT 1
             )
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(lease_until)
        .bind(Utc::now())
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    /// Atomically claim the oldest `NotStarted` job: set owner, advance to
    /// `Populating`, and start the lease in one conditional update.
    ///
    /// `Populating` holds until the owner finishes expanding the search into
    /// the working set; a crash before then re-runs the expansion on resume.
    async fn claim_not_started(&self, worker_id: i64, lease_until: i64) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "UPDATE fixer_queue
             SET status = 1, assigned_worker_id = ?, lease_expires_at = ?, last_modified_at = ?
             WHERE rowid = (
                 SELECT rowid FROM fixer_queue
                 WHERE status = 0
                 ORDER BY job_id ASC
                 LIMIT 1
             )
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(worker_id)
        .bind(lease_until)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    /// Take over the oldest unfinished job whose owner's lease has expired.
    async fn reclaim_expired(&self, worker_id: i64, lease_until: i64) -> Result<Option<Job>> {
        let now = Utc::now().timestamp();
        let row = sqlx::query(&format!(
            "UPDATE fixer_queue
             SET assigned_worker_id = ?, lease_expires_at = ?, last_modified_at = ?
             WHERE rowid = (
                 SELECT rowid FROM fixer_queue
                 WHERE status NOT IN (0, 4, 5)
                   AND assigned_worker_id IS NOT NULL
                   AND lease_expires_at IS NOT NULL
                   AND lease_expires_at < ?
                 ORDER BY job_id ASC
                 LIMIT 1
             )
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(worker_id)
        .bind(lease_until)
        .bind(Utc::now())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    /// Idempotent `InProgress` assert plus lease heartbeat. Called once the
    /// working set is materialized and again after each processed batch
    /// while work remains.
    pub async fn touch(&self, job: &Job, lease_secs: i64) -> Result<()> {
        let lease_until = Utc::now().timestamp() + lease_secs;
        sqlx::query(
            "UPDATE fixer_queue
             SET status = 2, lease_expires_at = ?, last_modified_at = ?
             WHERE workspace_id = ? AND job_id = ? AND assigned_worker_id = ?",
        )
        .bind(lease_until)
        .bind(Utc::now())
        .bind(job.workspace_id)
        .bind(job.job_id)
        .bind(job.assigned_worker_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Mark a job `Complete`, drop its working-set rows, and purge every
    /// `Complete` job from the queue.
    pub async fn complete(&self, job: &Job) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "UPDATE fixer_queue SET status = 4, last_modified_at = ?
             WHERE workspace_id = ? AND job_id = ?",
        )
        .bind(Utc::now())
        .bind(job.workspace_id)
        .bind(job.job_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query("DELETE FROM fixer_population WHERE workspace_id = ? AND job_id = ?")
            .bind(job.workspace_id)
            .bind(job.job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM fixer_queue WHERE status = 4")
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "queue",
            op = "complete",
            workspace_id = job.workspace_id,
            job_id = job.job_id,
            "Job completed and purged"
        );
        Ok(())
    }

    /// Fetch a job by its `(workspace_id, job_id)` address.
    pub async fn get(&self, workspace_id: i64, job_id: i64) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM fixer_queue WHERE workspace_id = ? AND job_id = ?"
        ))
        .bind(workspace_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    /// Number of jobs not yet claimed by any worker.
    pub async fn pending_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fixer_queue WHERE status = 0")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }
}
