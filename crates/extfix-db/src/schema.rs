//! Schema bootstrap for the queue and working-set tables.
//!
//! Idempotent; runs at every connect. The population working set is one
//! durable table keyed by `(workspace_id, job_id, file_id)` rather than a
//! dynamically named table per job, so repeated jobs cause no schema churn.

use sqlx::SqlitePool;

use extfix_core::{Error, Result};

/// Shared job queue. A job is uniquely addressed by `(workspace_id, job_id)`.
const CREATE_QUEUE: &str = r#"
CREATE TABLE IF NOT EXISTS fixer_queue (
    workspace_id       INTEGER NOT NULL,
    job_id             INTEGER NOT NULL,
    source_search_id   INTEGER NOT NULL,
    assigned_worker_id INTEGER,
    status             INTEGER NOT NULL DEFAULT 0,
    lease_expires_at   INTEGER,
    created_at         TEXT NOT NULL,
    last_modified_at   TEXT NOT NULL,
    PRIMARY KEY (workspace_id, job_id)
)
"#;

const CREATE_QUEUE_STATUS_IDX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_fixer_queue_status
    ON fixer_queue (status, job_id)
"#;

/// Per-job working set of candidate file records.
const CREATE_POPULATION: &str = r#"
CREATE TABLE IF NOT EXISTS fixer_population (
    workspace_id INTEGER NOT NULL,
    job_id       INTEGER NOT NULL,
    file_id      INTEGER NOT NULL,
    filename     TEXT NOT NULL,
    location     TEXT NOT NULL,
    status       INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (workspace_id, job_id, file_id)
)
"#;

const CREATE_POPULATION_STATUS_IDX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_fixer_population_status
    ON fixer_population (workspace_id, job_id, status, file_id)
"#;

/// Create queue and working-set tables if absent.
pub async fn bootstrap(pool: &SqlitePool) -> Result<()> {
    for statement in [
        CREATE_QUEUE,
        CREATE_QUEUE_STATUS_IDX,
        CREATE_POPULATION,
        CREATE_POPULATION_STATUS_IDX,
    ] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(Error::Database)?;
    }
    Ok(())
}
