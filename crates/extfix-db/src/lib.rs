//! # extfix-db
//!
//! SQLite persistence layer for extfix.
//!
//! This crate provides:
//! - Connection pool management
//! - Idempotent schema bootstrap for the queue and working-set tables
//! - The job-queue repository (atomic claims, leases, completion purge)
//! - The population repository (per-job working set keyed by
//!   `(workspace_id, job_id, file_id)`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use extfix_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite://extfix.db").await?;
//!     db.queue.enqueue(101, 7, 55).await?;
//!     if let Some(job) = db.queue.claim(9, 600).await? {
//!         println!("claimed job {} in workspace {}", job.job_id, job.workspace_id);
//!     }
//!     Ok(())
//! }
//! ```

pub mod pool;
pub mod population;
pub mod queue;
pub mod schema;

// Re-export core types
pub use extfix_core::*;

pub use pool::{create_in_memory_pool, create_pool, create_pool_with_config, PoolConfig};
pub use population::SqlitePopulationRepository;
pub use queue::SqliteJobQueue;

use sqlx::SqlitePool;

/// Bundled repositories over one connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    pub queue: SqliteJobQueue,
    pub population: SqlitePopulationRepository,
}

impl Database {
    /// Connect to the given database URL and bootstrap the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Self::from_pool(pool).await
    }

    /// Build a database over an existing pool, bootstrapping the schema.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        schema::bootstrap(&pool).await?;
        Ok(Self {
            queue: SqliteJobQueue::new(pool.clone()),
            population: SqlitePopulationRepository::new(pool.clone()),
            pool,
        })
    }

    /// In-memory database for tests and ephemeral runs.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = create_in_memory_pool().await?;
        Self::from_pool(pool).await
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
