//! # extfix-worker
//!
//! The extension-repair pipeline for extfix: saved-search enumeration,
//! working-set materialization, batch classification, and the activation
//! orchestrator.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use extfix_db::Database;
//! use extfix_worker::{Worker, WorkerConfig};
//! use extfix_core::{FsContentSource, TracingHostChannel};
//!
//! let db = Database::connect("sqlite://extfix.db").await?;
//! let worker = Worker::new(
//!     db,
//!     search_service,            // host platform glue
//!     file_record_store,         // host platform glue
//!     Arc::new(FsContentSource),
//!     Arc::new(TracingHostChannel),
//!     WorkerConfig::from_env().with_worker_id(agent_id),
//! );
//!
//! // Scheduler-driven: one batch per call.
//! worker.run_activation().await;
//!
//! // Or resident: poll until shutdown.
//! let handle = worker.start();
//! handle.shutdown().await?;
//! ```

pub mod batch;
pub mod population;
pub mod search;
pub mod worker;

// Re-export core types
pub use extfix_core::*;

pub use batch::BatchProcessor;
pub use population::PopulationTableBuilder;
pub use search::SearchResultEnumerator;
pub use worker::{ActivationOutcome, Worker, WorkerConfig, WorkerHandle};
