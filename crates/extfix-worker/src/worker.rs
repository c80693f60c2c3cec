//! Worker orchestrator: one activation claims a job, expands it, processes
//! one batch, and yields.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};

use extfix_core::{
    defaults, ContentSource, FileRecordStore, HostChannel, Job, JobStatus, Result, SearchService,
};
use extfix_db::Database;

use crate::batch::BatchProcessor;
use crate::population::PopulationTableBuilder;
use crate::search::SearchResultEnumerator;

/// Configuration for the extension-repair worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Identity this instance claims jobs under. Must be unique per
    /// concurrently running instance.
    pub worker_id: i64,
    /// Working-set entries processed per activation.
    pub batch_size: i64,
    /// Search result page size.
    pub page_size: i64,
    /// Attempts per subsequent search page before the expansion fails.
    pub page_retries: u32,
    /// Claim lease duration in seconds.
    pub lease_secs: i64,
    /// Polling interval in milliseconds when running resident.
    pub poll_interval_ms: u64,
    /// Restrict candidates to image/production file records.
    pub images_only: bool,
    /// Whether to process jobs at all.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: 0,
            batch_size: defaults::BATCH_SIZE,
            page_size: defaults::SEARCH_PAGE_SIZE,
            page_retries: defaults::SEARCH_PAGE_RETRIES,
            lease_secs: defaults::JOB_LEASE_SECS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            images_only: true,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `EXTFIX_WORKER_ID` | `0` | Claim identity for this instance |
    /// | `EXTFIX_BATCH_SIZE` | `5000` | Entries per activation |
    /// | `EXTFIX_PAGE_SIZE` | `1000` | Search result page size |
    /// | `EXTFIX_PAGE_RETRIES` | `3` | Attempts per search page |
    /// | `EXTFIX_LEASE_SECS` | `600` | Claim lease duration |
    /// | `EXTFIX_POLL_INTERVAL_MS` | `5000` | Resident polling interval |
    /// | `EXTFIX_IMAGES_ONLY` | `true` | Restrict to image/production files |
    /// | `EXTFIX_ENABLED` | `true` | Enable/disable job processing |
    pub fn from_env() -> Self {
        fn parse<T: std::str::FromStr>(var: &str, default: T) -> T {
            std::env::var(var)
                .ok()
                .and_then(|v| v.parse::<T>().ok())
                .unwrap_or(default)
        }

        let defaults = Self::default();
        Self {
            worker_id: parse("EXTFIX_WORKER_ID", defaults.worker_id),
            batch_size: parse("EXTFIX_BATCH_SIZE", defaults.batch_size).max(1),
            page_size: parse("EXTFIX_PAGE_SIZE", defaults.page_size).max(1),
            page_retries: parse("EXTFIX_PAGE_RETRIES", defaults.page_retries).max(1),
            lease_secs: parse("EXTFIX_LEASE_SECS", defaults.lease_secs).max(1),
            poll_interval_ms: parse("EXTFIX_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            images_only: std::env::var("EXTFIX_IMAGES_ONLY")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            enabled: std::env::var("EXTFIX_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }

    /// Set the claim identity.
    pub fn with_worker_id(mut self, id: i64) -> Self {
        self.worker_id = id;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, size: i64) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the search page size.
    pub fn with_page_size(mut self, size: i64) -> Self {
        self.page_size = size;
        self
    }

    /// Set the per-page retry limit.
    pub fn with_page_retries(mut self, retries: u32) -> Self {
        self.page_retries = retries;
        self
    }

    /// Set the claim lease duration in seconds.
    pub fn with_lease_secs(mut self, secs: i64) -> Self {
        self.lease_secs = secs;
        self
    }

    /// Set the resident polling interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Include non-image file records as candidates.
    pub fn with_images_only(mut self, images_only: bool) -> Self {
        self.images_only = images_only;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// What a single activation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// No claimable job; idle reported to the host.
    Idle,
    /// One batch processed; the job still has work.
    Processed { rows: usize },
    /// The job's working set drained; job completed and purged.
    Completed,
    /// The activation failed; error reported to the host, job status
    /// left as-is for the next activation to retry.
    Failed,
}

/// Extension-repair worker.
///
/// Holds the shared database plus the host-platform collaborators and runs
/// the claim → expand → materialize → batch → commit pipeline.
pub struct Worker {
    db: Database,
    search: Arc<dyn SearchService>,
    files: Arc<dyn FileRecordStore>,
    content: Arc<dyn ContentSource>,
    host: Arc<dyn HostChannel>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        db: Database,
        search: Arc<dyn SearchService>,
        files: Arc<dyn FileRecordStore>,
        content: Arc<dyn ContentSource>,
        host: Arc<dyn HostChannel>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            db,
            search,
            files,
            content,
            host,
            config,
        }
    }

    /// Run one scheduler activation.
    ///
    /// The whole activation sits under a single catch-all: any failure is
    /// reported through the host error channel and the job keeps its
    /// last-written status, to be retried verbatim on a later activation.
    #[instrument(skip(self), fields(worker_id = self.config.worker_id))]
    pub async fn run_activation(&self) -> ActivationOutcome {
        match self.activate().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    subsystem = "worker",
                    op = "activation",
                    error = %e,
                    "Activation failed"
                );
                self.host
                    .report_error("Extension fixer activation failed", &e.to_string());
                ActivationOutcome::Failed
            }
        }
    }

    async fn activate(&self) -> Result<ActivationOutcome> {
        let start = Instant::now();

        let Some(job) = self
            .db
            .queue
            .claim(self.config.worker_id, self.config.lease_secs)
            .await?
        else {
            self.host
                .report_idle("Queue is empty. Waiting for work.", defaults::IDLE_HINT_SECS);
            return Ok(ActivationOutcome::Idle);
        };

        // Expansion runs while the job is still Populating; afterwards the
        // working set alone drives the job to completion.
        if job.status == JobStatus::Populating || job.status == JobStatus::NotStarted {
            self.expand_into_population(&job).await?;
            self.db.queue.touch(&job, self.config.lease_secs).await?;
        }

        let processor = BatchProcessor::new(
            &self.db.population,
            self.files.as_ref(),
            self.content.as_ref(),
        );

        let batch = processor.claim_batch(&job, self.config.batch_size).await?;
        if batch.is_empty() {
            // Drain any rows a crashed commit left behind before declaring
            // the job done.
            processor.propagate_updated(&job).await?;
            self.db.queue.complete(&job).await?;
            info!(
                subsystem = "worker",
                op = "activation",
                workspace_id = job.workspace_id,
                job_id = job.job_id,
                duration_ms = start.elapsed().as_millis() as u64,
                "Job complete"
            );
            return Ok(ActivationOutcome::Completed);
        }

        let renames = processor.classify(&batch).await;
        processor.commit(&job, &renames).await?;
        self.db.queue.touch(&job, self.config.lease_secs).await?;

        info!(
            subsystem = "worker",
            op = "activation",
            workspace_id = job.workspace_id,
            job_id = job.job_id,
            row_count = batch.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch processed"
        );
        Ok(ActivationOutcome::Processed { rows: batch.len() })
    }

    async fn expand_into_population(&self, job: &Job) -> Result<()> {
        let enumerator = SearchResultEnumerator::new(
            self.search.as_ref(),
            self.config.page_size,
            self.config.page_retries,
        );
        let document_ids = enumerator.expand(job.source_search_id).await?;

        let builder = PopulationTableBuilder::new(&self.db.population, self.files.as_ref());
        builder
            .materialize(job, &document_ids, self.config.images_only)
            .await?;
        Ok(())
    }

    /// Run the worker resident: repeated activations with a polling pause
    /// whenever the queue is idle. Returns a handle for graceful shutdown.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let worker = Arc::new(self);

        let task = tokio::spawn(async move {
            if !worker.config.enabled {
                info!(
                    subsystem = "worker",
                    "Worker is disabled, not processing jobs"
                );
                return;
            }

            info!(
                subsystem = "worker",
                worker_id = worker.config.worker_id,
                poll_interval_ms = worker.config.poll_interval_ms,
                batch_size = worker.config.batch_size,
                "Worker started"
            );
            let poll_interval = Duration::from_millis(worker.config.poll_interval_ms);

            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                match worker.run_activation().await {
                    ActivationOutcome::Processed { rows } => {
                        // Work remains; go straight into the next batch.
                        debug!(subsystem = "worker", rows, "Continuing with next batch");
                    }
                    ActivationOutcome::Completed => {}
                    ActivationOutcome::Idle | ActivationOutcome::Failed => {
                        tokio::select! {
                            _ = shutdown_rx.recv() => break,
                            _ = sleep(poll_interval) => {}
                        }
                    }
                }
            }

            info!(subsystem = "worker", "Worker stopped");
        });

        WorkerHandle { shutdown_tx, task }
    }
}

/// Handle for controlling a resident worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the worker to shut down and wait for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| extfix_core::Error::Internal(format!("worker task panicked: {e}")))?;
        Ok(())
    }
}
