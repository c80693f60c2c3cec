//! Centralized default constants for extfix.
//!
//! This module is the single source of truth for shared default values;
//! crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// BATCHING
// =============================================================================

/// Working-set entries claimed and processed per activation. Bounds memory
/// and transaction size for jobs over millions of records.
pub const BATCH_SIZE: i64 = 5000;

// =============================================================================
// SEARCH ENUMERATION
// =============================================================================

/// Result page size requested from the search service.
pub const SEARCH_PAGE_SIZE: i64 = 1000;

/// Attempts per subsequent result page before the expansion fails.
pub const SEARCH_PAGE_RETRIES: u32 = 3;

// =============================================================================
// QUEUE / LEASING
// =============================================================================

/// How long a claim is held before another worker may reclaim the job.
pub const JOB_LEASE_SECS: i64 = 600;

/// Polling interval between activations when the worker runs resident.
pub const POLL_INTERVAL_MS: u64 = 5_000;

/// Idle interval hint passed to the host when the queue is empty (seconds).
pub const IDLE_HINT_SECS: u32 = 10;
