//! Structured logging field name constants for extfix.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Activation failed, requires operator attention |
//! | WARN  | Recoverable issue (unreadable file, retried page) |
//! | INFO  | Lifecycle events, batch/job completions |
//! | DEBUG | Decision points, claim results, page bookkeeping |

/// Subsystem originating the log event.
/// Values: "queue", "worker", "search", "batch", "population", "db"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "claim", "expand", "materialize", "claim_batch", "commit"
pub const OPERATION: &str = "op";

/// Workspace the job runs against.
pub const WORKSPACE_ID: &str = "workspace_id";

/// Job identifier within the workspace.
pub const JOB_ID: &str = "job_id";

/// Saved search scoping the job.
pub const SEARCH_ID: &str = "search_id";

/// File record being classified or committed.
pub const FILE_ID: &str = "file_id";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows/documents an operation touched.
pub const ROW_COUNT: &str = "row_count";
