//! # extfix-core
//!
//! Core types, traits, and the binary-signature classifier for extfix, a
//! background worker that repairs file records whose stored name is missing
//! a file-type extension.
//!
//! This crate provides:
//! - The job and working-set data model with stable status codes
//! - Collaborator traits for the host search service, file-record store,
//!   content source, and status/error channel
//! - The format classifier (JPEG/TIFF signature table)
//! - Shared defaults and structured-logging field constants

pub mod classifier;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

pub use classifier::{classify, repaired_filename, HEADER_LEN};
pub use error::{Error, Result};
pub use models::{EntryStatus, FileRecord, Job, JobStatus, PopulationEntry, SearchPage};
pub use traits::{
    ContentSource, FileRecordStore, FsContentSource, HostChannel, SearchService,
    TracingHostChannel,
};
