//! # Batch Embedding
//!
//! Parallel embedding of one message into a directory of carriers, with a
//! JSON-exportable per-job report.

pub mod report;
pub mod runner;

pub use report::{AggregatedStats, BatchReport, JobRecord};
pub use runner::{jobs_from_dir, BatchJob, BatchRunner};
