//! Output module for end-of-run reporting
//!
//! This module handles:
//! - Printing the counters of a finished crawl
//! - Listing the pagination checkpoints left in the progress database

pub mod stats;

pub use stats::{load_checkpoints, print_checkpoints, print_report, CheckpointSummary};
