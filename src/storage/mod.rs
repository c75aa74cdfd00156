//! Storage module for pagination checkpoints
//!
//! This module persists, per domain, the listing page currently being worked on:
//! - A page URL is written as `failed` before it is fetched
//! - The entry is removed once the page has been processed
//! - Whatever is left after a crash or an abandoned domain marks where to resume

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteProgressStore;
pub use traits::{ProgressStore, StorageError, StorageResult};

use crate::CrawlerError;
use std::path::Path;

/// Opens (or creates) the progress database at the given path
pub fn open_progress_store(path: &Path) -> Result<SqliteProgressStore, CrawlerError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    SqliteProgressStore::new(path)
}

/// Status of a checkpointed page URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressStatus {
    Pending,
    Failed,
}

impl ProgressStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A checkpoint row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub domain_id: String,
    pub url: String,
    pub status: ProgressStatus,
    /// RFC 3339 timestamp of the last write
    pub updated_at: String,
}
