//! Storage traits and error types

use crate::storage::{ProgressRecord, ProgressStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Unknown progress status '{0}'")]
    UnknownStatus(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable `(domain, page URL) -> status` store
///
/// Entries are keyed per domain, so concurrent crawlers never write the same key.
/// Implementations must be usable from many tasks at once.
pub trait ProgressStore: Send + Sync {
    /// Inserts or overwrites the status of a page URL
    fn set_status(&self, domain_id: &str, url: &str, status: ProgressStatus) -> StorageResult<()>;

    /// Removes the entry for a page URL; missing entries are not an error
    fn clear_status(&self, domain_id: &str, url: &str) -> StorageResult<()>;

    /// Reads the status of a single page URL
    fn get_status(&self, domain_id: &str, url: &str) -> StorageResult<Option<ProgressStatus>>;

    /// Lists a domain's entries, most recently written first
    fn entries(&self, domain_id: &str) -> StorageResult<Vec<ProgressRecord>>;

    /// Lists every entry of every domain
    fn all_entries(&self) -> StorageResult<Vec<ProgressRecord>>;

    /// Drops all entries of a domain, returning how many were removed
    fn clear_domain(&self, domain_id: &str) -> StorageResult<usize>;

    /// Page URL a crawl of this domain should resume from, if any
    fn resume_point(&self, domain_id: &str) -> StorageResult<Option<String>> {
        Ok(self
            .entries(domain_id)?
            .into_iter()
            .find(|record| record.status == ProgressStatus::Failed)
            .map(|record| record.url))
    }
}
