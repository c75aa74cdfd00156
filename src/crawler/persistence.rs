//! Manifest persistence under `<data-dir>/<domain>/<vendor>/<repo>/<file>`

use crate::metrics::{MetricsRegistry, REPOSITORY_FILE_SAVED};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while saving a manifest
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("malformed repository name '{0}', expected '<vendor>/<repo>'")]
    MalformedName(String),

    #[error("invalid domain tag '{0}'")]
    InvalidDomainTag(String),

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Splits a `<vendor>/<repo>` full name into its first two segments
///
/// Extra segments (GitLab subgroups) are ignored. Empty, `.` and `..` segments are
/// rejected so a name can never escape the data directory.
pub fn split_full_name(name: &str) -> Result<(&str, &str), PersistError> {
    let mut parts = name.split('/');
    let vendor = parts.next().filter(|s| is_safe_segment(s));
    let repo = parts.next().filter(|s| is_safe_segment(s));

    match (vendor, repo) {
        (Some(vendor), Some(repo)) => Ok((vendor, repo)),
        _ => Err(PersistError::MalformedName(name.to_string())),
    }
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".." && !segment.contains('\\')
}

/// Writes fetched manifests to disk, last write wins
#[derive(Clone)]
pub struct FileStore {
    data_dir: PathBuf,
    file_name: String,
    metrics: Arc<MetricsRegistry>,
}

impl FileStore {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            file_name: file_name.into(),
            metrics,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path a repository's manifest is stored at
    pub fn manifest_path(&self, domain_tag: &str, name: &str) -> Result<PathBuf, PersistError> {
        if !is_safe_segment(domain_tag) || domain_tag.contains('/') {
            return Err(PersistError::InvalidDomainTag(domain_tag.to_string()));
        }
        let (vendor, repo) = split_full_name(name)?;

        Ok(self
            .data_dir
            .join(domain_tag)
            .join(vendor)
            .join(repo)
            .join(&self.file_name))
    }

    /// Saves a manifest, creating missing directories and overwriting any previous file
    pub async fn save(
        &self,
        domain_tag: &str,
        name: &str,
        data: &[u8],
    ) -> Result<PathBuf, PersistError> {
        let path = self.manifest_path(domain_tag, name)?;

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| PersistError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|source| PersistError::Write {
                path: path.clone(),
                source,
            })?;

        self.metrics.increment(REPOSITORY_FILE_SAVED);
        tracing::debug!("Saved {} ({} bytes)", path.display(), data.len());

        Ok(path)
    }
}
