//! Manifest validation step of the repository task

use crate::metrics::{MetricsRegistry, REPOSITORY_FILE_SAVED_VALID};
use crate::publiccode::{ValidationError, Validator};
use std::sync::Arc;

/// Directory a manifest was fetched from, used to resolve its relative references
pub fn base_dir<'a>(source_url: &'a str, file_name: &str) -> &'a str {
    source_url.strip_suffix(file_name).unwrap_or(source_url)
}

#[derive(Clone)]
pub struct ValidationPipeline {
    validator: Arc<dyn Validator>,
    file_name: String,
    metrics: Arc<MetricsRegistry>,
}

impl ValidationPipeline {
    pub fn new(
        validator: Arc<dyn Validator>,
        file_name: impl Into<String>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            validator,
            file_name: file_name.into(),
            metrics,
        }
    }

    /// Validates manifest bytes fetched from `source_url`
    ///
    /// Counts the manifest as valid on success; errors are returned for the caller to log.
    pub fn validate(&self, data: &[u8], source_url: &str) -> Result<(), ValidationError> {
        let base = base_dir(source_url, &self.file_name);
        self.validator.parse(data, base)?;
        self.metrics.increment(REPOSITORY_FILE_SAVED_VALID);
        Ok(())
    }
}
