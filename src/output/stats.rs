//! Statistics reporting for crawl runs
//!
//! This module provides functionality for displaying the counters of a
//! finished crawl and the checkpoints left in the progress database.

use crate::crawler::CrawlReport;
use crate::storage::{ProgressRecord, ProgressStore};
use crate::CrawlerError;
use std::collections::BTreeMap;

/// Checkpoints left in the progress database, grouped by domain
#[derive(Debug, Clone, Default)]
pub struct CheckpointSummary {
    /// Total number of checkpointed URLs
    pub total: usize,

    /// Checkpoints per domain id, newest first
    pub by_domain: BTreeMap<String, Vec<ProgressRecord>>,
}

/// Loads every checkpoint from the progress store
///
/// # Arguments
///
/// * `store` - The progress store to query
///
/// # Returns
///
/// * `Ok(CheckpointSummary)` - Successfully loaded checkpoints
/// * `Err(CrawlerError)` - Failed to query the store
pub fn load_checkpoints(store: &dyn ProgressStore) -> Result<CheckpointSummary, CrawlerError> {
    let entries = store.all_entries()?;
    let total = entries.len();

    let mut by_domain: BTreeMap<String, Vec<ProgressRecord>> = BTreeMap::new();
    for entry in entries {
        by_domain.entry(entry.domain_id.clone()).or_default().push(entry);
    }

    Ok(CheckpointSummary { total, by_domain })
}

/// Prints checkpoints to stdout in a formatted manner
pub fn print_checkpoints(summary: &CheckpointSummary) {
    println!("=== Pagination Checkpoints ===\n");

    if summary.total == 0 {
        println!("No checkpoints, the next run starts every domain from its first page.");
        return;
    }

    for (domain, records) in &summary.by_domain {
        println!("{} ({}):", domain, records.len());
        for record in records {
            println!(
                "  [{}] {} (updated {})",
                record.status.to_db_string(),
                record.url,
                record.updated_at
            );
        }
        println!();
    }

    println!("Total: {} checkpointed pages", summary.total);
}

/// Prints the outcome of a crawl to stdout
///
/// # Arguments
///
/// * `report` - The report returned by the crawl
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Repositories processed: {}", report.processed);
    println!("  Manifests saved: {}", report.saved);
    println!("  Valid manifests: {}", report.valid);
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    println!();

    println!("Counters:");
    for (name, value) in &report.counters {
        println!("  {}: {}", name, value);
    }
    println!();

    if !report.abandoned_domains.is_empty() {
        println!("Abandoned Domains ({}):", report.abandoned_domains.len());
        for (domain, url) in &report.abandoned_domains {
            println!("  - {} (resume at {})", domain, url);
        }
        println!();
    }

    let valid_rate = if report.saved > 0 {
        (report.valid as f64 / report.saved as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Valid Rate: {:.1}% ({} / {} saved manifests passed validation)",
        valid_rate, report.valid, report.saved
    );
}
