//! Report files for a consolidated project.
//!
//! Layout: `<report_dir>/<YYYY-MM-DD>/<project_id>/` holding `project.json`,
//! `summary.json`, `summary.md` and one `<document-id>.md` per document.

mod report;
mod summary;

pub use report::write_document_report;
pub use summary::{write_summary, SummaryReport};

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::consolidate::ProjectResult;
use crate::error::OutputError;

/// Dated directory for one project's reports
pub fn project_report_dir(report_dir: &Path, project_id: &str) -> PathBuf {
    let date_str = Local::now().format("%Y-%m-%d").to_string();
    report_dir.join(date_str).join(project_id)
}

/// Write every report for `project` into `dir`
pub fn write_project_report(dir: &Path, project: &ProjectResult) -> Result<SummaryReport, OutputError> {
    for entry in &project.manifest {
        match project.documents.iter().find(|d| d.spec_id == entry.id) {
            Some(result) => write_document_report(dir, entry, result)?,
            None => warn!("No result for {}, skipping its report", entry.id),
        }
    }
    let summary = write_summary(dir, project)?;
    debug!("Reports written to {}", dir.display());
    Ok(summary)
}
