use crate::consolidate::{OverallStatus, ProjectResult, RiskLevel};
use crate::error::OutputError;
use crate::runner::ProgressSnapshot;
use crate::validate::Severity;
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::report::format_status;

#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub timestamp: String,
    pub project_id: String,
    pub primary_framework: String,
    pub overall_status: OverallStatus,
    pub risk_level: RiskLevel,
    pub compliance_coverage: f64,
    pub timed_out: bool,
    pub counts: ProgressSnapshot,
    pub critical_issues: usize,
    pub warning_issues: usize,
    pub gaps: usize,
    pub report_dir: PathBuf,
}

/// Write `project.json` (the full result), `summary.json` and `summary.md`
pub fn write_summary(report_dir: &Path, project: &ProjectResult) -> Result<SummaryReport, OutputError> {
    fs::create_dir_all(report_dir).map_err(OutputError::CreateDir)?;

    let project_path = report_dir.join("project.json");
    let json = serde_json::to_string_pretty(project)?;
    fs::write(&project_path, json).map_err(OutputError::WriteReport)?;

    let summary = build_summary(project, report_dir.to_path_buf());

    let json_path = report_dir.join("summary.json");
    let json = serde_json::to_string_pretty(&summary)?;
    fs::write(&json_path, json).map_err(OutputError::WriteReport)?;

    let md_path = report_dir.join("summary.md");
    let md = build_summary_markdown(&summary, project);
    fs::write(&md_path, md).map_err(OutputError::WriteReport)?;

    Ok(summary)
}

fn build_summary(project: &ProjectResult, report_dir: PathBuf) -> SummaryReport {
    SummaryReport {
        timestamp: Utc::now().to_rfc3339(),
        project_id: project.project_id.clone(),
        primary_framework: project.primary_framework.clone(),
        overall_status: project.overall_status,
        risk_level: project.risk_level,
        compliance_coverage: project.compliance_coverage,
        timed_out: project.timed_out,
        counts: project.counts(),
        critical_issues: project.issue_count(Severity::Critical),
        warning_issues: project.issue_count(Severity::Warning),
        gaps: project.gap_report.gap_count(),
        report_dir,
    }
}

fn build_summary_markdown(summary: &SummaryReport, project: &ProjectResult) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {} Summary\n\n", summary.project_id));
    md.push_str(&format!("**Generated:** {}\n", summary.timestamp));
    md.push_str(&format!("**Framework:** {}\n", summary.primary_framework));
    md.push_str(&format!(
        "**Report Dir:** {}\n\n",
        summary.report_dir.display()
    ));

    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Status | {} |\n", summary.overall_status));
    md.push_str(&format!("| Risk | {} |\n", summary.risk_level));
    md.push_str(&format!(
        "| Compliance Coverage | {:.0}% |\n",
        summary.compliance_coverage * 100.0
    ));
    md.push_str(&format!(
        "| Documents | {} generated / {} total |\n",
        summary.counts.generated, summary.counts.total
    ));
    md.push_str(&format!(
        "| Issues | {} critical, {} warning |\n",
        summary.critical_issues, summary.warning_issues
    ));
    md.push_str(&format!("| Gaps | {} |\n", summary.gaps));
    if summary.timed_out {
        md.push_str("| Deadline | ⏱️ reached before all documents finished |\n");
    }

    md.push_str("\n## Documents\n\n");
    md.push_str("| Document | Status | Score | Attempts |\n");
    md.push_str("|----------|--------|-------|----------|\n");
    for entry in &project.manifest {
        let score = match (&entry.scores, entry.validation_unavailable) {
            (Some(score), _) => format!("{:.1}", score.overall),
            (None, true) => "unavailable".to_string(),
            (None, false) => "-".to_string(),
        };
        let required = if entry.required { " *" } else { "" };
        md.push_str(&format!(
            "| {}{} | {} | {} | {} |\n",
            entry.title,
            required,
            format_status(entry.status),
            score,
            entry.attempts
        ));
    }

    if !project.issues.is_empty() {
        md.push_str("\n## Consistency Issues\n\n");
        for issue in &project.issues {
            md.push_str(&format!(
                "- **[{}] {}** ({}): {}\n",
                issue.severity,
                issue.issue_type,
                issue.documents.join(", "),
                issue.description
            ));
        }
    }

    let gaps: Vec<_> = project.gap_report.gaps().collect();
    if !gaps.is_empty() {
        md.push_str("\n## Requirement Gaps\n\n");
        for gap in gaps {
            md.push_str(&format!("### {}\n\n", gap.description));
            if let Some(remediation) = &gap.remediation {
                md.push_str(&format!("**Remediation:** {}\n\n", remediation));
            }
        }
    }

    md
}
