use crate::consolidate::ManifestEntry;
use crate::error::OutputError;
use crate::runner::{DocumentResult, DocumentStatus};
use crate::validate::ValidationOutcome;
use std::fs;
use std::path::Path;

/// Write one document's report: a metadata table, its validation scores and
/// the generated text
pub fn write_document_report(
    report_dir: &Path,
    entry: &ManifestEntry,
    result: &DocumentResult,
) -> Result<(), OutputError> {
    fs::create_dir_all(report_dir).map_err(OutputError::CreateDir)?;
    let mut content = String::new();

    content.push_str(&format!("# {}\n\n", entry.title));

    content.push_str("| Metric | Value |\n");
    content.push_str("|--------|-------|\n");
    content.push_str(&format!("| Status | {} |\n", format_status(result.status)));
    content.push_str(&format!("| Type | {} |\n", entry.document_type));
    content.push_str(&format!(
        "| Required | {} |\n",
        if entry.required { "yes" } else { "no" }
    ));
    content.push_str(&format!("| Attempts | {} |\n", result.attempts));
    content.push_str(&format!(
        "| Duration | {:.1}s |\n",
        result.duration_ms as f64 / 1000.0
    ));

    match &result.validation {
        ValidationOutcome::Scored(score) => {
            content.push_str(&format!(
                "| Score | {:.1} ({}) |\n",
                score.overall,
                if score.passed { "pass" } else { "fail" }
            ));
            content.push_str(&format!("| Coverage | {:.2} |\n", score.coverage));
            content.push_str(&format!("| Completeness | {:.2} |\n", score.completeness));
            content.push_str(&format!("| Clarity | {:.2} |\n", score.clarity));
            content.push_str(&format!("| Accuracy | {:.2} |\n", score.accuracy));
            content.push_str(&format!("| Words | {} |\n", score.word_count));
        }
        ValidationOutcome::Unavailable { reason } => {
            content.push_str(&format!("| Score | unavailable ({}) |\n", reason));
        }
        ValidationOutcome::NotValidated => {}
    }
    content.push_str("\n---\n\n");

    if let ValidationOutcome::Scored(score) = &result.validation {
        if !score.missing_sections.is_empty() {
            content.push_str("**Missing sections:**\n");
            for section in &score.missing_sections {
                content.push_str(&format!("- [ ] {}\n", section));
            }
            content.push('\n');
        }
        if !score.missing_fields.is_empty() {
            content.push_str("**Missing fields:**\n");
            for field in &score.missing_fields {
                content.push_str(&format!("- [ ] {}\n", field));
            }
            content.push('\n');
        }
    }

    if let Some(error) = &result.last_error {
        content.push_str(&format!("**Last error:** {}\n\n", error));
    }

    match result.text() {
        Some(text) => {
            content.push_str(text.trim_end());
            content.push('\n');
        }
        None => content.push_str("*No content generated*\n"),
    }

    let report_path = report_dir.join(format!("{}.md", result.spec_id));
    fs::write(&report_path, &content).map_err(OutputError::WriteReport)?;

    // Raw generator payload for downstream tooling
    if let Some(blob) = &result.content {
        if !blob.metadata.is_null() {
            let path = report_dir.join(format!("{}.content.json", result.spec_id));
            let json = serde_json::to_string_pretty(blob)?;
            fs::write(&path, json).map_err(OutputError::WriteReport)?;
        }
    }

    Ok(())
}

pub(crate) fn format_status(status: DocumentStatus) -> String {
    match status {
        DocumentStatus::Generated => "✅ generated".to_string(),
        DocumentStatus::Skipped => "⏭️ skipped".to_string(),
        DocumentStatus::TimedOut => "⏱️ timed_out".to_string(),
        DocumentStatus::Failed => "❌ failed".to_string(),
        DocumentStatus::Pending | DocumentStatus::Generating => format!("❓ {}", status),
    }
}
