//! Requirements coverage: blueprint items and success criteria → documents

use serde::{Deserialize, Serialize};

use super::document::ValidationOutcome;
use crate::planner::{text_mentions, DocumentPlan, DocumentSpec};
use crate::runner::{DocumentResult, DocumentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Deliverable,
    SuccessCriterion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    Met,
    Gap,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RequirementItem {
    pub id: String,
    pub kind: RequirementKind,
    pub description: String,
    /// Documents that answer this requirement
    pub documents: Vec<String>,
    pub status: RequirementStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RequirementGapReport {
    pub items: Vec<RequirementItem>,
}

impl RequirementGapReport {
    pub fn gaps(&self) -> impl Iterator<Item = &RequirementItem> {
        self.items
            .iter()
            .filter(|i| i.status == RequirementStatus::Gap)
    }

    pub fn gap_count(&self) -> usize {
        self.gaps().count()
    }
}

/// Share of blueprint documents that were generated and passed validation
pub fn compliance_coverage(results: &[DocumentResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passing = results.iter().filter(|r| r.is_passing()).count();
    passing as f64 / results.len() as f64
}

pub struct CoverageValidator {
    pass_threshold: f64,
}

impl CoverageValidator {
    pub fn new(pass_threshold: f64) -> Self {
        Self { pass_threshold }
    }

    pub fn evaluate(&self, plan: &DocumentPlan, results: &[DocumentResult]) -> (f64, RequirementGapReport) {
        let find = |id: &str| results.iter().find(|r| r.spec_id == id);
        let mut items = Vec::new();

        for spec in plan.in_blueprint_order() {
            let remediation = match find(&spec.id) {
                Some(result) if result.is_passing() => None,
                Some(result) => Some(self.remediation(spec, result)),
                None => Some("No result was recorded for this document. Re-run the project.".to_string()),
            };
            items.push(RequirementItem {
                id: spec.id.clone(),
                kind: RequirementKind::Deliverable,
                description: spec.title.clone(),
                documents: vec![spec.id.clone()],
                status: if remediation.is_none() {
                    RequirementStatus::Met
                } else {
                    RequirementStatus::Gap
                },
                remediation,
            });
        }

        for (index, criterion) in plan.success_criteria.iter().enumerate() {
            let documents = criterion_documents(plan, criterion.description(), criterion.documents());
            let not_passing: Vec<&str> = documents
                .iter()
                .map(String::as_str)
                .filter(|id| !find(id).map(|r| r.is_passing()).unwrap_or(false))
                .collect();

            let remediation = if documents.is_empty() {
                Some(
                    "No document in the blueprint addresses this criterion. \
                     Add a blueprint item that covers it."
                        .to_string(),
                )
            } else if !not_passing.is_empty() {
                Some(format!(
                    "Covered by documents that did not pass: {}. Resolve those gaps first.",
                    not_passing.join(", ")
                ))
            } else {
                None
            };

            items.push(RequirementItem {
                id: criterion.id(index),
                kind: RequirementKind::SuccessCriterion,
                description: criterion.description().to_string(),
                documents,
                status: if remediation.is_none() {
                    RequirementStatus::Met
                } else {
                    RequirementStatus::Gap
                },
                remediation,
            });
        }

        (compliance_coverage(results), RequirementGapReport { items })
    }

    fn remediation(&self, spec: &DocumentSpec, result: &DocumentResult) -> String {
        let reason = result.last_error.as_deref().unwrap_or("unknown error");
        match result.status {
            DocumentStatus::Failed => format!(
                "Generation failed after {} attempt(s): {}. Check the generator and re-run.",
                result.attempts, reason
            ),
            DocumentStatus::Skipped => format!(
                "Not generated because {}. Fix the dependency and re-run.",
                reason
            ),
            DocumentStatus::TimedOut => {
                "Did not finish before the project deadline. Raise timeout_sec or reduce the blueprint."
                    .to_string()
            }
            DocumentStatus::Pending | DocumentStatus::Generating => {
                "Generation never completed. Re-run the project.".to_string()
            }
            DocumentStatus::Generated => match &result.validation {
                ValidationOutcome::Scored(score) => {
                    let mut text = format!(
                        "Scored {:.1}, below the pass threshold of {:.1}.",
                        score.overall, self.pass_threshold
                    );
                    if !score.missing_sections.is_empty() {
                        text.push_str(&format!(
                            " Add sections: {}.",
                            score.missing_sections.join(", ")
                        ));
                    }
                    if !score.missing_fields.is_empty() {
                        text.push_str(&format!(
                            " Add fields: {}.",
                            score.missing_fields.join(", ")
                        ));
                    }
                    if score.clarity < 1.0 {
                        text.push_str(&format!(
                            " Expand the text ({} words).",
                            score.word_count
                        ));
                    }
                    text
                }
                ValidationOutcome::Unavailable { reason } => format!(
                    "Validation was unavailable ({}). Review '{}' manually.",
                    reason, spec.title
                ),
                ValidationOutcome::NotValidated => {
                    format!("'{}' was generated but never validated.", spec.title)
                }
            },
        }
    }
}

/// Documents a success criterion maps to: its explicit ids, else every
/// document whose title or type the criterion names
fn criterion_documents(plan: &DocumentPlan, description: &str, explicit: &[String]) -> Vec<String> {
    let declared: Vec<String> = explicit
        .iter()
        .filter(|id| plan.spec(id).is_some())
        .cloned()
        .collect();
    if !declared.is_empty() {
        return declared;
    }

    let lower = description.to_lowercase();
    plan.in_blueprint_order()
        .into_iter()
        .filter(|spec| {
            text_mentions(description, spec) || lower.contains(&spec.document_type.replace('_', " "))
        })
        .map(|spec| spec.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::ProjectBrief;
    use crate::config::PlannerConfig;
    use crate::planner::plan_project;
    use crate::validate::ValidationScore;

    fn plan(yaml: &str) -> DocumentPlan {
        let brief = ProjectBrief::parse(yaml).unwrap();
        let config = PlannerConfig {
            dependency_rules: Vec::new(),
            ..Default::default()
        };
        plan_project(&brief, &config).unwrap()
    }

    fn scored(id: &str, overall: f64) -> DocumentResult {
        let mut result = DocumentResult::pending(id);
        result.status = DocumentStatus::Generated;
        result.validation = ValidationOutcome::Scored(ValidationScore {
            coverage: 1.0,
            completeness: 1.0,
            clarity: 1.0,
            accuracy: 1.0,
            overall,
            passed: overall >= 70.0,
            word_count: 500,
            missing_sections: Vec::new(),
            missing_fields: Vec::new(),
        });
        result
    }

    const BRIEF: &str = r#"
blueprint:
  - { id: policy, title: Privacy Policy }
  - { id: notice, title: Privacy Notice }
  - { id: ropa, title: Records of Processing }
  - { id: dpia, title: DPIA }
  - { id: cookies, title: Cookie Policy }
success_criteria:
  - A privacy policy published for customers
  - id: sc_cookies
    description: Cookie consent documented
    documents: [cookies]
  - Breach notification procedure in place
"#;

    #[test]
    fn test_four_of_five_passing_is_point_eight() {
        let plan = plan(BRIEF);
        let results = vec![
            scored("policy", 90.0),
            scored("notice", 85.0),
            scored("ropa", 75.0),
            scored("dpia", 40.0),
            scored("cookies", 95.0),
        ];

        let (coverage, report) = CoverageValidator::new(70.0).evaluate(&plan, &results);

        assert!((coverage - 0.8).abs() < f64::EPSILON);
        let gaps: Vec<&str> = report.gaps().map(|i| i.id.as_str()).collect();
        assert_eq!(gaps, vec!["dpia", "criterion_003"]);
        let dpia = report.items.iter().find(|i| i.id == "dpia").unwrap();
        assert!(dpia.remediation.as_deref().unwrap().contains("below the pass threshold"));
    }

    #[test]
    fn test_criteria_map_by_title_type_and_explicit_ids() {
        let plan = plan(BRIEF);
        let results: Vec<DocumentResult> = ["policy", "notice", "ropa", "dpia", "cookies"]
            .iter()
            .map(|id| scored(id, 90.0))
            .collect();

        let (_, report) = CoverageValidator::new(70.0).evaluate(&plan, &results);

        let by_id = |id: &str| report.items.iter().find(|i| i.id == id).unwrap();
        assert_eq!(by_id("criterion_001").documents, vec!["policy"]);
        assert_eq!(by_id("criterion_001").status, RequirementStatus::Met);
        assert_eq!(by_id("sc_cookies").documents, vec!["cookies"]);
        assert_eq!(by_id("criterion_003").status, RequirementStatus::Gap);
        assert!(by_id("criterion_003").documents.is_empty());
    }

    #[test]
    fn test_remediation_describes_each_failure() {
        let plan = plan(BRIEF);
        let mut failed = DocumentResult::pending("policy");
        failed.status = DocumentStatus::Failed;
        failed.attempts = 3;
        failed.last_error = Some("Generator exited with code 1: boom".to_string());
        let mut skipped = DocumentResult::pending("notice");
        skipped.status = DocumentStatus::Skipped;
        skipped.last_error = Some("dependency 'policy' failed".to_string());
        let mut timed_out = DocumentResult::pending("ropa");
        timed_out.status = DocumentStatus::TimedOut;
        let mut unavailable = scored("dpia", 0.0);
        unavailable.validation = ValidationOutcome::Unavailable {
            reason: "knowledge source down".to_string(),
        };
        let results = vec![failed, skipped, timed_out, unavailable, scored("cookies", 90.0)];

        let (coverage, report) = CoverageValidator::new(70.0).evaluate(&plan, &results);

        assert!((coverage - 0.2).abs() < 1e-9);
        let text = |id: &str| {
            report
                .items
                .iter()
                .find(|i| i.id == id)
                .and_then(|i| i.remediation.clone())
                .unwrap()
        };
        assert!(text("policy").contains("after 3 attempt(s)"));
        assert!(text("notice").contains("dependency 'policy' failed"));
        assert!(text("ropa").contains("project deadline"));
        assert!(text("dpia").contains("knowledge source down"));
        // The policy criterion inherits the failure
        assert!(text("criterion_001").contains("policy"));
    }
}
