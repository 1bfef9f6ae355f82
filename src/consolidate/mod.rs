//! Result consolidation: every document outcome, issue and gap folded into
//! one [`ProjectResult`] with an overall status and risk level.
//!
//! Consolidation is a pure function of its inputs; the only side effect is
//! the event handed to the sink.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::brief::Framework;
use crate::config::RiskConfig;
use crate::error::ConsolidationError;
use crate::planner::{DocumentPlan, DocumentSpec};
use crate::runner::{DocumentResult, DocumentStatus, EventSink, ProgressEvent, ProgressSnapshot};
use crate::validate::{
    compliance_coverage, ConsistencyIssue, RequirementGapReport, Severity, ValidationOutcome,
    ValidationScore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Completed,
    CompletedWithWarnings,
    Partial,
    Failed,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::Completed => write!(f, "completed"),
            OverallStatus::CompletedWithWarnings => write!(f, "completed_with_warnings"),
            OverallStatus::Partial => write!(f, "partial"),
            OverallStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// One line of the document manifest
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ManifestEntry {
    pub id: String,
    pub title: String,
    pub document_type: String,
    pub status: DocumentStatus,
    pub required: bool,
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<ValidationScore>,

    #[serde(default)]
    pub validation_unavailable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProjectResult {
    pub project_id: String,
    pub primary_framework: String,
    pub frameworks: Vec<Framework>,
    pub overall_status: OverallStatus,
    /// 0-1
    pub compliance_coverage: f64,
    pub risk_level: RiskLevel,
    /// The run stopped at its deadline (or was cancelled) before finishing
    pub timed_out: bool,
    pub manifest: Vec<ManifestEntry>,
    pub documents: Vec<DocumentResult>,
    pub issues: Vec<ConsistencyIssue>,
    pub gap_report: RequirementGapReport,
}

impl ProjectResult {
    pub fn counts(&self) -> ProgressSnapshot {
        ProgressSnapshot::from_results(&self.documents)
    }

    pub fn issue_count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn is_complete(&self) -> bool {
        matches!(
            self.overall_status,
            OverallStatus::Completed | OverallStatus::CompletedWithWarnings
        )
    }
}

pub struct Consolidator<'a> {
    risk: &'a RiskConfig,
    sink: &'a dyn EventSink,
}

impl<'a> Consolidator<'a> {
    pub fn new(risk: &'a RiskConfig, sink: &'a dyn EventSink) -> Self {
        Self { risk, sink }
    }

    pub fn consolidate(
        &self,
        plan: &DocumentPlan,
        results: &[DocumentResult],
        issues: &[ConsistencyIssue],
        gap_report: &RequirementGapReport,
        timed_out: bool,
    ) -> Result<ProjectResult, ConsolidationError> {
        let mut ordered: Vec<(&DocumentSpec, &DocumentResult)> = Vec::new();
        let mut unfinished = Vec::new();
        for spec in plan.in_blueprint_order() {
            match results.iter().find(|r| r.spec_id == spec.id) {
                Some(result) if result.status.is_terminal() => ordered.push((spec, result)),
                _ => unfinished.push(spec.id.clone()),
            }
        }
        if !unfinished.is_empty() {
            return Err(ConsolidationError::NonTerminal(unfinished));
        }

        let documents: Vec<DocumentResult> = ordered.iter().map(|(_, r)| (*r).clone()).collect();
        let coverage = compliance_coverage(&documents);
        let overall_status = overall_status(&ordered, issues);
        let risk_level = risk_level(self.risk, issues, coverage);

        let manifest = ordered
            .iter()
            .map(|(spec, result)| ManifestEntry {
                id: spec.id.clone(),
                title: spec.title.clone(),
                document_type: spec.document_type.clone(),
                status: result.status,
                required: spec.required,
                attempts: result.attempts,
                scores: result.score().cloned(),
                validation_unavailable: result.validation.is_unavailable(),
                last_error: result.last_error.clone(),
            })
            .collect();

        let project = ProjectResult {
            project_id: plan.project_id.clone(),
            primary_framework: plan.primary_framework.clone(),
            frameworks: plan.frameworks.clone(),
            overall_status,
            compliance_coverage: coverage,
            risk_level,
            timed_out,
            manifest,
            documents,
            issues: issues.to_vec(),
            gap_report: gap_report.clone(),
        };

        info!(
            "Consolidated {}: {} ({} issues, {} gaps)",
            project.project_id,
            project.overall_status,
            project.issues.len(),
            project.gap_report.gap_count()
        );
        self.sink.emit(&ProgressEvent::Consolidated {
            project_id: project.project_id.clone(),
            overall_status,
            compliance_coverage: coverage,
            risk_level,
        });

        Ok(project)
    }
}

/// Rules in order: a required document not generated fails the project;
/// any other unfinished document makes it partial; failed or unavailable
/// validation, or any consistency issue, adds warnings.
fn overall_status(
    documents: &[(&DocumentSpec, &DocumentResult)],
    issues: &[ConsistencyIssue],
) -> OverallStatus {
    if documents
        .iter()
        .any(|(spec, r)| spec.required && r.status != DocumentStatus::Generated)
    {
        return OverallStatus::Failed;
    }
    if documents
        .iter()
        .any(|(_, r)| r.status != DocumentStatus::Generated)
    {
        return OverallStatus::Partial;
    }
    let validation_warnings = documents.iter().any(|(_, r)| match &r.validation {
        ValidationOutcome::Scored(score) => !score.passed,
        ValidationOutcome::Unavailable { .. } => true,
        ValidationOutcome::NotValidated => false,
    });
    if validation_warnings || !issues.is_empty() {
        return OverallStatus::CompletedWithWarnings;
    }
    OverallStatus::Completed
}

fn risk_level(config: &RiskConfig, issues: &[ConsistencyIssue], coverage: f64) -> RiskLevel {
    let critical = issues
        .iter()
        .filter(|i| i.severity == Severity::Critical)
        .count();

    if critical >= config.critical_issue_limit || coverage < config.critical_coverage_below {
        RiskLevel::Critical
    } else if critical > 0 || coverage < config.high_coverage_below {
        RiskLevel::High
    } else if !issues.is_empty() || coverage < config.medium_coverage_below {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::ProjectBrief;
    use crate::config::PlannerConfig;
    use crate::planner::plan_project;
    use crate::runner::{MemorySink, NullSink};
    use crate::validate::{CoverageValidator, IssueType};

    const FIVE_REQUIRED: &str = r#"
project_id: acme-privacy
frameworks: [GDPR]
blueprint:
  - { id: policy, title: Privacy Policy, required: true }
  - { id: notice, title: Privacy Notice, required: true }
  - { id: ropa, title: Records of Processing, required: true }
  - { id: dpia, title: DPIA, required: true }
  - { id: cookies, title: Cookie Policy, required: true }
"#;

    const FIVE_OPTIONAL: &str = r#"
project_id: acme-privacy
blueprint:
  - { id: a, title: A }
  - { id: b, title: B }
  - { id: c, title: C }
  - { id: d, title: D, depends_on: [c] }
  - { id: e, title: E, depends_on: [d] }
"#;

    fn plan(yaml: &str) -> DocumentPlan {
        let brief = ProjectBrief::parse(yaml).unwrap();
        let config = PlannerConfig {
            dependency_rules: Vec::new(),
            ..Default::default()
        };
        plan_project(&brief, &config).unwrap()
    }

    fn result(id: &str, status: DocumentStatus, score: Option<f64>) -> DocumentResult {
        let mut result = DocumentResult::pending(id);
        result.status = status;
        if let Some(overall) = score {
            result.validation = ValidationOutcome::Scored(ValidationScore {
                coverage: 1.0,
                completeness: 1.0,
                clarity: 1.0,
                accuracy: 1.0,
                overall,
                passed: overall >= 70.0,
                word_count: 400,
                missing_sections: Vec::new(),
                missing_fields: Vec::new(),
            });
        }
        result
    }

    fn issue(severity: Severity) -> ConsistencyIssue {
        ConsistencyIssue::new(
            IssueType::EntityMismatch,
            severity,
            vec!["policy".to_string(), "notice".to_string()],
            format!("{} mismatch", severity),
        )
    }

    fn consolidate(
        plan: &DocumentPlan,
        results: &[DocumentResult],
        issues: &[ConsistencyIssue],
        timed_out: bool,
    ) -> ProjectResult {
        let (_, gaps) = CoverageValidator::new(70.0).evaluate(plan, results);
        Consolidator::new(&RiskConfig::default(), &NullSink)
            .consolidate(plan, results, issues, &gaps, timed_out)
            .unwrap()
    }

    #[test]
    fn test_four_of_five_passing_completes_with_warnings() {
        let plan = plan(FIVE_REQUIRED);
        let results = vec![
            result("policy", DocumentStatus::Generated, Some(90.0)),
            result("notice", DocumentStatus::Generated, Some(88.0)),
            result("ropa", DocumentStatus::Generated, Some(80.0)),
            result("dpia", DocumentStatus::Generated, Some(55.0)),
            result("cookies", DocumentStatus::Generated, Some(92.0)),
        ];

        let project = consolidate(&plan, &results, &[], false);

        assert!((project.compliance_coverage - 0.8).abs() < 1e-9);
        assert_eq!(project.overall_status, OverallStatus::CompletedWithWarnings);
        assert_eq!(project.risk_level, RiskLevel::Medium);
        assert_eq!(project.primary_framework, "gdpr");
        let ids: Vec<&str> = project.manifest.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["policy", "notice", "ropa", "dpia", "cookies"]);
    }

    #[test]
    fn test_all_passing_without_issues_completes() {
        let plan = plan(FIVE_REQUIRED);
        let results: Vec<DocumentResult> = ["policy", "notice", "ropa", "dpia", "cookies"]
            .iter()
            .map(|id| result(id, DocumentStatus::Generated, Some(95.0)))
            .collect();

        let project = consolidate(&plan, &results, &[], false);

        assert_eq!(project.overall_status, OverallStatus::Completed);
        assert_eq!(project.risk_level, RiskLevel::Low);
        assert!(project.is_complete());
    }

    #[test]
    fn test_required_document_missing_fails_project() {
        let plan = plan(FIVE_REQUIRED);
        let mut results: Vec<DocumentResult> = ["policy", "notice", "ropa", "dpia"]
            .iter()
            .map(|id| result(id, DocumentStatus::Generated, Some(95.0)))
            .collect();
        results.push(result("cookies", DocumentStatus::Failed, None));

        let project = consolidate(&plan, &results, &[], false);
        assert_eq!(project.overall_status, OverallStatus::Failed);
    }

    #[test]
    fn test_timeout_with_three_pending_is_partial() {
        let plan = plan(FIVE_OPTIONAL);
        let results = vec![
            result("a", DocumentStatus::Generated, Some(90.0)),
            result("b", DocumentStatus::Generated, Some(90.0)),
            result("c", DocumentStatus::TimedOut, None),
            result("d", DocumentStatus::TimedOut, None),
            result("e", DocumentStatus::TimedOut, None),
        ];

        let project = consolidate(&plan, &results, &[], true);

        assert_eq!(project.overall_status, OverallStatus::Partial);
        assert!(project.timed_out);
        assert_eq!(project.counts().timed_out, 3);
        // 2 of 5 passing
        assert_eq!(project.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_consolidation_is_idempotent() {
        let plan = plan(FIVE_REQUIRED);
        let results = vec![
            result("policy", DocumentStatus::Generated, Some(90.0)),
            result("notice", DocumentStatus::Generated, Some(65.0)),
            result("ropa", DocumentStatus::Failed, None),
            result("dpia", DocumentStatus::Skipped, None),
            result("cookies", DocumentStatus::Generated, Some(92.0)),
        ];
        let issues = vec![issue(Severity::Critical), issue(Severity::Warning)];

        let first = consolidate(&plan, &results, &issues, false);
        let second = consolidate(&plan, &results, &issues, false);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_non_terminal_results_rejected() {
        let plan = plan(FIVE_OPTIONAL);
        let results = vec![
            result("a", DocumentStatus::Generated, Some(90.0)),
            result("b", DocumentStatus::Generating, None),
        ];
        let err = Consolidator::new(&RiskConfig::default(), &NullSink)
            .consolidate(&plan, &results, &[], &RequirementGapReport::default(), false)
            .unwrap_err();

        match err {
            ConsolidationError::NonTerminal(ids) => assert_eq!(ids, vec!["b", "c", "d", "e"]),
        }
    }

    #[test]
    fn test_risk_levels() {
        let config = RiskConfig::default();
        assert_eq!(risk_level(&config, &[], 1.0), RiskLevel::Low);
        assert_eq!(risk_level(&config, &[issue(Severity::Warning)], 1.0), RiskLevel::Medium);
        assert_eq!(risk_level(&config, &[], 0.85), RiskLevel::Medium);
        assert_eq!(risk_level(&config, &[issue(Severity::Critical)], 1.0), RiskLevel::High);
        assert_eq!(risk_level(&config, &[], 0.6), RiskLevel::High);
        assert_eq!(risk_level(&config, &[], 0.3), RiskLevel::Critical);
        let many = vec![
            issue(Severity::Critical),
            issue(Severity::Critical),
            issue(Severity::Critical),
        ];
        assert_eq!(risk_level(&config, &many, 1.0), RiskLevel::Critical);
    }

    #[test]
    fn test_consolidation_emits_event() {
        let plan = plan(FIVE_OPTIONAL);
        let results: Vec<DocumentResult> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| result(id, DocumentStatus::Generated, Some(90.0)))
            .collect();
        let sink = MemorySink::new();

        Consolidator::new(&RiskConfig::default(), &sink)
            .consolidate(&plan, &results, &[], &RequirementGapReport::default(), false)
            .unwrap();

        assert!(matches!(
            sink.events().as_slice(),
            [ProgressEvent::Consolidated {
                overall_status: OverallStatus::Completed,
                ..
            }]
        ));
    }
}
