//! Cross-document consistency checks over the generated set

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::facts::{normalize_email, normalize_entity, retention_days, DocumentFacts, FactExtractor};
use crate::brief::CanonicalFacts;
use crate::knowledge::FactKind;
use crate::planner::{text_mentions, DocumentPlan};
use crate::runner::{DocumentResult, DocumentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    EntityMismatch,
    RetentionConflict,
    Contradiction,
    MissingReference,
    ExtractionFailed,
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IssueType::EntityMismatch => "entity_mismatch",
            IssueType::RetentionConflict => "retention_conflict",
            IssueType::Contradiction => "contradiction",
            IssueType::MissingReference => "missing_reference",
            IssueType::ExtractionFailed => "extraction_failed",
        };
        f.write_str(name)
    }
}

/// Ordered most to least severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    /// Extraction itself failed, so the impact is not known
    Unknown,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Warning => write!(f, "warning"),
            Severity::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConsistencyIssue {
    /// Stable across runs with the same content
    pub id: String,
    pub documents: Vec<String>,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
}

impl ConsistencyIssue {
    pub fn new(
        issue_type: IssueType,
        severity: Severity,
        mut documents: Vec<String>,
        description: String,
    ) -> Self {
        documents.sort();
        documents.dedup();
        let input = format!("{}|{}|{}", issue_type, documents.join(","), description);
        let hash = Sha256::digest(input.as_bytes());
        Self {
            id: format!("{:x}", hash)[..12].to_string(),
            documents,
            issue_type,
            severity,
            description,
        }
    }
}

/// Sort issues most severe first, then by type and documents
pub fn sort_issues(issues: &mut [ConsistencyIssue]) {
    issues.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then(a.issue_type.cmp(&b.issue_type))
            .then_with(|| a.documents.cmp(&b.documents))
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub struct ConsistencyValidator<'a> {
    extractor: &'a dyn FactExtractor,
}

impl<'a> ConsistencyValidator<'a> {
    pub fn new(extractor: &'a dyn FactExtractor) -> Self {
        Self { extractor }
    }

    /// Check every generated document against the others. Only generated
    /// results are read; everything else is ignored.
    pub fn check(&self, plan: &DocumentPlan, results: &[DocumentResult]) -> Vec<ConsistencyIssue> {
        let mut issues = Vec::new();
        let mut facts: Vec<(String, DocumentFacts)> = Vec::new();

        for result in results {
            if result.status != DocumentStatus::Generated {
                continue;
            }
            let Some(spec) = plan.spec(&result.spec_id) else {
                continue;
            };
            match self.extractor.extract(spec, result.text().unwrap_or_default()) {
                Ok(found) => {
                    debug!("{} facts: {:?}", spec.id, found.values);
                    facts.push((spec.id.clone(), found));
                }
                Err(e) => {
                    warn!("Fact extraction failed for {}: {}", spec.id, e);
                    issues.push(ConsistencyIssue::new(
                        IssueType::ExtractionFailed,
                        Severity::Unknown,
                        vec![spec.id.clone()],
                        format!("Could not extract facts from '{}': {}", spec.title, e),
                    ));
                }
            }
        }

        let canonical = &plan.canonical_facts;
        issues.extend(entity_issue(&facts, canonical));
        issues.extend(retention_issue(&facts, canonical));
        issues.extend(contact_issue(&facts, canonical));
        issues.extend(reference_issues(plan, results));

        sort_issues(&mut issues);
        issues
    }
}

/// Fact values per document, in result order
fn values_of(facts: &[(String, DocumentFacts)], kind: FactKind) -> Vec<(&str, &str)> {
    facts
        .iter()
        .filter_map(|(id, f)| f.get(kind).map(|v| (id.as_str(), v)))
        .collect()
}

fn describe(values: &[(&str, &str)]) -> String {
    values
        .iter()
        .map(|(id, value)| format!("{} says '{}'", id, value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Group values by a normalized key; at most one issue per fact kind
fn grouped<'v>(
    values: &[(&'v str, &'v str)],
    key: impl Fn(&str) -> Option<String>,
) -> BTreeMap<String, Vec<(&'v str, &'v str)>> {
    let mut groups: BTreeMap<String, Vec<(&str, &str)>> = BTreeMap::new();
    for &(id, value) in values {
        if let Some(k) = key(value) {
            groups.entry(k).or_default().push((id, value));
        }
    }
    groups
}

fn entity_issue(
    facts: &[(String, DocumentFacts)],
    canonical: &CanonicalFacts,
) -> Option<ConsistencyIssue> {
    let values = values_of(facts, FactKind::LegalEntity);

    if let Some(expected) = canonical.legal_entity.as_deref() {
        let want = normalize_entity(expected);
        let differing: Vec<(&str, &str)> = values
            .iter()
            .copied()
            .filter(|(_, v)| normalize_entity(v) != want)
            .collect();
        if differing.is_empty() {
            return None;
        }
        return Some(ConsistencyIssue::new(
            IssueType::EntityMismatch,
            Severity::Critical,
            differing.iter().map(|(id, _)| id.to_string()).collect(),
            format!(
                "Legal entity differs from the declared '{}': {}",
                expected,
                describe(&differing)
            ),
        ));
    }

    let groups = grouped(&values, |v| Some(normalize_entity(v)));
    if groups.len() < 2 {
        return None;
    }
    Some(ConsistencyIssue::new(
        IssueType::EntityMismatch,
        Severity::Critical,
        values.iter().map(|(id, _)| id.to_string()).collect(),
        format!("Documents name different legal entities: {}", describe(&values)),
    ))
}

fn retention_issue(
    facts: &[(String, DocumentFacts)],
    canonical: &CanonicalFacts,
) -> Option<ConsistencyIssue> {
    let values = values_of(facts, FactKind::RetentionPeriod);

    if let Some(expected) = canonical.retention_period.as_deref() {
        let want = retention_days(expected);
        let differing: Vec<(&str, &str)> = values
            .iter()
            .copied()
            .filter(|(_, v)| match (retention_days(v), want) {
                (Some(days), Some(want)) => days != want,
                _ => v.trim().to_lowercase() != expected.trim().to_lowercase(),
            })
            .collect();
        if differing.is_empty() {
            return None;
        }
        return Some(ConsistencyIssue::new(
            IssueType::RetentionConflict,
            Severity::Critical,
            differing.iter().map(|(id, _)| id.to_string()).collect(),
            format!(
                "Retention period differs from the declared '{}': {}",
                expected,
                describe(&differing)
            ),
        ));
    }

    let groups = grouped(&values, |v| retention_days(v).map(|d| d.to_string()));
    if groups.len() < 2 {
        return None;
    }
    let involved: Vec<(&str, &str)> = groups.values().flatten().copied().collect();
    Some(ConsistencyIssue::new(
        IssueType::RetentionConflict,
        Severity::Warning,
        involved.iter().map(|(id, _)| id.to_string()).collect(),
        format!("Documents state different retention periods: {}", describe(&values)),
    ))
}

fn contact_issue(
    facts: &[(String, DocumentFacts)],
    canonical: &CanonicalFacts,
) -> Option<ConsistencyIssue> {
    let values = values_of(facts, FactKind::ContactEmail);

    if let Some(expected) = canonical.contact_email.as_deref() {
        let want = normalize_email(expected);
        let differing: Vec<(&str, &str)> = values
            .iter()
            .copied()
            .filter(|(_, v)| normalize_email(v) != want)
            .collect();
        if differing.is_empty() {
            return None;
        }
        return Some(ConsistencyIssue::new(
            IssueType::Contradiction,
            Severity::Critical,
            differing.iter().map(|(id, _)| id.to_string()).collect(),
            format!(
                "Contact email differs from the declared '{}': {}",
                expected,
                describe(&differing)
            ),
        ));
    }

    let groups = grouped(&values, |v| Some(normalize_email(v)));
    if groups.len() < 2 {
        return None;
    }
    Some(ConsistencyIssue::new(
        IssueType::Contradiction,
        Severity::Warning,
        values.iter().map(|(id, _)| id.to_string()).collect(),
        format!("Documents give different contact emails: {}", describe(&values)),
    ))
}

/// Every dependency edge between two generated documents must be cited
fn reference_issues(plan: &DocumentPlan, results: &[DocumentResult]) -> Vec<ConsistencyIssue> {
    let generated = |id: &str| {
        results
            .iter()
            .find(|r| r.spec_id == id)
            .filter(|r| r.status == DocumentStatus::Generated)
    };

    let mut issues = Vec::new();
    for spec in &plan.specs {
        let Some(result) = generated(&spec.id) else {
            continue;
        };
        let text = result.text().unwrap_or_default();
        for dep in &spec.dependencies {
            let Some(target) = plan.spec(&dep.id) else {
                continue;
            };
            if generated(&target.id).is_none() || text_mentions(text, target) {
                continue;
            }
            issues.push(ConsistencyIssue::new(
                IssueType::MissingReference,
                Severity::Warning,
                vec![spec.id.clone(), target.id.clone()],
                format!(
                    "'{}' depends on '{}' ({}) but never cites it",
                    spec.title, target.title, dep.origin
                ),
            ));
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::ProjectBrief;
    use crate::config::{default_extraction_rules, PlannerConfig};
    use crate::error::ExtractionError;
    use crate::planner::{plan_project, DocumentSpec};
    use crate::provider::ContentBlob;
    use crate::validate::RuleExtractor;

    fn plan(yaml: &str) -> DocumentPlan {
        let brief = ProjectBrief::parse(yaml).unwrap();
        let config = PlannerConfig {
            dependency_rules: Vec::new(),
            ..Default::default()
        };
        plan_project(&brief, &config).unwrap()
    }

    fn generated(id: &str, text: &str) -> DocumentResult {
        let mut result = DocumentResult::pending(id);
        result.status = DocumentStatus::Generated;
        result.content = Some(ContentBlob::from_text(text));
        result
    }

    fn check(plan: &DocumentPlan, results: &[DocumentResult]) -> Vec<ConsistencyIssue> {
        let extractor = RuleExtractor::new(&default_extraction_rules()).unwrap();
        ConsistencyValidator::new(&extractor).check(plan, results)
    }

    const TWO_DOCS: &str = "blueprint:\n  - { id: policy, title: Privacy Policy }\n  - { id: notice, title: Privacy Notice }\n";

    #[test]
    fn test_differing_entities_yield_one_critical_issue() {
        let plan = plan(TWO_DOCS);
        let results = vec![
            generated("policy", "Data Controller: Acme Ltd\nWe care about privacy."),
            generated("notice", "Data Controller: Globex Inc\nWe care about privacy."),
        ];

        let issues = check(&plan, &results);

        let mismatches: Vec<_> = issues
            .iter()
            .filter(|i| i.issue_type == IssueType::EntityMismatch)
            .collect();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].severity, Severity::Critical);
        assert_eq!(mismatches[0].documents, vec!["notice", "policy"]);
    }

    #[test]
    fn test_equivalent_entities_are_consistent() {
        let plan = plan(TWO_DOCS);
        let results = vec![
            generated("policy", "Data Controller: Acme Limited\n"),
            generated("notice", "Data Controller: ACME Ltd.\n"),
        ];

        assert!(check(&plan, &results).is_empty());
    }

    #[test]
    fn test_retention_conflict_is_warning_without_canonical_value() {
        let plan = plan(TWO_DOCS);
        let results = vec![
            generated("policy", "We retain records for 7 years."),
            generated("notice", "Records are kept for 5 years."),
        ];

        let issues = check(&plan, &results);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::RetentionConflict);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_retention_conflict_is_critical_with_canonical_value() {
        let plan = plan(&format!("{}canonical_facts:\n  retention_period: 7 years\n", TWO_DOCS));
        let results = vec![
            generated("policy", "We retain records for 84 months."),
            generated("notice", "Records are kept for 5 years."),
        ];

        let issues = check(&plan, &results);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Critical);
        // 84 months is 2520 days, not seven years of 365
        assert_eq!(issues[0].documents, vec!["notice", "policy"]);
    }

    #[test]
    fn test_declared_entity_flags_only_the_outlier() {
        let plan = plan(&format!("{}canonical_facts:\n  legal_entity: Acme Ltd\n", TWO_DOCS));
        let results = vec![
            generated("policy", "Data Controller: Acme Ltd\n"),
            generated("notice", "Data Controller: Globex Inc\n"),
        ];

        let issues = check(&plan, &results);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].documents, vec!["notice"]);
        assert_eq!(issues[0].severity, Severity::Critical);
    }

    #[test]
    fn test_uncited_dependency_is_missing_reference() {
        let plan = plan(
            "blueprint:\n  - { id: policy, title: Privacy Policy }\n  - { id: dpia, title: DPIA, depends_on: [policy] }\n  - { id: notice, title: Notice, depends_on: [policy] }\n",
        );
        let results = vec![
            generated("policy", "Our commitments."),
            generated("dpia", "This assessment does not cite anything."),
            generated("notice", "See the Privacy Policy for details."),
        ];

        let issues = check(&plan, &results);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::MissingReference);
        assert_eq!(issues[0].documents, vec!["dpia", "policy"]);
    }

    #[test]
    fn test_non_generated_documents_are_ignored() {
        let plan = plan(TWO_DOCS);
        let mut failed = DocumentResult::pending("notice");
        failed.status = DocumentStatus::Failed;
        let results = vec![generated("policy", "Data Controller: Acme Ltd\n"), failed];

        assert!(check(&plan, &results).is_empty());
    }

    struct BrokenExtractor;

    impl FactExtractor for BrokenExtractor {
        fn extract(&self, _: &DocumentSpec, _: &str) -> Result<DocumentFacts, ExtractionError> {
            Err(ExtractionError::Failed("service down".to_string()))
        }
    }

    #[test]
    fn test_extraction_failure_is_unknown_severity_issue() {
        let plan = plan(TWO_DOCS);
        let results = vec![generated("policy", "text"), generated("notice", "text")];

        let issues = ConsistencyValidator::new(&BrokenExtractor).check(&plan, &results);
        assert_eq!(issues.len(), 2);
        assert!(issues
            .iter()
            .all(|i| i.issue_type == IssueType::ExtractionFailed && i.severity == Severity::Unknown));
    }

    #[test]
    fn test_issue_ids_are_stable() {
        let a = ConsistencyIssue::new(
            IssueType::EntityMismatch,
            Severity::Critical,
            vec!["b".to_string(), "a".to_string()],
            "x".to_string(),
        );
        let b = ConsistencyIssue::new(
            IssueType::EntityMismatch,
            Severity::Critical,
            vec!["a".to_string(), "b".to_string()],
            "x".to_string(),
        );
        assert_eq!(a, b);
        assert_eq!(a.id.len(), 12);
    }
}
