//! Per-document rubric scoring.
//!
//! Each generated document is scored against the merged rubric for its
//! frameworks and type. A lookup fault marks the document
//! `validation_unavailable` instead of failing the run.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::brief::Framework;
use crate::config::ValidationConfig;
use crate::error::KnowledgeError;
use crate::knowledge::{KnowledgeLookup, Rubric, WILDCARD};
use crate::planner::{DocumentPlan, DocumentSpec};
use crate::runner::{DocumentResult, DocumentStatus};

/// Per-document rubric score. Sub-scores are 0-1, `overall` is 0-100.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ValidationScore {
    /// Share of required sections present
    pub coverage: f64,
    /// Share of mandatory fields present
    pub completeness: f64,
    /// Length against the rubric's floor
    pub clarity: f64,
    /// Share of target frameworks the text names
    pub accuracy: f64,
    pub overall: f64,
    pub passed: bool,
    pub word_count: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_sections: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ValidationOutcome {
    #[default]
    NotValidated,
    Scored(ValidationScore),
    #[serde(rename = "validation_unavailable")]
    Unavailable { reason: String },
}

impl ValidationOutcome {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ValidationOutcome::Unavailable { .. })
    }
}

/// Frameworks a document is judged against: its own, else the project's
pub fn effective_frameworks<'a>(spec: &'a DocumentSpec, plan: &'a [Framework]) -> &'a [Framework] {
    if spec.frameworks.is_empty() {
        plan
    } else {
        &spec.frameworks
    }
}

/// Merge every rubric the knowledge lookup has for the document's frameworks
/// and type, falling back to `default` when it knows nothing
pub fn resolve_rubric(
    knowledge: &dyn KnowledgeLookup,
    default: &Rubric,
    spec: &DocumentSpec,
    frameworks: &[Framework],
) -> Result<Rubric, KnowledgeError> {
    let mut merged: Option<Rubric> = None;
    for framework in frameworks {
        if let Some(rubric) = knowledge.rubric(framework, &spec.document_type)? {
            merged.get_or_insert_with(Rubric::default).merge(&rubric);
        }
    }
    // Frameworkless documents still get type-level rubrics
    if frameworks.is_empty() {
        if let Some(any) = Framework::normalize(WILDCARD, &Default::default()) {
            if let Some(rubric) = knowledge.rubric(&any, &spec.document_type)? {
                merged.get_or_insert_with(Rubric::default).merge(&rubric);
            }
        }
    }
    Ok(merged.unwrap_or_else(|| default.clone()))
}

/// Scores generated documents against their rubric
pub struct DocumentValidator<'a> {
    knowledge: &'a dyn KnowledgeLookup,
    config: &'a ValidationConfig,
}

impl<'a> DocumentValidator<'a> {
    pub fn new(knowledge: &'a dyn KnowledgeLookup, config: &'a ValidationConfig) -> Self {
        Self { knowledge, config }
    }

    /// Annotate every generated result. Validator faults mark the result
    /// unavailable instead of failing.
    pub fn validate_all(&self, plan: &DocumentPlan, results: &mut [DocumentResult]) {
        for result in results.iter_mut() {
            if result.status != DocumentStatus::Generated {
                continue;
            }
            let Some(spec) = plan.spec(&result.spec_id) else {
                continue;
            };
            let text = result.text().unwrap_or_default();

            result.validation = match self.validate(spec, &plan.frameworks, text) {
                Ok(score) => {
                    debug!(
                        "{} scored {:.1} ({})",
                        spec.id,
                        score.overall,
                        if score.passed { "pass" } else { "fail" }
                    );
                    ValidationOutcome::Scored(score)
                }
                Err(e) => {
                    warn!("Validation unavailable for {}: {}", spec.id, e);
                    ValidationOutcome::Unavailable {
                        reason: e.to_string(),
                    }
                }
            };
        }
    }

    pub fn validate(
        &self,
        spec: &DocumentSpec,
        plan_frameworks: &[Framework],
        text: &str,
    ) -> Result<ValidationScore, KnowledgeError> {
        let frameworks = effective_frameworks(spec, plan_frameworks);
        let rubric = resolve_rubric(self.knowledge, &self.config.default_rubric, spec, frameworks)?;
        let fields = rubric.compile_fields()?;
        Ok(self.score(&rubric, &fields, frameworks, text))
    }

    fn score(
        &self,
        rubric: &Rubric,
        fields: &[(String, Regex)],
        frameworks: &[Framework],
        text: &str,
    ) -> ValidationScore {
        let missing_sections: Vec<String> = rubric
            .required_sections
            .iter()
            .filter(|section| !has_section(text, section))
            .cloned()
            .collect();
        let coverage = ratio(
            rubric.required_sections.len() - missing_sections.len(),
            rubric.required_sections.len(),
        );

        let missing_fields: Vec<String> = fields
            .iter()
            .filter(|(_, re)| !re.is_match(text))
            .map(|(name, _)| name.clone())
            .collect();
        let completeness = ratio(fields.len() - missing_fields.len(), fields.len());

        let word_count = text.split_whitespace().count();
        let clarity = if rubric.min_words == 0 {
            1.0
        } else {
            (word_count as f64 / rubric.min_words as f64).min(1.0)
        };

        let lower = text.to_lowercase();
        let mentioned = frameworks
            .iter()
            .filter(|f| {
                f.search_terms()
                    .iter()
                    .any(|term| lower.contains(&term.to_lowercase()))
            })
            .count();
        let accuracy = ratio(mentioned, frameworks.len());

        let weights = &self.config.weights;
        let total = weights.total();
        let overall = if total > 0.0 {
            (coverage * weights.coverage
                + completeness * weights.completeness
                + clarity * weights.clarity
                + accuracy * weights.accuracy)
                / total
                * 100.0
        } else {
            0.0
        };
        let overall = (overall * 10.0).round() / 10.0;

        ValidationScore {
            coverage,
            completeness,
            clarity,
            accuracy,
            overall,
            passed: overall >= self.config.pass_threshold,
            word_count,
            missing_sections,
            missing_fields,
        }
    }
}

/// Nothing required counts as fully met
fn ratio(found: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        found as f64 / total as f64
    }
}

/// A section is present when a heading names it. Text without any markdown
/// headings is searched in full.
fn has_section(text: &str, section: &str) -> bool {
    let needle = section.to_lowercase();
    let headings: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('#') || (line.starts_with("**") && line.ends_with("**")))
        .map(|line| line.trim_matches(|c| c == '#' || c == '*').trim().to_lowercase())
        .collect();

    if headings.is_empty() {
        text.to_lowercase().contains(&needle)
    } else {
        headings.iter().any(|h| h.contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoreWeights;
    use crate::knowledge::{MandatoryField, RubricEntry, StaticKnowledgeBase};

    fn spec(frameworks: &[&str]) -> DocumentSpec {
        DocumentSpec {
            id: "policy".to_string(),
            title: "Privacy Policy".to_string(),
            description: String::new(),
            document_type: "privacy_policy".to_string(),
            format_hints: Vec::new(),
            dependencies: Vec::new(),
            frameworks: frameworks
                .iter()
                .filter_map(|f| Framework::normalize(f, &Default::default()))
                .collect(),
            required: false,
            target_audience: "general".to_string(),
            position: 0,
        }
    }

    fn config() -> ValidationConfig {
        ValidationConfig {
            pass_threshold: 70.0,
            weights: ScoreWeights::default(),
            default_rubric: Rubric {
                required_sections: vec!["Scope".to_string()],
                min_words: 10,
                mandatory_fields: Vec::new(),
                extraction_rules: Vec::new(),
            },
        }
    }

    fn knowledge() -> StaticKnowledgeBase {
        StaticKnowledgeBase::new(vec![RubricEntry {
            framework: "gdpr".to_string(),
            document_type: "privacy_policy".to_string(),
            rubric: Rubric {
                required_sections: vec![
                    "Data Controller".to_string(),
                    "Your Rights".to_string(),
                ],
                min_words: 20,
                mandatory_fields: vec![MandatoryField {
                    name: "contact_information".to_string(),
                    pattern: r"[\w.+-]+@[\w-]+\.[\w.]+".to_string(),
                }],
                extraction_rules: Vec::new(),
            },
        }])
    }

    #[test]
    fn test_complete_document_passes() {
        let kb = knowledge();
        let config = config();
        let validator = DocumentValidator::new(&kb, &config);
        let text = "# Privacy Policy\n\nThis GDPR notice explains how we process data.\n\n\
                    ## Data Controller\n\nAcme Ltd is the controller, reach us at privacy@acme.com.\n\n\
                    ## Your Rights\n\nYou may request access, rectification and erasure at any time.";

        let score = validator.validate(&spec(&["gdpr"]), &[], text).unwrap();

        assert_eq!(score.coverage, 1.0);
        assert_eq!(score.completeness, 1.0);
        assert_eq!(score.clarity, 1.0);
        assert_eq!(score.accuracy, 1.0);
        assert_eq!(score.overall, 100.0);
        assert!(score.passed);
    }

    #[test]
    fn test_missing_sections_and_fields_reported() {
        let kb = knowledge();
        let config = config();
        let validator = DocumentValidator::new(&kb, &config);
        let text = "# Privacy Policy\n\n## Data Controller\n\nShort.";

        let score = validator.validate(&spec(&["gdpr"]), &[], text).unwrap();

        assert_eq!(score.missing_sections, vec!["Your Rights".to_string()]);
        assert_eq!(score.missing_fields, vec!["contact_information".to_string()]);
        assert_eq!(score.coverage, 0.5);
        assert_eq!(score.accuracy, 0.0);
        assert!(!score.passed);
    }

    #[test]
    fn test_default_rubric_when_knowledge_is_silent() {
        let kb = StaticKnowledgeBase::default();
        let config = config();
        let validator = DocumentValidator::new(&kb, &config);
        let text = "Scope: this policy covers every customer record we hold in the EU.";

        let score = validator.validate(&spec(&[]), &[], text).unwrap();

        assert_eq!(score.coverage, 1.0);
        // No frameworks to name
        assert_eq!(score.accuracy, 1.0);
        assert!(score.passed);
    }

    #[test]
    fn test_invalid_field_pattern_is_unavailable() {
        let kb = StaticKnowledgeBase::default();
        let mut config = config();
        config.default_rubric.mandatory_fields.push(MandatoryField {
            name: "broken".to_string(),
            pattern: "([".to_string(),
        });
        let validator = DocumentValidator::new(&kb, &config);

        let err = validator.validate(&spec(&[]), &[], "text").unwrap_err();
        assert!(matches!(err, KnowledgeError::InvalidPattern { .. }));
    }

    #[test]
    fn test_sections_match_headings_only_when_present() {
        assert!(has_section("## Your Rights\nbody", "your rights"));
        assert!(!has_section("## Intro\nyour rights are listed below", "Your Rights"));
        assert!(has_section("plain text mentioning your rights", "Your Rights"));
        assert!(has_section("**Retention**\nSeven years.", "Retention"));
    }

    #[test]
    fn test_outcome_serialization_tag() {
        let json = serde_json::to_value(ValidationOutcome::Unavailable {
            reason: "down".to_string(),
        })
        .unwrap();
        assert_eq!(json["state"], "validation_unavailable");
    }
}
