//! Canonical fact extraction (legal entity, retention period, contact email)

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

use super::document::{effective_frameworks, resolve_rubric};
use crate::brief::Framework;
use crate::error::ExtractionError;
use crate::knowledge::{ExtractionRule, FactKind, KnowledgeLookup, Rubric};
use crate::planner::DocumentSpec;

/// Facts found in one document, first match per kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentFacts {
    pub values: BTreeMap<FactKind, String>,
}

impl DocumentFacts {
    pub fn get(&self, kind: FactKind) -> Option<&str> {
        self.values.get(&kind).map(String::as_str)
    }

    pub fn insert(&mut self, kind: FactKind, value: impl Into<String>) {
        self.values.entry(kind).or_insert_with(|| value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Pulls canonical facts out of a generated document
pub trait FactExtractor: Send + Sync {
    fn extract(&self, spec: &DocumentSpec, text: &str) -> Result<DocumentFacts, ExtractionError>;
}

/// Applies a fixed list of regex rules; every capture group is joined with a
/// space to form the value
#[derive(Debug, Clone)]
pub struct RuleExtractor {
    rules: Vec<(FactKind, Regex)>,
}

impl RuleExtractor {
    pub fn new(rules: &[ExtractionRule]) -> Result<Self, ExtractionError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|re| (rule.fact, re))
                    .map_err(|e| ExtractionError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn apply(&self, text: &str) -> DocumentFacts {
        let mut facts = DocumentFacts::default();
        for (kind, re) in &self.rules {
            if facts.get(*kind).is_some() {
                continue;
            }
            let Some(caps) = re.captures(text) else {
                continue;
            };
            let value = if caps.len() > 1 {
                caps.iter()
                    .skip(1)
                    .flatten()
                    .map(|m| m.as_str().trim())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                caps[0].trim().to_string()
            };
            if !value.is_empty() {
                facts.insert(*kind, value);
            }
        }
        facts
    }
}

impl FactExtractor for RuleExtractor {
    fn extract(&self, _spec: &DocumentSpec, text: &str) -> Result<DocumentFacts, ExtractionError> {
        Ok(self.apply(text))
    }
}

/// Uses the extraction rules of each document's rubric
pub struct KnowledgeExtractor<'a> {
    knowledge: &'a dyn KnowledgeLookup,
    default: &'a Rubric,
    frameworks: &'a [Framework],
}

impl<'a> KnowledgeExtractor<'a> {
    pub fn new(
        knowledge: &'a dyn KnowledgeLookup,
        default: &'a Rubric,
        frameworks: &'a [Framework],
    ) -> Self {
        Self {
            knowledge,
            default,
            frameworks,
        }
    }
}

impl FactExtractor for KnowledgeExtractor<'_> {
    fn extract(&self, spec: &DocumentSpec, text: &str) -> Result<DocumentFacts, ExtractionError> {
        let frameworks = effective_frameworks(spec, self.frameworks);
        let mut rubric = resolve_rubric(self.knowledge, self.default, spec, frameworks)
            .map_err(|e| ExtractionError::Failed(e.to_string()))?;
        if rubric.extraction_rules.is_empty() {
            rubric.extraction_rules = self.default.extraction_rules.clone();
        }
        Ok(RuleExtractor::new(&rubric.extraction_rules)?.apply(text))
    }
}

/// Lowercased, punctuation-free entity name with common suffixes unified
pub fn normalize_entity(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '&')
        .filter(|part| !part.is_empty())
        .map(|part| match part {
            "limited" => "ltd",
            "incorporated" => "inc",
            "corporation" => "corp",
            "company" => "co",
            "the" => "",
            other => other,
        })
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// "7 years", "seven (7) years", "90 days" → days
pub fn retention_days(raw: &str) -> Option<u32> {
    let re = Regex::new(
        r"(?i)\b(\d+|one|two|three|four|five|six|seven|eight|nine|ten|twelve|an|a)\s*(?:\(\d+\)\s*)?(day|week|month|year)s?\b",
    )
    .ok()?;
    let caps = re.captures(raw)?;
    let amount = match caps[1].to_lowercase().as_str() {
        "one" | "a" | "an" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "twelve" => 12,
        digits => digits.parse::<u32>().ok()?,
    };
    let unit = match caps[2].to_lowercase().as_str() {
        "day" => 1,
        "week" => 7,
        "month" => 30,
        _ => 365,
    };
    Some(amount.saturating_mul(unit))
}

/// Normalized email for comparison
pub fn normalize_email(raw: &str) -> String {
    raw.trim().trim_end_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_extraction_rules;

    fn spec() -> DocumentSpec {
        DocumentSpec {
            id: "policy".to_string(),
            title: "Privacy Policy".to_string(),
            description: String::new(),
            document_type: "privacy_policy".to_string(),
            format_hints: Vec::new(),
            dependencies: Vec::new(),
            frameworks: Vec::new(),
            required: false,
            target_audience: "general".to_string(),
            position: 0,
        }
    }

    #[test]
    fn test_default_rules_extract_facts() {
        let extractor = RuleExtractor::new(&default_extraction_rules()).unwrap();
        let text = "# Privacy Policy\n\nData Controller: Acme Analytics Ltd\n\n\
                    We retain customer records for 7 years after account closure.\n\
                    Contact privacy@acme.example for questions.";

        let facts = extractor.extract(&spec(), text).unwrap();

        assert_eq!(facts.get(FactKind::LegalEntity), Some("Acme Analytics Ltd"));
        assert_eq!(
            facts.get(FactKind::RetentionPeriod).map(retention_days),
            Some(Some(7 * 365))
        );
        assert_eq!(facts.get(FactKind::ContactEmail), Some("privacy@acme.example"));
    }

    #[test]
    fn test_first_rule_wins() {
        let extractor = RuleExtractor::new(&[
            ExtractionRule {
                fact: FactKind::LegalEntity,
                pattern: r"Controller: (\w+)".to_string(),
            },
            ExtractionRule {
                fact: FactKind::LegalEntity,
                pattern: r"(\w+) Inc".to_string(),
            },
        ])
        .unwrap();

        let facts = extractor.apply("Controller: Acme. Also Globex Inc.");
        assert_eq!(facts.get(FactKind::LegalEntity), Some("Acme"));
    }

    #[test]
    fn test_invalid_rule_rejected() {
        let err = RuleExtractor::new(&[ExtractionRule {
            fact: FactKind::ContactEmail,
            pattern: "(".to_string(),
        }])
        .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidPattern { .. }));
    }

    #[test]
    fn test_normalize_entity() {
        assert_eq!(normalize_entity("Acme Ltd."), "acme ltd");
        assert_eq!(normalize_entity("ACME Limited"), "acme ltd");
        assert_eq!(normalize_entity("The Acme Company"), "acme co");
        assert_ne!(normalize_entity("Acme Ltd"), normalize_entity("Acme Inc"));
    }

    #[test]
    fn test_retention_days() {
        assert_eq!(retention_days("7 years"), Some(2555));
        assert_eq!(retention_days("seven years"), Some(2555));
        assert_eq!(retention_days("90 days"), Some(90));
        assert_eq!(retention_days("6 months"), Some(180));
        assert_eq!(retention_days("a week"), Some(7));
        assert_eq!(retention_days("as long as necessary"), None);
    }
}
