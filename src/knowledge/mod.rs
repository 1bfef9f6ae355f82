//! Knowledge lookup: (framework, document type) → rubric
//!
//! The orchestrator does not interpret regulation itself. Required sections,
//! length floors, mandatory fields and fact-extraction rules all come from a
//! [`KnowledgeLookup`] supplied by the caller; [`StaticKnowledgeBase`] serves
//! them from the `knowledge.rubrics` table of the config file.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::brief::{canonical_key, Framework};
use crate::config::KnowledgeConfig;
use crate::error::KnowledgeError;

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Rubric {
    /// Section headings that must appear in the document
    #[serde(default)]
    pub required_sections: Vec<String>,

    #[serde(default)]
    pub min_words: usize,

    #[serde(default)]
    pub mandatory_fields: Vec<MandatoryField>,

    #[serde(default)]
    pub extraction_rules: Vec<ExtractionRule>,
}

/// A field that must be present, detected by regex
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct MandatoryField {
    pub name: String,
    pub pattern: String,
}

/// Regex that pulls one canonical fact out of document text.
/// All capture groups are joined with a space to form the fact value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ExtractionRule {
    pub fact: FactKind,
    pub pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    LegalEntity,
    RetentionPeriod,
    ContactEmail,
}

impl std::fmt::Display for FactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactKind::LegalEntity => write!(f, "legal entity"),
            FactKind::RetentionPeriod => write!(f, "retention period"),
            FactKind::ContactEmail => write!(f, "contact email"),
        }
    }
}

/// A rubric bound to a framework and document type (`*` matches any)
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RubricEntry {
    #[serde(default = "wildcard")]
    pub framework: String,

    #[serde(default = "wildcard")]
    pub document_type: String,

    #[serde(flatten)]
    pub rubric: Rubric,
}

fn wildcard() -> String {
    WILDCARD.to_string()
}

impl Rubric {
    /// Fold another rubric into this one: union of sections, fields and
    /// rules, the stricter length floor.
    pub fn merge(&mut self, other: &Rubric) {
        for section in &other.required_sections {
            if !self
                .required_sections
                .iter()
                .any(|s| s.eq_ignore_ascii_case(section))
            {
                self.required_sections.push(section.clone());
            }
        }
        self.min_words = self.min_words.max(other.min_words);
        for field in &other.mandatory_fields {
            if !self.mandatory_fields.iter().any(|f| f.name == field.name) {
                self.mandatory_fields.push(field.clone());
            }
        }
        for rule in &other.extraction_rules {
            if !self.extraction_rules.contains(rule) {
                self.extraction_rules.push(rule.clone());
            }
        }
    }

    /// Compile mandatory field patterns
    pub fn compile_fields(&self) -> Result<Vec<(String, Regex)>, KnowledgeError> {
        self.mandatory_fields
            .iter()
            .map(|field| {
                Regex::new(&field.pattern)
                    .map(|re| (field.name.clone(), re))
                    .map_err(|e| KnowledgeError::InvalidPattern {
                        field: field.name.clone(),
                        pattern: field.pattern.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect()
    }
}

pub trait KnowledgeLookup: Send + Sync {
    /// Rubric for a framework/document-type pair, `None` when nothing is known
    fn rubric(
        &self,
        framework: &Framework,
        document_type: &str,
    ) -> Result<Option<Rubric>, KnowledgeError>;
}

/// Rubrics served from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticKnowledgeBase {
    entries: Vec<RubricEntry>,
}

impl StaticKnowledgeBase {
    pub fn new(entries: Vec<RubricEntry>) -> Self {
        Self { entries }
    }

    pub fn from_config(config: &KnowledgeConfig) -> Self {
        Self::new(config.rubrics.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn matches_key(pattern: &str, value: &str) -> bool {
    pattern == WILDCARD || canonical_key(pattern) == canonical_key(value)
}

impl KnowledgeLookup for StaticKnowledgeBase {
    fn rubric(
        &self,
        framework: &Framework,
        document_type: &str,
    ) -> Result<Option<Rubric>, KnowledgeError> {
        let mut merged: Option<Rubric> = None;
        for entry in self.entries.iter().filter(|e| {
            matches_key(&e.framework, framework.as_str())
                && matches_key(&e.document_type, document_type)
        }) {
            match merged.as_mut() {
                Some(rubric) => rubric.merge(&entry.rubric),
                None => merged = Some(entry.rubric.clone()),
            }
        }
        Ok(merged)
    }
}
