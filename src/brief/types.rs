//! Input types: the project brief and the legacy single-document request

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// A structured compliance-project brief
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ProjectBrief {
    /// Stable project identifier (a fresh one is generated when absent)
    #[serde(default)]
    pub project_id: Option<String>,

    /// Free-text description of the project
    #[serde(default, alias = "user_prompt")]
    pub description: String,

    /// Target regulatory frameworks, any spelling
    #[serde(default)]
    pub frameworks: Vec<String>,

    /// Ordered list of documents to produce
    #[serde(default, alias = "deliverable_blueprint")]
    pub blueprint: Vec<BlueprintItem>,

    #[serde(default)]
    pub success_criteria: Vec<SuccessCriterion>,

    #[serde(default)]
    pub context: ProjectContext,

    /// Values every document must agree on, when the brief pins them
    #[serde(default)]
    pub canonical_facts: CanonicalFacts,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ProjectContext {
    #[serde(default, alias = "industry_sector")]
    pub industry: Option<String>,

    #[serde(
        default,
        alias = "jurisdiction",
        alias = "geographic_scope",
        deserialize_with = "one_or_many"
    )]
    pub jurisdictions: Vec<String>,

    #[serde(default)]
    pub organization_size: Option<String>,
}

/// One document in the deliverable blueprint
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct BlueprintItem {
    #[serde(default)]
    pub id: Option<String>,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Document type tag; classified from the title when absent
    #[serde(default, alias = "type")]
    pub document_type: Option<String>,

    /// Format hints passed through to the generator and renderer
    #[serde(default, alias = "formats", deserialize_with = "one_or_many")]
    pub format: Vec<String>,

    #[serde(default, alias = "dependencies")]
    pub depends_on: Vec<DependencyRef>,

    /// Frameworks specific to this document (defaults to the project's)
    #[serde(default)]
    pub frameworks: Vec<String>,

    /// A required document that is not generated fails the whole project
    #[serde(default)]
    pub required: bool,
}

/// An explicit dependency, either a bare id or `{ id, optional }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum DependencyRef {
    Id(String),
    Detailed {
        id: String,
        #[serde(default)]
        optional: bool,
    },
}

impl DependencyRef {
    pub fn id(&self) -> &str {
        match self {
            DependencyRef::Id(id) => id,
            DependencyRef::Detailed { id, .. } => id,
        }
    }

    pub fn optional(&self) -> bool {
        matches!(self, DependencyRef::Detailed { optional: true, .. })
    }
}

/// A success criterion, either plain text or tied to specific documents
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum SuccessCriterion {
    Text(String),
    Detailed {
        #[serde(default)]
        id: Option<String>,
        description: String,
        #[serde(default)]
        documents: Vec<String>,
    },
}

impl SuccessCriterion {
    pub fn description(&self) -> &str {
        match self {
            SuccessCriterion::Text(text) => text,
            SuccessCriterion::Detailed { description, .. } => description,
        }
    }

    pub fn documents(&self) -> &[String] {
        match self {
            SuccessCriterion::Text(_) => &[],
            SuccessCriterion::Detailed { documents, .. } => documents,
        }
    }

    pub fn id(&self, index: usize) -> String {
        match self {
            SuccessCriterion::Detailed { id: Some(id), .. } => id.clone(),
            _ => format!("criterion_{:03}", index + 1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct CanonicalFacts {
    #[serde(default)]
    pub legal_entity: Option<String>,

    /// e.g. "7 years", "90 days"
    #[serde(default)]
    pub retention_period: Option<String>,

    #[serde(default)]
    pub contact_email: Option<String>,
}

/// Older request shape asking for a single document
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct LegacyRequest {
    #[serde(alias = "user_prompt")]
    pub prompt: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub document_type: Option<String>,

    #[serde(default, alias = "framework", deserialize_with = "one_or_many")]
    pub frameworks: Vec<String>,

    #[serde(default, alias = "industry_sector")]
    pub industry: Option<String>,

    #[serde(
        default,
        alias = "jurisdictions",
        alias = "geographic_scope",
        deserialize_with = "one_or_many"
    )]
    pub jurisdiction: Vec<String>,

    #[serde(default, alias = "format", deserialize_with = "one_or_many")]
    pub formats: Vec<String>,
}

impl LegacyRequest {
    /// Wrap the request as a one-document brief
    pub fn into_brief(self) -> ProjectBrief {
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| derive_title(&self.prompt, self.document_type.as_deref()));

        ProjectBrief {
            project_id: None,
            description: self.prompt.clone(),
            frameworks: self.frameworks,
            blueprint: vec![BlueprintItem {
                id: Some("doc_001".to_string()),
                title,
                description: self.prompt,
                document_type: self.document_type,
                format: self.formats,
                depends_on: Vec::new(),
                frameworks: Vec::new(),
                required: true,
            }],
            success_criteria: Vec::new(),
            context: ProjectContext {
                industry: self.industry,
                jurisdictions: self.jurisdiction,
                organization_size: None,
            },
            canonical_facts: CanonicalFacts::default(),
        }
    }
}

fn derive_title(prompt: &str, document_type: Option<&str>) -> String {
    if let Some(doc_type) = document_type {
        return doc_type
            .split(['_', '-', ' '])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
    }
    let first_line = prompt.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        "Compliance Document".to_string()
    } else {
        first_line.chars().take(80).collect()
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(()) => Vec::new(),
    })
}
