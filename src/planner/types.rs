//! Planned documents and the dependency graph between them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::brief::{CanonicalFacts, Framework, ProjectContext, SuccessCriterion};

/// One document to generate, fixed at planning time
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DocumentSpec {
    /// Unique within the plan
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Open type tag, e.g. "privacy_policy"
    pub document_type: String,

    #[serde(default)]
    pub format_hints: Vec<String>,

    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    #[serde(default)]
    pub frameworks: Vec<Framework>,

    #[serde(default)]
    pub required: bool,

    pub target_audience: String,

    /// Position in the original blueprint
    pub position: usize,
}

impl DocumentSpec {
    pub fn dependency_ids(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|d| d.id.as_str())
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Dependency {
    pub id: String,

    /// An optional dependency's failure does not skip the dependent
    #[serde(default)]
    pub optional: bool,

    pub origin: DependencyOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyOrigin {
    Explicit,
    Inferred,
}

impl std::fmt::Display for DependencyOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyOrigin::Explicit => write!(f, "explicit"),
            DependencyOrigin::Inferred => write!(f, "inferred"),
        }
    }
}

/// The validated, acyclic plan for a project
#[derive(Debug, Clone, Serialize)]
pub struct DocumentPlan {
    pub project_id: String,

    /// Normalized project-level frameworks
    pub frameworks: Vec<Framework>,

    /// Used by delivery for file naming
    pub primary_framework: String,

    /// Specs in topological order (dependencies first)
    pub specs: Vec<DocumentSpec>,

    pub success_criteria: Vec<SuccessCriterion>,

    pub canonical_facts: CanonicalFacts,

    pub context: ProjectContext,

    #[serde(skip)]
    pub(crate) index: HashMap<String, usize>,
}

impl DocumentPlan {
    pub fn spec(&self, id: &str) -> Option<&DocumentSpec> {
        self.index.get(id).map(|&i| &self.specs[i])
    }

    /// Position of `id` in [`DocumentPlan::specs`]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Specs that declare a direct dependency on `id`
    pub fn dependents<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a DocumentSpec> + 'a {
        self.specs.iter().filter(move |s| s.depends_on(id))
    }

    /// Specs in blueprint order
    pub fn in_blueprint_order(&self) -> Vec<&DocumentSpec> {
        let mut specs: Vec<&DocumentSpec> = self.specs.iter().collect();
        specs.sort_by_key(|s| s.position);
        specs
    }
}
