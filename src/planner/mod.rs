//! Project planner: brief → acyclic plan of document specs
//!
//! 1. Normalize frameworks (declared, else detected from text and inferred
//!    from jurisdiction/industry)
//! 2. Turn each blueprint item into a [`DocumentSpec`] (ids, type tags,
//!    audience, explicit dependencies)
//! 3. Merge in dependencies inferred from document-type rules
//! 4. Topologically sort; any structural problem is an [`InvalidBriefError`]

mod graph;
mod rules;
mod types;

pub use graph::topological_order;
pub use rules::{classify, document_type, infer_dependencies, mentions, text_mentions};
pub use types::{Dependency, DependencyOrigin, DocumentPlan, DocumentSpec};

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::brief::{detect_frameworks, infer_frameworks, normalize_all, Framework, ProjectBrief};
use crate::config::PlannerConfig;
use crate::error::InvalidBriefError;

/// Build the document plan for a brief
pub fn plan_project(
    brief: &ProjectBrief,
    config: &PlannerConfig,
) -> Result<DocumentPlan, InvalidBriefError> {
    if brief.blueprint.is_empty() {
        return Err(InvalidBriefError::EmptyBlueprint);
    }

    let frameworks = resolve_frameworks(brief, config);
    let primary_framework = frameworks
        .first()
        .map(|f| f.as_str().to_string())
        .unwrap_or_else(|| "compliance".to_string());

    let mut specs = Vec::with_capacity(brief.blueprint.len());
    let mut seen: HashSet<String> = HashSet::new();

    for (position, item) in brief.blueprint.iter().enumerate() {
        let id = item
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("doc_{:03}", position + 1));

        if !seen.insert(id.clone()) {
            return Err(InvalidBriefError::DuplicateId(id));
        }

        let mut dependencies: Vec<Dependency> = Vec::new();
        for dep in &item.depends_on {
            let dep_id = dep.id().trim().to_string();
            if dep_id == id {
                return Err(InvalidBriefError::Cycle(vec![id]));
            }
            if dependencies.iter().any(|d| d.id == dep_id) {
                continue;
            }
            dependencies.push(Dependency {
                id: dep_id,
                optional: dep.optional(),
                origin: DependencyOrigin::Explicit,
            });
        }

        let item_frameworks = normalize_all(&item.frameworks, &config.framework_aliases);

        specs.push(DocumentSpec {
            document_type: document_type(
                item.document_type.as_deref(),
                &item.title,
                &config.document_types,
                &config.default_document_type,
            ),
            target_audience: classify(
                &item.description,
                &config.audiences,
                &config.default_audience,
            ),
            id,
            title: item.title.clone(),
            description: item.description.clone(),
            format_hints: item.format.clone(),
            dependencies,
            frameworks: if item_frameworks.is_empty() {
                frameworks.clone()
            } else {
                item_frameworks
            },
            required: item.required,
            position,
        });
    }

    // Unknown explicit ids are reported before inference adds anything
    for spec in &specs {
        for dep in spec.dependency_ids() {
            if !seen.contains(dep) {
                return Err(InvalidBriefError::UnknownDependency {
                    document: spec.id.clone(),
                    dependency: dep.to_string(),
                });
            }
        }
    }

    // Only the brief's own edges can make it cyclic
    topological_order(&specs)?;
    let inferred = infer_dependencies(&mut specs, &config.dependency_rules);
    let order = topological_order(&specs)?;

    let mut slots: Vec<Option<DocumentSpec>> = specs.into_iter().map(Some).collect();
    let sorted: Vec<DocumentSpec> = order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect();
    let index: HashMap<String, usize> = sorted
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.clone(), i))
        .collect();

    let project_id = brief
        .project_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("project-{}", uuid::Uuid::new_v4()));

    info!(
        "Planned {} documents for {} ({} inferred dependencies, frameworks: {})",
        sorted.len(),
        project_id,
        inferred,
        frameworks
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    for spec in &sorted {
        debug!(
            "  {} [{}] <- {:?}",
            spec.id,
            spec.document_type,
            spec.dependency_ids().collect::<Vec<_>>()
        );
    }

    Ok(DocumentPlan {
        project_id,
        frameworks,
        primary_framework,
        specs: sorted,
        success_criteria: brief.success_criteria.clone(),
        canonical_facts: brief.canonical_facts.clone(),
        context: brief.context.clone(),
        index,
    })
}

/// Declared frameworks, or detected ∪ inferred ones when none are declared
fn resolve_frameworks(brief: &ProjectBrief, config: &PlannerConfig) -> Vec<Framework> {
    let declared = normalize_all(&brief.frameworks, &config.framework_aliases);
    if !declared.is_empty() {
        return declared;
    }

    let mut text = brief.description.clone();
    for item in &brief.blueprint {
        text.push('\n');
        text.push_str(&item.title);
        text.push(' ');
        text.push_str(&item.description);
    }

    let mut frameworks = detect_frameworks(
        &text,
        &config.framework_keywords,
        &config.framework_aliases,
    );
    for fw in infer_frameworks(
        &brief.context.jurisdictions,
        brief.context.industry.as_deref(),
        &config.jurisdiction_rules,
        &config.industry_rules,
        &config.framework_aliases,
    ) {
        if !frameworks.contains(&fw) {
            frameworks.push(fw);
        }
    }

    if !frameworks.is_empty() {
        debug!(
            "No frameworks declared; using detected/inferred: {:?}",
            frameworks
        );
    }
    frameworks
}
