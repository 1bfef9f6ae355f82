//! Classification and dependency-inference rules

use crate::brief::canonical_key;
use crate::config::{DependencyRule, KeywordRule, RuleScope};

use super::types::{Dependency, DependencyOrigin, DocumentSpec};

/// First rule whose keyword appears in `text`, else the fallback
pub fn classify(text: &str, rules: &[KeywordRule], fallback: &str) -> String {
    let lower = text.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lower.contains(&k.to_lowercase())))
        .map(|rule| rule.value.clone())
        .unwrap_or_else(|| fallback.to_string())
}

/// Document type for a blueprint item: explicit tag, else by title keywords
pub fn document_type(
    explicit: Option<&str>,
    title: &str,
    rules: &[KeywordRule],
    fallback: &str,
) -> String {
    match explicit.map(canonical_key).filter(|t| !t.is_empty()) {
        Some(tag) => tag,
        None => canonical_key(&classify(title, rules, fallback)),
    }
}

/// Whether `dependent`'s title or description mentions `target`
pub fn mentions(dependent: &DocumentSpec, target: &DocumentSpec) -> bool {
    text_mentions(&format!("{} {}", dependent.title, dependent.description), target)
}

/// Whether `text` names `target` by title, or by an id of 3+ characters
pub fn text_mentions(text: &str, target: &DocumentSpec) -> bool {
    let haystack = text.to_lowercase();
    let title = target.title.to_lowercase();
    let id = target.id.to_lowercase();
    (!title.is_empty() && haystack.contains(&title)) || (id.len() >= 3 && haystack.contains(&id))
}

/// Add inferred edges to `specs` according to `rules`.
///
/// An edge is never inferred where it already exists, or where the target
/// already depends on the dependent, directly or transitively. Inference
/// never turns an acyclic explicit graph into a cyclic one.
pub fn infer_dependencies(specs: &mut [DocumentSpec], rules: &[DependencyRule]) -> usize {
    let mut candidates: Vec<(usize, usize, Dependency)> = Vec::new();

    for (i, dependent) in specs.iter().enumerate() {
        for rule in rules
            .iter()
            .filter(|r| canonical_key(&r.document_type) == dependent.document_type)
        {
            let target_type = canonical_key(&rule.depends_on);
            for (t, target) in specs
                .iter()
                .enumerate()
                .filter(|(_, t)| t.id != dependent.id && t.document_type == target_type)
            {
                if rule.scope == RuleScope::Referenced && !mentions(dependent, target) {
                    continue;
                }
                if dependent.depends_on(&target.id) {
                    continue;
                }
                let duplicate = candidates
                    .iter()
                    .any(|(idx, _, d)| *idx == i && d.id == target.id);
                if !duplicate {
                    candidates.push((
                        i,
                        t,
                        Dependency {
                            id: target.id.clone(),
                            optional: rule.optional,
                            origin: DependencyOrigin::Inferred,
                        },
                    ));
                }
            }
        }
    }

    let mut added = 0;
    for (idx, target, dep) in candidates {
        if reaches(specs, target, &specs[idx].id) {
            tracing::debug!(
                "Dropped inferred dependency {} -> {}: would close a cycle",
                specs[idx].id,
                dep.id
            );
            continue;
        }
        tracing::debug!("Inferred dependency {} -> {}", specs[idx].id, dep.id);
        specs[idx].dependencies.push(dep);
        added += 1;
    }
    added
}

/// Whether `specs[from]` depends on `id` through any chain of edges
fn reaches(specs: &[DocumentSpec], from: usize, id: &str) -> bool {
    let mut visited = vec![false; specs.len()];
    let mut stack = vec![from];
    while let Some(current) = stack.pop() {
        if std::mem::replace(&mut visited[current], true) {
            continue;
        }
        for dep in specs[current].dependency_ids() {
            if dep == id {
                return true;
            }
            if let Some(next) = specs.iter().position(|s| s.id == dep) {
                stack.push(next);
            }
        }
    }
    false
}
