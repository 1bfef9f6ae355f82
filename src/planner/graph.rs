use std::collections::{BTreeSet, HashMap};

use crate::error::InvalidBriefError;

use super::types::DocumentSpec;

/// Kahn's algorithm over the dependency edges.
///
/// Ties are broken by blueprint position so the order is deterministic.
/// Returns the specs' indices in topological order, or the ids left on a
/// cycle.
pub fn topological_order(specs: &[DocumentSpec]) -> Result<Vec<usize>, InvalidBriefError> {
    let index: HashMap<&str, usize> = specs
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; specs.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); specs.len()];

    for (i, spec) in specs.iter().enumerate() {
        for dep in spec.dependency_ids() {
            let Some(&d) = index.get(dep) else {
                return Err(InvalidBriefError::UnknownDependency {
                    document: spec.id.clone(),
                    dependency: dep.to_string(),
                });
            };
            in_degree[i] += 1;
            dependents[d].push(i);
        }
    }

    // (position, index) so the earliest blueprint entry is released first
    let mut ready: BTreeSet<(usize, usize)> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &deg)| deg == 0)
        .map(|(i, _)| (specs[i].position, i))
        .collect();

    let mut order = Vec::with_capacity(specs.len());
    while let Some(next) = ready.pop_first() {
        let (_, i) = next;
        order.push(i);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert((specs[dependent].position, dependent));
            }
        }
    }

    if order.len() != specs.len() {
        let mut stuck: Vec<&DocumentSpec> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg > 0)
            .map(|(i, _)| &specs[i])
            .collect();
        stuck.sort_by_key(|s| s.position);
        return Err(InvalidBriefError::Cycle(
            stuck.into_iter().map(|s| s.id.clone()).collect(),
        ));
    }

    Ok(order)
}
