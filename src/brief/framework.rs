use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::{InferenceRule, KeywordRule};

/// A regulatory framework identifier.
///
/// Open-ended: any non-empty name is accepted. Names are case-folded and
/// separator-normalized, then looked up in an alias table; names with no
/// alias pass through unchanged.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema,
)]
#[serde(transparent)]
pub struct Framework(String);

impl Framework {
    pub fn normalize(raw: &str, aliases: &HashMap<String, String>) -> Option<Self> {
        let key = canonical_key(raw);
        if key.is_empty() {
            return None;
        }
        // An alias spelled exactly as the key wins, then the lowest spelling,
        // so colliding aliases resolve the same way on every run
        let resolved = match aliases.get(&key) {
            Some(target) => canonical_key(target),
            None => aliases
                .iter()
                .filter(|(alias, _)| canonical_key(alias) == key)
                .min_by(|a, b| a.0.cmp(b.0))
                .map(|(_, target)| canonical_key(target))
                .unwrap_or(key),
        };
        Some(Self(resolved))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Spellings under which this framework may appear in prose
    pub fn search_terms(&self) -> Vec<String> {
        let mut terms = vec![self.0.clone()];
        if self.0.contains('_') {
            terms.push(self.0.replace('_', " "));
            terms.push(self.0.replace('_', "-"));
            terms.push(self.0.replace('_', ""));
        }
        terms
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowercase, trim, and collapse whitespace/hyphens into underscores
pub fn canonical_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalize a list of raw names, dropping empties and duplicates (first wins)
pub fn normalize_all<'a, I>(raw: I, aliases: &HashMap<String, String>) -> Vec<Framework>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut out: Vec<Framework> = Vec::new();
    for name in raw {
        if let Some(fw) = Framework::normalize(name, aliases) {
            if !out.contains(&fw) {
                out.push(fw);
            }
        }
    }
    out
}

/// Find frameworks mentioned in free text by keyword
pub fn detect_frameworks(
    text: &str,
    rules: &[KeywordRule],
    aliases: &HashMap<String, String>,
) -> Vec<Framework> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let lower = text.to_lowercase();
    let hits: Vec<String> = rules
        .iter()
        .filter(|rule| rule.keywords.iter().any(|k| lower.contains(&k.to_lowercase())))
        .map(|rule| rule.value.clone())
        .collect();
    normalize_all(&hits, aliases)
}

/// Infer frameworks from jurisdictions (exact match) and industry (substring match)
pub fn infer_frameworks(
    jurisdictions: &[String],
    industry: Option<&str>,
    jurisdiction_rules: &[InferenceRule],
    industry_rules: &[InferenceRule],
    aliases: &HashMap<String, String>,
) -> Vec<Framework> {
    let mut hits: Vec<String> = Vec::new();

    let regions: Vec<String> = jurisdictions.iter().map(|j| j.trim().to_lowercase()).collect();
    for rule in jurisdiction_rules {
        if rule
            .keywords
            .iter()
            .any(|k| regions.contains(&k.to_lowercase()))
        {
            hits.extend(rule.frameworks.iter().cloned());
        }
    }

    if let Some(industry) = industry {
        let industry = industry.to_lowercase();
        for rule in industry_rules {
            if rule
                .keywords
                .iter()
                .any(|k| industry.contains(&k.to_lowercase()))
            {
                hits.extend(rule.frameworks.iter().cloned());
            }
        }
    }

    normalize_all(&hits, aliases)
}
