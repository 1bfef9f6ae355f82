//! Project briefs: the immutable input to a run
//!
//! A brief may arrive either as a full project brief (with a `blueprint`) or
//! as a legacy single-document request (with a `prompt`); both load into a
//! [`ProjectBrief`].

mod framework;
mod types;

pub use framework::{
    canonical_key, detect_frameworks, infer_frameworks, normalize_all, Framework,
};
pub use types::{
    BlueprintItem, CanonicalFacts, DependencyRef, LegacyRequest, ProjectBrief, ProjectContext,
    SuccessCriterion,
};

use crate::error::BriefError;
use std::path::Path;

impl ProjectBrief {
    /// Load a brief from a YAML or JSON file
    pub fn load(path: &Path) -> Result<Self, BriefError> {
        let content = std::fs::read_to_string(path).map_err(|e| BriefError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parse either brief shape. YAML is a superset of JSON, so both work.
    pub fn parse(content: &str) -> Result<Self, BriefError> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;

        let is_legacy = value
            .as_mapping()
            .map(|m| {
                let has = |key: &str| m.contains_key(serde_yaml::Value::from(key));
                !has("blueprint")
                    && !has("deliverable_blueprint")
                    && (has("prompt") || has("user_prompt"))
            })
            .unwrap_or(false);

        if is_legacy {
            tracing::debug!("Normalizing legacy single-document request");
            let legacy: LegacyRequest = serde_yaml::from_value(value)?;
            Ok(legacy.into_brief())
        } else {
            Ok(serde_yaml::from_value(value)?)
        }
    }
}
