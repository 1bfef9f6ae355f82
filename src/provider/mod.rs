mod command;
mod prompt;

pub use command::CommandGenerator;
pub use prompt::build_prompt;

use crate::brief::{Framework, ProjectContext};
use crate::error::GenerationError;
use crate::planner::DocumentSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Generated document content. Opaque to the scheduler; validators read `text`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ContentBlob {
    pub text: String,

    /// Anything else the generator returned (structured sections, usage, ...)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl ContentBlob {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Content of an already-generated dependency, handed to the generator
#[derive(Debug, Clone)]
pub struct DependencyContent {
    pub id: String,
    pub title: String,
    pub content: ContentBlob,
}

/// Everything a generator sees besides the [`DocumentSpec`] itself
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    pub project_id: String,
    pub frameworks: Vec<Framework>,
    pub project: ProjectContext,
    pub dependencies: Vec<DependencyContent>,
    /// 1-based attempt number
    pub attempt: u32,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(
        &self,
        spec: &DocumentSpec,
        context: &GenerationContext,
    ) -> Result<ContentBlob, GenerationError>;
}
