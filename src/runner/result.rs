use serde::{Deserialize, Serialize};

use crate::provider::ContentBlob;
use crate::validate::{ValidationOutcome, ValidationScore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Generating,
    Generated,
    Failed,
    Skipped,
    TimedOut,
}

impl DocumentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DocumentStatus::Generated
                | DocumentStatus::Failed
                | DocumentStatus::Skipped
                | DocumentStatus::TimedOut
        )
    }

    /// Terminal without usable content
    pub fn is_unsuccessful(self) -> bool {
        self.is_terminal() && self != DocumentStatus::Generated
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Pending => write!(f, "pending"),
            DocumentStatus::Generating => write!(f, "generating"),
            DocumentStatus::Generated => write!(f, "generated"),
            DocumentStatus::Failed => write!(f, "failed"),
            DocumentStatus::Skipped => write!(f, "skipped"),
            DocumentStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Outcome record for one document spec
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DocumentResult {
    pub spec_id: String,

    pub status: DocumentStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentBlob>,

    /// Generator calls made, including the successful one
    #[serde(default)]
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    #[serde(default)]
    pub validation: ValidationOutcome,

    #[serde(default)]
    pub duration_ms: u64,
}

impl DocumentResult {
    pub fn pending(spec_id: impl Into<String>) -> Self {
        Self {
            spec_id: spec_id.into(),
            status: DocumentStatus::Pending,
            content: None,
            attempts: 0,
            last_error: None,
            validation: ValidationOutcome::NotValidated,
            duration_ms: 0,
        }
    }

    pub fn score(&self) -> Option<&ValidationScore> {
        match &self.validation {
            ValidationOutcome::Scored(score) => Some(score),
            _ => None,
        }
    }

    /// Generated and passed individual validation
    pub fn is_passing(&self) -> bool {
        self.status == DocumentStatus::Generated && self.score().map(|s| s.passed).unwrap_or(false)
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().map(|c| c.text.as_str())
    }
}
