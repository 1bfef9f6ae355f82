use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::defaults::*;
use crate::knowledge::{Rubric, RubricEntry};

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Maximum documents generating at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_launch_delay_ms")]
    pub launch_delay_ms: u64,

    /// Whole-run deadline; documents still pending when it fires are timed out
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,

    /// Deadline for a single generator attempt
    #[serde(default = "default_generation_timeout_sec")]
    pub generation_timeout_sec: u64,

    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub risk: RiskConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RetryConfig {
    /// Total attempts per document, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

/// External command that turns a prompt into document prose
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_binary")]
    pub binary: PathBuf,

    /// Arguments placed before the prompt
    #[serde(default = "default_generator_args")]
    pub args: Vec<String>,

    /// Send the prompt on stdin instead of as the last argument
    #[serde(default)]
    pub prompt_via_stdin: bool,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            binary: default_generator_binary(),
            args: default_generator_args(),
            prompt_via_stdin: false,
            working_dir: None,
        }
    }
}

/// Maps a value to the keywords that select it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct KeywordRule {
    pub value: String,
    pub keywords: Vec<String>,
}

/// Maps matching keywords to one or more frameworks
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct InferenceRule {
    pub keywords: Vec<String>,
    pub frameworks: Vec<String>,
}

/// "Documents of `document_type` depend on documents of `depends_on`"
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct DependencyRule {
    pub document_type: String,

    pub depends_on: String,

    #[serde(default)]
    pub scope: RuleScope,

    /// Inferred edge does not cascade failures
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Every document of the target type in the blueprint
    #[default]
    All,
    /// Only target documents whose id or title the dependent's title/description mentions
    Referenced,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct PlannerConfig {
    #[serde(default = "default_framework_aliases")]
    pub framework_aliases: HashMap<String, String>,

    #[serde(default = "default_framework_keywords")]
    pub framework_keywords: Vec<KeywordRule>,

    #[serde(default = "default_jurisdiction_rules")]
    pub jurisdiction_rules: Vec<InferenceRule>,

    #[serde(default = "default_industry_rules")]
    pub industry_rules: Vec<InferenceRule>,

    /// Ordered title keyword table used when an item has no type tag
    #[serde(default = "default_document_types")]
    pub document_types: Vec<KeywordRule>,

    #[serde(default = "default_document_type")]
    pub default_document_type: String,

    #[serde(default = "default_audiences")]
    pub audiences: Vec<KeywordRule>,

    #[serde(default = "default_audience")]
    pub default_audience: String,

    #[serde(default = "default_dependency_rules")]
    pub dependency_rules: Vec<DependencyRule>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            framework_aliases: default_framework_aliases(),
            framework_keywords: default_framework_keywords(),
            jurisdiction_rules: default_jurisdiction_rules(),
            industry_rules: default_industry_rules(),
            document_types: default_document_types(),
            default_document_type: default_document_type(),
            audiences: default_audiences(),
            default_audience: default_audience(),
            dependency_rules: default_dependency_rules(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ValidationConfig {
    /// Overall score (0-100) at or above which a document passes
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,

    #[serde(default)]
    pub weights: ScoreWeights,

    /// Used when the knowledge lookup has nothing for a document
    #[serde(default = "default_rubric")]
    pub default_rubric: Rubric,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            pass_threshold: default_pass_threshold(),
            weights: ScoreWeights::default(),
            default_rubric: default_rubric(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ScoreWeights {
    #[serde(default = "default_weight_coverage")]
    pub coverage: f64,

    #[serde(default = "default_weight_completeness")]
    pub completeness: f64,

    #[serde(default = "default_weight_clarity")]
    pub clarity: f64,

    #[serde(default = "default_weight_accuracy")]
    pub accuracy: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            coverage: default_weight_coverage(),
            completeness: default_weight_completeness(),
            clarity: default_weight_clarity(),
            accuracy: default_weight_accuracy(),
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.coverage + self.completeness + self.clarity + self.accuracy
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct KnowledgeConfig {
    #[serde(default)]
    pub rubrics: Vec<RubricEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct RiskConfig {
    /// Coverage below this is at least "critical"
    #[serde(default = "default_critical_coverage_below")]
    pub critical_coverage_below: f64,

    /// Coverage below this is at least "high"
    #[serde(default = "default_high_coverage_below")]
    pub high_coverage_below: f64,

    /// Coverage below this is at least "medium"
    #[serde(default = "default_medium_coverage_below")]
    pub medium_coverage_below: f64,

    /// This many critical issues make the project "critical"
    #[serde(default = "default_critical_issue_limit")]
    pub critical_issue_limit: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            critical_coverage_below: default_critical_coverage_below(),
            high_coverage_below: default_high_coverage_below(),
            medium_coverage_below: default_medium_coverage_below(),
            critical_issue_limit: default_critical_issue_limit(),
        }
    }
}
