use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocpackError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Brief error: {0}")]
    Brief(#[from] BriefError),

    #[error("Invalid brief: {0}")]
    InvalidBrief(#[from] InvalidBriefError),

    #[error("Consolidation error: {0}")]
    Consolidation(#[from] ConsolidationError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Problems reading a brief from disk, before any planning happens
#[derive(Error, Debug)]
pub enum BriefError {
    #[error("Failed to read brief file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse brief: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Structural problems found while planning. Always fatal to the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidBriefError {
    #[error("Blueprint contains no documents")]
    EmptyBlueprint,

    #[error("Duplicate document id '{0}'")]
    DuplicateId(String),

    #[error("Document '{document}' depends on unknown document '{dependency}'")]
    UnknownDependency { document: String, dependency: String },

    #[error("Dependency cycle between documents: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Generator exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Generator returned empty content")]
    EmptyOutput,

    #[error("Generator rejected request: {0}")]
    Rejected(String),

    #[error("Generation cancelled")]
    Cancelled,
}

impl From<std::io::Error> for GenerationError {
    fn from(e: std::io::Error) -> Self {
        GenerationError::Io(e.to_string())
    }
}

#[derive(Error, Debug, Clone)]
pub enum KnowledgeError {
    #[error("Knowledge source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid pattern '{pattern}' for {field}: {reason}")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },
}

#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    #[error("Invalid extraction pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Extraction failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsolidationError {
    #[error("Documents not in a terminal status: {}", .0.join(", "))]
    NonTerminal(Vec<String>),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Failed to write report: {0}")]
    WriteReport(std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
