//! Post-generation validators. All run single-threaded after every
//! document has reached a terminal status, and none of them can fail the
//! project: faults are recorded on the result or as issues.

mod consistency;
mod coverage;
mod document;
mod facts;

pub use consistency::{sort_issues, ConsistencyIssue, ConsistencyValidator, IssueType, Severity};
pub use coverage::{
    compliance_coverage, CoverageValidator, RequirementGapReport, RequirementItem,
    RequirementKind, RequirementStatus,
};
pub use document::{
    effective_frameworks, resolve_rubric, DocumentValidator, ValidationOutcome, ValidationScore,
};
pub use facts::{
    normalize_email, normalize_entity, retention_days, DocumentFacts, FactExtractor,
    KnowledgeExtractor, RuleExtractor,
};
