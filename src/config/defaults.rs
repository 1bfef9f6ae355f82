use std::collections::HashMap;
use std::path::PathBuf;

use super::{DependencyRule, InferenceRule, KeywordRule, RuleScope};
use crate::knowledge::{ExtractionRule, FactKind, MandatoryField, Rubric};

pub fn default_version() -> u32 {
    1
}

pub fn default_concurrency() -> usize {
    4
}

pub fn default_launch_delay_ms() -> u64 {
    0
}

pub fn default_timeout_sec() -> u64 {
    1800
}

pub fn default_generation_timeout_sec() -> u64 {
    300
}

pub fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

pub fn default_max_attempts() -> u32 {
    3
}

pub fn default_backoff_base_ms() -> u64 {
    1000
}

pub fn default_generator_binary() -> PathBuf {
    PathBuf::from("claude")
}

pub fn default_generator_args() -> Vec<String> {
    vec![
        "--output-format".to_string(),
        "json".to_string(),
        "-p".to_string(),
    ]
}

pub fn default_pass_threshold() -> f64 {
    70.0
}

pub fn default_weight_coverage() -> f64 {
    0.35
}

pub fn default_weight_completeness() -> f64 {
    0.25
}

pub fn default_weight_clarity() -> f64 {
    0.2
}

pub fn default_weight_accuracy() -> f64 {
    0.2
}

pub fn default_critical_coverage_below() -> f64 {
    0.4
}

pub fn default_high_coverage_below() -> f64 {
    0.7
}

pub fn default_medium_coverage_below() -> f64 {
    0.9
}

pub fn default_critical_issue_limit() -> usize {
    3
}

pub fn default_document_type() -> String {
    "compliance_checklist".to_string()
}

pub fn default_audience() -> String {
    "legal".to_string()
}

fn kw(value: &str, keywords: &[&str]) -> KeywordRule {
    KeywordRule {
        value: value.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn infer(keywords: &[&str], frameworks: &[&str]) -> InferenceRule {
    InferenceRule {
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        frameworks: frameworks.iter().map(|f| f.to_string()).collect(),
    }
}

pub fn default_framework_aliases() -> HashMap<String, String> {
    [
        ("general data protection regulation", "gdpr"),
        ("uk gdpr", "gdpr"),
        ("eu gdpr", "gdpr"),
        ("sarbanes oxley", "sox"),
        ("sarbox", "sox"),
        ("pci", "pci_dss"),
        ("pcidss", "pci_dss"),
        ("iso27001", "iso_27001"),
        ("iso 27001", "iso_27001"),
        ("soc 2", "soc2"),
        ("soc ii", "soc2"),
        ("cpra", "ccpa"),
        ("ccpa/cpra", "ccpa"),
        ("nist csf", "nist"),
    ]
    .into_iter()
    .map(|(alias, target)| (alias.to_string(), target.to_string()))
    .collect()
}

pub fn default_framework_keywords() -> Vec<KeywordRule> {
    vec![
        kw("gdpr", &["gdpr", "general data protection", "eu data", "european privacy"]),
        kw("sox", &["sox", "sarbanes", "sarbox"]),
        kw("hipaa", &["hipaa", "health insurance portability", "protected health"]),
        kw("ccpa", &["ccpa", "california consumer privacy", "cpra"]),
        kw("pci_dss", &["pci-dss", "pci dss", "payment card"]),
        kw("iso_27001", &["iso 27001", "iso27001", "iso-27001"]),
        kw("nist", &["nist"]),
        kw("soc2", &["soc2", "soc 2", "service organization control"]),
        kw("ferpa", &["ferpa", "family educational", "student records"]),
        kw("glba", &["glba", "gramm-leach"]),
        kw("pipeda", &["pipeda", "canadian privacy"]),
        kw("lgpd", &["lgpd", "lei geral", "brazilian data"]),
    ]
}

pub fn default_jurisdiction_rules() -> Vec<InferenceRule> {
    vec![
        infer(
            &["eu", "europe", "european union", "uk", "germany", "france", "spain", "italy"],
            &["gdpr"],
        ),
        infer(
            &["us", "usa", "united states", "california", "us-west", "us-east"],
            &["ccpa"],
        ),
        infer(&["canada", "canadian"], &["pipeda"]),
        infer(&["brazil", "brazilian"], &["lgpd"]),
    ]
}

pub fn default_industry_rules() -> Vec<InferenceRule> {
    vec![
        infer(
            &["healthcare", "health", "medical", "hospital", "clinical"],
            &["hipaa"],
        ),
        infer(
            &["financial", "finance", "bank", "fintech", "payment", "credit card"],
            &["pci_dss", "glba", "sox"],
        ),
        infer(
            &["education", "school", "university", "college", "student"],
            &["ferpa"],
        ),
        infer(
            &["saas", "software", "technology", "tech", "cloud"],
            &["soc2", "iso_27001"],
        ),
    ]
}

pub fn default_document_types() -> Vec<KeywordRule> {
    vec![
        kw("privacy_policy", &["privacy policy", "data protection policy"]),
        kw("privacy_notice", &["privacy notice", "privacy statement"]),
        kw("ropa", &["ropa", "records of processing"]),
        kw("dpia", &["dpia", "data protection impact"]),
        kw("dsar_workflow", &["dsar", "data subject access"]),
        kw("cookie_policy", &["cookie"]),
        kw("dpa_template", &["dpa", "data processing agreement"]),
        kw("breach_response", &["breach"]),
        kw("vendor_assessment", &["vendor", "processor"]),
        kw("training_materials", &["training"]),
        kw("compliance_checklist", &["audit", "compliance checklist"]),
    ]
}

pub fn default_audiences() -> Vec<KeywordRule> {
    vec![
        kw("legal", &["legal", "counsel"]),
        kw("technical", &["technical", "engineering"]),
        kw("executive", &["executive", "c-suite"]),
        kw("end_users", &["customer", "public"]),
        kw("auditors", &["auditor", "compliance"]),
    ]
}

pub fn default_dependency_rules() -> Vec<DependencyRule> {
    let rule = |document_type: &str, depends_on: &str, scope: RuleScope| DependencyRule {
        document_type: document_type.to_string(),
        depends_on: depends_on.to_string(),
        scope,
        optional: false,
    };
    vec![
        rule("dpia", "privacy_policy", RuleScope::Referenced),
        rule("dpia", "ropa", RuleScope::All),
        rule("privacy_notice", "privacy_policy", RuleScope::All),
        rule("cookie_policy", "privacy_policy", RuleScope::All),
        rule("dsar_workflow", "privacy_policy", RuleScope::All),
        rule("vendor_assessment", "dpa_template", RuleScope::Referenced),
        rule("compliance_checklist", "privacy_policy", RuleScope::Referenced),
        rule("training_materials", "privacy_policy", RuleScope::Referenced),
    ]
}

pub fn default_rubric() -> Rubric {
    Rubric {
        required_sections: Vec::new(),
        min_words: 300,
        mandatory_fields: vec![
            MandatoryField {
                name: "contact_information".to_string(),
                pattern: r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}".to_string(),
            },
            MandatoryField {
                name: "effective_date".to_string(),
                pattern: r"(?i)effective\s+(date|from|as\s+of)".to_string(),
            },
        ],
        extraction_rules: default_extraction_rules(),
    }
}

pub fn default_extraction_rules() -> Vec<ExtractionRule> {
    vec![
        ExtractionRule {
            fact: FactKind::LegalEntity,
            pattern: r"(?i)(?:legal entity|data controller|company name)\s*[:\-]\s*([^\n;]+?)\s*(?:\.\s|\.$|\n|;|$)"
                .to_string(),
        },
        ExtractionRule {
            fact: FactKind::LegalEntity,
            pattern: r"\b([A-Z][A-Za-z0-9&'-]*(?:\s+[A-Z][A-Za-z0-9&'-]*)*\s+(?:Ltd|Limited|LLC|Inc|GmbH|PLC|plc|Corp|Corporation|AG|BV))\b"
                .to_string(),
        },
        ExtractionRule {
            fact: FactKind::RetentionPeriod,
            pattern: r"(?i)(?:retain|retained|retention|kept|stored)[^.\n]{0,60}?(\d+)\s*(days?|weeks?|months?|years?)\b"
                .to_string(),
        },
        ExtractionRule {
            fact: FactKind::ContactEmail,
            pattern: r"([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})".to_string(),
        },
    ]
}
