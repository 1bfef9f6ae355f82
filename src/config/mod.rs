mod defaults;
mod types;

pub use defaults::default_extraction_rules;
pub use types::*;

use crate::error::ConfigError;
use defaults::*;
use std::path::Path;
use std::time::Duration;

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            concurrency: default_concurrency(),
            launch_delay_ms: default_launch_delay_ms(),
            timeout_sec: default_timeout_sec(),
            generation_timeout_sec: default_generation_timeout_sec(),
            report_dir: default_report_dir(),
            retry: RetryConfig::default(),
            generator: GeneratorConfig::default(),
            planner: PlannerConfig::default(),
            validation: ValidationConfig::default(),
            knowledge: KnowledgeConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config if the file exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("Config {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        let threshold = self.validation.pass_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "validation.pass_threshold must be within 0..=100, got {}",
                threshold
            )));
        }

        let w = &self.validation.weights;
        if [w.coverage, w.completeness, w.clarity, w.accuracy]
            .iter()
            .any(|v| *v < 0.0)
            || w.total() <= 0.0
        {
            return Err(ConfigError::Invalid(
                "validation.weights must be non-negative with a positive sum".to_string(),
            ));
        }

        let r = &self.risk;
        for (name, value) in [
            ("critical_coverage_below", r.critical_coverage_below),
            ("high_coverage_below", r.high_coverage_below),
            ("medium_coverage_below", r.medium_coverage_below),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "risk.{} must be within 0..=1, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    pub fn project_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_sec)
    }
}
