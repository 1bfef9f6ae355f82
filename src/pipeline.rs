//! End-to-end project run:
//! Planner → Scheduler → document validation → consistency → coverage →
//! consolidation, with a stage event around each step

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::brief::ProjectBrief;
use crate::config::Config;
use crate::consolidate::{Consolidator, ProjectResult};
use crate::error::{DocpackError, InvalidBriefError};
use crate::knowledge::{KnowledgeLookup, StaticKnowledgeBase};
use crate::planner::{plan_project, DocumentPlan};
use crate::provider::ContentGenerator;
use crate::runner::{EventSink, ProgressEvent, Scheduler, SchedulerOptions, Stage, TracingSink};
use crate::validate::{
    ConsistencyValidator, CoverageValidator, DocumentValidator, FactExtractor, KnowledgeExtractor,
};

pub struct Pipeline {
    config: Config,
    generator: Arc<dyn ContentGenerator>,
    knowledge: Arc<dyn KnowledgeLookup>,
    extractor: Option<Arc<dyn FactExtractor>>,
    sink: Arc<dyn EventSink>,
}

impl Pipeline {
    /// Knowledge comes from the config's rubric table; events go to `tracing`
    pub fn new(config: Config, generator: Arc<dyn ContentGenerator>) -> Self {
        let knowledge = Arc::new(StaticKnowledgeBase::from_config(&config.knowledge));
        Self {
            config,
            generator,
            knowledge,
            extractor: None,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeLookup>) -> Self {
        self.knowledge = knowledge;
        self
    }

    /// Replace the rubric-driven fact extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn FactExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn plan(&self, brief: &ProjectBrief) -> Result<DocumentPlan, InvalidBriefError> {
        self.stage(Stage::Planning, || plan_project(brief, &self.config.planner))
    }

    /// Plan and execute a brief. Only an invalid brief fails the run.
    pub async fn run(
        &self,
        brief: &ProjectBrief,
        cancel: CancellationToken,
    ) -> Result<ProjectResult, DocpackError> {
        let plan = self.plan(brief)?;
        self.execute(&plan, cancel).await
    }

    pub async fn execute(
        &self,
        plan: &DocumentPlan,
        cancel: CancellationToken,
    ) -> Result<ProjectResult, DocpackError> {
        self.sink.emit(&ProgressEvent::StageStarted {
            stage: Stage::Generation,
        });
        let scheduler = Scheduler::new(
            SchedulerOptions::from_config(&self.config),
            self.generator.clone(),
            self.sink.clone(),
        );
        let outcome = scheduler.run(plan, cancel).await;
        self.sink.emit(&ProgressEvent::StageCompleted {
            stage: Stage::Generation,
        });
        info!(
            "Generation finished in {:.1}s (peak concurrency {})",
            outcome.duration.as_secs_f64(),
            outcome.peak_concurrency
        );

        let timed_out = outcome.timed_out();
        let mut results = outcome.results;

        let validation = &self.config.validation;
        self.stage(Stage::DocumentValidation, || {
            DocumentValidator::new(self.knowledge.as_ref(), validation).validate_all(plan, &mut results)
        });

        let issues = self.stage(Stage::ConsistencyValidation, || {
            let rubric_extractor = KnowledgeExtractor::new(
                self.knowledge.as_ref(),
                &validation.default_rubric,
                &plan.frameworks,
            );
            let extractor: &dyn FactExtractor = match &self.extractor {
                Some(custom) => custom.as_ref(),
                None => &rubric_extractor,
            };
            ConsistencyValidator::new(extractor).check(plan, &results)
        });

        let (_, gap_report) = self.stage(Stage::CoverageValidation, || {
            CoverageValidator::new(validation.pass_threshold).evaluate(plan, &results)
        });

        let project = self.stage(Stage::Consolidation, || {
            Consolidator::new(&self.config.risk, self.sink.as_ref()).consolidate(
                plan,
                &results,
                &issues,
                &gap_report,
                timed_out,
            )
        })?;

        Ok(project)
    }

    fn stage<T>(&self, stage: Stage, run: impl FnOnce() -> T) -> T {
        self.sink.emit(&ProgressEvent::StageStarted { stage });
        let value = run();
        self.sink.emit(&ProgressEvent::StageCompleted { stage });
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::{OverallStatus, RiskLevel};
    use crate::error::GenerationError;
    use crate::planner::DocumentSpec;
    use crate::provider::{ContentBlob, GenerationContext};
    use crate::runner::{DocumentStatus, MemorySink};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Writes a short document that satisfies the test rubric and cites
    /// every dependency it was given
    #[derive(Default)]
    struct ScriptedGenerator {
        calls: AtomicUsize,
        entity: Option<(String, String)>,
        hanging: HashSet<String>,
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(
            &self,
            spec: &DocumentSpec,
            context: &GenerationContext,
        ) -> Result<ContentBlob, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hanging.contains(&spec.id) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            let entity = match &self.entity {
                Some((id, name)) if *id == spec.id => name.as_str(),
                _ => "Acme Ltd",
            };
            let cited = context
                .dependencies
                .iter()
                .map(|d| d.title.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Ok(ContentBlob::from_text(format!(
                "# {}\n\nEffective date: 1 March 2026.\n\nData Controller: {}\n\n\
                 This GDPR document is maintained by our privacy team. Related: {}.\n\n\
                 Contact privacy@acme.example with questions.",
                spec.title, entity, cited
            )))
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.concurrency = 2;
        config.retry.backoff_base_ms = 0;
        config.validation.default_rubric.min_words = 10;
        config
    }

    const BRIEF: &str = r#"
project_id: acme-privacy
frameworks: [GDPR]
blueprint:
  - { id: policy, title: Privacy Policy, required: true }
  - { id: notice, title: Privacy Notice }
  - { id: cookies, title: Cookie Policy }
success_criteria:
  - Customers can read the privacy notice
"#;

    #[tokio::test]
    async fn test_cyclic_brief_makes_no_generation_attempts() {
        let generator = Arc::new(ScriptedGenerator::default());
        let pipeline = Pipeline::new(config(), generator.clone());
        let brief = ProjectBrief::parse(
            "blueprint:\n  - { id: a, title: A, depends_on: [b] }\n  - { id: b, title: B, depends_on: [a] }\n",
        )
        .unwrap();

        let err = pipeline
            .run(&brief, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DocpackError::InvalidBrief(InvalidBriefError::Cycle(_))
        ));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_consistent_project_completes() {
        let generator = Arc::new(ScriptedGenerator::default());
        let sink = Arc::new(MemorySink::new());
        let pipeline = Pipeline::new(config(), generator.clone()).with_sink(sink.clone());
        let brief = ProjectBrief::parse(BRIEF).unwrap();

        let project = pipeline.run(&brief, CancellationToken::new()).await.unwrap();

        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
        assert!(project
            .documents
            .iter()
            .all(|d| d.status == DocumentStatus::Generated && d.is_passing()));
        assert!(project.issues.is_empty(), "{:?}", project.issues);
        assert_eq!(project.overall_status, OverallStatus::Completed);
        assert_eq!(project.compliance_coverage, 1.0);
        assert_eq!(project.risk_level, RiskLevel::Low);
        assert_eq!(project.gap_report.gap_count(), 0);

        let stages: Vec<Stage> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::StageStarted { stage } => Some(stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            stages,
            vec![
                Stage::Planning,
                Stage::Generation,
                Stage::DocumentValidation,
                Stage::ConsistencyValidation,
                Stage::CoverageValidation,
                Stage::Consolidation,
            ]
        );
    }

    #[tokio::test]
    async fn test_entity_mismatch_is_reported() {
        let generator = Arc::new(ScriptedGenerator {
            entity: Some(("cookies".to_string(), "Globex Inc".to_string())),
            ..Default::default()
        });
        let pipeline = Pipeline::new(config(), generator);
        let brief = ProjectBrief::parse(BRIEF).unwrap();

        let project = pipeline.run(&brief, CancellationToken::new()).await.unwrap();

        assert_eq!(project.issues.len(), 1);
        assert_eq!(
            project.overall_status,
            OverallStatus::CompletedWithWarnings
        );
        assert_eq!(project.risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_project_deadline_yields_partial_result() {
        let generator = Arc::new(ScriptedGenerator {
            hanging: ["beta", "gamma", "delta"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        });
        let mut config = config();
        config.concurrency = 5;
        config.timeout_sec = 1;
        let pipeline = Pipeline::new(config, generator);
        let brief = ProjectBrief::parse(
            r#"
project_id: deadline
blueprint:
  - { id: alpha, title: Alpha, required: true }
  - { id: beta, title: Beta }
  - { id: gamma, title: Gamma }
  - { id: delta, title: Delta }
  - { id: epsilon, title: Epsilon }
"#,
        )
        .unwrap();
        let plan = pipeline.plan(&brief).unwrap();

        let project = pipeline
            .execute(&plan, CancellationToken::new())
            .await
            .unwrap();

        assert!(project.timed_out);
        assert_eq!(project.overall_status, OverallStatus::Partial);
        let mut timed_out: Vec<&str> = project
            .manifest
            .iter()
            .filter(|e| e.status == DocumentStatus::TimedOut)
            .map(|e| e.id.as_str())
            .collect();
        timed_out.sort_unstable();
        assert_eq!(timed_out, vec!["beta", "delta", "gamma"]);
    }
}
