//! Dependency-aware generation scheduler
//!
//! A single coordinating loop owns every [`DocumentResult`] and the ready
//! set. Workers only generate content and report back through the
//! completion stream, so status transitions happen in one place:
//!
//! 1. Launch ready specs (all dependencies terminal) while fewer than
//!    `concurrency` workers are in flight
//! 2. Wait for the next completion, the project deadline or cancellation
//! 3. Record the completion and re-evaluate direct dependents: a failed,
//!    skipped or timed-out hard dependency skips them transitively
//! 4. On deadline or cancellation, stop workers and time out every
//!    document not yet terminal

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::{EventSink, ProgressEvent, ProgressSnapshot};
use super::result::{DocumentResult, DocumentStatus};
use super::retry::retry_with_backoff_notify;
use crate::config::{Config, RetryConfig};
use crate::error::GenerationError;
use crate::planner::{DocumentPlan, DocumentSpec};
use crate::provider::{ContentBlob, ContentGenerator, DependencyContent, GenerationContext};

/// How long stopped workers get to report their attempt counts
const DRAIN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub concurrency: usize,
    pub launch_delay: Duration,
    pub project_timeout: Duration,
    pub retry: RetryConfig,
}

impl SchedulerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.concurrency,
            launch_delay: Duration::from_millis(config.launch_delay_ms),
            project_timeout: config.project_timeout(),
            retry: config.retry.clone(),
        }
    }
}

/// Why generation stopped before every document finished on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Deadline,
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Deadline => write!(f, "project deadline reached"),
            StopReason::Cancelled => write!(f, "run cancelled"),
        }
    }
}

#[derive(Debug)]
pub struct ScheduleOutcome {
    /// One result per spec, in plan order, all terminal
    pub results: Vec<DocumentResult>,
    pub stopped: Option<StopReason>,
    pub duration: Duration,
    /// Most workers observed in flight at once
    pub peak_concurrency: usize,
}

impl ScheduleOutcome {
    pub fn timed_out(&self) -> bool {
        self.stopped.is_some()
    }
}

pub struct Scheduler {
    options: SchedulerOptions,
    generator: Arc<dyn ContentGenerator>,
    sink: Arc<dyn EventSink>,
}

struct WorkerReport {
    attempts: u32,
    outcome: Result<ContentBlob, GenerationError>,
    duration: Duration,
}

impl Scheduler {
    pub fn new(
        options: SchedulerOptions,
        generator: Arc<dyn ContentGenerator>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            options,
            generator,
            sink,
        }
    }

    pub async fn run(&self, plan: &DocumentPlan, cancel: CancellationToken) -> ScheduleOutcome {
        let start = Instant::now();
        let concurrency = self.options.concurrency.max(1);
        let workers = cancel.child_token();
        let mut state = RunState::new(plan, self.sink.as_ref());
        let mut in_flight = FuturesUnordered::new();
        let mut launched = 0usize;
        let mut peak = 0usize;

        info!(
            "Generating {} documents with concurrency {} (generator: {})",
            plan.len(),
            concurrency,
            self.generator.name()
        );

        let deadline = sleep(self.options.project_timeout);
        tokio::pin!(deadline);

        let stopped = 'run: loop {
            while in_flight.len() < concurrency {
                let Some(index) = state.ready.pop_first() else {
                    break;
                };

                // Small delay between launches to avoid burst rate limits
                if launched > 0 && !self.options.launch_delay.is_zero() {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break 'run Some(StopReason::Cancelled),
                        _ = &mut deadline => break 'run Some(StopReason::Deadline),
                        _ = sleep(self.options.launch_delay) => {}
                    }
                }
                launched += 1;

                let spec = plan.specs[index].clone();
                let context = state.context_for(index);
                state.transition(index, DocumentStatus::Generating);

                let generator = self.generator.clone();
                let sink = self.sink.clone();
                let retry = self.options.retry.clone();
                let token = workers.clone();
                let handle = tokio::spawn(async move {
                    let started = Instant::now();
                    let (attempts, outcome) =
                        generate_document(generator, spec, context, retry, token, sink).await;
                    WorkerReport {
                        attempts,
                        outcome,
                        duration: started.elapsed(),
                    }
                });
                in_flight.push(async move { (index, handle.await) });
            }
            peak = peak.max(in_flight.len());

            if in_flight.is_empty() {
                break None;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Some(StopReason::Cancelled),
                _ = &mut deadline => break Some(StopReason::Deadline),
                Some((index, joined)) = in_flight.next() => state.complete(index, joined),
            }
        };

        if let Some(reason) = stopped {
            workers.cancel();
            let unfinished = state.unfinished();
            warn!("{}; {} documents unfinished", reason, unfinished.len());
            self.sink.emit(&ProgressEvent::DeadlineReached { unfinished });

            let drained = timeout(DRAIN_GRACE, async {
                while let Some((index, joined)) = in_flight.next().await {
                    state.record_stopped(index, joined);
                }
            })
            .await;
            if drained.is_err() {
                debug!("{} workers still stopping after grace period", in_flight.len());
            }

            state.time_out_unfinished(reason);
        } else {
            // Only reachable if a dependency never resolved
            state.skip_stranded();
        }

        ScheduleOutcome {
            results: state.results,
            stopped,
            duration: start.elapsed(),
            peak_concurrency: peak,
        }
    }
}

/// Generate one document with retries, stopping early when `cancel` fires
async fn generate_document(
    generator: Arc<dyn ContentGenerator>,
    spec: DocumentSpec,
    context: GenerationContext,
    retry: RetryConfig,
    cancel: CancellationToken,
    sink: Arc<dyn EventSink>,
) -> (u32, Result<ContentBlob, GenerationError>) {
    let attempts = AtomicU32::new(0);

    let outcome = {
        let attempts = &attempts;
        let spec = &spec;
        let context = &context;
        let generator = &generator;

        let attempt_once = move || {
            let mut context = context.clone();
            context.attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let generator = generator.clone();
            async move {
                let content = generator.generate(spec, &context).await?;
                if content.is_blank() {
                    return Err(GenerationError::EmptyOutput);
                }
                Ok(content)
            }
        };
        let on_retry = |attempt: u32, error: &GenerationError, delay: Duration| {
            sink.emit(&ProgressEvent::RetryScheduled {
                document_id: spec.id.clone(),
                attempt,
                error: error.to_string(),
                delay_ms: delay.as_millis() as u64,
            });
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            result = retry_with_backoff_notify(&retry, attempt_once, on_retry) => result,
        }
    };

    (attempts.load(Ordering::SeqCst), outcome)
}

/// Coordinator-owned view of the run
struct RunState<'a> {
    plan: &'a DocumentPlan,
    sink: &'a dyn EventSink,
    results: Vec<DocumentResult>,
    /// Plan indices whose dependencies are all terminal, lowest first
    ready: BTreeSet<usize>,
}

impl<'a> RunState<'a> {
    fn new(plan: &'a DocumentPlan, sink: &'a dyn EventSink) -> Self {
        let results = plan
            .specs
            .iter()
            .map(|s| DocumentResult::pending(&s.id))
            .collect();
        let ready = plan
            .specs
            .iter()
            .enumerate()
            .filter(|(_, s)| s.dependencies.is_empty())
            .map(|(i, _)| i)
            .collect();
        Self {
            plan,
            sink,
            results,
            ready,
        }
    }

    fn status_of(&self, id: &str) -> DocumentStatus {
        self.plan
            .index_of(id)
            .map(|i| self.results[i].status)
            .unwrap_or(DocumentStatus::Pending)
    }

    fn transition(&mut self, index: usize, to: DocumentStatus) {
        let from = self.results[index].status;
        if from == to {
            return;
        }
        self.results[index].status = to;
        let snapshot = ProgressSnapshot::from_results(&self.results);
        self.sink.emit(&ProgressEvent::DocumentTransition {
            document_id: self.results[index].spec_id.clone(),
            from,
            to,
            snapshot,
        });
    }

    /// Context for a spec about to launch: content of every generated dependency
    fn context_for(&self, index: usize) -> GenerationContext {
        let spec = &self.plan.specs[index];
        let dependencies = spec
            .dependencies
            .iter()
            .filter_map(|dep| {
                let dep_index = self.plan.index_of(&dep.id)?;
                let result = &self.results[dep_index];
                let content = result.content.clone()?;
                Some(DependencyContent {
                    id: dep.id.clone(),
                    title: self.plan.specs[dep_index].title.clone(),
                    content,
                })
            })
            .collect();

        GenerationContext {
            project_id: self.plan.project_id.clone(),
            frameworks: if spec.frameworks.is_empty() {
                self.plan.frameworks.clone()
            } else {
                spec.frameworks.clone()
            },
            project: self.plan.context.clone(),
            dependencies,
            attempt: 0,
        }
    }

    fn complete(&mut self, index: usize, joined: Result<WorkerReport, JoinError>) {
        let status = match joined {
            Ok(report) => {
                let result = &mut self.results[index];
                result.attempts = report.attempts;
                result.duration_ms = report.duration.as_millis() as u64;
                match report.outcome {
                    Ok(content) => {
                        result.content = Some(content);
                        result.last_error = None;
                        DocumentStatus::Generated
                    }
                    Err(GenerationError::Cancelled) => {
                        result.last_error = Some(GenerationError::Cancelled.to_string());
                        DocumentStatus::TimedOut
                    }
                    Err(e) => {
                        result.last_error = Some(e.to_string());
                        DocumentStatus::Failed
                    }
                }
            }
            Err(e) => {
                self.results[index].last_error = Some(format!("generation task failed: {}", e));
                DocumentStatus::Failed
            }
        };
        self.transition(index, status);
        self.resolve_dependents(index);
    }

    /// Skip or release the pending dependents of a newly terminal spec
    fn resolve_dependents(&mut self, index: usize) {
        let plan = self.plan;
        let mut queue = vec![index];

        while let Some(done) = queue.pop() {
            let done_id = plan.specs[done].id.as_str();
            for (dependent, spec) in plan.specs.iter().enumerate() {
                if !spec.depends_on(done_id)
                    || self.results[dependent].status != DocumentStatus::Pending
                {
                    continue;
                }

                let blocker = spec
                    .dependencies
                    .iter()
                    .filter(|d| !d.optional)
                    .map(|d| (d.id.as_str(), self.status_of(&d.id)))
                    .find(|(_, status)| status.is_unsuccessful());

                if let Some((blocker_id, blocker_status)) = blocker {
                    self.results[dependent].last_error = Some(format!(
                        "dependency '{}' {}",
                        blocker_id, blocker_status
                    ));
                    self.transition(dependent, DocumentStatus::Skipped);
                    queue.push(dependent);
                } else if spec
                    .dependencies
                    .iter()
                    .all(|d| self.status_of(&d.id).is_terminal())
                {
                    self.ready.insert(dependent);
                }
            }
        }
    }

    fn unfinished(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.status.is_terminal())
            .map(|r| r.spec_id.clone())
            .collect()
    }

    /// Keep attempt counts from workers that stopped after the run did
    fn record_stopped(&mut self, index: usize, joined: Result<WorkerReport, JoinError>) {
        if let Ok(report) = joined {
            let result = &mut self.results[index];
            result.attempts = report.attempts;
            result.duration_ms = report.duration.as_millis() as u64;
        }
    }

    fn time_out_unfinished(&mut self, reason: StopReason) {
        self.ready.clear();
        for index in 0..self.results.len() {
            if !self.results[index].status.is_terminal() {
                self.results[index].last_error = Some(reason.to_string());
                self.transition(index, DocumentStatus::TimedOut);
            }
        }
    }

    fn skip_stranded(&mut self) {
        for index in 0..self.results.len() {
            if !self.results[index].status.is_terminal() {
                warn!("{} never became ready", self.results[index].spec_id);
                self.results[index].last_error = Some("dependencies never resolved".to_string());
                self.transition(index, DocumentStatus::Skipped);
            }
        }
    }
}
