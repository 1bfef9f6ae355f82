use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::result::{DocumentResult, DocumentStatus};
use crate::consolidate::{OverallStatus, RiskLevel};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Planning,
    Generation,
    DocumentValidation,
    ConsistencyValidation,
    CoverageValidation,
    Consolidation,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Planning => "planning",
            Stage::Generation => "generation",
            Stage::DocumentValidation => "document_validation",
            Stage::ConsistencyValidation => "consistency_validation",
            Stage::CoverageValidation => "coverage_validation",
            Stage::Consolidation => "consolidation",
        };
        f.write_str(name)
    }
}

/// Per-status document counts at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub pending: usize,
    pub generating: usize,
    pub generated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub timed_out: usize,
}

impl ProgressSnapshot {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a DocumentResult>) -> Self {
        let mut snapshot = Self::default();
        for result in results {
            snapshot.total += 1;
            match result.status {
                DocumentStatus::Pending => snapshot.pending += 1,
                DocumentStatus::Generating => snapshot.generating += 1,
                DocumentStatus::Generated => snapshot.generated += 1,
                DocumentStatus::Failed => snapshot.failed += 1,
                DocumentStatus::Skipped => snapshot.skipped += 1,
                DocumentStatus::TimedOut => snapshot.timed_out += 1,
            }
        }
        snapshot
    }

    pub fn finished(&self) -> usize {
        self.generated + self.failed + self.skipped + self.timed_out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    StageStarted {
        stage: Stage,
    },
    StageCompleted {
        stage: Stage,
    },
    DocumentTransition {
        document_id: String,
        from: DocumentStatus,
        to: DocumentStatus,
        snapshot: ProgressSnapshot,
    },
    RetryScheduled {
        document_id: String,
        attempt: u32,
        error: String,
        delay_ms: u64,
    },
    DeadlineReached {
        unfinished: Vec<String>,
    },
    Consolidated {
        project_id: String,
        overall_status: OverallStatus,
        compliance_coverage: f64,
        risk_level: RiskLevel,
    },
}

/// Receiver of progress events. Called from the coordinating task, so
/// implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::StageStarted { stage } => info!("Stage {} started", stage),
            ProgressEvent::StageCompleted { stage } => debug!("Stage {} completed", stage),
            ProgressEvent::DocumentTransition {
                document_id,
                from,
                to,
                snapshot,
            } => info!(
                "[{}/{}] {}: {} -> {}",
                snapshot.finished(),
                snapshot.total,
                document_id,
                from,
                to
            ),
            ProgressEvent::RetryScheduled {
                document_id,
                attempt,
                error,
                delay_ms,
            } => warn!(
                "{}: attempt {} failed ({}), retrying in {}ms",
                document_id, attempt, error, delay_ms
            ),
            ProgressEvent::DeadlineReached { unfinished } => warn!(
                "Project deadline reached with {} documents unfinished: {}",
                unfinished.len(),
                unfinished.join(", ")
            ),
            ProgressEvent::Consolidated {
                project_id,
                overall_status,
                compliance_coverage,
                risk_level,
            } => info!(
                "Project {} {} (coverage {:.0}%, risk {})",
                project_id,
                overall_status,
                compliance_coverage * 100.0,
                risk_level
            ),
        }
    }
}

/// Forwards events to an unbounded channel. A dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &ProgressEvent) {
        let _ = self.tx.send(event.clone());
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &ProgressEvent) {}
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &ProgressEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_snapshot_counts() {
        let mut generated = DocumentResult::pending("a");
        generated.status = DocumentStatus::Generated;
        let mut failed = DocumentResult::pending("b");
        failed.status = DocumentStatus::Failed;
        let pending = DocumentResult::pending("c");

        let snapshot = ProgressSnapshot::from_results([&generated, &failed, &pending]);
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.generated, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.pending, 1);
        assert_eq!(snapshot.finished(), 2);
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelSink::new(tx);
        sink.emit(&ProgressEvent::StageStarted {
            stage: Stage::Generation,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            ProgressEvent::StageStarted {
                stage: Stage::Generation
            }
        );
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ChannelSink::new(tx).emit(&ProgressEvent::StageCompleted {
            stage: Stage::Planning,
        });
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(ProgressEvent::StageStarted {
            stage: Stage::CoverageValidation,
        })
        .unwrap();
        assert_eq!(json["event"], "stage_started");
        assert_eq!(json["stage"], "coverage_validation");
    }
}
