//! Dispatcher behavior: concurrency bounds, outcome accounting, failure
//! isolation, timeouts, and panic containment.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fluxdot::config::{ExecutionMode, RenderConfig};
use fluxdot::dispatch::{BatchEvent, Dispatcher};
use fluxdot::jobs::{DiagramJob, JobContext, JobError, JobOutput, JobStatus, OutcomeKind};
use fluxdot::model::SparseSystem;
use fluxdot::scope::ScopeKey;

use common::*;

/// Tracks how many probe jobs are in flight at once.
#[derive(Debug, Default)]
struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

enum Behavior {
    Render,
    Skip,
    Fail,
    Panic,
    Stall(Duration),
}

struct ProbeJob {
    scope: ScopeKey,
    behavior: Behavior,
    gauge: Arc<Gauge>,
}

impl ProbeJob {
    fn boxed(index: usize, behavior: Behavior, gauge: Arc<Gauge>) -> Box<dyn DiagramJob> {
        Box::new(Self {
            scope: probe_scope(index),
            behavior,
            gauge,
        })
    }
}

fn probe_scope(index: usize) -> ScopeKey {
    ScopeKey::Carrier {
        carrier: format!("probe_{index}"),
    }
}

#[async_trait]
impl DiagramJob for ProbeJob {
    fn scope(&self) -> ScopeKey {
        self.scope.clone()
    }

    async fn run(&self, _ctx: &JobContext) -> Result<JobOutput, JobError> {
        self.gauge.enter();
        tokio::time::sleep(Duration::from_millis(25)).await;
        self.gauge.exit();
        match &self.behavior {
            Behavior::Render => Ok(JobOutput::Rendered {
                artifact: "probe.dot".into(),
                image: "probe.svg".into(),
            }),
            Behavior::Skip => Ok(JobOutput::NothingToDraw),
            Behavior::Fail => Err(JobError::Write {
                path: "probe.dot".into(),
                source: std::io::Error::other("synthetic write failure"),
            }),
            Behavior::Panic => panic!("probe panic"),
            Behavior::Stall(extra) => {
                tokio::time::sleep(*extra).await;
                Ok(JobOutput::NothingToDraw)
            }
        }
    }
}

fn probe_context(root: &std::path::Path) -> JobContext {
    prepared_context(
        root,
        RenderConfig::default(),
        SparseSystem::builder().build(),
        Arc::new(RecordingRenderer::new()),
    )
}

#[tokio::test]
async fn bounded_mode_respects_the_concurrency_limit() {
    let dir = tempfile::tempdir().unwrap();
    let gauge = Arc::new(Gauge::default());
    let jobs: Vec<Box<dyn DiagramJob>> = (0..9)
        .map(|i| ProbeJob::boxed(i, Behavior::Render, Arc::clone(&gauge)))
        .collect();

    let dispatcher = Dispatcher::new(2, Duration::from_secs(5), ExecutionMode::Bounded);
    let report = dispatcher.run(jobs, probe_context(dir.path())).await;

    assert!(gauge.peak() <= 2, "peak in-flight was {}", gauge.peak());
    assert_eq!(report.total(), 9);
    assert_eq!(report.rendered, 9);
    assert!(!report.degraded());
    // Outcomes come back in submission order regardless of finish order.
    for (index, outcome) in report.outcomes.iter().enumerate() {
        assert_eq!(outcome.scope, probe_scope(index));
    }
}

#[tokio::test]
async fn sequential_mode_runs_one_job_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let gauge = Arc::new(Gauge::default());
    let jobs: Vec<Box<dyn DiagramJob>> = (0..5)
        .map(|i| ProbeJob::boxed(i, Behavior::Render, Arc::clone(&gauge)))
        .collect();

    let dispatcher = Dispatcher::new(4, Duration::from_secs(5), ExecutionMode::Sequential);
    let report = dispatcher.run(jobs, probe_context(dir.path())).await;

    assert_eq!(gauge.peak(), 1);
    assert_eq!(report.rendered, 5);
    for (index, outcome) in report.outcomes.iter().enumerate() {
        assert_eq!(outcome.scope, probe_scope(index));
    }
}

#[tokio::test]
async fn one_failure_never_blocks_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let gauge = Arc::new(Gauge::default());
    let jobs: Vec<Box<dyn DiagramJob>> = (0..6)
        .map(|i| {
            let behavior = if i == 3 { Behavior::Fail } else { Behavior::Render };
            ProbeJob::boxed(i, behavior, Arc::clone(&gauge))
        })
        .collect();

    let dispatcher = Dispatcher::new(3, Duration::from_secs(5), ExecutionMode::Bounded);
    let report = dispatcher.run(jobs, probe_context(dir.path())).await;

    assert_eq!(report.rendered, 5);
    assert_eq!(report.failed, 1);
    assert!(report.degraded());
    assert!(report.outcomes[3].status.is_failure());
    assert!(matches!(
        report.outcomes[3].status,
        JobStatus::Failed(JobError::Write { .. })
    ));

    let summary = report.summary_json();
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["outcomes"][3]["status"], "failed");
    assert!(summary["outcomes"][0]["error"].is_null());
}

#[tokio::test]
async fn overrunning_jobs_are_timed_out() {
    let dir = tempfile::tempdir().unwrap();
    let gauge = Arc::new(Gauge::default());
    let jobs: Vec<Box<dyn DiagramJob>> = vec![
        ProbeJob::boxed(0, Behavior::Render, Arc::clone(&gauge)),
        ProbeJob::boxed(1, Behavior::Stall(Duration::from_secs(30)), Arc::clone(&gauge)),
        ProbeJob::boxed(2, Behavior::Render, Arc::clone(&gauge)),
    ];

    let dispatcher = Dispatcher::new(3, Duration::from_millis(200), ExecutionMode::Bounded);
    let report = dispatcher.run(jobs, probe_context(dir.path())).await;

    // The timeout drops the job future mid-flight; the production renderer
    // sets kill_on_drop so its subprocess dies with it rather than running
    // on detached.
    assert_eq!(report.rendered, 2);
    assert_eq!(report.failed, 1);
    assert!(matches!(
        report.outcomes[1].status,
        JobStatus::Failed(JobError::TimedOut { .. })
    ));
    assert!(report.outcomes[1].elapsed >= Duration::from_millis(200));
}

#[tokio::test]
async fn a_panicking_job_still_reports_an_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let gauge = Arc::new(Gauge::default());
    let jobs: Vec<Box<dyn DiagramJob>> = (0..4)
        .map(|i| {
            let behavior = if i == 1 { Behavior::Panic } else { Behavior::Render };
            ProbeJob::boxed(i, behavior, Arc::clone(&gauge))
        })
        .collect();

    let dispatcher = Dispatcher::new(2, Duration::from_secs(5), ExecutionMode::Bounded);
    let report = dispatcher.run(jobs, probe_context(dir.path())).await;

    assert_eq!(report.total(), 4);
    assert_eq!(report.rendered, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.outcomes[1].scope, probe_scope(1));
    assert!(matches!(
        report.outcomes[1].status,
        JobStatus::Failed(JobError::Panicked { .. })
    ));
}

#[tokio::test]
async fn event_channel_sees_every_job() {
    let dir = tempfile::tempdir().unwrap();
    let gauge = Arc::new(Gauge::default());
    let jobs: Vec<Box<dyn DiagramJob>> = vec![
        ProbeJob::boxed(0, Behavior::Render, Arc::clone(&gauge)),
        ProbeJob::boxed(1, Behavior::Skip, Arc::clone(&gauge)),
        ProbeJob::boxed(2, Behavior::Fail, Arc::clone(&gauge)),
    ];

    let (dispatcher, rx) =
        Dispatcher::new(2, Duration::from_secs(5), ExecutionMode::Bounded).with_event_channel();
    let report = dispatcher.run(jobs, probe_context(dir.path())).await;
    assert_eq!(report.total(), 3);

    let events: Vec<BatchEvent> = rx.try_iter().collect();
    let mut started = 0;
    let mut job_started = 0;
    let mut job_finished = 0;
    let mut finished_kinds = Vec::new();
    for event in &events {
        match event {
            BatchEvent::BatchStarted { jobs, .. } => {
                started += 1;
                assert_eq!(*jobs, 3);
            }
            BatchEvent::JobStarted { .. } => job_started += 1,
            BatchEvent::JobFinished { outcome, .. } => {
                job_finished += 1;
                finished_kinds.push(*outcome);
            }
            BatchEvent::BatchFinished {
                rendered,
                skipped,
                failed,
                ..
            } => {
                assert_eq!((*rendered, *skipped, *failed), (1, 1, 1));
            }
        }
    }
    assert_eq!(started, 1);
    assert_eq!(job_started, 3);
    assert_eq!(job_finished, 3);
    assert!(finished_kinds.contains(&OutcomeKind::Rendered));
    assert!(finished_kinds.contains(&OutcomeKind::SkippedEmpty));
    assert!(finished_kinds.contains(&OutcomeKind::Failed));
    // The last event is always the batch summary.
    assert!(matches!(events.last(), Some(BatchEvent::BatchFinished { .. })));
}
