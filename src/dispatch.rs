//! Bounded-concurrency batch execution of diagram jobs.
//!
//! The dispatcher owns everything between "here are the jobs" and "here is
//! the report": admission through a semaphore, per-job timeouts, panic
//! containment, and outcome collection. One failed job never blocks a
//! sibling; the worst a bad scope can do is occupy one permit until its
//! timeout fires.
//!
//! Progress can be observed live through an optional event channel, which
//! is how a CLI would drive a progress bar without the dispatcher knowing
//! anything about terminals.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ExecutionMode, RenderConfig};
use crate::jobs::{DiagramJob, JobContext, JobError, JobOutcome, JobOutput, JobStatus, OutcomeKind};
use crate::scope::ScopeKey;

/// Progress notifications emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    BatchStarted {
        batch_id: Uuid,
        jobs: usize,
    },
    /// The job acquired a permit and began running.
    JobStarted { scope: ScopeKey },
    JobFinished {
        scope: ScopeKey,
        outcome: OutcomeKind,
        elapsed: Duration,
    },
    BatchFinished {
        batch_id: Uuid,
        rendered: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Terminal record of one batch.
#[derive(Debug)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// One outcome per submitted job, in submission order.
    pub outcomes: Vec<JobOutcome>,
    pub rendered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    fn new(batch_id: Uuid, started_at: DateTime<Utc>, elapsed: Duration, outcomes: Vec<JobOutcome>) -> Self {
        let rendered = outcomes
            .iter()
            .filter(|o| o.status.kind() == OutcomeKind::Rendered)
            .count();
        let skipped = outcomes
            .iter()
            .filter(|o| o.status.kind() == OutcomeKind::SkippedEmpty)
            .count();
        let failed = outcomes.len() - rendered - skipped;
        Self {
            batch_id,
            started_at,
            elapsed,
            outcomes,
            rendered,
            skipped,
            failed,
        }
    }

    /// True when at least one job failed. The batch itself still completed;
    /// callers decide whether degraded output is acceptable.
    #[must_use]
    pub fn degraded(&self) -> bool {
        self.failed > 0
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Machine-readable run summary, suitable for dropping next to the
    /// generated images.
    #[must_use]
    pub fn summary_json(&self) -> serde_json::Value {
        let outcomes: Vec<serde_json::Value> = self
            .outcomes
            .iter()
            .map(|outcome| {
                let error = match &outcome.status {
                    JobStatus::Failed(err) => serde_json::Value::String(err.to_string()),
                    _ => serde_json::Value::Null,
                };
                serde_json::json!({
                    "scope": outcome.scope.to_string(),
                    "status": outcome.status.kind(),
                    "elapsed_ms": outcome.elapsed.as_millis() as u64,
                    "error": error,
                })
            })
            .collect();
        serde_json::json!({
            "batch_id": self.batch_id.to_string(),
            "started_at": self.started_at.to_rfc3339(),
            "elapsed_ms": self.elapsed.as_millis() as u64,
            "rendered": self.rendered,
            "skipped": self.skipped,
            "failed": self.failed,
            "outcomes": outcomes,
        })
    }
}

/// Runs batches of [`DiagramJob`]s and reports per-job outcomes.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    concurrency: usize,
    job_timeout: Duration,
    mode: ExecutionMode,
    events: Option<flume::Sender<BatchEvent>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(concurrency: usize, job_timeout: Duration, mode: ExecutionMode) -> Self {
        Self {
            concurrency: concurrency.max(1),
            job_timeout,
            mode,
            events: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(
            config.effective_concurrency(),
            config.job_timeout,
            config.execution_mode,
        )
    }

    /// Attach an unbounded event channel and return its receiver. Events
    /// are sent best-effort; dropping the receiver never stalls the batch.
    #[must_use]
    pub fn with_event_channel(mut self) -> (Self, flume::Receiver<BatchEvent>) {
        let (tx, rx) = flume::unbounded();
        self.events = Some(tx);
        (self, rx)
    }

    /// Run every job to a terminal outcome and report.
    ///
    /// The report always carries exactly one outcome per submitted job, in
    /// submission order, whatever mix of renders, skips, failures, timeouts,
    /// and panics the batch produced.
    pub async fn run(&self, jobs: Vec<Box<dyn DiagramJob>>, ctx: JobContext) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        info!(
            batch_id = %batch_id,
            jobs = jobs.len(),
            concurrency = self.concurrency,
            mode = ?self.mode,
            "dispatching diagram batch"
        );
        emit(
            &self.events,
            BatchEvent::BatchStarted {
                batch_id,
                jobs: jobs.len(),
            },
        );

        let outcomes = match self.mode {
            ExecutionMode::Bounded => self.run_bounded(jobs, ctx).await,
            ExecutionMode::Sequential => self.run_sequential(jobs, ctx).await,
        };

        let report = BatchReport::new(batch_id, started_at, start.elapsed(), outcomes);
        info!(
            batch_id = %batch_id,
            rendered = report.rendered,
            skipped = report.skipped,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "diagram batch finished"
        );
        emit(
            &self.events,
            BatchEvent::BatchFinished {
                batch_id,
                rendered: report.rendered,
                skipped: report.skipped,
                failed: report.failed,
            },
        );
        report
    }

    async fn run_bounded(&self, jobs: Vec<Box<dyn DiagramJob>>, ctx: JobContext) -> Vec<JobOutcome> {
        let total = jobs.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set: JoinSet<(usize, JobOutcome)> = JoinSet::new();
        // Task id → submission slot, so a panicked task can still be tied
        // back to the scope it was running.
        let mut pending: FxHashMap<tokio::task::Id, (usize, ScopeKey)> = FxHashMap::default();

        for (index, job) in jobs.into_iter().enumerate() {
            let scope = job.scope();
            let ctx = ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.job_timeout;
            let events = self.events.clone();
            let task_scope = scope.clone();
            let handle = join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("batch semaphore is never closed");
                emit(
                    &events,
                    BatchEvent::JobStarted {
                        scope: task_scope.clone(),
                    },
                );
                let (status, elapsed) = run_one(job.as_ref(), &ctx, timeout).await;
                emit(
                    &events,
                    BatchEvent::JobFinished {
                        scope: task_scope.clone(),
                        outcome: status.kind(),
                        elapsed,
                    },
                );
                (
                    index,
                    JobOutcome {
                        scope: task_scope,
                        status,
                        elapsed,
                    },
                )
            });
            pending.insert(handle.id(), (index, scope));
        }

        let mut slots: Vec<Option<JobOutcome>> = std::iter::repeat_with(|| None).take(total).collect();
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((id, (index, outcome))) => {
                    pending.remove(&id);
                    slots[index] = Some(outcome);
                }
                Err(join_error) => {
                    let id = join_error.id();
                    if let Some((index, scope)) = pending.remove(&id) {
                        warn!(scope = %scope, error = %join_error, "job task panicked");
                        emit(
                            &self.events,
                            BatchEvent::JobFinished {
                                scope: scope.clone(),
                                outcome: OutcomeKind::Failed,
                                elapsed: Duration::ZERO,
                            },
                        );
                        slots[index] = Some(JobOutcome {
                            scope,
                            status: JobStatus::Failed(JobError::Panicked {
                                detail: join_error.to_string(),
                            }),
                            elapsed: Duration::ZERO,
                        });
                    }
                }
            }
        }

        slots.into_iter().flatten().collect()
    }

    async fn run_sequential(
        &self,
        jobs: Vec<Box<dyn DiagramJob>>,
        ctx: JobContext,
    ) -> Vec<JobOutcome> {
        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            let scope = job.scope();
            emit(
                &self.events,
                BatchEvent::JobStarted {
                    scope: scope.clone(),
                },
            );
            let (status, elapsed) = run_one(job.as_ref(), &ctx, self.job_timeout).await;
            emit(
                &self.events,
                BatchEvent::JobFinished {
                    scope: scope.clone(),
                    outcome: status.kind(),
                    elapsed,
                },
            );
            outcomes.push(JobOutcome {
                scope,
                status,
                elapsed,
            });
        }
        outcomes
    }
}

/// Run one job under its timeout and map every exit to a terminal status.
async fn run_one(job: &dyn DiagramJob, ctx: &JobContext, timeout: Duration) -> (JobStatus, Duration) {
    let scope = job.scope();
    debug!(scope = %scope, "job running");
    let started = Instant::now();
    let result = tokio::time::timeout(timeout, job.run(ctx)).await;
    let elapsed = started.elapsed();
    let status = match result {
        Ok(Ok(JobOutput::Rendered { artifact, image })) => JobStatus::Rendered { artifact, image },
        Ok(Ok(JobOutput::NothingToDraw)) => {
            debug!(scope = %scope, "nothing to draw, skipping");
            JobStatus::SkippedEmpty
        }
        Ok(Err(error)) => {
            warn!(scope = %scope, error = %error, "job failed");
            JobStatus::Failed(error)
        }
        Err(_) => {
            warn!(scope = %scope, timeout_s = timeout.as_secs(), "job timed out");
            JobStatus::Failed(JobError::TimedOut { after: timeout })
        }
    };
    (status, elapsed)
}

fn emit(events: &Option<flume::Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}
