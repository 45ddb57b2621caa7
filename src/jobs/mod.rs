//! Diagram jobs: one independent unit of work per diagram.
//!
//! Every job follows the same shape: query the [`EnergySystem`] for its
//! scope, build statement sets, serialize a DOT document, write it, and
//! hand the artifact to the renderer. A job that finds nothing to draw
//! reports [`JobOutput::NothingToDraw`] and touches no files.
//!
//! Jobs are independent by construction: they share only the read-only
//! [`JobContext`] and never read each other's output, which is what lets
//! the dispatcher run them in any order at any concurrency.
//!
//! [`EnergySystem`]: crate::model::EnergySystem

mod carrier;
mod overview;
mod process;
mod results;

pub use carrier::{CarrierJob, CarrierUsageJob};
pub use overview::{OverviewJob, VintageOverviewJob};
pub use process::ProcessJob;
pub use results::{PeriodResultsJob, SegmentsJob, TechResultsJob};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::config::RenderConfig;
use crate::model::EnergySystem;
use crate::outdir::OutputTree;
use crate::render::{ArtifactRenderer, RenderError};
use crate::scope::ScopeKey;

/// Shared read-only environment handed to every job in a batch.
#[derive(Clone)]
pub struct JobContext {
    pub system: Arc<dyn EnergySystem>,
    pub config: Arc<RenderConfig>,
    pub tree: Arc<OutputTree>,
    pub renderer: Arc<dyn ArtifactRenderer>,
}

impl JobContext {
    pub fn new(
        system: Arc<dyn EnergySystem>,
        config: Arc<RenderConfig>,
        tree: Arc<OutputTree>,
        renderer: Arc<dyn ArtifactRenderer>,
    ) -> Self {
        Self {
            system,
            config,
            tree,
            renderer,
        }
    }
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("tree", &self.tree.root())
            .finish_non_exhaustive()
    }
}

/// What a job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutput {
    /// Artifact written and image rendered.
    Rendered { artifact: PathBuf, image: PathBuf },
    /// The scope had no data; no file was written.
    NothingToDraw,
}

/// Why a job failed.
#[derive(Debug, Error, Diagnostic)]
pub enum JobError {
    #[error("failed to write artifact {path}")]
    #[diagnostic(code(fluxdot::job::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),

    /// Imposed by the dispatcher when a job exceeds its wall-clock budget.
    #[error("job exceeded its {}s budget", after.as_secs())]
    #[diagnostic(
        code(fluxdot::job::timeout),
        help("Raise the job timeout or simplify the model slice; huge graphs can stall the renderer.")
    )]
    TimedOut { after: Duration },

    /// Recorded by the dispatcher when a job task panicked.
    #[error("job panicked: {detail}")]
    #[diagnostic(code(fluxdot::job::panic))]
    Panicked { detail: String },
}

/// Terminal state of one dispatched job.
#[derive(Debug)]
pub enum JobStatus {
    Rendered { artifact: PathBuf, image: PathBuf },
    SkippedEmpty,
    Failed(JobError),
}

/// The status discriminant without its payload, for events and summaries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Rendered,
    SkippedEmpty,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Failed(_))
    }

    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        match self {
            JobStatus::Rendered { .. } => OutcomeKind::Rendered,
            JobStatus::SkippedEmpty => OutcomeKind::SkippedEmpty,
            JobStatus::Failed(_) => OutcomeKind::Failed,
        }
    }
}

/// One job's terminal record in a batch report.
#[derive(Debug)]
pub struct JobOutcome {
    pub scope: ScopeKey,
    pub status: JobStatus,
    pub elapsed: Duration,
}

/// A unit of diagram work, keyed by scope.
#[async_trait]
pub trait DiagramJob: Send + Sync {
    /// The scope this job owns. Stable across calls.
    fn scope(&self) -> ScopeKey;

    /// Build, write, and render the diagram.
    async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError>;
}

/// Write the finished DOT text for `scope` and render it.
///
/// Shared tail of every job; paths come from the output tree so the write
/// and the render always agree on location.
pub(crate) async fn write_and_render(
    ctx: &JobContext,
    scope: &ScopeKey,
    dot_text: String,
) -> Result<JobOutput, JobError> {
    let artifact = ctx.tree.artifact_path(scope);
    tokio::fs::write(&artifact, dot_text)
        .await
        .map_err(|source| JobError::Write {
            path: artifact.clone(),
            source,
        })?;
    let image = ctx.tree.image_path(scope);
    ctx.renderer.render(&artifact, &image).await?;
    debug!(scope = %scope, artifact = %artifact.display(), "diagram rendered");
    Ok(JobOutput::Rendered { artifact, image })
}

/// Format a capacity or flow quantity the way diagram labels expect.
pub(crate) fn fmt_quantity(value: f64) -> String {
    format!("{value:.2}")
}

/// Comment block written at the top of the overview artifacts, for people
/// who open the `.dot` files by hand.
pub(crate) const ARTIFACT_BANNER: &str = "\
This file is a Graphviz DOT language description of an energy-system
model instance. Graphviz reads it to create an equivalent image in a
number of formats, including SVG, PNG, GIF, and PDF. For example:

dot -Tsvg -o model.svg model.dot

For more information, see the Graphviz homepage: http://graphviz.org/";
