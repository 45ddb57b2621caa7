//! Invoking the external Graphviz renderer.
//!
//! [`ArtifactRenderer`] is the seam between jobs and the outside world;
//! [`DotRenderer`] is the production implementation that shells out to
//! `dot`. Tests substitute their own implementation and never need a
//! Graphviz install.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::config::{ImageFormat, RenderConfig};

/// Errors from one renderer invocation.
#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    /// The renderer binary could not be started at all.
    #[error("failed to launch renderer `{program}`")]
    #[diagnostic(
        code(fluxdot::render::spawn),
        help("Install Graphviz or point FLUXDOT_DOT_BIN at the dot binary.")
    )]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The renderer ran and exited non-zero.
    #[error("renderer exited with status {status} for {input}")]
    #[diagnostic(
        code(fluxdot::render::failed),
        help("The artifact is kept on disk; run the renderer on it by hand to reproduce.")
    )]
    Failed {
        input: PathBuf,
        status: i32,
        stderr: String,
    },

    /// The renderer was killed by a signal before exiting.
    #[error("renderer terminated by signal for {input}")]
    #[diagnostic(code(fluxdot::render::terminated))]
    Terminated { input: PathBuf, stderr: String },
}

/// Turns a `.dot` artifact on disk into an image on disk.
#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    async fn render(&self, input: &Path, output: &Path) -> Result<(), RenderError>;
}

/// Production renderer: `dot -T<format> -o<output> <input>`.
///
/// Both paths are passed absolute so the invocation is independent of the
/// process working directory.
#[derive(Debug, Clone)]
pub struct DotRenderer {
    program: PathBuf,
    format: ImageFormat,
}

impl DotRenderer {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, format: ImageFormat) -> Self {
        Self {
            program: program.into(),
            format,
        }
    }

    #[must_use]
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.dot_program.clone(), config.image_format)
    }
}

#[async_trait]
impl ArtifactRenderer for DotRenderer {
    async fn render(&self, input: &Path, output: &Path) -> Result<(), RenderError> {
        debug!(
            program = %self.program.display(),
            input = %input.display(),
            output = %output.display(),
            format = %self.format,
            "invoking renderer"
        );
        // The dispatcher drops this future when the job times out, so the
        // child must die with it or a stalled `dot` would linger and could
        // still write the output file later.
        let result = Command::new(&self.program)
            .arg(format!("-T{}", self.format))
            .arg(format!("-o{}", output.display()))
            .arg(input)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RenderError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if result.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&result.stderr).into_owned();
        match result.status.code() {
            Some(status) => Err(RenderError::Failed {
                input: input.to_owned(),
                status,
                stderr,
            }),
            None => Err(RenderError::Terminated {
                input: input.to_owned(),
                stderr,
            }),
        }
    }
}
