use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use fluxdot::render::{ArtifactRenderer, RenderError};

/// Stand-in renderer so job tests run without a Graphviz install. Records
/// every invocation and writes an empty image file; optionally fails any
/// input whose file name contains a chosen substring.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<PathBuf>>,
    fail_on: Option<String>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every render whose input file name contains `needle`.
    pub fn failing_on(needle: impl Into<String>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: Some(needle.into()),
        }
    }

    /// Inputs rendered so far, in invocation order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactRenderer for RecordingRenderer {
    async fn render(&self, input: &Path, output: &Path) -> Result<(), RenderError> {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(needle) = &self.fail_on {
            if name.contains(needle.as_str()) {
                return Err(RenderError::Failed {
                    input: input.to_owned(),
                    status: 1,
                    stderr: "synthetic failure".into(),
                });
            }
        }
        tokio::fs::write(output, b"")
            .await
            .map_err(|source| RenderError::Spawn {
                program: "recording-renderer".into(),
                source,
            })?;
        self.calls.lock().unwrap().push(input.to_owned());
        Ok(())
    }
}
