//! Run configuration: output format, colors, layout choices, and the knobs
//! that govern dispatch (concurrency, timeout, execution mode).
//!
//! [`RenderConfig`] is built fluently and then shared immutably across every
//! job in a run. Environment overrides are read through `dotenvy`, so a
//! `.env` file next to the binary works the same as real environment
//! variables.

use std::fmt;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable naming the Graphviz binary to invoke.
pub const DOT_BIN_ENV: &str = "FLUXDOT_DOT_BIN";

/// Flow magnitudes below this threshold are treated as unused.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 0.005;

/// Output image format, passed to the renderer as `-T<format>`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Svg,
    Png,
    Gif,
    Pdf,
}

impl ImageFormat {
    /// File extension, which doubles as the renderer's format name.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How a technology diagram arranges vintages.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VintageLayout {
    /// Vintage and period nodes grouped in bordered clusters, flows routed
    /// through cluster anchors.
    #[default]
    Clustered,
    /// One node per (period, vintage) pair, every flow drawn explicitly.
    Explicit,
}

/// How the dispatcher runs a batch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Concurrent with a bounded number of in-flight jobs.
    #[default]
    Bounded,
    /// One job at a time, in submission order. Useful when debugging a
    /// misbehaving dataset.
    Sequential,
}

/// Color assignments for every diagram element.
///
/// Field values are Graphviz color names. The defaults are deliberately
/// loud; models are dense and the palette is doing real work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    /// Technology nodes.
    pub tech: String,
    /// Energy-carrier nodes.
    pub carrier: String,
    /// Declared-but-unused nodes.
    pub unused: String,
    /// Font on unused nodes.
    pub unused_font: String,
    /// Font on in-use nodes.
    pub used_font: String,
    /// Arrowheads on flows into a process.
    pub input_arrow: String,
    /// Arrowheads on flows out of a process.
    pub output_arrow: String,
    /// "Back to overview" home links.
    pub home: String,
    /// Cluster background fill in technology diagrams.
    pub cluster_fill: String,
    /// Nodes inside clusters.
    pub cluster_node: String,
    /// Input-carrier nodes in per-scope diagrams.
    pub input_carrier: String,
    /// Output-carrier nodes in per-scope diagrams.
    pub output_carrier: String,
    /// Flow edges in per-scope diagrams.
    pub flow_arrow: String,
    /// Cycled over vintage→period edges so parallel flows stay
    /// distinguishable.
    pub rainbow: Vec<String>,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            tech: "darkseagreen".into(),
            carrier: "lightsteelblue".into(),
            unused: "powderblue".into(),
            unused_font: "chocolate".into(),
            used_font: "black".into(),
            input_arrow: "firebrick".into(),
            output_arrow: "forestgreen".into(),
            home: "gray75".into(),
            cluster_fill: "lightgrey".into(),
            cluster_node: "white".into(),
            input_carrier: "lightsteelblue".into(),
            output_carrier: "lawngreen".into(),
            flow_arrow: "forestgreen".into(),
            rainbow: [
                "red",
                "orange",
                "gold",
                "green",
                "blue",
                "purple",
                "hotpink",
                "cyan",
                "burlywood",
                "coral",
                "limegreen",
                "black",
                "brown",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl Palette {
    /// Rainbow color for the `idx`-th parallel edge, cycling. An empty
    /// rainbow list falls back to black.
    #[must_use]
    pub fn rainbow_color(&self, idx: usize) -> &str {
        if self.rainbow.is_empty() {
            return "black";
        }
        &self.rainbow[idx % self.rainbow.len()]
    }
}

/// Immutable configuration for one diagram-generation run.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub palette: Palette,
    pub image_format: ImageFormat,
    /// Graph-level `splines` attribute; curved edges read better but cost
    /// layout time on big systems.
    pub splines: bool,
    /// Annotate nodes with capacity labels where the model has them.
    pub show_capacity: bool,
    pub vintage_layout: VintageLayout,
    /// Flows below this magnitude are drawn as unused.
    pub significance_threshold: f64,
    /// In-flight job bound; `None` means one per available core.
    pub concurrency: Option<usize>,
    /// Wall-clock budget per job, covering both the artifact write and the
    /// renderer invocation.
    pub job_timeout: Duration,
    pub execution_mode: ExecutionMode,
    /// Graphviz binary to invoke.
    pub dot_program: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            palette: Palette::default(),
            image_format: ImageFormat::default(),
            splines: true,
            show_capacity: true,
            vintage_layout: VintageLayout::default(),
            significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
            concurrency: None,
            job_timeout: Duration::from_secs(120),
            execution_mode: ExecutionMode::default(),
            dot_program: resolve_dot_program(),
        }
    }
}

impl RenderConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    #[must_use]
    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    #[must_use]
    pub fn with_splines(mut self, splines: bool) -> Self {
        self.splines = splines;
        self
    }

    #[must_use]
    pub fn with_show_capacity(mut self, show: bool) -> Self {
        self.show_capacity = show;
        self
    }

    #[must_use]
    pub fn with_vintage_layout(mut self, layout: VintageLayout) -> Self {
        self.vintage_layout = layout;
        self
    }

    #[must_use]
    pub fn with_significance_threshold(mut self, threshold: f64) -> Self {
        self.significance_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, bound: usize) -> Self {
        self.concurrency = Some(bound.max(1));
        self
    }

    #[must_use]
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    #[must_use]
    pub fn with_dot_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.dot_program = program.into();
        self
    }

    /// The concurrency bound actually used by the dispatcher.
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.unwrap_or_else(|| {
            thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        })
    }

    /// True when `value` clears the significance threshold.
    #[must_use]
    pub fn significant(&self, value: f64) -> bool {
        value >= self.significance_threshold
    }
}

/// Resolve the Graphviz binary: `FLUXDOT_DOT_BIN` (via the environment or a
/// `.env` file) wins, otherwise `dot` from `PATH`.
#[must_use]
pub fn resolve_dot_program() -> PathBuf {
    dotenvy::var(DOT_BIN_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("dot"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RenderConfig::default();
        assert_eq!(config.image_format, ImageFormat::Svg);
        assert_eq!(config.significance_threshold, 0.005);
        assert_eq!(config.job_timeout, Duration::from_secs(120));
        assert_eq!(config.execution_mode, ExecutionMode::Bounded);
        assert!(config.splines);
        assert!(config.show_capacity);
    }

    #[test]
    fn concurrency_bound_is_never_zero() {
        let config = RenderConfig::new().with_concurrency(0);
        assert_eq!(config.effective_concurrency(), 1);
        assert!(RenderConfig::default().effective_concurrency() >= 1);
    }

    #[test]
    fn significance_is_inclusive_at_the_threshold() {
        let config = RenderConfig::default();
        assert!(config.significant(0.005));
        assert!(!config.significant(0.004));
    }

    #[test]
    fn rainbow_cycles_past_the_end() {
        let palette = Palette::default();
        let n = palette.rainbow.len();
        assert_eq!(palette.rainbow_color(0), palette.rainbow_color(n));
        assert_eq!(palette.rainbow_color(1), "orange");
    }

    #[test]
    fn empty_rainbow_falls_back_instead_of_panicking() {
        let palette = Palette {
            rainbow: Vec::new(),
            ..Palette::default()
        };
        assert_eq!(palette.rainbow_color(0), "black");
        assert_eq!(palette.rainbow_color(7), "black");
    }
}
