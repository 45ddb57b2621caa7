use std::path::Path;
use std::sync::Arc;

use fluxdot::config::RenderConfig;
use fluxdot::jobs::JobContext;
use fluxdot::model::{SparseSystem, TimeSlice};
use fluxdot::outdir::OutputTree;
use fluxdot::render::ArtifactRenderer;

pub const RUN_NAME: &str = "utopia";

/// A small but fully solved system: a mine turns reserves into coal, a
/// coal plant turns coal into electricity across two time slices, and an
/// `idle_tech` is declared but never used.
///
/// Planning this system yields 16 jobs. Two of them find nothing to draw:
/// the process diagram for `idle_tech` and the segments diagram for the
/// mine, which has no recorded slice flows.
pub fn utopia_lite() -> SparseSystem {
    SparseSystem::builder()
        .conversion(2025, "mine", 2020, "reserves", "coal")
        .slice_flow(
            2025,
            "coal_plant",
            2020,
            "coal",
            "electricity",
            TimeSlice::new("winter", "day"),
            2.0,
            0.8,
        )
        .slice_flow(
            2025,
            "coal_plant",
            2020,
            "coal",
            "electricity",
            TimeSlice::new("summer", "night"),
            1.0,
            0.4,
        )
        .capacity("coal_plant", 2020, 4.0)
        .available_capacity(2025, "coal_plant", 4.0)
        .available_capacity(2025, "mine", 1.0)
        .activity(2025, "coal_plant", 2020, 3.0)
        .activity(2025, "mine", 2020, 3.0)
        .emission(2025, "coal_plant", "co2", 1.5)
        .technology("idle_tech")
        .build()
}

/// Build a job context with a freshly prepared output tree under
/// `output_root`.
pub fn prepared_context(
    output_root: &Path,
    config: RenderConfig,
    system: SparseSystem,
    renderer: Arc<dyn ArtifactRenderer>,
) -> JobContext {
    let tree = OutputTree::new(output_root, RUN_NAME, config.image_format);
    tree.prepare().expect("output tree prepares in a tempdir");
    JobContext::new(
        Arc::new(system),
        Arc::new(config),
        Arc::new(tree),
        renderer,
    )
}
