//! Turns a model into a batch of diagram jobs, and provides the one-call
//! entry point that prepares the output tree and runs everything.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::RenderConfig;
use crate::dispatch::{BatchReport, Dispatcher};
use crate::jobs::{
    CarrierJob, CarrierUsageJob, DiagramJob, JobContext, OverviewJob, PeriodResultsJob,
    ProcessJob, SegmentsJob, TechResultsJob, VintageOverviewJob,
};
use crate::model::EnergySystem;
use crate::outdir::{OutdirError, OutputTree};
use crate::render::DotRenderer;

/// Enumerate every diagram the model can support, one job per scope key.
///
/// Enumeration is deliberately liberal: a scope that turns out to hold no
/// data is cheaper to skip inside its job than to predict here, and the
/// skip shows up honestly in the report.
#[must_use]
pub fn plan_jobs(system: &dyn EnergySystem, config: &RenderConfig) -> Vec<Box<dyn DiagramJob>> {
    let mut jobs: Vec<Box<dyn DiagramJob>> = vec![
        Box::new(OverviewJob),
        Box::new(VintageOverviewJob),
    ];

    for carrier in system.carriers() {
        jobs.push(Box::new(CarrierJob::new(&carrier)));
    }
    for tech in system.technologies() {
        jobs.push(Box::new(ProcessJob::new(&tech, config.vintage_layout)));
    }

    let periods = system.periods();
    for &period in &periods {
        jobs.push(Box::new(PeriodResultsJob::new(period)));
    }
    for &period in &periods {
        for tech in system.technologies() {
            if system.available_capacity(period, &tech).is_none() {
                continue;
            }
            jobs.push(Box::new(TechResultsJob::new(period, &tech)));
            for vintage in system.vintages(period, &tech) {
                jobs.push(Box::new(SegmentsJob::new(period, &tech, vintage)));
            }
        }
    }
    for carrier in system.carriers() {
        let attached = !system.consumers_of(&carrier).is_empty()
            || !system.producers_of(&carrier).is_empty();
        if !attached {
            continue;
        }
        for &period in &periods {
            jobs.push(Box::new(CarrierUsageJob::new(&carrier, period)));
        }
    }

    info!(jobs = jobs.len(), "planned diagram batch");
    jobs
}

/// Generate every diagram for `system` under `output_root`.
///
/// Refreshes the `images_<run_name>` tree (destructively), plans the batch,
/// and dispatches it. Only output-tree preparation is fatal; per-job
/// failures are reported, not raised.
pub async fn generate_diagrams(
    system: Arc<dyn EnergySystem>,
    config: RenderConfig,
    output_root: &Path,
    run_name: &str,
) -> Result<BatchReport, OutdirError> {
    let tree = OutputTree::new(output_root, run_name, config.image_format);
    tree.prepare()?;

    let jobs = plan_jobs(system.as_ref(), &config);
    let dispatcher = Dispatcher::from_config(&config);
    let renderer = Arc::new(DotRenderer::from_config(&config));
    let ctx = JobContext::new(system, Arc::new(config), Arc::new(tree), renderer);
    Ok(dispatcher.run(jobs, ctx).await)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::model::SparseSystem;
    use crate::scope::ScopeKey;

    fn fixture() -> SparseSystem {
        SparseSystem::builder()
            .conversion(2025, "coal_plant", 2020, "coal", "electricity")
            .conversion(2030, "coal_plant", 2020, "coal", "electricity")
            .available_capacity(2025, "coal_plant", 4.0)
            .technology("unused_tech")
            .build()
    }

    #[test]
    fn every_scope_is_planned_exactly_once() {
        let system = fixture();
        let jobs = plan_jobs(&system, &RenderConfig::default());
        let scopes: Vec<ScopeKey> = jobs.iter().map(|j| j.scope()).collect();
        let unique: HashSet<&ScopeKey> = scopes.iter().collect();
        assert_eq!(scopes.len(), unique.len());
    }

    #[test]
    fn plan_covers_overviews_carriers_and_results() {
        let system = fixture();
        let jobs = plan_jobs(&system, &RenderConfig::default());
        let scopes: HashSet<ScopeKey> = jobs.iter().map(|j| j.scope()).collect();

        assert!(scopes.contains(&ScopeKey::System));
        assert!(scopes.contains(&ScopeKey::SystemVintages));
        assert!(scopes.contains(&ScopeKey::Carrier {
            carrier: "coal".into()
        }));
        assert!(scopes.contains(&ScopeKey::Technology {
            tech: "unused_tech".into()
        }));
        assert!(scopes.contains(&ScopeKey::PeriodResults { period: 2030 }));
        // Tech results only where capacity entered the solution.
        assert!(scopes.contains(&ScopeKey::TechResults {
            period: 2025,
            tech: "coal_plant".into()
        }));
        assert!(!scopes.contains(&ScopeKey::TechResults {
            period: 2030,
            tech: "coal_plant".into()
        }));
        assert!(scopes.contains(&ScopeKey::Segments {
            period: 2025,
            tech: "coal_plant".into(),
            vintage: 2020
        }));
        assert!(scopes.contains(&ScopeKey::CarrierUsage {
            carrier: "electricity".into(),
            period: 2025
        }));
    }
}
