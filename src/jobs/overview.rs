//! Whole-system overview diagrams.

use async_trait::async_trait;

use crate::dot::{AttrList, DotWriter, EdgeSet, NodeSet};
use crate::scope::ScopeKey;

use super::{
    ARTIFACT_BANNER, DiagramJob, JobContext, JobError, JobOutput, write_and_render,
};

/// The system landing page: one node per technology, one per carrier,
/// flows collapsed across periods and vintages. Every node links into the
/// matching per-scope diagram, which makes this the navigation root of the
/// whole output tree.
#[derive(Debug, Clone, Default)]
pub struct OverviewJob;

#[async_trait]
impl DiagramJob for OverviewJob {
    fn scope(&self) -> ScopeKey {
        ScopeKey::System
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
        let scope = self.scope();
        let system = &ctx.system;
        let palette = &ctx.config.palette;

        let mut tnodes = NodeSet::new();
        let mut enodes = NodeSet::new();
        let mut iedges = EdgeSet::new();
        let mut oedges = EdgeSet::new();

        for key in system.active_processes() {
            let tech_scope = ScopeKey::Technology {
                tech: key.tech.clone(),
            };
            tnodes.insert(
                &key.tech,
                Some(AttrList::new().with("href", ctx.tree.href(&scope, &tech_scope))),
            );
            for input in system.process_inputs(&key) {
                let carrier_href = |carrier: &str| {
                    ctx.tree.href(
                        &scope,
                        &ScopeKey::Carrier {
                            carrier: carrier.to_owned(),
                        },
                    )
                };
                enodes.insert(&input, Some(AttrList::new().with("href", carrier_href(&input))));
                for output in system.outputs_for_input(&key, &input) {
                    enodes.insert(
                        &output,
                        Some(AttrList::new().with("href", carrier_href(&output))),
                    );
                    iedges.insert(&input, &key.tech, None);
                    oedges.insert(&key.tech, &output, None);
                }
            }
        }

        if tnodes.is_empty() {
            return Ok(JobOutput::NothingToDraw);
        }

        let mut w = DotWriter::with_banner("model", ARTIFACT_BANNER);
        w.graph_attr("rankdir", "LR");
        w.blank();
        w.node_defaults(&AttrList::new().with("style", "filled"));
        w.edge_defaults(
            &AttrList::new()
                .with("arrowhead", "vee")
                .with("labelfontcolor", "lightgreen"),
        );
        w.blank();
        w.subgraph("techs", |w| {
            w.node_defaults(
                &AttrList::new()
                    .with("color", &palette.tech)
                    .with("shape", "box"),
            );
            w.blank();
            w.nodes(&tnodes);
        });
        w.blank();
        w.subgraph("energy_carriers", |w| {
            w.node_defaults(
                &AttrList::new()
                    .with("color", &palette.carrier)
                    .with("shape", "circle"),
            );
            w.blank();
            w.nodes(&enodes);
        });
        w.blank();
        w.subgraph("inputs", |w| {
            w.edge_defaults(&AttrList::new().with("color", &palette.input_arrow));
            w.blank();
            w.edges(&iedges);
        });
        w.blank();
        w.subgraph("outputs", |w| {
            w.edge_defaults(&AttrList::new().with("color", &palette.output_arrow));
            w.blank();
            w.edges(&oedges);
        });

        write_and_render(ctx, &scope, w.finish()).await
    }
}

/// The overview with nothing collapsed: every (period, tech, vintage)
/// process gets its own node. Unusable for large systems, which is exactly
/// why the collapsed overview exists, but invaluable when debugging a small
/// dataset.
#[derive(Debug, Clone, Default)]
pub struct VintageOverviewJob;

fn process_node_id(period: u32, tech: &str, vintage: u32) -> String {
    format!("{period}, {tech}, {vintage}")
}

#[async_trait]
impl DiagramJob for VintageOverviewJob {
    fn scope(&self) -> ScopeKey {
        ScopeKey::SystemVintages
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
        let scope = self.scope();
        let system = &ctx.system;
        let palette = &ctx.config.palette;

        let mut techs = NodeSet::new();
        let mut carriers = NodeSet::new();
        let mut inputs = EdgeSet::new();
        let mut outputs = EdgeSet::new();

        for key in system.active_processes() {
            let node = process_node_id(key.period, &key.tech, key.vintage);
            techs.insert_plain(&node);
            for input in system.process_inputs(&key) {
                carriers.insert_plain(&input);
                inputs.insert(&input, &node, None);
            }
            for output in system.process_outputs(&key) {
                carriers.insert_plain(&output);
                outputs.insert(&node, &output, None);
            }
        }

        if techs.is_empty() {
            return Ok(JobOutput::NothingToDraw);
        }

        let mut w = DotWriter::with_banner("energy_system", ARTIFACT_BANNER);
        w.graph_attr("rankdir", "LR");
        w.blank();
        w.node_defaults(&AttrList::new().with("style", "filled"));
        w.edge_defaults(&AttrList::new().with("arrowhead", "vee").with("label", "   "));
        w.blank();
        w.subgraph("technologies", |w| {
            w.node_defaults(
                &AttrList::new()
                    .with("color", &palette.tech)
                    .with("shape", "box"),
            );
            w.blank();
            w.nodes(&techs);
        });
        w.blank();
        w.subgraph("energy_carriers", |w| {
            w.node_defaults(
                &AttrList::new()
                    .with("color", &palette.carrier)
                    .with("shape", "circle"),
            );
            w.blank();
            w.nodes(&carriers);
        });
        w.blank();
        w.subgraph("inputs", |w| {
            w.edge_defaults(&AttrList::new().with("color", &palette.input_arrow));
            w.blank();
            w.edges(&inputs);
        });
        w.blank();
        w.subgraph("outputs", |w| {
            w.edge_defaults(&AttrList::new().with("color", &palette.output_arrow));
            w.blank();
            w.edges(&outputs);
        });

        write_and_render(ctx, &scope, w.finish()).await
    }
}
