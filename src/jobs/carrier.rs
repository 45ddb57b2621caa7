//! Per-carrier diagrams: structural flows and solved per-period usage.

use async_trait::async_trait;

use crate::dot::{AttrList, DotWriter, EdgeSet, NodeSet};
use crate::model::Period;
use crate::scope::ScopeKey;

use super::{
    ARTIFACT_BANNER, DiagramJob, JobContext, JobError, JobOutput, write_and_render,
};

/// One carrier and every technology that produces or consumes it.
///
/// Purely structural: no solved quantities appear. Technology nodes link to
/// their process diagrams and the carrier itself links back to the system
/// overview.
#[derive(Debug, Clone)]
pub struct CarrierJob {
    pub carrier: String,
}

impl CarrierJob {
    pub fn new(carrier: impl Into<String>) -> Self {
        Self {
            carrier: carrier.into(),
        }
    }
}

#[async_trait]
impl DiagramJob for CarrierJob {
    fn scope(&self) -> ScopeKey {
        ScopeKey::Carrier {
            carrier: self.carrier.clone(),
        }
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
        let scope = self.scope();
        let system = &ctx.system;
        let palette = &ctx.config.palette;

        let consumers = system.consumers_of(&self.carrier);
        let producers = system.producers_of(&self.carrier);
        if consumers.is_empty() && producers.is_empty() {
            return Ok(JobOutput::NothingToDraw);
        }

        let mut enodes = NodeSet::new();
        let mut tnodes = NodeSet::new();
        let mut iedges = EdgeSet::new();
        let mut oedges = EdgeSet::new();

        enodes.insert(
            &self.carrier,
            Some(AttrList::new().with("href", ctx.tree.href(&scope, &ScopeKey::System))),
        );
        let tech_href = |tech: &str| {
            ctx.tree.href(
                &scope,
                &ScopeKey::Technology {
                    tech: tech.to_owned(),
                },
            )
        };
        for tech in &consumers {
            tnodes.insert(tech, Some(AttrList::new().with("href", tech_href(tech))));
            iedges.insert(&self.carrier, tech, None);
        }
        for tech in &producers {
            tnodes.insert(tech, Some(AttrList::new().with("href", tech_href(tech))));
            oedges.insert(tech, &self.carrier, None);
        }

        let mut w = DotWriter::with_banner("energy_carrier", ARTIFACT_BANNER);
        w.graph_attr("label", &self.carrier);
        w.blank();
        w.graph_attr("color", "black");
        w.graph_attr("compound", "true");
        w.graph_attr("concentrate", "true");
        w.graph_attr("rankdir", "LR");
        w.graph_attr("splines", "true");
        w.blank();
        w.node_defaults(&AttrList::new().with("style", "filled"));
        w.edge_defaults(
            &AttrList::new()
                .with("arrowhead", "vee")
                .with("fontsize", "8")
                .with("label", "   ")
                .with("labelfloat", "false")
                .with("len", "2")
                .with("weight", "0.5"),
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
        w.subgraph("outputs", |w| {
            w.edge_defaults(&AttrList::new().with("color", &palette.output_arrow));
            w.blank();
            w.edges(&oedges);
        });
        w.blank();
        w.subgraph("inputs", |w| {
            w.edge_defaults(&AttrList::new().with("color", &palette.input_arrow));
            w.blank();
            w.edges(&iedges);
        });

        write_and_render(ctx, &scope, w.finish()).await
    }
}

/// Solved usage of one carrier in one period: technologies that actually
/// moved a significant amount of it are drawn live and link to their result
/// diagrams; the rest are greyed out.
#[derive(Debug, Clone)]
pub struct CarrierUsageJob {
    pub carrier: String,
    pub period: Period,
}

impl CarrierUsageJob {
    pub fn new(carrier: impl Into<String>, period: Period) -> Self {
        Self {
            carrier: carrier.into(),
            period,
        }
    }

    /// A tech counts as used when any of its input flows in this period
    /// clears the significance threshold.
    fn tech_used(&self, ctx: &JobContext, tech: &str) -> bool {
        ctx.system
            .active_processes()
            .iter()
            .filter(|key| key.period == self.period && key.tech == tech)
            .any(|key| {
                ctx.system
                    .process_inputs(key)
                    .iter()
                    .any(|input| ctx.config.significant(ctx.system.flow_in(self.period, input, tech)))
            })
    }
}

#[async_trait]
impl DiagramJob for CarrierUsageJob {
    fn scope(&self) -> ScopeKey {
        ScopeKey::CarrierUsage {
            carrier: self.carrier.clone(),
            period: self.period,
        }
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
        let scope = self.scope();
        let system = &ctx.system;
        let palette = &ctx.config.palette;

        let consumers = system.consumers_of(&self.carrier);
        let producers = system.producers_of(&self.carrier);
        if consumers.is_empty() && producers.is_empty() {
            return Ok(JobOutput::NothingToDraw);
        }

        let mut used_nodes = NodeSet::new();
        let mut unused_nodes = NodeSet::new();
        let mut used_edges = EdgeSet::new();
        let mut unused_edges = EdgeSet::new();

        let results_href = |tech: &str| {
            ctx.tree.href(
                &scope,
                &ScopeKey::TechResults {
                    period: self.period,
                    tech: tech.to_owned(),
                },
            )
        };
        for tech in &consumers {
            if self.tech_used(ctx, tech) {
                used_nodes.insert(tech, Some(AttrList::new().with("href", results_href(tech))));
                used_edges.insert(&self.carrier, tech, None);
            } else {
                unused_nodes.insert_plain(tech);
                unused_edges.insert(&self.carrier, tech, None);
            }
        }
        for tech in &producers {
            if self.tech_used(ctx, tech) {
                used_nodes.insert(tech, Some(AttrList::new().with("href", results_href(tech))));
                used_edges.insert(tech, &self.carrier, None);
            } else {
                unused_nodes.insert_plain(tech);
                unused_edges.insert(tech, &self.carrier, None);
            }
        }

        let mut resource = NodeSet::new();
        resource.insert(
            &self.carrier,
            Some(
                AttrList::new()
                    .with("color", &palette.carrier)
                    .with(
                        "href",
                        ctx.tree.href(
                            &scope,
                            &ScopeKey::PeriodResults {
                                period: self.period,
                            },
                        ),
                    )
                    .with("shape", "circle"),
            ),
        );

        let mut w = DotWriter::strict_digraph(&format!("result_commodity_{}", self.carrier));
        w.graph_attr("label", format!("{} - {}", self.carrier, self.period));
        w.blank();
        w.graph_attr("compound", "true");
        w.graph_attr("concentrate", "true");
        w.graph_attr("rankdir", "LR");
        w.graph_attr("splines", "true");
        w.blank();
        w.node_defaults(&AttrList::new().with("shape", "box").with("style", "filled"));
        w.edge_defaults(
            &AttrList::new()
                .with("arrowhead", "vee")
                .with("fontsize", "8")
                .with("label", "   ")
                .with("labelfloat", "false")
                .with("labelfontcolor", "lightgreen")
                .with("len", "2")
                .with("weight", "0.5"),
        );
        w.blank();
        w.nodes(&resource);
        w.blank();
        w.subgraph("used_techs", |w| {
            w.node_defaults(&AttrList::new().with("color", &palette.tech));
            w.blank();
            w.nodes(&used_nodes);
        });
        w.blank();
        w.subgraph("unused_techs", |w| {
            w.node_defaults(&AttrList::new().with("color", &palette.unused));
            w.blank();
            w.nodes(&unused_nodes);
        });
        w.blank();
        w.subgraph("in_use_flows", |w| {
            w.edge_defaults(&AttrList::new().with("color", &palette.flow_arrow));
            w.blank();
            w.edges(&used_edges);
        });
        w.blank();
        w.subgraph("unused_flows", |w| {
            w.edge_defaults(&AttrList::new().with("color", &palette.unused));
            w.blank();
            w.edges(&unused_edges);
        });

        write_and_render(ctx, &scope, w.finish()).await
    }
}
