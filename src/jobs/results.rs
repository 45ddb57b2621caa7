//! Solved-results diagrams: per period, per (period, tech), and per-slice.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::dot::{AttrList, DotWriter, EdgeSet, NodeSet};
use crate::model::{Period, ProcessKey, Vintage};
use crate::scope::ScopeKey;

use super::{DiagramJob, JobContext, JobError, JobOutput, fmt_quantity, write_and_render};

fn splines_attr(ctx: &JobContext) -> &'static str {
    if ctx.config.splines { "true" } else { "false" }
}

/// The solved system in one period. Technologies with surviving capacity
/// are drawn live with capacity labels and links to their per-tech results;
/// everything else, including declared-but-idle carriers and emissions, is
/// greyed out so absences are as visible as activity.
#[derive(Debug, Clone)]
pub struct PeriodResultsJob {
    pub period: Period,
}

impl PeriodResultsJob {
    #[must_use]
    pub fn new(period: Period) -> Self {
        Self { period }
    }
}

#[async_trait]
impl DiagramJob for PeriodResultsJob {
    fn scope(&self) -> ScopeKey {
        ScopeKey::PeriodResults {
            period: self.period,
        }
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
        let scope = self.scope();
        let system = &ctx.system;
        let config = &ctx.config;
        let palette = &config.palette;
        let period = self.period;

        let mut live_techs = NodeSet::new();
        let mut dead_techs = NodeSet::new();
        let mut live_carriers = NodeSet::new();
        let mut live_emissions = NodeSet::new();
        let mut in_flows = EdgeSet::new();
        let mut out_flows = EdgeSet::new();
        let mut dead_flows = EdgeSet::new();
        let mut used_carriers: BTreeSet<String> = BTreeSet::new();
        let mut used_emissions: BTreeSet<String> = BTreeSet::new();

        let usage_href = |carrier: &str| {
            ctx.tree.href(
                &scope,
                &ScopeKey::CarrierUsage {
                    carrier: carrier.to_owned(),
                    period,
                },
            )
        };

        for tech in system.technologies() {
            // Techs that never entered the solution stay off this diagram
            // entirely; only a zero *surviving* capacity is worth showing.
            let Some(cap) = system.available_capacity(period, &tech) else {
                continue;
            };
            if cap > 0.0 {
                let href = ctx.tree.href(
                    &scope,
                    &ScopeKey::TechResults {
                        period,
                        tech: tech.clone(),
                    },
                );
                live_techs.insert(
                    &tech,
                    Some(
                        AttrList::new()
                            .with("label", format!("{tech}\nCapacity: {}", fmt_quantity(cap)))
                            .with("href", href),
                    ),
                );
            } else {
                dead_techs.insert_plain(&tech);
            }

            for vintage in system.vintages(period, &tech) {
                let key = ProcessKey::new(period, &tech, vintage);
                for input in system.process_inputs(&key) {
                    let flow = system.flow_in(period, &input, &tech);
                    if config.significant(flow) {
                        in_flows.insert(
                            &input,
                            &tech,
                            Some(AttrList::new().with("label", fmt_quantity(flow))),
                        );
                        live_carriers
                            .insert(&input, Some(AttrList::new().with("href", usage_href(&input))));
                        used_carriers.insert(input);
                    } else {
                        dead_flows.insert(&input, &tech, None);
                    }
                }
                for output in system.process_outputs(&key) {
                    let flow = system.flow_out(period, &tech, &output);
                    if config.significant(flow) {
                        out_flows.insert(
                            &tech,
                            &output,
                            Some(AttrList::new().with("label", fmt_quantity(flow))),
                        );
                        live_carriers.insert(
                            &output,
                            Some(AttrList::new().with("href", usage_href(&output))),
                        );
                        used_carriers.insert(output);
                    } else {
                        dead_flows.insert(&tech, &output, None);
                    }
                }
            }
        }

        if live_techs.is_empty() && dead_techs.is_empty() {
            return Ok(JobOutput::NothingToDraw);
        }

        for (tech, emission) in system.emission_links() {
            if system.vintages(period, &tech).is_empty() {
                continue;
            }
            let amount = system.emission_activity(period, &tech, &emission);
            if !config.significant(amount) {
                continue;
            }
            out_flows.insert(
                &tech,
                &emission,
                Some(AttrList::new().with("label", fmt_quantity(amount))),
            );
            live_emissions.insert_plain(&emission);
            used_emissions.insert(emission);
        }

        let mut dead_carriers = NodeSet::new();
        for carrier in system.carriers() {
            if !used_carriers.contains(&carrier) {
                dead_carriers.insert_plain(&carrier);
            }
        }
        let mut dead_emissions = NodeSet::new();
        for emission in system.emissions() {
            if !used_emissions.contains(&emission) {
                dead_emissions.insert_plain(&emission);
            }
        }

        let unused_nodes = |shape: &str| {
            AttrList::new()
                .with("color", &palette.unused)
                .with("fontcolor", &palette.unused_font)
                .with("shape", shape)
        };
        let used_nodes = |color: &str, shape: &str| {
            AttrList::new()
                .with("color", color)
                .with("fontcolor", &palette.used_font)
                .with("shape", shape)
        };

        let mut w = DotWriter::strict_digraph("model");
        w.graph_attr("label", format!("Results for {period}"));
        w.blank();
        w.graph_attr("rankdir", "LR");
        w.graph_attr("smoothtype", "power_dist");
        w.graph_attr("splines", splines_attr(ctx));
        w.blank();
        w.node_defaults(&AttrList::new().with("style", "filled"));
        w.edge_defaults(&AttrList::new().with("arrowhead", "vee"));
        w.blank();
        w.subgraph("unused_techs", |w| {
            w.node_defaults(&unused_nodes("box"));
            w.blank();
            w.nodes(&dead_techs);
        });
        w.blank();
        w.subgraph("unused_energy_carriers", |w| {
            w.node_defaults(&unused_nodes("circle"));
            w.blank();
            w.nodes(&dead_carriers);
        });
        w.blank();
        w.subgraph("unused_emissions", |w| {
            w.node_defaults(&unused_nodes("circle"));
            w.blank();
            w.nodes(&dead_emissions);
        });
        w.blank();
        w.subgraph("in_use_techs", |w| {
            w.node_defaults(&used_nodes(&palette.tech, "box"));
            w.blank();
            w.nodes(&live_techs);
        });
        w.blank();
        w.subgraph("in_use_energy_carriers", |w| {
            w.node_defaults(&used_nodes(&palette.carrier, "circle"));
            w.blank();
            w.nodes(&live_carriers);
        });
        w.blank();
        w.subgraph("in_use_emissions", |w| {
            w.node_defaults(&used_nodes(&palette.carrier, "circle"));
            w.blank();
            w.nodes(&live_emissions);
        });
        w.blank();
        w.subgraph("unused_flows", |w| {
            w.edge_defaults(&AttrList::new().with("color", &palette.unused));
            w.blank();
            w.edges(&dead_flows);
        });
        w.blank();
        w.subgraph("in_use_flows", |w| {
            w.subgraph("inputs", |w| {
                w.edge_defaults(&AttrList::new().with("color", &palette.input_arrow));
                w.blank();
                w.edges(&in_flows);
            });
            w.blank();
            w.subgraph("outputs", |w| {
                w.edge_defaults(&AttrList::new().with("color", &palette.output_arrow));
                w.blank();
                w.edges(&out_flows);
            });
        });

        write_and_render(ctx, &scope, w.finish()).await
    }
}

/// Solved flows of one technology in one period, broken out by vintage.
/// Vintage nodes link down into the per-slice segment diagrams and the
/// cluster header links back up to the period results.
#[derive(Debug, Clone)]
pub struct TechResultsJob {
    pub period: Period,
    pub tech: String,
}

impl TechResultsJob {
    pub fn new(period: Period, tech: impl Into<String>) -> Self {
        Self {
            period,
            tech: tech.into(),
        }
    }
}

#[async_trait]
impl DiagramJob for TechResultsJob {
    fn scope(&self) -> ScopeKey {
        ScopeKey::TechResults {
            period: self.period,
            tech: self.tech.clone(),
        }
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
        let scope = self.scope();
        let system = &ctx.system;
        let palette = &ctx.config.palette;
        let period = self.period;

        let Some(total_cap) = system.available_capacity(period, &self.tech) else {
            return Ok(JobOutput::NothingToDraw);
        };

        let mut vnodes = NodeSet::new();
        let mut enodes = NodeSet::new();
        let mut iedges = EdgeSet::new();
        let mut oedges = EdgeSet::new();

        let usage_href = |carrier: &str| {
            ctx.tree.href(
                &scope,
                &ScopeKey::CarrierUsage {
                    carrier: carrier.to_owned(),
                    period,
                },
            )
        };

        for vintage in system.vintages(period, &self.tech) {
            let key = ProcessKey::new(period, &self.tech, vintage);
            if system.activity(&key) == 0.0 {
                continue;
            }
            let cap = system.capacity(&self.tech, vintage).unwrap_or_default();
            let vnode = vintage.to_string();
            let segments_href = ctx.tree.href(
                &scope,
                &ScopeKey::Segments {
                    period,
                    tech: self.tech.clone(),
                    vintage,
                },
            );
            for input in system.process_inputs(&key) {
                for output in system.outputs_for_input(&key, &input) {
                    let totals = system.vintage_flow(&key, &input, &output);
                    vnodes.insert(
                        &vnode,
                        Some(
                            AttrList::new()
                                .with("href", &segments_href)
                                .with("label", format!("{vintage}\nCap: {}", fmt_quantity(cap))),
                        ),
                    );
                    enodes.insert(&input, Some(AttrList::new().with("href", usage_href(&input))));
                    enodes
                        .insert(&output, Some(AttrList::new().with("href", usage_href(&output))));
                    iedges.insert(
                        &input,
                        &vnode,
                        Some(AttrList::new().with("label", fmt_quantity(totals.consumed))),
                    );
                    oedges.insert(
                        &vnode,
                        &output,
                        Some(AttrList::new().with("label", fmt_quantity(totals.produced))),
                    );
                }
            }
        }

        if vnodes.is_empty() {
            return Ok(JobOutput::NothingToDraw);
        }

        let period_href = ctx
            .tree
            .href(&scope, &ScopeKey::PeriodResults { period });

        let mut w = DotWriter::strict_digraph("model");
        w.graph_attr("label", format!("Results for {} in {period}", self.tech));
        w.blank();
        w.graph_attr("compound", "true");
        w.graph_attr("concentrate", "true");
        w.graph_attr("rankdir", "LR");
        w.graph_attr("splines", splines_attr(ctx));
        w.blank();
        w.node_defaults(&AttrList::new().with("style", "filled"));
        w.edge_defaults(&AttrList::new().with("arrowhead", "vee"));
        w.blank();
        w.cluster("vintages", |w| {
            w.graph_attr(
                "label",
                format!("Vintages\nCapacity: {}", fmt_quantity(total_cap)),
            );
            w.graph_attr("href", &period_href);
            w.graph_attr("style", "filled");
            w.graph_attr("color", &palette.cluster_fill);
            w.blank();
            w.node_defaults(
                &AttrList::new()
                    .with("color", &palette.cluster_node)
                    .with("shape", "box"),
            );
            w.blank();
            w.nodes(&vnodes);
        });
        w.blank();
        w.subgraph("energy_carriers", |w| {
            w.node_defaults(
                &AttrList::new()
                    .with("color", &palette.carrier)
                    .with("fontcolor", &palette.used_font)
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

/// How one process split its activity across time slices: one node per
/// slice with a significant flow, every input→output conversion included.
#[derive(Debug, Clone)]
pub struct SegmentsJob {
    pub period: Period,
    pub tech: String,
    pub vintage: Vintage,
}

impl SegmentsJob {
    pub fn new(period: Period, tech: impl Into<String>, vintage: Vintage) -> Self {
        Self {
            period,
            tech: tech.into(),
            vintage,
        }
    }
}

#[async_trait]
impl DiagramJob for SegmentsJob {
    fn scope(&self) -> ScopeKey {
        ScopeKey::Segments {
            period: self.period,
            tech: self.tech.clone(),
            vintage: self.vintage,
        }
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
        let scope = self.scope();
        let system = &ctx.system;
        let palette = &ctx.config.palette;
        let period = self.period;

        let Some(total_cap) = system.available_capacity(period, &self.tech) else {
            return Ok(JobOutput::NothingToDraw);
        };
        let key = ProcessKey::new(period, &self.tech, self.vintage);

        let mut snodes = NodeSet::new();
        let mut enodes = NodeSet::new();
        let mut iedges = EdgeSet::new();
        let mut oedges = EdgeSet::new();

        let usage_href = |carrier: &str| {
            ctx.tree.href(
                &scope,
                &ScopeKey::CarrierUsage {
                    carrier: carrier.to_owned(),
                    period,
                },
            )
        };

        for input in system.process_inputs(&key) {
            for output in system.outputs_for_input(&key, &input) {
                for slice in system.time_slices() {
                    let flow = system.slice_flow(&key, &input, &output, &slice);
                    if flow.consumed == 0.0 {
                        continue;
                    }
                    let snode = slice.label();
                    snodes.insert_plain(&snode);
                    enodes.insert(&input, Some(AttrList::new().with("href", usage_href(&input))));
                    enodes
                        .insert(&output, Some(AttrList::new().with("href", usage_href(&output))));
                    iedges.insert(
                        &input,
                        &snode,
                        Some(AttrList::new().with("label", fmt_quantity(flow.consumed))),
                    );
                    oedges.insert(
                        &snode,
                        &output,
                        Some(AttrList::new().with("label", fmt_quantity(flow.produced))),
                    );
                }
            }
        }

        if snodes.is_empty() {
            return Ok(JobOutput::NothingToDraw);
        }

        let mut w = DotWriter::strict_digraph("model");
        w.graph_attr(
            "label",
            format!(
                "Activity split of process {}, {} in year {period}",
                self.tech, self.vintage
            ),
        );
        w.blank();
        w.graph_attr("compound", "true");
        w.graph_attr("concentrate", "true");
        w.graph_attr("rankdir", "LR");
        w.graph_attr("splines", splines_attr(ctx));
        w.blank();
        w.node_defaults(&AttrList::new().with("style", "filled"));
        w.edge_defaults(&AttrList::new().with("arrowhead", "vee"));
        w.blank();
        w.cluster("slices", |w| {
            w.graph_attr(
                "label",
                format!("{} Capacity: {}", self.vintage, fmt_quantity(total_cap)),
            );
            w.graph_attr("color", &palette.cluster_fill);
            w.graph_attr("rank", "same");
            w.graph_attr("style", "filled");
            w.blank();
            w.node_defaults(
                &AttrList::new()
                    .with("color", &palette.cluster_node)
                    .with("shape", "box"),
            );
            w.blank();
            w.nodes(&snodes);
        });
        w.blank();
        w.subgraph("energy_carriers", |w| {
            w.node_defaults(
                &AttrList::new()
                    .with("color", &palette.carrier)
                    .with("fontcolor", &palette.used_font)
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
