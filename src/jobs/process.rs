//! Per-technology diagrams, in either vintage layout.

use async_trait::async_trait;

use crate::config::VintageLayout;
use crate::dot::{AttrList, DotWriter, EdgeSet, NodeSet};
use crate::model::{Period, ProcessKey, Vintage};
use crate::scope::ScopeKey;

use super::{DiagramJob, JobContext, JobError, JobOutput, fmt_quantity, write_and_render};

/// One technology across all of its periods and vintages.
///
/// The clustered layout groups vintage and period nodes into bordered
/// clusters and routes carrier flows through one anchor node per cluster;
/// internal vintage→period edges cycle through the rainbow palette so the
/// parallel connections stay distinguishable. The explicit layout instead
/// draws one node per (period, vintage) pair with every flow spelled out.
#[derive(Debug, Clone)]
pub struct ProcessJob {
    pub tech: String,
    pub layout: VintageLayout,
}

impl ProcessJob {
    pub fn new(tech: impl Into<String>, layout: VintageLayout) -> Self {
        Self {
            tech: tech.into(),
            layout,
        }
    }

    fn keys(&self, ctx: &JobContext) -> Vec<ProcessKey> {
        ctx.system
            .active_processes()
            .into_iter()
            .filter(|key| key.tech == self.tech)
            .collect()
    }

    fn carrier_href(&self, ctx: &JobContext, carrier: &str) -> String {
        ctx.tree.href(
            &self.scope(),
            &ScopeKey::Carrier {
                carrier: carrier.to_owned(),
            },
        )
    }

    async fn run_clustered(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
        let scope = self.scope();
        let system = &ctx.system;
        let config = &ctx.config;
        let palette = &config.palette;

        let keys = self.keys(ctx);
        if keys.is_empty() {
            // Declared as a technology but used by no process.
            return Ok(JobOutput::NothingToDraw);
        }

        let periods: Vec<Period> = {
            let mut v: Vec<Period> = keys.iter().map(|k| k.period).collect();
            v.sort_unstable();
            v.dedup();
            v
        };
        let vintages: Vec<Vintage> = {
            let mut v: Vec<Vintage> = keys.iter().map(|k| k.vintage).collect();
            v.sort_unstable();
            v.dedup();
            v
        };
        // External flows all attach to one anchor per cluster so the graph
        // stays readable; the middle entry keeps the anchors centered.
        let mid_period = periods[periods.len() / 2];
        let mid_vintage = vintages[vintages.len() / 2];

        let mut pnodes = NodeSet::new();
        let mut vnodes = NodeSet::new();
        let mut input_nodes = NodeSet::new();
        let mut output_nodes = NodeSet::new();
        let mut external = EdgeSet::new();
        let mut internal = EdgeSet::new();

        let mut rainbow_idx = 0usize;
        for key in &keys {
            let pnode = format!("p_{}", key.period);
            let vnode = format!("v_{}", key.vintage);
            let pattr = config
                .show_capacity
                .then(|| system.available_capacity(key.period, &self.tech))
                .flatten()
                .map(|cap| {
                    AttrList::new().with(
                        "label",
                        format!("p{}\nTotal Capacity: {}", key.period, fmt_quantity(cap)),
                    )
                });
            let vattr = config
                .show_capacity
                .then(|| system.capacity(&self.tech, key.vintage))
                .flatten()
                .map(|cap| {
                    AttrList::new().with(
                        "label",
                        format!("v{}\nCapacity: {}", key.vintage, fmt_quantity(cap)),
                    )
                });
            pnodes.insert(&pnode, pattr);
            vnodes.insert(&vnode, vattr);

            for input in system.process_inputs(key) {
                for output in system.outputs_for_input(key, &input) {
                    let color = palette.rainbow_color(rainbow_idx).to_owned();
                    rainbow_idx += 1;

                    input_nodes.insert(
                        &input,
                        Some(
                            AttrList::new()
                                .with("color", &palette.input_carrier)
                                .with("href", self.carrier_href(ctx, &input)),
                        ),
                    );
                    output_nodes.insert(
                        &output,
                        Some(
                            AttrList::new()
                                .with("color", &palette.output_carrier)
                                .with("href", self.carrier_href(ctx, &output)),
                        ),
                    );
                    external.insert(
                        &input,
                        format!("v_{mid_vintage}"),
                        Some(
                            AttrList::new()
                                .with("color", &palette.input_arrow)
                                .with("lhead", "cluster_vintage"),
                        ),
                    );
                    external.insert(
                        format!("p_{mid_period}"),
                        &output,
                        Some(
                            AttrList::new()
                                .with("color", &palette.output_arrow)
                                .with("ltail", "cluster_period"),
                        ),
                    );
                    internal.insert(&vnode, &pnode, Some(AttrList::new().with("color", color)));
                }
            }
        }

        let overview_href = ctx.tree.href(&scope, &ScopeKey::System);

        let mut w = DotWriter::strict_digraph("model");
        w.graph_attr("label", &self.tech);
        w.blank();
        w.graph_attr("bgcolor", "transparent");
        w.graph_attr("color", "black");
        w.graph_attr("compound", "true");
        w.graph_attr("concentrate", "true");
        w.graph_attr("rankdir", "LR");
        w.graph_attr("splines", if config.splines { "true" } else { "false" });
        w.blank();
        w.node_defaults(&AttrList::new().with("shape", "box").with("style", "filled"));
        w.edge_defaults(
            &AttrList::new()
                .with("arrowhead", "vee")
                .with("decorate", "true")
                .with("dir", "both")
                .with("fontsize", "8")
                .with("label", "   ")
                .with("labelfloat", "false")
                .with("labelfontcolor", "lightgreen")
                .with("len", "2")
                .with("weight", "0.5"),
        );
        w.blank();
        w.cluster("vintage", |w| {
            w.graph_attr("label", "Vintages");
            w.graph_attr("color", &palette.cluster_fill);
            w.graph_attr("style", "filled");
            w.graph_attr("href", &overview_href);
            w.blank();
            w.node_defaults(&AttrList::new().with("color", &palette.cluster_node));
            w.blank();
            w.nodes(&vnodes);
        });
        w.blank();
        w.cluster("period", |w| {
            w.graph_attr("label", "Period");
            w.graph_attr("color", &palette.cluster_fill);
            w.graph_attr("style", "filled");
            w.graph_attr("href", &overview_href);
            w.blank();
            w.node_defaults(&AttrList::new().with("color", &palette.cluster_node));
            w.blank();
            w.nodes(&pnodes);
        });
        w.blank();
        w.subgraph("energy_carriers", |w| {
            w.node_defaults(&AttrList::new().with("shape", "circle"));
            w.blank();
            w.comment("input carriers");
            w.nodes(&input_nodes);
            w.blank();
            w.comment("output carriers");
            w.nodes(&output_nodes);
        });
        w.blank();
        w.subgraph("external_edges", |w| {
            w.edge_defaults(&AttrList::new().with("arrowhead", "normal").with("dir", "forward"));
            w.blank();
            w.edges(&external);
        });
        w.blank();
        w.subgraph("internal_edges", |w| {
            w.comment("edges between vintages and periods");
            w.edges(&internal);
        });

        write_and_render(ctx, &scope, w.finish()).await
    }

    async fn run_explicit(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
        let scope = self.scope();
        let system = &ctx.system;
        let config = &ctx.config;
        let palette = &config.palette;

        let keys = self.keys(ctx);

        let mut input_nodes = NodeSet::new();
        let mut output_nodes = NodeSet::new();
        let mut vnodes = NodeSet::new();
        let mut edges = EdgeSet::new();

        let overview_href = ctx.tree.href(&scope, &ScopeKey::System);
        for key in &keys {
            let vnode = format!("p{}_v{}", key.period, key.vintage);
            for input in system.process_inputs(key) {
                for output in system.outputs_for_input(key, &input) {
                    input_nodes.insert(
                        &input,
                        Some(
                            AttrList::new()
                                .with("color", &palette.carrier)
                                .with("href", self.carrier_href(ctx, &input)),
                        ),
                    );
                    output_nodes.insert(
                        &output,
                        Some(
                            AttrList::new()
                                .with("color", &palette.carrier)
                                .with("href", self.carrier_href(ctx, &output)),
                        ),
                    );

                    let mut vattr = AttrList::new().with("color", &palette.tech);
                    if config.show_capacity {
                        if let Some(cap) = system.capacity(&self.tech, key.vintage) {
                            vattr = vattr.with(
                                "label",
                                format!("{vnode}\nCapacity = {}", fmt_quantity(cap)),
                            );
                        }
                    }
                    vnodes.insert(&vnode, Some(vattr.with("href", &overview_href)));

                    edges.insert(
                        &input,
                        &vnode,
                        Some(
                            AttrList::new()
                                .with("color", &palette.input_arrow)
                                .with("sametail", &input),
                        ),
                    );
                    edges.insert(
                        &vnode,
                        &output,
                        Some(
                            AttrList::new()
                                .with("color", &palette.output_arrow)
                                .with("samehead", &output),
                        ),
                    );
                }
            }
        }

        if vnodes.is_empty() {
            return Ok(JobOutput::NothingToDraw);
        }

        let mut w = DotWriter::strict_digraph("model");
        w.graph_attr("label", &self.tech);
        w.blank();
        w.graph_attr("color", "black");
        w.graph_attr("concentrate", "true");
        w.graph_attr("rankdir", "LR");
        w.blank();
        w.node_defaults(&AttrList::new().with("shape", "box").with("style", "filled"));
        w.edge_defaults(
            &AttrList::new()
                .with("arrowhead", "vee")
                .with("decorate", "true")
                .with("label", "   ")
                .with("labelfontcolor", "lightgreen"),
        );
        w.blank();
        w.subgraph("energy_carriers", |w| {
            w.node_defaults(&AttrList::new().with("shape", "circle"));
            w.blank();
            w.comment("input carriers");
            w.nodes(&input_nodes);
            w.blank();
            w.comment("output carriers");
            w.nodes(&output_nodes);
        });
        w.blank();
        w.comment("vintage nodes");
        w.nodes(&vnodes);
        w.blank();
        w.comment("flows and any vintage-specific attributes");
        w.edges(&edges);

        write_and_render(ctx, &scope, w.finish()).await
    }
}

#[async_trait]
impl DiagramJob for ProcessJob {
    fn scope(&self) -> ScopeKey {
        ScopeKey::Technology {
            tech: self.tech.clone(),
        }
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
        match self.layout {
            VintageLayout::Clustered => self.run_clustered(ctx).await,
            VintageLayout::Explicit => self.run_explicit(ctx).await,
        }
    }
}
