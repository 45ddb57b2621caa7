//! # Fluxdot: Concurrent Graphviz Diagrams for Energy-Flow Models
//!
//! Fluxdot turns a sparse energy-system model into a navigable family of
//! Graphviz diagrams: a system overview, per-carrier and per-technology
//! views, and solved-results views per period, technology, and time slice,
//! all cross-linked through `href` attributes in the rendered images.
//!
//! ## Core Concepts
//!
//! - **Model**: the [`model::EnergySystem`] trait is the read-only query
//!   surface; [`model::SparseSystem`] is the in-memory implementation
//! - **Scope keys**: every diagram is identified by a [`scope::ScopeKey`],
//!   which also decides its output path and cross-link targets
//! - **DOT construction**: deduplicating, order-independent statement sets
//!   and a document writer in [`dot`], producing byte-identical artifacts
//!   for identical models
//! - **Jobs**: one independent [`jobs::DiagramJob`] per diagram; a job with
//!   no data skips without touching disk
//! - **Dispatch**: [`dispatch::Dispatcher`] runs a batch under a
//!   concurrency bound and per-job timeout and reports one terminal
//!   outcome per job
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use fluxdot::config::RenderConfig;
//! use fluxdot::model::SparseSystem;
//! use fluxdot::planner::generate_diagrams;
//!
//! # #[tokio::main]
//! # async fn main() -> miette::Result<()> {
//! fluxdot::telemetry::init();
//!
//! let system = SparseSystem::builder()
//!     .conversion(2025, "coal_plant", 2020, "coal", "electricity")
//!     .available_capacity(2025, "coal_plant", 4.0)
//!     .build();
//!
//! let report = generate_diagrams(
//!     Arc::new(system),
//!     RenderConfig::default(),
//!     Path::new("out"),
//!     "utopia",
//! )
//! .await
//! .map_err(miette::Report::new)?;
//!
//! println!("{}", report.summary_json());
//! if report.degraded() {
//!     eprintln!("{} of {} diagrams failed", report.failed, report.total());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Rendering requires a Graphviz install; set `FLUXDOT_DOT_BIN` when `dot`
//! is not on `PATH`.

pub mod config;
pub mod dispatch;
pub mod dot;
pub mod jobs;
pub mod model;
pub mod outdir;
pub mod planner;
pub mod render;
pub mod scope;
pub mod telemetry;

pub use dispatch::{BatchEvent, BatchReport, Dispatcher};
pub use planner::{generate_diagrams, plan_jobs};
