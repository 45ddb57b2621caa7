//! Tracing setup shared by binaries and integration tests.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// The filter honors `RUST_LOG` and falls back to `info` for this crate.
/// Safe to call more than once; later calls are no-ops, which keeps test
/// binaries that share a process from fighting over the subscriber.
pub fn init() {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,fluxdot=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .ok();
}
