//! Diagnostic logging for the CLI.
//!
//! The runtime emits `tracing` events; this module installs the only
//! subscriber. Filter comes from `WAYPOINT_LOG` (same syntax as
//! `RUST_LOG`), default `warn`. Output goes to stderr so that stdout
//! stays machine-readable.
//!
//! ```bash
//! WAYPOINT_LOG=waypoint_runtime=debug waypoint step ...
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub(crate) const LOG_ENV: &str = "WAYPOINT_LOG";

pub(crate) fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
