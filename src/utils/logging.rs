//! Diagnostic logging setup.
//!
//! Console output for the operator goes through `ui`; this is the
//! `tracing` side, written to stderr and filtered by `HUBCTL_LOG`.

use crate::project_identity;
use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let fallback = if verbose { "hubctl=debug" } else { "hubctl=warn" };
    let filter = std::env::var(project_identity::env_key("LOG"))
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
