//! Tracing subscriber setup for binaries and tests embedding routemap.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive, e.g. `routemap_analysis=debug`.
pub const LOG_ENV_VAR: &str = "ROUTEMAP_LOG";

/// Install a global fmt subscriber filtered by `ROUTEMAP_LOG` (default `warn`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
