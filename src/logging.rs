use std::io;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "POMOTASK_LOG";

/// Install the global subscriber. Output goes to stderr so `--json` output on
/// stdout stays machine-readable.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
