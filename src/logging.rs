//! Diagnostic logging.
//!
//! Code logs through the `log` macros; `init` installs a `tracing-subscriber`
//! formatter that picks those records up and writes them to stderr, keeping
//! stdout for application output.

use tracing_subscriber::EnvFilter;

/// Reads `RUST_LOG`, defaulting to `warn`.
///
/// ```bash
/// RUST_LOG=app_runner=debug app_runner
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
