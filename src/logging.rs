// Logging setup (tracing-subscriber)
//
// RUST_LOG overrides the default level, e.g.
//   RUST_LOG=bank_reconciliation=debug bank-reconcile ...
// Output goes to stderr so the JSON report on stdout stays clean.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Verbose subscriber for tests; safe to call repeatedly
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
