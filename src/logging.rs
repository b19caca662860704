// src/logging.rs
// =============================================================================
// This module sets up logging with `tracing`.
//
// - Logs go to stderr so stdout only carries results
// - RUST_LOG wins if it is set (e.g. RUST_LOG=reference_codeblock=debug)
// - Otherwise only warnings are shown, or debug output with --verbose
// =============================================================================

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("reference_codeblock=debug,warn")
    } else {
        EnvFilter::new("warn")
    };

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if let Err(err) = init_result {
        tracing::warn!(error = %err, "tracing already initialized; skipping setup");
    }
}
