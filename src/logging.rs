// Diagnostic logging. User-facing output goes through `ui::Console`; this
// only sets up `tracing` events, written to stderr so they never mix with
// the progress bar or the final address on stdout.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,portal_upload=debug"
    } else {
        "warn"
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}
