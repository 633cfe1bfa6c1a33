//! Diagnostic tracing for the runner.
//!
//! Product output (per-stage verdicts, pass summary) goes to stdout from the
//! CLI. Tracing goes to stderr and is controlled by `RUST_LOG` or `--verbose`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `verbose`.
///
/// # Example
/// ```bash
/// RUST_LOG=levelrunner=trace levelrunner submit
/// ```
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
