//! Tracing subscriber setup for the `safe-scan` binary.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins when set; otherwise the
/// default level is `info` with `--verbose` and `warn` without.
pub fn init(verbose: bool) {
    let default = if verbose {
        "safe_scan=info,safe_scan_core=info,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (e.g. in tests) is harmless.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
