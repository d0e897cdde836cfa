use tracing_subscriber::EnvFilter;

/// Initialize stderr logging filtered by `TETHER_LOG`.
///
/// Logs go to stderr so they never interleave with the status line or the
/// dashboard screen on stdout. Safe to call more than once; only the first
/// call installs a subscriber.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("TETHER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
