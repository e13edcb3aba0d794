//! Logging initialization

/// Initialize logging based on the debug flag
///
/// Diagnostics go to stderr so they never mix with the user-facing
/// summary on stdout. Without `--debug` only warnings surface; the
/// `RUST_LOG` environment variable overrides either default.
pub fn init_logging(debug: bool) {
    let default_filter = if debug { "meshdump=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(debug)
        .init();
}
