use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "folio=info";

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// filter. Calling this twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("[Telemetry] subscriber already installed");
    }
}
