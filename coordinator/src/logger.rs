use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "infimum_coordinator=info";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn initialize_logger()
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // A subscriber installed earlier, e.g. by a test harness, takes precedence.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
