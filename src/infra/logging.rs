//! Tracing subscriber setup (stderr, env-filtered).

use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "FICSTREAM_LOG";

/// Install the global subscriber once. `FICSTREAM_LOG` wins over the
/// verbosity flag; later calls are no-ops.
pub fn init(verbose: bool)
{
    let fallback = if verbose { "info" } else { "warn" };

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
