//! Subscriber setup for binaries and tests that embed the client.
//!
//! Library code logs through the `log` facade; the subscriber installed here
//! captures those records alongside native `tracing` events.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use winrmcp_core::{CopyError, CopyResult};

/// Install the global subscriber. `RUST_LOG` takes precedence over `verbose`.
///
/// Fails if a global subscriber or logger is already installed.
pub fn init_logging(verbose: bool) -> CopyResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let registry = tracing_subscriber::registry().with(filter);

    #[cfg(feature = "logs-json")]
    let result = registry.with(fmt::layer().json()).try_init();
    #[cfg(not(feature = "logs-json"))]
    let result = registry
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init();

    result.map_err(|e| CopyError::io_error(format!("Failed to initialise logging: {}", e)))?;
    tracing::debug!(verbose, "logging initialised");
    Ok(())
}

fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("winrmcp={},winrmcp_core={}", level, level)
}
