//! Logging initialization.
//!
//! Sets up structured logging with tracing and optional JSON output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set.
///
/// # Errors
///
/// Fails on an invalid filter directive or if a subscriber is already installed.
pub fn init_telemetry(default_filter: &str, json_format: bool) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)?,
    };

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()?;
    }

    Ok(())
}
