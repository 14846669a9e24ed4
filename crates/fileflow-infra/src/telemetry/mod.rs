//! Tracing subscriber initialization

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "fileflow=info";

/// Initialize tracing with an `EnvFilter` read from `RUST_LOG` (default `fileflow=info`).
///
/// With `json` set, events are written as JSON lines. Fails if a global subscriber is
/// already installed.
pub fn init_telemetry(json: bool, environment: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    tracing::debug!(environment = %environment, json = json, "Tracing initialized");
    Ok(())
}
