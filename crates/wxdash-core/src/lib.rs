pub mod clock;
pub mod config;
pub mod error;
pub mod gate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AiConfig, Config, ConfigIssue, StorageConfig, Units, ValidationResult, WeatherConfig,
};
pub use error::{AppError, ConfigError};
pub use gate::{CacheEntry, GateConfig, RequestGate, ThrottleScope, ThrottledError};

use anyhow::Result;

/// Install the tracing subscriber. `RUST_LOG` overrides the default `info`
/// filter; output goes to stderr so it stays out of the dashboard's stdout.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("wxdash core initialized");
    Ok(())
}
