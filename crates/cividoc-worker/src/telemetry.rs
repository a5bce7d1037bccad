use cividoc_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with an env-driven filter and a fmt layer.
///
/// Production gets JSON output for log aggregation; everything else gets
/// the human-readable format.
pub fn init_telemetry(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "cividoc=debug,info".into());

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
