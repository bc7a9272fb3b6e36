//! Tracing subscriber setup.

use crate::config::LoggingConfig;
use crate::error::{Result, ViennaMeshError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file name prefix inside `LoggingConfig::directory`
pub const LOG_FILE_PREFIX: &str = "viennamesh.log";

/// Build the filter: `RUST_LOG` wins, then the configured directives.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| ViennaMeshError::Config(format!("Invalid log filter '{}': {}", config.filter, e)))
}

/// Install the global subscriber: stderr plus an optional daily rolling
/// file. Keep the returned guard alive until exit so buffered file output
/// is flushed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(config)?;

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| ViennaMeshError::Config(format!("Failed to install logger: {}", e)))?;

    Ok(guard)
}
