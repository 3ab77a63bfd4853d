//! Tracing subscriber setup.
//!
//! Human-readable (or JSON) output goes to stderr, since stdout carries the
//! RPC channel. An optional daily-rotated JSON file is added when a log
//! directory is configured.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::types::config::LoggingConfig;

pub const LOG_FILE_NAME: &str = "smartmark.log";

/// `RUST_LOG` when set and valid, else the configured level, else `info`.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    resolve_filter(from_env.as_deref(), config)
}

/// First valid directive among `env_directives`, the configured level and `info`.
pub fn resolve_filter(env_directives: Option<&str>, config: &LoggingConfig) -> EnvFilter {
    env_directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .or_else(|| EnvFilter::try_new(&config.level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Installs the global subscriber. Returns the file writer guard, which the
/// caller must keep alive for buffered lines to be flushed. A second call is
/// harmless: the existing subscriber stays in place.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let stderr_plain = (!config.json).then(|| fmt::layer().with_writer(std::io::stderr));
    let stderr_json = config
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            let appender = rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).json().with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(build_filter(config))
        .with(stderr_plain)
        .with(stderr_json)
        .with(file_layer)
        .try_init();

    match installed {
        Ok(()) => {
            tracing::debug!(level = %config.level, json = config.json, "logging initialized");
            guard
        }
        Err(_) => None,
    }
}
