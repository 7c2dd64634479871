//! Logging - tracing subscriber setup
//!
//! Console output is pretty by default; `GATHER_LOG_FORMAT=json` (or
//! `log.format = "json"`) selects JSON lines. With `log.directory` set, a
//! daily-rotated JSON file is written through a non-blocking writer.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::settings::{LogFormat, LogSettings};

pub const LOG_FORMAT_ENV: &str = "GATHER_LOG_FORMAT";
const DEFAULT_LOG_FILTER: &str = "gather=info";
const LOG_FILE_PREFIX: &str = "gather.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Effective console format: the environment wins over the settings file
pub fn resolve_format(settings: &LogSettings, env_value: Option<&str>) -> LogFormat {
    match env_value.map(str::to_ascii_lowercase).as_deref() {
        Some("json") => LogFormat::Json,
        Some(_) => LogFormat::Pretty,
        None => settings.format,
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must live until exit.
pub fn init(settings: &LogSettings) -> Result<Option<WorkerGuard>> {
    let env_format = std::env::var(LOG_FORMAT_ENV).ok();
    let format = resolve_format(settings, env_format.as_deref());

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(match format {
        // Production: JSON structured logging
        LogFormat::Json => fmt::layer().json().boxed(),
        // Development: Pretty formatting with colors
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    });

    let mut guard = None;
    if let Some(directory) = &settings.directory {
        let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()?;

    Ok(guard)
}
