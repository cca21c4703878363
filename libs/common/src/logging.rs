//! Logging bootstrap for kiln services
//!
//! Console output uses a compact `timestamp [LEVEL] message` format. An optional
//! daily rolling file layer is added when a log directory is configured; the
//! returned [`WorkerGuard`] must be held for the lifetime of the process so
//! buffered lines are flushed on exit.

use std::path::PathBuf;

use errors::{KilnError, KilnResult};
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2025-12-02T00:50:44.809512Z [INFO] Recording started`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Service name, used as the log file prefix
    pub service_name: String,
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Directory for daily rolling log files; console only when unset
    pub log_dir: Option<PathBuf>,
    /// Write the file layer as JSON lines
    pub enable_json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "kilnsrv".to_string(),
            level: "info".to_string(),
            log_dir: None,
            enable_json: false,
        }
    }
}

impl LogConfig {
    /// Filter string used when `RUST_LOG` is not set
    pub fn default_directive(&self) -> String {
        format!("{},{}=debug", self.level, self.service_name)
    }
}

/// Build the EnvFilter; `RUST_LOG` always wins over the configured level
fn build_filter(config: &LogConfig) -> KilnResult<EnvFilter> {
    match std::env::var("RUST_LOG") {
        Ok(env_str) if !env_str.is_empty() => EnvFilter::try_new(&env_str)
            .map_err(|e| KilnError::config(format!("invalid RUST_LOG '{}': {}", env_str, e))),
        _ => EnvFilter::try_new(config.default_directive()).map_err(|e| {
            KilnError::config(format!("invalid log level '{}': {}", config.level, e))
        }),
    }
}

/// Initialize logging system with configuration
///
/// Returns the file writer guard when a file layer was installed.
pub fn init_logging(config: &LogConfig) -> KilnResult<Option<WorkerGuard>> {
    let filter = build_filter(config)?;

    let console_layer = fmt::layer()
        .with_ansi(true)
        .event_format(BracketedLevelFormat)
        .boxed();

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            let layer = if config.enable_json {
                fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_level(true)
                    .with_target(true)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(BracketedLevelFormat)
                    .boxed()
            };
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| KilnError::internal(format!("logging already initialized: {}", e)))?;

    tracing::info!(
        "Logging: {} @ {}",
        config.service_name,
        config
            .log_dir
            .as_ref()
            .map_or_else(|| "console".to_string(), |d| d.display().to_string())
    );

    Ok(guard)
}
