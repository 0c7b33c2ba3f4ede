//! Tracing setup
//!
//! The engine emits `tracing` spans and events: one `extract` span per call with
//! a child span per stage (`normalize`, `resolve`, `combine`, `materialize`),
//! `debug!` events for read strategies and coverage sizes, and `warn!` events
//! for soft warnings. Span close events carry each stage's busy time.
//!
//! Applications that do not install their own subscriber can use this module:
//!
//! ```no_run
//! use shotalign::{config::EngineConfig, logging};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::load()?;
//! logging::init_from_config(&config)?;
//! # Ok(())
//! # }
//! ```

use crate::config::EngineConfig;
use crate::error::{ExtractError, ExtractResult};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer,
};

/// Output format for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed format with colors (for development)
    Pretty,
    /// Compact format without colors
    Compact,
    /// JSON format for log aggregation
    Json,
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Maximum level emitted.
    pub level: Level,
    /// Output format of the fmt layer.
    pub format: OutputFormat,
    /// Emit span close events, which report stage timings
    pub with_span_events: bool,
    /// Include source file and line in each event.
    pub with_file_and_line: bool,
    /// Whether to enable ANSI colors (only for Pretty format)
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Pretty,
            with_span_events: true,
            with_file_and_line: false,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Create tracing config from the engine configuration
    pub fn from_engine_config(config: &EngineConfig) -> ExtractResult<Self> {
        Ok(Self {
            level: parse_log_level(&config.logging.level)?,
            format: parse_format(&config.logging.format)?,
            ..Default::default()
        })
    }

    /// Defaults at the given level.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Emit span close events.
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// Enable or disable ANSI colors.
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Initialize tracing from the engine configuration
pub fn init_from_config(config: &EngineConfig) -> ExtractResult<()> {
    init(TracingConfig::from_engine_config(config)?)
}

/// Initialize tracing with custom configuration
///
/// Idempotent: if a global subscriber is already installed this returns
/// `Ok(())`, so it is safe to call from tests and libraries.
pub fn init(config: TracingConfig) -> ExtractResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_string(config.level)));

    let span_events = if config.with_span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let result = match config.format {
        OutputFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_file(config.with_file_and_line)
                .with_line_number(config.with_file_and_line)
                .with_ansi(config.with_ansi)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(fmt_layer).try_init()
        }
        OutputFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_span_events(span_events)
                .with_file(config.with_file_and_line)
                .with_line_number(config.with_file_and_line)
                .with_ansi(false)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(fmt_layer).try_init()
        }
        OutputFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_file(config.with_file_and_line)
                .with_line_number(config.with_file_and_line)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(fmt_layer).try_init()
        }
    };
    result.or_else(already_initialized)
}

fn already_initialized(e: TryInitError) -> ExtractResult<()> {
    // expected in tests and when the host application installed a subscriber
    // (or a `log` logger, which try_init sets up first)
    let message = e.to_string();
    if message.contains("a global default trace dispatcher has already been set")
        || message.contains("logging system was already initialized")
    {
        Ok(())
    } else {
        Err(ExtractError::Logging(format!(
            "Failed to initialize tracing: {}",
            e
        )))
    }
}

/// Parse log level string into tracing Level
fn parse_log_level(level: &str) -> ExtractResult<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(ExtractError::Logging(format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        ))),
    }
}

fn parse_format(format: &str) -> ExtractResult<OutputFormat> {
    match format.to_lowercase().as_str() {
        "pretty" => Ok(OutputFormat::Pretty),
        "compact" => Ok(OutputFormat::Compact),
        "json" => Ok(OutputFormat::Json),
        _ => Err(ExtractError::Logging(format!(
            "Invalid log format '{}'. Must be one of: pretty, compact, json",
            format
        ))),
    }
}

/// Convert Level to env filter string
fn level_to_filter_string(level: Level) -> String {
    match level {
        Level::TRACE => "trace".to_string(),
        Level::DEBUG => "debug".to_string(),
        Level::INFO => "info".to_string(),
        Level::WARN => "warn".to_string(),
        Level::ERROR => "error".to_string(),
    }
}
