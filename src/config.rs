//! Engine configuration using Figment
//!
//! Configuration is layered from:
//! 1. built-in defaults
//! 2. a TOML file (`config/shotalign.toml` by default)
//! 3. environment variables prefixed with `SHOTALIGN_`, nested with `__`
//!    (e.g. `SHOTALIGN_EXTRACTION__DEFAULT_MODE=union`)
//!
//! # Example
//! ```no_run
//! use shotalign::config::EngineConfig;
//!
//! let config = EngineConfig::load()?;
//! println!("coverage mode: {}", config.extraction.default_mode);
//! # Ok::<(), shotalign::ExtractError>(())
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::engine::{CoverageMode, StrategyPolicy};
use crate::error::{ExtractError, ExtractResult};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/shotalign.toml";

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tracing subscriber settings.
    #[serde(default)]
    pub logging: LoggingSection,
    /// Extraction defaults.
    #[serde(default)]
    pub extraction: ExtractionSettings,
    /// NULL sentinels for uncovered rows.
    #[serde(default)]
    pub null_fill: NullPolicy,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format (pretty, compact, json)
    #[serde(default = "default_format")]
    pub format: String,
}

/// Extraction defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSettings {
    /// Coverage mode used when the caller does not pick one
    #[serde(default)]
    pub default_mode: CoverageMode,
    /// Suppress soft warnings in the log; they are still recorded in the metadata
    #[serde(default)]
    pub silent: bool,
    /// Read strategy for non-sequential streams
    #[serde(default)]
    pub read_strategy: StrategyPolicy,
}

/// NULL sentinels for uncovered rows in union mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullPolicy {
    /// Sentinel for signed integer columns, clamped to the column's type
    #[serde(default = "default_signed_sentinel")]
    pub signed_sentinel: i64,
}

// Default value functions
fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

fn default_signed_sentinel() -> i64 {
    -99999
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl Default for NullPolicy {
    fn default() -> Self {
        Self {
            signed_sentinel: default_signed_sentinel(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `config/shotalign.toml` and the environment.
    ///
    /// A missing file leaves the defaults in place.
    pub fn load() -> ExtractResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> ExtractResult<Self> {
        let config: Self = Self::figment(path.as_ref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Layered providers, exposed so callers can merge their own.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SHOTALIGN_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> ExtractResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ExtractError::Logging(format!(
                "Invalid level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(ExtractError::Logging(format!(
                "Invalid format '{}'. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn missing_file_yields_defaults() {
        let config = EngineConfig::load_from("/nonexistent/shotalign.toml").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.null_fill.signed_sentinel, -99999);
        assert_eq!(config.extraction.default_mode, CoverageMode::Intersection);
    }

    #[test]
    #[serial]
    fn file_values_override_defaults() {
        let file = write_config(
            r#"
[logging]
level = "debug"

[extraction]
default_mode = "union"
read_strategy = "full"

[null_fill]
signed_sentinel = -1
"#,
        );
        let config = EngineConfig::load_from(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.extraction.default_mode, CoverageMode::Union);
        assert_eq!(config.extraction.read_strategy, StrategyPolicy::Full);
        assert!(!config.extraction.silent);
        assert_eq!(config.null_fill.signed_sentinel, -1);
    }

    #[test]
    #[serial]
    fn environment_overrides_file() {
        let file = write_config("[extraction]\nsilent = false\n");
        std::env::set_var("SHOTALIGN_EXTRACTION__SILENT", "true");
        let config = EngineConfig::load_from(file.path());
        std::env::remove_var("SHOTALIGN_EXTRACTION__SILENT");
        assert!(config.unwrap().extraction.silent);
    }

    #[test]
    #[serial]
    fn invalid_values_are_rejected() {
        let file = write_config("[logging]\nlevel = \"chatty\"\n");
        assert!(matches!(
            EngineConfig::load_from(file.path()),
            Err(ExtractError::Logging(_))
        ));

        let file = write_config("[extraction]\ndefault_mode = \"outer\"\n");
        assert!(matches!(
            EngineConfig::load_from(file.path()),
            Err(ExtractError::Config(_))
        ));
    }
}
