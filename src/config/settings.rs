//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Every field is optional; an empty object yields the built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::automation::invoker::{
    DEFAULT_INTERPRETER, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_SCRIPT_EXTENSION, DEFAULT_TIMEOUT,
};
use crate::error::ConfigError;

/// Log levels accepted in `logging.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Automation script settings.
    #[serde(default)]
    pub automation: AutomationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.automation.validate()?;

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

/// How automation scripts are located and run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutomationConfig {
    /// Program that runs a script file, e.g. `osascript`.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Directory holding the scripts. Defaults to `scripts/` next to the
    /// executable's directory.
    #[serde(default)]
    pub scripts_dir: Option<PathBuf>,

    /// File extension of script files, without the dot.
    #[serde(default = "default_script_extension")]
    pub script_extension: String,

    /// Upper bound on a single script run, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound on captured script output, in bytes.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl AutomationConfig {
    /// Returns the script timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interpreter.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "automation.interpreter must not be empty".to_string(),
            });
        }
        if self.script_extension.trim().is_empty() || self.script_extension.contains('.') {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid automation.script_extension '{}'. Give the extension without a dot",
                    self.script_extension
                ),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "automation.timeout_ms must be greater than zero".to_string(),
            });
        }
        if self.max_output_bytes == 0 {
            return Err(ConfigError::ValidationError {
                message: "automation.max_output_bytes must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            scripts_dir: None,
            script_extension: default_script_extension(),
            timeout_ms: default_timeout_ms(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

fn default_interpreter() -> String {
    DEFAULT_INTERPRETER.to_string()
}

fn default_script_extension() -> String {
    DEFAULT_SCRIPT_EXTENSION.to_string()
}

#[allow(clippy::cast_possible_truncation)] // Ten seconds fits in u64
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

const fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
