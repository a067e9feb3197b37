//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk, parsing
//! it into validated, type-safe structures, and turning the automation
//! section into a ready [`ScriptInvoker`].
//!
//! # Configuration File Locations
//!
//! The configuration file is searched in the following order:
//!
//! 1. Path given as the CLI positional argument (must exist)
//! 2. Default location (optional; built-in defaults apply when absent):
//!    - **Linux/macOS:** `~/.omnifocus-gtd-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.omnifocus-gtd-mcp\config.json`
//!
//! # Example Configuration
//!
//! See `config/example-config.json` for a complete example.

mod settings;

pub use settings::{AutomationConfig, Config, LoggingConfig};

use std::path::{Path, PathBuf};

use crate::automation::ScriptInvoker;
use crate::error::ConfigError;

/// Name of the scripts directory looked up next to the install prefix.
const SCRIPTS_DIR_NAME: &str = "scripts";

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.omnifocus-gtd-mcp/`
/// - **Windows:** `%USERPROFILE%\.omnifocus-gtd-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".omnifocus-gtd-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, the platform-specific default location is used, and
/// a missing default file yields [`Config::default`].
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - Fields are unknown or invalid
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}

/// Returns the default scripts directory: `scripts/` beside the directory
/// holding the running executable.
#[must_use]
pub fn default_scripts_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let install_root = exe.parent()?.parent()?;
    Some(install_root.join(SCRIPTS_DIR_NAME))
}

/// Builds the script invoker described by `automation`.
///
/// `scripts_dir_override` (from the command line) wins over the configured
/// directory, which wins over [`default_scripts_dir`].
///
/// # Errors
///
/// Returns an error if no scripts directory can be determined.
pub fn script_invoker(
    automation: &AutomationConfig,
    scripts_dir_override: Option<&Path>,
) -> Result<ScriptInvoker, ConfigError> {
    let scripts_dir = scripts_dir_override
        .map(Path::to_path_buf)
        .or_else(|| automation.scripts_dir.clone())
        .or_else(default_scripts_dir)
        .ok_or_else(|| ConfigError::ValidationError {
            message: "could not determine the scripts directory; set automation.scripts_dir"
                .to_string(),
        })?;

    Ok(ScriptInvoker::new(scripts_dir)
        .with_interpreter(automation.interpreter.clone())
        .with_extension(automation.script_extension.clone())
        .with_timeout(automation.timeout())
        .with_max_output_bytes(automation.max_output_bytes))
}
