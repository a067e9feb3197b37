//! Error types for automation script invocation.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for automation calls.
pub type AutomationResult<T> = Result<T, AutomationError>;

/// Errors that can occur while running an automation script.
///
/// The `Display` text is shown to the assistant verbatim, so it names the
/// script and carries the interpreter's own diagnostic where there is one.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// No script file exists for the identifier.
    #[error("Script not found: {script}")]
    ScriptNotFound {
        /// Script identifier that was looked up.
        script: String,
        /// Directories that were searched.
        searched: Vec<PathBuf>,
    },

    /// The interpreter could not be started.
    #[error("Failed to launch {program}: {source}")]
    Launch {
        /// Interpreter that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// I/O failed while talking to the running script.
    #[error("I/O error while running {script}: {source}")]
    Io {
        /// Script identifier.
        script: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The script ran past its deadline and was killed.
    #[error("{script} timed out after {} ms", .timeout.as_millis())]
    Timeout {
        /// Script identifier.
        script: String,
        /// The configured deadline.
        timeout: Duration,
    },

    /// The script wrote more output than the cap allows and was killed.
    #[error("{script} produced more than {limit} bytes of output")]
    OutputTooLarge {
        /// Script identifier.
        script: String,
        /// Maximum number of bytes captured per stream.
        limit: usize,
    },

    /// The script exited unsuccessfully.
    #[error("AppleScript execution failed: {diagnostic}")]
    Failed {
        /// Script identifier.
        script: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// The interpreter's stderr, or a description of the exit status.
        diagnostic: String,
    },
}
