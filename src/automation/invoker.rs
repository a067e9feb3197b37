//! Process-based automation backend.
//!
//! Scripts live as files under a scripts directory (with an `enhanced/`
//! subdirectory for the extended tool set) and are run by an external
//! interpreter, `osascript` by default:
//!
//! ```text
//! osascript <scripts_dir>/add_task.applescript "Buy milk" "" "Errands" ...
//! ```
//!
//! Arguments are handed to the process as a vector, never through a shell.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::error::{AutomationError, AutomationResult};
use super::quoting;
use super::AutomationBackend;

/// Interpreter used when none is configured.
pub const DEFAULT_INTERPRETER: &str = "osascript";

/// Script file extension used when none is configured.
pub const DEFAULT_SCRIPT_EXTENSION: &str = "applescript";

/// Wall-clock limit for one script run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum bytes captured per output stream.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Subdirectory searched after the scripts directory itself.
pub const ENHANCED_SUBDIR: &str = "enhanced";

/// Runs automation scripts as child processes.
#[derive(Debug, Clone)]
pub struct ScriptInvoker {
    interpreter: String,
    scripts_dir: PathBuf,
    extension: String,
    timeout: Duration,
    max_output_bytes: usize,
}

impl ScriptInvoker {
    /// Creates an invoker for the given scripts directory with default limits.
    #[must_use]
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            scripts_dir: scripts_dir.into(),
            extension: DEFAULT_SCRIPT_EXTENSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Sets the interpreter program.
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Sets the script file extension (without the dot).
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Sets the per-run timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the per-stream output cap.
    #[must_use]
    pub const fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    /// Returns the scripts directory.
    #[must_use]
    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Returns the per-run timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves a script identifier to a file.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::ScriptNotFound`] if no matching file exists
    /// or the identifier is not a plain name.
    pub fn locate(&self, script: &str) -> AutomationResult<PathBuf> {
        let searched = vec![
            self.scripts_dir.clone(),
            self.scripts_dir.join(ENHANCED_SUBDIR),
        ];

        let plain_name = !script.is_empty()
            && script
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if plain_name {
            let file_name = format!("{script}.{}", self.extension);
            if let Some(found) = searched
                .iter()
                .map(|dir| dir.join(&file_name))
                .find(|candidate| candidate.is_file())
            {
                return Ok(found);
            }
        }

        Err(AutomationError::ScriptNotFound {
            script: script.to_string(),
            searched,
        })
    }

    async fn execute(&self, script: &str, path: &Path, args: &[String]) -> AutomationResult<String> {
        let mut child = Command::new(&self.interpreter)
            .arg(path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AutomationError::Launch {
                program: self.interpreter.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = self.max_output_bytes;

        let outcome = tokio::time::timeout(self.timeout, async {
            let (out, err) = tokio::try_join!(
                read_capped(stdout, limit, script),
                read_capped(stderr, limit, script)
            )?;
            let status = child.wait().await.map_err(|source| AutomationError::Io {
                script: script.to_string(),
                source,
            })?;
            Ok::<_, AutomationError>((status, out, err))
        })
        .await;

        let (status, stdout, stderr) = match outcome {
            Ok(Ok(captured)) => captured,
            Ok(Err(e)) => {
                reap(&mut child, script).await;
                return Err(e);
            }
            Err(_) => {
                reap(&mut child, script).await;
                return Err(AutomationError::Timeout {
                    script: script.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        let stderr = String::from_utf8_lossy(&stderr).trim().to_string();

        if !status.success() {
            return Err(AutomationError::Failed {
                script: script.to_string(),
                code: status.code(),
                diagnostic: failure_diagnostic(stderr, status),
            });
        }

        if !stderr.is_empty() {
            debug!(script, stderr = %stderr, "Script wrote to stderr");
        }

        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }
}

impl AutomationBackend for ScriptInvoker {
    async fn run(&self, script: &str, args: &[String]) -> AutomationResult<String> {
        let path = self.locate(script)?;

        debug!(
            command = %quoting::command_line(&self.interpreter, &path, args),
            "Running automation script"
        );

        let started = Instant::now();
        let result = self.execute(script, &path, args).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(output) => debug!(script, elapsed_ms, bytes = output.len(), "Script finished"),
            Err(e) => warn!(script, elapsed_ms, error = %e, "Script failed"),
        }

        result
    }
}

/// Reads a stream to EOF, failing once it exceeds `limit` bytes.
async fn read_capped<R>(stream: Option<R>, limit: usize, script: &str) -> AutomationResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return Ok(Vec::new());
    };

    // One byte past the limit is enough to detect overflow.
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut buf = Vec::new();
    stream
        .take(cap)
        .read_to_end(&mut buf)
        .await
        .map_err(|source| AutomationError::Io {
            script: script.to_string(),
            source,
        })?;

    if buf.len() > limit {
        return Err(AutomationError::OutputTooLarge {
            script: script.to_string(),
            limit,
        });
    }

    Ok(buf)
}

async fn reap(child: &mut Child, script: &str) {
    if let Err(e) = child.kill().await {
        warn!(script, error = %e, "Failed to kill automation process");
    }
}

fn failure_diagnostic(stderr: String, status: ExitStatus) -> String {
    if stderr.is_empty() {
        format!("process exited with {status}")
    } else {
        stderr
    }
}
