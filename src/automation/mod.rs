//! Automation backend: runs a named script with positional string arguments.
//!
//! The rest of the server only sees [`AutomationBackend`]: given a script
//! identifier and an ordered argument list, return the script's text output
//! or fail. [`ScriptInvoker`] is the process-based implementation.
//!
//! Calls are awaited to completion before the server reads its next request,
//! so from the protocol's point of view every call is blocking.

pub mod error;
pub mod invoker;
pub mod quoting;

pub use error::{AutomationError, AutomationResult};
pub use invoker::ScriptInvoker;

/// Something that can run automation scripts.
#[allow(async_fn_in_trait)] // Only driven on the server's own current-thread runtime
pub trait AutomationBackend {
    /// Runs `script` with `args` and returns its trimmed text output.
    ///
    /// # Errors
    ///
    /// Returns an [`AutomationError`] if the script cannot be found or
    /// started, times out, produces too much output or exits unsuccessfully.
    async fn run(&self, script: &str, args: &[String]) -> AutomationResult<String>;
}
