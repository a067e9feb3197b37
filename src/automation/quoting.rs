//! Argument quoting for single-string command lines.
//!
//! Invocations pass arguments as a vector, so nothing here is needed to run
//! a script. The quoted form is what gets logged, and is the minimum an
//! argument must go through whenever a launcher only accepts one command
//! string: every argument becomes one double-quoted token in which `\`, `"`,
//! newline and tab are escaped, so the interpreter receives it as a single
//! opaque string.

use std::fmt::Write as _;
use std::path::Path;

/// Quotes one argument.
#[must_use]
pub fn quote_arg(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for ch in arg.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}

/// Renders a full invocation as one command line.
#[must_use]
pub fn command_line(program: &str, script: &Path, args: &[String]) -> String {
    let mut line = format!(
        "{} {}",
        quote_arg(program),
        quote_arg(&script.to_string_lossy())
    );
    for arg in args {
        let _ = write!(line, " {}", quote_arg(arg));
    }
    line
}
