//! Turns a tool call into an automation script run.
//!
//! The dispatcher reads each declared parameter off the argument object,
//! fills in defaults, validates types and enums, and hands the resulting
//! positional list to the [`AutomationBackend`]. Nothing it does fails the
//! request: every problem becomes a [`ToolCallResult`] with `isError` set.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::automation::AutomationBackend;
use crate::tools::catalog::{ParamSpec, ParamType, ToolKind};
use crate::tools::{ToolCallResult, ToolRegistry};

/// Separator between entries of a `batch_add_tasks` list.
pub const BATCH_SEPARATOR: &str = "|";

/// Prefix marking a `batch_add_tasks` entry as a subtask.
pub const SUBTASK_PREFIX: char = '-';

/// Problems with the arguments of an otherwise known tool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    /// `arguments` was present but not an object.
    #[error("Tool arguments must be an object")]
    NotAnObject,

    /// A required parameter was absent, null or blank.
    #[error("Missing required parameter: {0}")]
    Missing(&'static str),

    /// A parameter had a value of the wrong JSON type.
    #[error("Invalid value for {param}: expected {expected}")]
    WrongType {
        /// Parameter name.
        param: &'static str,
        /// Expected type label.
        expected: &'static str,
    },

    /// A parameter's value is outside its allowed set.
    #[error("Invalid value for {param}: expected one of {}", .allowed.join(", "))]
    NotAllowed {
        /// Parameter name.
        param: &'static str,
        /// The allowed values.
        allowed: &'static [&'static str],
    },

    /// A batch contained no task entries.
    #[error("No tasks given: separate task names with '|'")]
    EmptyBatch,

    /// A batch started with a subtask.
    #[error("Subtask '{0}' has no parent task before it")]
    OrphanSubtask(String),
}

/// Routes tool calls to the automation backend.
pub struct Dispatcher<B> {
    registry: ToolRegistry,
    backend: B,
}

impl<B: AutomationBackend> Dispatcher<B> {
    /// Creates a dispatcher over a registry and backend.
    #[must_use]
    pub const fn new(registry: ToolRegistry, backend: B) -> Self {
        Self { registry, backend }
    }

    /// The tools this dispatcher accepts.
    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The backend scripts are run on.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs one tool call.
    pub async fn dispatch(&self, name: &str, arguments: &Value) -> ToolCallResult {
        let Some(tool) = self.registry.get(name) else {
            info!(tool = name, "Unknown tool requested");
            return ToolCallResult::error(format!("Unknown tool: {name}"));
        };

        let args = match positional_args(tool.kind, arguments) {
            Ok(args) => args,
            Err(e) => {
                info!(tool = name, error = %e, "Rejected tool arguments");
                return ToolCallResult::error(e.to_string());
            }
        };

        debug!(tool = name, argc = args.len(), "Dispatching tool call");

        match self.backend.run(tool.kind.script(), &args).await {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => ToolCallResult::error(e.to_string()),
        }
    }
}

/// Builds the positional argument list for a tool.
///
/// # Errors
///
/// Returns an [`ArgumentError`] if a required parameter is missing or a
/// value has the wrong type or is not allowed.
pub fn positional_args(kind: ToolKind, arguments: &Value) -> Result<Vec<String>, ArgumentError> {
    let empty = Map::new();
    let object = match arguments {
        Value::Null => &empty,
        Value::Object(map) => map,
        _ => return Err(ArgumentError::NotAnObject),
    };

    let mut args = kind
        .params()
        .iter()
        .map(|param| extract(param, object.get(param.name)))
        .collect::<Result<Vec<_>, _>>()?;

    match kind {
        ToolKind::BatchAddTasks => {
            if let Some(tasks) = args.first_mut() {
                *tasks = normalise_batch(tasks)?;
            }
        }
        ToolKind::AddTask
        | ToolKind::ListInbox
        | ToolKind::TodayTasks
        | ToolKind::CompleteTask
        | ToolKind::WeeklyReview
        | ToolKind::SearchTasks
        | ToolKind::EditTask
        | ToolKind::CreateRecurringTask
        | ToolKind::ListProjects
        | ToolKind::ListDeferredTasks
        | ToolKind::ListFlaggedTasks
        | ToolKind::ListOverdueTasks => {}
    }

    Ok(args)
}

/// Reads one parameter into its positional string form.
fn extract(param: &ParamSpec, value: Option<&Value>) -> Result<String, ArgumentError> {
    let wrong_type = || ArgumentError::WrongType {
        param: param.name,
        expected: param.ty.label(),
    };

    let text = match value {
        None | Some(Value::Null) => {
            if param.required {
                return Err(ArgumentError::Missing(param.name));
            }
            return Ok(param.positional_default().to_string());
        }
        Some(value) => match (param.ty, value) {
            (ParamType::String, Value::String(s)) => s.clone(),
            (ParamType::String, Value::Number(n)) => n.to_string(),
            (ParamType::String, Value::Bool(b)) => b.to_string(),
            (ParamType::Boolean, Value::Bool(b)) => b.to_string(),
            (ParamType::Boolean, Value::String(s)) if s == "true" || s == "false" => s.clone(),
            (ParamType::Number, Value::Number(n)) => n.to_string(),
            (ParamType::Number, Value::String(s))
                if s.trim().parse::<f64>().is_ok_and(f64::is_finite) =>
            {
                s.trim().to_string()
            }
            _ => return Err(wrong_type()),
        },
    };

    if param.required && text.trim().is_empty() {
        return Err(ArgumentError::Missing(param.name));
    }

    if !param.allowed.is_empty() && !param.allowed.contains(&text.as_str()) {
        return Err(ArgumentError::NotAllowed {
            param: param.name,
            allowed: param.allowed,
        });
    }

    Ok(text)
}

/// Cleans up a `|`-separated task list.
///
/// Entries are trimmed and empty ones dropped; subtask entries are written
/// as `-Name` with no space after the prefix.
fn normalise_batch(raw: &str) -> Result<String, ArgumentError> {
    let mut entries = Vec::new();

    for entry in raw.split(BATCH_SEPARATOR).map(str::trim) {
        if let Some(subtask) = entry.strip_prefix(SUBTASK_PREFIX) {
            let subtask = subtask.trim();
            if subtask.is_empty() {
                continue;
            }
            if entries.is_empty() {
                return Err(ArgumentError::OrphanSubtask(subtask.to_string()));
            }
            entries.push(format!("{SUBTASK_PREFIX}{subtask}"));
        } else if !entry.is_empty() {
            entries.push(entry.to_string());
        }
    }

    if entries.is_empty() {
        return Err(ArgumentError::EmptyBatch);
    }

    Ok(entries.join(BATCH_SEPARATOR))
}
