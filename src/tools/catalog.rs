//! The fixed catalog of OmniFocus tools.
//!
//! Each [`ToolKind`] names one tool and its script. Its parameter list is
//! both the advertised schema and the positional argument order handed to
//! the script, so the two can never drift apart.

use serde_json::Value;

/// Type tag of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Free text.
    String,
    /// `true` / `false`.
    Boolean,
    /// Integer or decimal number.
    Number,
}

impl ParamType {
    /// Positional value used when an optional parameter is absent and
    /// declares no default.
    #[must_use]
    pub const fn fallback(self) -> &'static str {
        match self {
            Self::String => "",
            Self::Boolean => "false",
            Self::Number => "0",
        }
    }

    /// Name used in error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Number => "number",
        }
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    /// Parameter name as sent by the client.
    pub name: &'static str,
    /// Type tag.
    pub ty: ParamType,
    /// Human-readable description.
    pub description: &'static str,
    /// Whether the client must supply it.
    pub required: bool,
    /// Declared default, in positional (string) form.
    pub default: Option<&'static str>,
    /// Allowed values; empty means unrestricted.
    pub allowed: &'static [&'static str],
}

impl ParamSpec {
    const fn required(name: &'static str, ty: ParamType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            description,
            required: true,
            default: None,
            allowed: &[],
        }
    }

    const fn optional(name: &'static str, ty: ParamType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            description,
            required: false,
            default: None,
            allowed: &[],
        }
    }

    const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = allowed;
        self
    }

    /// Value used when the parameter is absent.
    #[must_use]
    pub fn positional_default(&self) -> &'static str {
        self.default.unwrap_or_else(|| self.ty.fallback())
    }

    /// JSON Schema fragment for this parameter.
    #[must_use]
    pub fn schema(&self) -> Value {
        let mut property = serde_json::Map::new();
        property.insert("type".to_string(), Value::from(self.ty.label()));
        property.insert("description".to_string(), Value::from(self.description));
        if !self.allowed.is_empty() {
            property.insert("enum".to_string(), Value::from(self.allowed.to_vec()));
        }
        if let Some(default) = self.default {
            let value = match self.ty {
                ParamType::String => Value::from(default),
                ParamType::Boolean => Value::Bool(default == "true"),
                ParamType::Number => serde_json::from_str(default).unwrap_or(Value::Null),
            };
            property.insert("default".to_string(), value);
        }
        Value::Object(property)
    }
}

const SEARCH_FILTERS: &[&str] = &["all", "available", "remaining"];

const EDITABLE_PROPERTIES: &[&str] = &[
    "name",
    "note",
    "due_date",
    "defer_date",
    "flagged",
    "project",
    "estimated_minutes",
];

const ADD_TASK_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("name", ParamType::String, "The task name/title"),
    ParamSpec::optional(
        "note",
        ParamType::String,
        "Optional note or description for the task",
    ),
    ParamSpec::optional(
        "project",
        ParamType::String,
        "Optional project name to add the task to",
    ),
    ParamSpec::optional(
        "due_date",
        ParamType::String,
        "Optional due date (e.g., \"tomorrow\", \"next week\", \"Friday\")",
    ),
    ParamSpec::optional(
        "flagged",
        ParamType::Boolean,
        "Whether to flag this task as important",
    )
    .with_default("false"),
    ParamSpec::optional(
        "defer_date",
        ParamType::String,
        "Optional defer date; the task stays hidden until then",
    ),
    ParamSpec::optional(
        "estimated_minutes",
        ParamType::Number,
        "Optional time estimate in minutes",
    ),
];

const COMPLETE_TASK_PARAMS: &[ParamSpec] = &[ParamSpec::required(
    "task_name",
    ParamType::String,
    "Name or partial name of the task to complete",
)];

const SEARCH_TASKS_PARAMS: &[ParamSpec] = &[
    ParamSpec::required(
        "query",
        ParamType::String,
        "Text to search for in task names and notes",
    ),
    ParamSpec::optional(
        "filter",
        ParamType::String,
        "Which tasks to search: all, available (not deferred or blocked) or remaining (incomplete)",
    )
    .with_default("all")
    .one_of(SEARCH_FILTERS),
    ParamSpec::optional(
        "limit",
        ParamType::Number,
        "Maximum number of results (0 for no limit)",
    ),
];

const EDIT_TASK_PARAMS: &[ParamSpec] = &[
    ParamSpec::required(
        "task_name",
        ParamType::String,
        "Name or partial name of the task to edit",
    ),
    ParamSpec::required("property", ParamType::String, "The property to change")
        .one_of(EDITABLE_PROPERTIES),
    ParamSpec::required(
        "value",
        ParamType::String,
        "The new value (dates as natural language, flagged as true/false)",
    ),
];

const BATCH_ADD_TASKS_PARAMS: &[ParamSpec] = &[
    ParamSpec::required(
        "tasks",
        ParamType::String,
        "Tasks separated by '|'; prefix an entry with '-' to make it a subtask of the previous task \
         (e.g., \"Plan trip|-Book flights|-Book hotel|Pack\")",
    ),
    ParamSpec::optional(
        "project",
        ParamType::String,
        "Optional project to add all tasks to",
    ),
    ParamSpec::optional(
        "due_date",
        ParamType::String,
        "Optional due date applied to every top-level task",
    ),
    ParamSpec::optional(
        "flagged",
        ParamType::Boolean,
        "Whether to flag every top-level task",
    )
    .with_default("false"),
];

const CREATE_RECURRING_TASK_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("name", ParamType::String, "The task name/title"),
    ParamSpec::optional(
        "repeat_rule",
        ParamType::String,
        "How often the task repeats (e.g., \"daily\", \"weekly\", \"monthly\", \"every 2 weeks\")",
    ),
    ParamSpec::optional(
        "project",
        ParamType::String,
        "Optional project name to add the task to",
    ),
    ParamSpec::optional(
        "initial_due_date",
        ParamType::String,
        "Optional first due date (e.g., \"next Monday\")",
    ),
];

const LIST_PROJECTS_PARAMS: &[ParamSpec] = &[ParamSpec::optional(
    "include_stats",
    ParamType::Boolean,
    "Include remaining and overdue task counts for each project",
)
.with_default("false")];

/// Every tool the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Create a task in the inbox or a project.
    AddTask,
    /// List inbox tasks.
    ListInbox,
    /// List tasks due today.
    TodayTasks,
    /// Complete a task found by name.
    CompleteTask,
    /// Summarise the week for a GTD review.
    WeeklyReview,
    /// Search tasks by text.
    SearchTasks,
    /// Change one property of a task.
    EditTask,
    /// Create many tasks (and subtasks) at once.
    BatchAddTasks,
    /// Create a repeating task.
    CreateRecurringTask,
    /// List projects.
    ListProjects,
    /// List deferred tasks.
    ListDeferredTasks,
    /// List flagged tasks.
    ListFlaggedTasks,
    /// List overdue tasks.
    ListOverdueTasks,
}

impl ToolKind {
    /// All tools, in advertised order.
    pub const ALL: [Self; 13] = [
        Self::AddTask,
        Self::ListInbox,
        Self::TodayTasks,
        Self::CompleteTask,
        Self::WeeklyReview,
        Self::SearchTasks,
        Self::EditTask,
        Self::BatchAddTasks,
        Self::CreateRecurringTask,
        Self::ListProjects,
        Self::ListDeferredTasks,
        Self::ListFlaggedTasks,
        Self::ListOverdueTasks,
    ];

    /// Tool name on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AddTask => "add_task",
            Self::ListInbox => "list_inbox",
            Self::TodayTasks => "today_tasks",
            Self::CompleteTask => "complete_task",
            Self::WeeklyReview => "weekly_review",
            Self::SearchTasks => "search_tasks",
            Self::EditTask => "edit_task",
            Self::BatchAddTasks => "batch_add_tasks",
            Self::CreateRecurringTask => "create_recurring_task",
            Self::ListProjects => "list_projects",
            Self::ListDeferredTasks => "list_deferred_tasks",
            Self::ListFlaggedTasks => "list_flagged_tasks",
            Self::ListOverdueTasks => "list_overdue_tasks",
        }
    }

    /// Identifier of the automation script backing this tool.
    #[must_use]
    pub const fn script(self) -> &'static str {
        self.name()
    }

    /// Description advertised in `tools/list`.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AddTask => "Add a new task to OmniFocus inbox or specific project",
            Self::ListInbox => "List all tasks currently in the OmniFocus inbox",
            Self::TodayTasks => "List all tasks due today",
            Self::CompleteTask => "Mark a task as complete by searching for it by name",
            Self::WeeklyReview => "Get a comprehensive weekly review summary",
            Self::SearchTasks => "Search tasks by name or note, optionally filtered by status",
            Self::EditTask => "Change a single property of an existing task found by name",
            Self::BatchAddTasks => "Add several tasks and subtasks in one call",
            Self::CreateRecurringTask => "Create a task that repeats on a schedule",
            Self::ListProjects => "List active projects, optionally with task statistics",
            Self::ListDeferredTasks => "List tasks whose defer date is in the future",
            Self::ListFlaggedTasks => "List all incomplete flagged tasks",
            Self::ListOverdueTasks => "List all incomplete tasks past their due date",
        }
    }

    /// Parameters in positional order.
    #[must_use]
    pub const fn params(self) -> &'static [ParamSpec] {
        match self {
            Self::AddTask => ADD_TASK_PARAMS,
            Self::CompleteTask => COMPLETE_TASK_PARAMS,
            Self::SearchTasks => SEARCH_TASKS_PARAMS,
            Self::EditTask => EDIT_TASK_PARAMS,
            Self::BatchAddTasks => BATCH_ADD_TASKS_PARAMS,
            Self::CreateRecurringTask => CREATE_RECURRING_TASK_PARAMS,
            Self::ListProjects => LIST_PROJECTS_PARAMS,
            Self::ListInbox
            | Self::TodayTasks
            | Self::WeeklyReview
            | Self::ListDeferredTasks
            | Self::ListFlaggedTasks
            | Self::ListOverdueTasks => &[],
        }
    }

    /// Looks a tool up by wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// JSON Schema for the tool's arguments.
    #[must_use]
    pub fn input_schema(self) -> Value {
        let params = self.params();

        let properties: serde_json::Map<String, Value> = params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();

        let mut schema = serde_json::Map::new();
        schema.insert("type".to_string(), Value::from("object"));
        schema.insert("properties".to_string(), Value::Object(properties));

        let required: Vec<&str> = params.iter().filter(|p| p.required).map(|p| p.name).collect();
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::from(required));
        }

        Value::Object(schema)
    }
}
