//! Tool registry and tool call results.
//!
//! The registry is built once at startup from [`ToolKind::ALL`] and is
//! read-only afterwards. Its iteration order is the order tools are
//! advertised in `tools/list`.

pub mod catalog;
pub mod dispatch;

pub use catalog::{ParamSpec, ParamType, ToolKind};
pub use dispatch::{ArgumentError, Dispatcher};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// A tool definition for the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
    /// The tool this definition describes.
    #[serde(skip)]
    pub kind: ToolKind,
}

impl ToolDefinition {
    fn from_kind(kind: ToolKind) -> Self {
        Self {
            name: kind.name(),
            description: kind.description(),
            input_schema: kind.input_schema(),
            kind,
        }
    }
}

/// The ordered, immutable set of tools.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: IndexMap<&'static str, ToolDefinition>,
}

impl ToolRegistry {
    /// Builds the registry of every known tool.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tools(&ToolKind::ALL)
    }

    /// Builds a registry exposing only the given tools, in the given order.
    #[must_use]
    pub fn with_tools(kinds: &[ToolKind]) -> Self {
        let tools = kinds
            .iter()
            .map(|&kind| (kind.name(), ToolDefinition::from_kind(kind)))
            .collect();
        Self { tools }
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Iterates over tools in advertised order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Returns the first text item, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|item| match item {
            ToolContent::Text { text } => text.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_every_tool_in_order() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.len(), ToolKind::ALL.len());

        let names: Vec<&str> = registry.iter().map(|t| t.name).collect();
        let expected: Vec<&str> = ToolKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn tool_definitions_valid() {
        let registry = ToolRegistry::new();
        assert!(!registry.is_empty());

        for tool in registry.iter() {
            assert!(!tool.name.is_empty());
            assert!(!tool.description.is_empty());
            assert_eq!(tool.input_schema["type"], "object");
        }
    }

    #[test]
    fn definition_serialises_camel_case_without_kind() {
        let registry = ToolRegistry::new();
        let tool = registry.get("complete_task").unwrap();
        let json = serde_json::to_value(tool).unwrap();

        assert_eq!(json["name"], "complete_task");
        assert!(json.get("inputSchema").is_some());
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn restricted_registry() {
        let registry = ToolRegistry::with_tools(&[ToolKind::WeeklyReview, ToolKind::ListInbox]);
        let names: Vec<&str> = registry.iter().map(|t| t.name).collect();
        assert_eq!(names, ["weekly_review", "list_inbox"]);
        assert!(registry.get("add_task").is_none());
    }

    #[test]
    fn tool_call_result_text() {
        let result = ToolCallResult::text("Hello, world!");
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);
        assert_eq!(result.first_text(), Some("Hello, world!"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert!(json.get("isError").is_none());
    }

    #[test]
    fn tool_call_result_error() {
        let result = ToolCallResult::error("Something went wrong");
        assert!(result.is_error);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isError"], true);
        assert_eq!(json["content"][0]["text"], "Something went wrong");
    }
}
