//! Result formatting.
//!
//! [`format`] turns a tool outcome into two renderings that are always
//! produced together: a markdown table for reading and canonical JSON for
//! copying. It never fails; anything it cannot render degrades to the debug
//! text of the value.

pub mod replies;
pub mod table;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const NO_RESULT: &str = "No result returned";
const UNFORMATTABLE: &str = "unformattable, raw value below";

#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Failure(String),
}

impl ToolOutcome {
    /// Interprets a raw `tools/call` result. MCP results (a `content` list of
    /// typed items) are unwrapped: `structuredContent` wins, text items are
    /// parsed as JSON when they hold JSON, and `isError` makes the outcome a
    /// failure. Anything else is taken as the payload itself.
    pub fn from_call_result(value: Value) -> ToolOutcome {
        let Value::Object(map) = value else {
            return ToolOutcome::Success(value);
        };
        if !is_mcp_call_result(&map) {
            return ToolOutcome::Success(Value::Object(map));
        }

        let content = unwrap_content(map.get("content"));
        if map.get("isError").and_then(Value::as_bool).unwrap_or(false) {
            let message = match &content {
                Value::Null => "Tool reported an error".to_string(),
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            return ToolOutcome::Failure(message);
        }

        match map.get("structuredContent") {
            Some(structured) if !structured.is_null() => ToolOutcome::Success(structured.clone()),
            _ => ToolOutcome::Success(content),
        }
    }
}

fn is_mcp_call_result(map: &Map<String, Value>) -> bool {
    match map.get("content") {
        Some(Value::Array(items)) => items
            .iter()
            .all(|item| item.get("type").and_then(Value::as_str).is_some()),
        _ => false,
    }
}

fn unwrap_content(content: Option<&Value>) -> Value {
    let Some(Value::Array(items)) = content else {
        return Value::Null;
    };
    let mut values: Vec<Value> = items.iter().map(unwrap_item).collect();
    match values.len() {
        0 => Value::Null,
        1 => values.remove(0),
        _ => Value::Array(values),
    }
}

fn unwrap_item(item: &Value) -> Value {
    if item.get("type").and_then(Value::as_str) != Some("text") {
        return item.clone();
    }
    let text = item.get("text").and_then(Value::as_str).unwrap_or_default();
    serde_json::from_str::<Value>(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedResult {
    pub structured_text: String,
    pub canonical_text: String,
    pub succeeded: bool,
}

/// Which renderings a tool-call reply includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Markdown,
    Json,
    #[default]
    Both,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputMode::Markdown => "markdown",
            OutputMode::Json => "json",
            OutputMode::Both => "both",
        })
    }
}

pub fn format(outcome: &ToolOutcome) -> FormattedResult {
    match outcome {
        ToolOutcome::Failure(message) => FormattedResult {
            structured_text: format!("Tool call failed: {message}"),
            canonical_text: canonical_json(&serde_json::json!({
                "status": "failed",
                "message": message,
            }))
            .unwrap_or_else(|_| format!("{UNFORMATTABLE}\n{message:?}")),
            succeeded: false,
        },
        ToolOutcome::Success(value) => format_success(value),
    }
}

fn format_success(value: &Value) -> FormattedResult {
    let canonical = match canonical_json(value) {
        Ok(text) => text,
        Err(_) => return unformattable(value),
    };

    let structured_text = match value {
        Value::Null => NO_RESULT.to_string(),
        Value::String(text) => text.clone(),
        Value::Object(_) | Value::Array(_) => match table::build_table(value) {
            Some(table) => table.to_markdown(),
            None => return unformattable(value),
        },
        scalar => scalar.to_string(),
    };

    FormattedResult {
        structured_text,
        canonical_text: canonical,
        succeeded: true,
    }
}

fn unformattable(value: &Value) -> FormattedResult {
    let text = format!("{UNFORMATTABLE}\n{value:?}");
    FormattedResult {
        structured_text: text.clone(),
        canonical_text: text,
        succeeded: true,
    }
}

/// Pretty JSON with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&sorted(value))
}

pub(crate) fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), sorted(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
