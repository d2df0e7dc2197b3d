//! Chat reply text for every command outcome.

use super::{FormattedResult, OutputMode};
use crate::commands::{all_commands, CommandSpec};
use crate::core::session::{ConnectSummary, SessionStatus};
use crate::mcp::schema::{
    normalize, CanonicalSchema, ParameterSpec, SchemaUnavailable, ToolDescriptor, TypeTag,
};
use crate::mcp::validate::ParameterValidationError;
use serde_json::{Map, Value};

const RAW_SCHEMA_LIMIT: usize = 2000;
const ENUM_PREVIEW: usize = 5;

fn code_block(content: &str, lang: &str) -> String {
    format!("```{lang}\n{content}\n```")
}

fn pretty(value: &Value) -> String {
    super::canonical_json(value).unwrap_or_else(|_| value.to_string())
}

fn example_call(tool: &str, example: &Map<String, Value>) -> String {
    let arguments = serde_json::to_string(&super::sorted(&Value::Object(example.clone())))
        .unwrap_or_else(|_| "{}".to_string());
    format!("!call {tool} {arguments}")
}

pub fn error(message: &str) -> String {
    format!("# ❌ Error\n\n**Message:** {message}")
}

pub fn connect_success(summary: &ConnectSummary) -> String {
    format!(
        "# ✅ Connection Successful\n\n**Endpoint:** `{}`\n\n**Tools Available:** `{}`\n\nRun the following to list them:\n\n{}",
        summary.url,
        summary.tool_count,
        code_block("!list", "bash")
    )
}

pub fn connect_failure(reason: &str) -> String {
    format!("# ❌ Connection Failed\n\n**Reason:** {reason}")
}

pub fn disconnect_success(url: &str) -> String {
    format!("# ✅ Disconnection Successful\n\n**Message:** Disconnected from `{url}`")
}

pub fn disconnect_failure(reason: &str) -> String {
    format!("# ❌ Disconnection Failed\n\n**Reason:** {reason}")
}

pub fn not_connected() -> String {
    format!(
        "# 🔌 Not Connected\n\nYou are not connected to any MCP server.\n\nConnect using:\n\n{}",
        code_block("!connect <url>", "bash")
    )
}

pub fn status(status: &SessionStatus) -> String {
    let Some(url) = status.url.as_deref().filter(|_| status.connected) else {
        return "# 📡 Connection Status\n\n**Status:** Not connected".to_string();
    };
    let mut reply = format!(
        "# 📡 Connection Status\n\n**Status:** Connected to `{url}`\n\n**Available Tools:** `{}`\n\n**Authentication:** {}",
        status.tool_count,
        status.token_source.describe()
    );
    if let Some(connected_at) = status.connected_at {
        reply.push_str(&format!(
            "\n\n**Connected Since:** {}",
            connected_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    reply
}

fn parameter_line(name: &str, spec: &ParameterSpec) -> String {
    let marker = if spec.required { " *(required)*" } else { "" };
    match spec.description.as_deref().filter(|text| !text.is_empty()) {
        Some(description) => format!("- `{name}` ({}){marker}: {description}", spec.type_tag),
        None => format!("- `{name}` ({}){marker}", spec.type_tag),
    }
}

pub fn tool_list(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "# 📭 No Tools Available\n\nThe connected server does not offer any tools."
            .to_string();
    }

    let mut reply = format!("# 🧰 Available Tools ({})\n", tools.len());
    for tool in tools {
        reply.push_str(&format!(
            "\n---\n\n## 🔧 `{}`\n\n**Description:** {}\n\n",
            tool.name,
            tool.description.as_deref().unwrap_or("No description available")
        ));
        match normalize(tool) {
            Ok(schema) if schema.properties.is_empty() => {
                reply.push_str("_No parameters required._\n");
            }
            Ok(schema) => {
                reply.push_str("### 🧾 Parameters\n\n");
                for name in &schema.required {
                    if let Some(spec) = schema.parameter(name) {
                        reply.push_str(&parameter_line(name, spec));
                        reply.push('\n');
                    }
                }
                for (name, spec) in schema.optional() {
                    reply.push_str(&parameter_line(name, spec));
                    reply.push('\n');
                }
            }
            Err(_) => reply.push_str("_No parameters defined._\n"),
        }
    }

    reply.push_str(&format!(
        "\n---\n\n## 💡 Usage\n\n{}",
        code_block(
            "!call <tool_name> {\"arg\": \"value\"}\n!call <tool_name> arg=\"value\"\n!schema <tool_name>",
            "bash"
        )
    ));
    reply
}

fn inline(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn constraints(spec: &ParameterSpec) -> Vec<String> {
    let schema = &spec.schema;
    let mut out = Vec::new();

    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        let shown: Vec<String> = values
            .iter()
            .take(ENUM_PREVIEW)
            .map(|value| format!("`{}`", inline(value)))
            .collect();
        let more = if values.len() > ENUM_PREVIEW { "..." } else { "" };
        out.push(format!("Allowed values: {}{more}", shown.join(", ")));
    }
    if let Some(default) = &spec.default {
        out.push(format!("Default: `{}`", inline(default)));
    }

    let accepts = |tag: &TypeTag| match &spec.type_tag {
        TypeTag::Union(tags) => tags.contains(tag),
        other => other == tag,
    };
    let bounds: &[(&str, &str)] = &[("minimum", "Minimum"), ("maximum", "Maximum")];
    let lengths: &[(&str, &str)] = &[
        ("minLength", "Minimum length"),
        ("maxLength", "Maximum length"),
        ("format", "Format"),
        ("pattern", "Pattern"),
    ];
    let items: &[(&str, &str)] = &[("minItems", "Minimum items"), ("maxItems", "Maximum items")];

    let mut push_keys = |keys: &[(&str, &str)]| {
        for (key, label) in keys {
            if let Some(value) = schema.get(*key) {
                out.push(format!("{label}: `{}`", inline(value)));
            }
        }
    };
    if accepts(&TypeTag::Number) || accepts(&TypeTag::Integer) {
        push_keys(bounds);
    }
    if accepts(&TypeTag::String) {
        push_keys(lengths);
    }
    if accepts(&TypeTag::Array) {
        push_keys(items);
        if schema.get("uniqueItems").and_then(Value::as_bool) == Some(true) {
            out.push("Items must be unique".to_string());
        }
    }
    out
}

pub fn schema(tool: &str, schema: &CanonicalSchema, example: &Map<String, Value>) -> String {
    let mut reply = format!("# 📝 Schema for `{tool}`\n");
    if let Some(title) = &schema.title {
        reply.push_str(&format!("\n**Title:** {title}\n"));
    }
    if let Some(description) = &schema.description {
        reply.push_str(&format!("\n**Description:** {description}\n"));
    }

    let required = schema.required.len();
    let optional = schema.properties.len() - required;
    reply.push_str(&format!(
        "\n## 🧾 Parameters ({required} required, {optional} optional)\n\n"
    ));
    if schema.properties.is_empty() {
        reply.push_str("_No parameters defined._\n\n");
    }

    let ordered = schema
        .required
        .iter()
        .filter_map(|name| schema.parameter(name).map(|spec| (name, spec)))
        .chain(schema.optional());
    for (name, spec) in ordered {
        let marker = if spec.required { "required" } else { "optional" };
        reply.push_str(&format!("- **`{name}`** ({marker}): `{}`\n", spec.type_tag));
        if let Some(description) = spec.description.as_deref().filter(|text| !text.is_empty()) {
            reply.push_str(&format!("  {description}\n"));
        }
        for constraint in constraints(spec) {
            reply.push_str(&format!("  {constraint}\n"));
        }
        reply.push('\n');
    }

    reply.push_str(&format!(
        "## 🧪 Example Usage\n\n{}\n",
        code_block(&example_call(tool, example), "bash")
    ));

    let mut raw = pretty(schema.raw());
    if raw.chars().count() > RAW_SCHEMA_LIMIT {
        raw = raw.chars().take(RAW_SCHEMA_LIMIT).collect();
        raw.push_str("\n... (truncated)");
    }
    reply.push_str(&format!("\n## 📄 Raw Schema\n\n{}", code_block(&raw, "json")));
    reply
}

pub fn schema_unavailable(err: &SchemaUnavailable) -> String {
    format!(
        "# ❌ No Schema Available\n\n**Tool:** `{}`\n\n**Reason:** {}",
        err.tool, err.reason
    )
}

pub fn validation_error(
    tool: &str,
    err: &ParameterValidationError,
    schema: &CanonicalSchema,
    example: &Map<String, Value>,
) -> String {
    let mut reply = format!("# ⚠️ Parameter Validation Error\n\n**Tool:** `{tool}`\n\n");
    if !err.missing.is_empty() {
        let names: Vec<String> = err.missing.iter().map(|name| format!("`{name}`")).collect();
        reply.push_str(&format!("**Missing:** {}\n\n", names.join(", ")));
    }
    for invalid in &err.invalid {
        reply.push_str(&format!(
            "**Invalid:** `{}` expects {}, got {}\n\n",
            invalid.name, invalid.expected, invalid.actual
        ));
    }
    for violation in &err.violations {
        reply.push_str(&format!("**Schema:** {violation}\n\n"));
    }

    if !schema.required.is_empty() {
        reply.push_str("### 🧾 Required Parameters\n\n");
        for name in &schema.required {
            if let Some(spec) = schema.parameter(name) {
                reply.push_str(&parameter_line(name, spec));
                reply.push('\n');
            }
        }
        reply.push('\n');
    }
    reply.push_str(&format!(
        "### 🧪 Example Usage\n\n{}",
        code_block(&example_call(tool, example), "bash")
    ));
    reply
}

pub fn tool_call(tool: &str, formatted: &FormattedResult, mode: OutputMode) -> String {
    let heading = if formatted.succeeded {
        format!("# ✅ Tool Call Successful\n\n**Tool:** `{tool}`")
    } else {
        format!("# ❌ Tool Call Failed\n\n**Tool:** `{tool}`")
    };

    let mut sections = vec![heading];
    if matches!(mode, OutputMode::Markdown | OutputMode::Both) {
        sections.push(formatted.structured_text.clone());
    }
    if matches!(mode, OutputMode::Json | OutputMode::Both) {
        sections.push(code_block(&formatted.canonical_text, "json"));
    }
    sections.join("\n\n")
}

pub fn unknown_command(raw: &str, syntax_error: Option<&str>) -> String {
    match syntax_error {
        Some(detail) => format!(
            "# ❓ Could Not Parse Command\n\n**Command:** `{raw}`\n\n**Problem:** {detail}\n\nTry running:\n\n{}",
            code_block("!help", "bash")
        ),
        None => format!(
            "# ❓ Unknown Command\n\n**Command:** `{raw}`\n\nTry running:\n\n{}",
            code_block("!help", "bash")
        ),
    }
}

pub fn guidance() -> String {
    format!(
        "I relay commands to an MCP tool server. Type `!help` for the full list, or start with:\n\n{}",
        code_block("!connect <url>\nlist tools\ncall <tool_name> {\"arg\": \"value\"}", "bash")
    )
}

pub fn missing_argument(usage: &str, what: &str) -> String {
    error(&format!("{what} is required. Usage: `{usage}`"))
}

pub fn help_overview() -> String {
    let mut reply = String::from("# 📖 Commands\n\n| Command | Description |\n|---|---|\n");
    for command in all_commands() {
        reply.push_str(&format!("| `{}` | {} |\n", command.usage, command.help));
    }
    reply.push_str("\nNatural-language forms work too, for example `connect to <url>` or `list tools`.\n");
    reply.push_str("Use `!help <command>` for details.");
    reply
}

pub fn help_topic(command: &CommandSpec) -> String {
    let mut reply = format!(
        "# 📖 `!{}`\n\n{}\n\n**Usage:** `{}`\n",
        command.name, command.help, command.usage
    );
    for line in command.details {
        reply.push_str(&format!("\n- {line}"));
    }
    reply
}

pub fn unknown_topic(topic: &str) -> String {
    format!(
        "# ❓ Unknown Help Topic\n\n**Topic:** `{topic}`\n\n{}",
        help_overview()
    )
}
