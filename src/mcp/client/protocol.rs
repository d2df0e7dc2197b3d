use crate::mcp::schema::ToolDescriptor;
use rust_mcp_schema::schema_utils::ServerMessage;
use rust_mcp_schema::{
    CallToolResult, InitializeResult, ListToolsResult, PaginatedRequestParams, RpcError, Tool,
    LATEST_PROTOCOL_VERSION,
};
use serde_json::Value;

pub(crate) fn effective_protocol_version(negotiated_version: Option<&str>) -> String {
    match negotiated_version {
        Some(version) if !version.trim().is_empty() => version.to_string(),
        _ => LATEST_PROTOCOL_VERSION.to_string(),
    }
}

pub(crate) fn paginated_params(cursor: Option<String>) -> Option<PaginatedRequestParams> {
    cursor.map(|cursor| PaginatedRequestParams {
        cursor: Some(cursor),
        meta: None,
    })
}

pub(crate) fn parse_initialize_result(message: ServerMessage) -> Result<InitializeResult, String> {
    let result: InitializeResult = parse_response(message)?;
    if result.protocol_version.trim().is_empty() {
        return Err("Unexpected initialize response.".to_string());
    }
    Ok(result)
}

pub(crate) fn parse_list_tools(message: ServerMessage) -> Result<ListToolsResult, String> {
    parse_response(message)
}

/// Decodes a `tools/call` reply and hands back its JSON form, so the
/// formatter sees `content`, `structuredContent`, and `isError` as sent.
pub(crate) fn parse_call_tool(message: ServerMessage) -> Result<Value, String> {
    let result: CallToolResult = parse_response(message)?;
    serde_json::to_value(&result).map_err(|err| err.to_string())
}

pub(crate) fn tool_descriptor(tool: &Tool) -> Option<ToolDescriptor> {
    let value = serde_json::to_value(tool).ok()?;
    ToolDescriptor::from_value(&value)
}

fn parse_response<T: serde::de::DeserializeOwned>(message: ServerMessage) -> Result<T, String> {
    let value = parse_response_value(message)?;
    serde_json::from_value::<T>(value).map_err(|err| err.to_string())
}

pub(crate) fn parse_response_value(message: ServerMessage) -> Result<Value, String> {
    match message {
        ServerMessage::Response(response) => {
            serde_json::to_value(&response.result).map_err(|err| err.to_string())
        }
        ServerMessage::Error(error) => Err(format_rpc_error(&error.error)),
        other => Err(format!("Unexpected MCP server message: {other:?}")),
    }
}

pub(crate) fn format_rpc_error(error: &RpcError) -> String {
    let mut output = format!("MCP error {}: {}", error.code, error.message);
    let details = error.data.as_ref().and_then(|data| {
        data.get("details")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| data.as_str().map(str::to_string))
            .or_else(|| serde_json::to_string_pretty(data).ok())
    });
    if let Some(details) = details.filter(|details| !details.is_empty()) {
        output.push('\n');
        output.push_str(&details);
    }
    output
}
