//! Remote tool-server boundary.
//!
//! The session manager only talks to a server through these traits, so the
//! wire protocol can be swapped out (the HTTP client in [`crate::mcp::client`]
//! in production, an in-memory fake in tests).

use crate::mcp::schema::ToolDescriptor;
use async_trait::async_trait;
use rust_mcp_schema::schema_utils::ServerMessage;
use serde_json::{Map, Value};

pub mod streamable_http;

/// JSON-RPC code used by servers to indicate an unsupported method.
pub const MCP_METHOD_NOT_FOUND: i64 = -32601;

/// Opens sessions against a remote endpoint.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// `auth_header` is the complete `Authorization` header value, if any.
    async fn connect(
        &self,
        url: &str,
        auth_header: Option<&str>,
    ) -> Result<Box<dyn RemoteSession>, String>;
}

/// One live, initialized connection.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, String>;

    /// Returns the server's result payload unmodified.
    async fn call_tool(&mut self, name: &str, arguments: Map<String, Value>)
        -> Result<Value, String>;

    async fn close(&mut self) -> Result<(), String>;
}

/// Returns true when a server reports the JSON-RPC method-not-found code.
pub fn is_method_not_found(message: &ServerMessage) -> bool {
    matches!(
        message,
        ServerMessage::Error(error) if error.error.code == MCP_METHOD_NOT_FOUND
    )
}
