//! MCP client over streamable HTTP.
//!
//! Each [`HttpToolTransport::connect`] performs the `initialize` handshake and
//! yields an [`HttpSession`](transport_http::HttpSession) that tracks the
//! server-issued `mcp-session-id` and negotiated protocol version.

use crate::mcp::transport::{RemoteSession, ToolTransport};
use async_trait::async_trait;
use rust_mcp_schema::{
    ClientCapabilities, Implementation, InitializeRequestParams, LATEST_PROTOCOL_VERSION,
};
use std::time::Duration;

mod protocol;
mod transport_http;

pub(crate) use transport_http::HttpSession;

const MCP_MAX_TOOL_LIST: usize = 100;
const MCP_JSON_CONTENT_TYPE: &str = "application/json";
const MCP_JSON_AND_SSE_ACCEPT: &str = "application/json, text/event-stream";
const MCP_PROTOCOL_VERSION_HEADER: &str = "MCP-Protocol-Version";
const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";
const MCP_HTTP_POOL_IDLE_TIMEOUT_SECONDS: u64 = 90;
const MCP_HTTP_POOL_MAX_IDLE_PER_HOST: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(30),
        }
    }
}

fn build_mcp_http_client(timeouts: HttpTimeouts) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .pool_idle_timeout(Duration::from_secs(MCP_HTTP_POOL_IDLE_TIMEOUT_SECONDS))
        .pool_max_idle_per_host(MCP_HTTP_POOL_MAX_IDLE_PER_HOST)
        .build()
        .map_err(|err| err.to_string())
}

fn apply_streamable_http_client_post_headers(
    request: reqwest::RequestBuilder,
) -> reqwest::RequestBuilder {
    request
        .header("Content-Type", MCP_JSON_CONTENT_TYPE)
        .header("Accept", MCP_JSON_AND_SSE_ACCEPT)
}

fn apply_streamable_http_protocol_version_header(
    request: reqwest::RequestBuilder,
    protocol_version: Option<&str>,
) -> reqwest::RequestBuilder {
    match protocol_version {
        Some(protocol_version) if !protocol_version.trim().is_empty() => {
            request.header(MCP_PROTOCOL_VERSION_HEADER, protocol_version)
        }
        _ => request,
    }
}

fn client_details() -> InitializeRequestParams {
    InitializeRequestParams {
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolrelay".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("toolrelay".to_string()),
            description: Some("Chat front-end for MCP tool servers".to_string()),
            icons: Vec::new(),
            website_url: None,
        },
        meta: None,
        protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
    }
}

/// Production [`ToolTransport`]: one pooled `reqwest` client shared by every
/// session it opens.
#[derive(Clone)]
pub struct HttpToolTransport {
    client: reqwest::Client,
}

impl HttpToolTransport {
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, String> {
        let client = build_mcp_http_client(timeouts)
            .map_err(|err| format!("Failed to build HTTP client: {err}"))?;
        Ok(Self::with_client(client))
    }

    pub(crate) fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolTransport for HttpToolTransport {
    async fn connect(
        &self,
        url: &str,
        auth_header: Option<&str>,
    ) -> Result<Box<dyn RemoteSession>, String> {
        let mut session = HttpSession::new(self.client.clone(), url, auth_header);
        session.initialize().await?;
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests;
