use super::protocol;
use super::{
    apply_streamable_http_client_post_headers, apply_streamable_http_protocol_version_header,
    client_details, MCP_MAX_TOOL_LIST, MCP_SESSION_ID_HEADER,
};
use crate::mcp::schema::ToolDescriptor;
use crate::mcp::transport::streamable_http::{is_event_stream_content_type, next_sse_server_message};
use crate::mcp::transport::{is_method_not_found, RemoteSession};
use async_trait::async_trait;
use rust_mcp_schema::schema_utils::{
    ClientMessage, FromMessage, MessageFromClient, NotificationFromClient, RequestFromClient,
    ServerMessage,
};
use rust_mcp_schema::{CallToolRequestParams, RequestId};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// One streamable HTTP session against a single endpoint URL.
pub(crate) struct HttpSession {
    client: reqwest::Client,
    url: String,
    auth_header: Option<String>,
    session_id: Option<String>,
    negotiated_protocol_version: Option<String>,
    next_request_id: i64,
}

impl HttpSession {
    pub(crate) fn new(client: reqwest::Client, url: &str, auth_header: Option<&str>) -> Self {
        Self {
            client,
            url: url.to_string(),
            auth_header: auth_header.map(str::to_string),
            session_id: None,
            negotiated_protocol_version: None,
            next_request_id: 0,
        }
    }

    pub(crate) fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Runs the `initialize` handshake and acknowledges it.
    pub(crate) async fn initialize(&mut self) -> Result<(), String> {
        let response = self
            .send_request(RequestFromClient::InitializeRequest(client_details()))
            .await?;
        let initialize = protocol::parse_initialize_result(response)?;
        info!(
            url = %self.url,
            server = %initialize.server_info.name,
            protocol_version = %initialize.protocol_version,
            "MCP session initialized"
        );
        self.negotiated_protocol_version = Some(initialize.protocol_version);

        self.send_notification(NotificationFromClient::InitializedNotification(None))
            .await
    }

    fn effective_protocol_version(&self) -> String {
        protocol::effective_protocol_version(self.negotiated_protocol_version.as_deref())
    }

    fn with_session_headers(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(auth) = &self.auth_header {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        if let Some(session_id) = &self.session_id {
            request = request.header(MCP_SESSION_ID_HEADER, session_id);
        }
        request
    }

    async fn post(&mut self, message: ClientMessage) -> Result<reqwest::Response, String> {
        let payload = serde_json::to_string(&message).map_err(|err| err.to_string())?;
        let protocol_version = self.effective_protocol_version();
        let request = apply_streamable_http_protocol_version_header(
            apply_streamable_http_client_post_headers(self.client.post(&self.url)),
            Some(protocol_version.as_str()),
        )
        .body(payload);

        let response = self
            .with_session_headers(request)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP error: {}", response.status()));
        }

        if let Some(session_id) = response
            .headers()
            .get(MCP_SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            self.session_id = Some(session_id.to_string());
        }
        Ok(response)
    }

    async fn send_request(&mut self, request: RequestFromClient) -> Result<ServerMessage, String> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let message = ClientMessage::from_message(
            MessageFromClient::RequestFromClient(request),
            Some(RequestId::Integer(request_id)),
        )
        .map_err(|err| err.to_string())?;

        debug!(url = %self.url, request_id, "Sending MCP HTTP request");
        let response = self.post(message).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();

        if is_event_stream_content_type(&content_type) {
            next_sse_server_message(response).await
        } else {
            let body = response.bytes().await.map_err(|err| err.to_string())?;
            serde_json::from_slice::<ServerMessage>(&body).map_err(|err| err.to_string())
        }
    }

    async fn send_notification(&mut self, notification: NotificationFromClient) -> Result<(), String> {
        let message = ClientMessage::from_message(
            MessageFromClient::NotificationFromClient(notification),
            None,
        )
        .map_err(|err| err.to_string())?;
        self.post(message).await.map(|_| ())
    }
}

#[async_trait]
impl RemoteSession for HttpSession {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, String> {
        let mut tools = Vec::new();
        let mut cursor = None;

        loop {
            let response = self
                .send_request(RequestFromClient::ListToolsRequest(
                    protocol::paginated_params(cursor.take()),
                ))
                .await?;
            if is_method_not_found(&response) {
                break;
            }
            let page = protocol::parse_list_tools(response)?;
            let empty_page = page.tools.is_empty();
            tools.extend(page.tools);
            if tools.len() >= MCP_MAX_TOOL_LIST {
                tools.truncate(MCP_MAX_TOOL_LIST);
                break;
            }
            match page.next_cursor {
                Some(next) if !empty_page => cursor = Some(next),
                _ => break,
            }
        }

        debug!(url = %self.url, count = tools.len(), "Fetched MCP tool list");
        Ok(tools.iter().filter_map(protocol::tool_descriptor).collect())
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, String> {
        let params = CallToolRequestParams::new(name).with_arguments(arguments);
        let response = self
            .send_request(RequestFromClient::CallToolRequest(params))
            .await?;
        protocol::parse_call_tool(response)
    }

    /// Cancel-safe: the session id is cleared only after the server answers.
    async fn close(&mut self) -> Result<(), String> {
        let Some(session_id) = self.session_id.clone() else {
            return Ok(());
        };

        let protocol_version = self.effective_protocol_version();
        let mut request = apply_streamable_http_protocol_version_header(
            self.client.delete(&self.url),
            Some(protocol_version.as_str()),
        )
        .header(MCP_SESSION_ID_HEADER, &session_id);
        if let Some(auth) = &self.auth_header {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await.map_err(|err| err.to_string())?;
        let status = response.status();
        // 405: the server does not support explicit session termination.
        if status.is_success() || status == reqwest::StatusCode::METHOD_NOT_ALLOWED {
            self.session_id = None;
            debug!(url = %self.url, "MCP session closed");
            Ok(())
        } else {
            Err(format!("HTTP error: {status}"))
        }
    }
}
