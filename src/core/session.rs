//! The single active tool-server connection.
//!
//! [`SessionManager`] owns at most one [`Session`]. Every operation takes the
//! same async mutex, so connect, disconnect, listing and calls never
//! interleave. Each remote step runs under the request timeout; connecting is
//! two steps (handshake, then the first tool list).

use crate::mcp::schema::ToolDescriptor;
use crate::mcp::transport::{RemoteSession, ToolTransport};
use crate::utils::url::validate_endpoint_url;
use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Named variable lookup, so token resolution can be tested without touching
/// the process environment.
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    None,
    Literal,
    EnvVar(String),
}

impl TokenSource {
    pub fn describe(&self) -> String {
        match self {
            TokenSource::None => "none".to_string(),
            TokenSource::Literal => "bearer token".to_string(),
            TokenSource::EnvVar(name) => format!("bearer token from ${name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NotConnected,
    InvalidUrl(String),
    MissingEnvVar(String),
    /// The remote endpoint refused or failed the connection; message verbatim.
    Connection(String),
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    ToolNotFound(String),
    RemoteCall(String),
    Disconnect(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotConnected => write!(f, "Not connected to any MCP server"),
            SessionError::InvalidUrl(message) => write!(f, "{message}"),
            SessionError::MissingEnvVar(name) => {
                write!(f, "Environment variable {name} not found or empty")
            }
            SessionError::Connection(message) => write!(f, "{message}"),
            SessionError::Timeout { operation, after } => {
                write!(f, "{operation} timed out after {}s", after.as_secs_f64())
            }
            SessionError::ToolNotFound(name) => write!(f, "Tool '{name}' not found"),
            SessionError::RemoteCall(message) => write!(f, "{message}"),
            SessionError::Disconnect(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for SessionError {}

struct Session {
    url: String,
    token_source: TokenSource,
    tools: Vec<ToolDescriptor>,
    connected_at: DateTime<Local>,
    remote: Box<dyn RemoteSession>,
}

impl Session {
    fn find_tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectSummary {
    pub url: String,
    pub tool_count: usize,
}

#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub connected: bool,
    pub url: Option<String>,
    pub tool_count: usize,
    pub token_source: TokenSource,
    pub connected_at: Option<DateTime<Local>>,
}

pub struct SessionManager {
    transport: Arc<dyn ToolTransport>,
    env: Arc<dyn EnvSource>,
    request_timeout: Duration,
    state: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn ToolTransport>,
        env: Arc<dyn EnvSource>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            env,
            request_timeout,
            state: Mutex::new(None),
        }
    }

    async fn timed<T>(
        &self,
        operation: &'static str,
        future: impl Future<Output = Result<T, String>>,
    ) -> Result<Result<T, String>, SessionError> {
        tokio::time::timeout(self.request_timeout, future)
            .await
            .map_err(|_| SessionError::Timeout {
                operation,
                after: self.request_timeout,
            })
    }

    fn resolve_token(
        &self,
        token: Option<&str>,
        token_env_var: Option<&str>,
    ) -> Result<(Option<String>, TokenSource), SessionError> {
        if let Some(name) = token_env_var {
            let value = self
                .env
                .var(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| SessionError::MissingEnvVar(name.to_string()))?;
            return Ok((Some(value), TokenSource::EnvVar(name.to_string())));
        }
        match token.filter(|token| !token.is_empty()) {
            Some(token) => Ok((Some(token.to_string()), TokenSource::Literal)),
            None => Ok((None, TokenSource::None)),
        }
    }

    /// Replaces any current session with a new one on `url`.
    ///
    /// The URL and token are checked before anything remote happens, so a bad
    /// request leaves an existing session untouched. Once past those checks the
    /// old session is always dropped, even if its teardown fails.
    pub async fn connect(
        &self,
        url: &str,
        token: Option<&str>,
        token_env_var: Option<&str>,
    ) -> Result<ConnectSummary, SessionError> {
        let url = validate_endpoint_url(url).map_err(SessionError::InvalidUrl)?;
        let (token, token_source) = self.resolve_token(token, token_env_var)?;

        let mut state = self.state.lock().await;
        if let Some(mut previous) = state.take() {
            info!(url = %previous.url, "Closing existing MCP session before reconnecting");
            let teardown = match self.timed("disconnect", previous.remote.close()).await {
                Ok(result) => result,
                Err(err) => Err(err.to_string()),
            };
            if let Err(err) = teardown {
                warn!(url = %previous.url, error = %err, "Teardown failed; dropping old session");
            }
        }

        let auth_header = token.map(|token| format!("Bearer {token}"));
        let mut remote = self
            .timed("connect", self.transport.connect(&url, auth_header.as_deref()))
            .await?
            .map_err(SessionError::Connection)?;
        let listed = match self.timed("connect", remote.list_tools()).await {
            Ok(result) => result.map_err(SessionError::Connection),
            Err(timeout) => Err(timeout),
        };
        let tools = match listed {
            Ok(tools) => tools,
            Err(err) => {
                self.close_half_open(remote.as_mut()).await;
                return Err(err);
            }
        };

        info!(url = %url, tools = tools.len(), auth = %token_source.describe(), "Connected to MCP server");
        let summary = ConnectSummary {
            url: url.clone(),
            tool_count: tools.len(),
        };
        *state = Some(Session {
            url,
            token_source,
            tools,
            connected_at: Local::now(),
            remote,
        });
        Ok(summary)
    }

    /// Best-effort teardown of a session that never finished connecting.
    async fn close_half_open(&self, remote: &mut dyn RemoteSession) {
        let closed = match self.timed("disconnect", remote.close()).await {
            Ok(result) => result,
            Err(err) => Err(err.to_string()),
        };
        if let Err(err) = closed {
            warn!(error = %err, "Failed to close half-open session");
        }
    }

    /// Closes the current session. If the remote teardown fails the session is
    /// kept so the caller can retry. Returns the endpoint that was closed.
    pub async fn disconnect(&self) -> Result<String, SessionError> {
        let mut state = self.state.lock().await;
        let session = state.as_mut().ok_or(SessionError::NotConnected)?;
        self.timed("disconnect", session.remote.close())
            .await?
            .map_err(SessionError::Disconnect)?;

        let url = session.url.clone();
        *state = None;
        info!(url = %url, "Disconnected from MCP server");
        Ok(url)
    }

    async fn refresh(&self, session: &mut Session) -> Result<(), SessionError> {
        let tools = self
            .timed("list tools", session.remote.list_tools())
            .await?
            .map_err(SessionError::RemoteCall)?;
        session.tools = tools;
        Ok(())
    }

    /// Fetches a fresh catalogue from the server.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, SessionError> {
        let mut state = self.state.lock().await;
        let session = state.as_mut().ok_or(SessionError::NotConnected)?;
        self.refresh(session).await?;
        Ok(session.tools.clone())
    }

    /// Looks a tool up in the cached catalogue, refreshing once on a miss.
    pub async fn tool(&self, name: &str) -> Result<ToolDescriptor, SessionError> {
        let mut state = self.state.lock().await;
        let session = state.as_mut().ok_or(SessionError::NotConnected)?;
        if let Some(tool) = session.find_tool(name) {
            return Ok(tool.clone());
        }
        self.refresh(session).await?;
        session
            .find_tool(name)
            .cloned()
            .ok_or_else(|| SessionError::ToolNotFound(name.to_string()))
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, SessionError> {
        let mut state = self.state.lock().await;
        let session = state.as_mut().ok_or(SessionError::NotConnected)?;
        info!(url = %session.url, tool = name, "Calling MCP tool");
        self.timed("tool call", session.remote.call_tool(name, arguments))
            .await?
            .map_err(SessionError::RemoteCall)
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.is_some()
    }

    pub async fn status(&self) -> SessionStatus {
        match self.state.lock().await.as_ref() {
            Some(session) => SessionStatus {
                connected: true,
                url: Some(session.url.clone()),
                tool_count: session.tools.len(),
                token_source: session.token_source.clone(),
                connected_at: Some(session.connected_at),
            },
            None => SessionStatus {
                connected: false,
                url: None,
                tool_count: 0,
                token_source: TokenSource::None,
                connected_at: None,
            },
        }
    }
}
