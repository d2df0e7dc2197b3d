use crate::core::session::EnvSource;
use crate::mcp::schema::ToolDescriptor;
use crate::mcp::transport::{RemoteSession, ToolTransport};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Every remote interaction the fake transport observed, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Connect {
        url: String,
        auth_header: Option<String>,
    },
    ListTools {
        url: String,
    },
    CallTool {
        url: String,
        name: String,
        arguments: Map<String, Value>,
    },
    Close {
        url: String,
    },
}

#[derive(Default)]
struct FakeState {
    calls: Vec<RemoteCall>,
    tools: Vec<ToolDescriptor>,
    results: HashMap<String, Result<Value, String>>,
    connect_error: Option<String>,
    close_error: Option<String>,
    delay: Option<Duration>,
}

/// In-memory [`ToolTransport`] that records calls and serves canned replies.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(self, tools: Vec<ToolDescriptor>) -> Self {
        self.state.lock().unwrap().tools = tools;
        self
    }

    pub fn with_result(self, tool: &str, result: Result<Value, String>) -> Self {
        self.state
            .lock()
            .unwrap()
            .results
            .insert(tool.to_string(), result);
        self
    }

    pub fn set_tools(&self, tools: Vec<ToolDescriptor>) {
        self.state.lock().unwrap().tools = tools;
    }

    pub fn fail_connect(&self, message: Option<&str>) {
        self.state.lock().unwrap().connect_error = message.map(str::to_string);
    }

    pub fn fail_close(&self, message: Option<&str>) {
        self.state.lock().unwrap().close_error = message.map(str::to_string);
    }

    /// Delays every remote operation after `connect`.
    pub fn delay(&self, delay: Option<Duration>) {
        self.state.lock().unwrap().delay = delay;
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, RemoteCall::Connect { .. }))
            .count()
    }

    fn record(&self, call: RemoteCall) -> Option<Duration> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.delay
    }
}

#[async_trait]
impl ToolTransport for FakeTransport {
    async fn connect(
        &self,
        url: &str,
        auth_header: Option<&str>,
    ) -> Result<Box<dyn RemoteSession>, String> {
        self.record(RemoteCall::Connect {
            url: url.to_string(),
            auth_header: auth_header.map(str::to_string),
        });
        if let Some(err) = self.state.lock().unwrap().connect_error.clone() {
            return Err(err);
        }
        Ok(Box::new(FakeSession {
            transport: self.clone(),
            url: url.to_string(),
        }))
    }
}

struct FakeSession {
    transport: FakeTransport,
    url: String,
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, String> {
        let delay = self.transport.record(RemoteCall::ListTools {
            url: self.url.clone(),
        });
        pause(delay).await;
        Ok(self.transport.state.lock().unwrap().tools.clone())
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, String> {
        let delay = self.transport.record(RemoteCall::CallTool {
            url: self.url.clone(),
            name: name.to_string(),
            arguments,
        });
        pause(delay).await;
        self.transport
            .state
            .lock()
            .unwrap()
            .results
            .get(name)
            .cloned()
            .unwrap_or_else(|| Err(format!("No canned result for tool '{name}'")))
    }

    async fn close(&mut self) -> Result<(), String> {
        let delay = self.transport.record(RemoteCall::Close {
            url: self.url.clone(),
        });
        pause(delay).await;
        match self.transport.state.lock().unwrap().close_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Fixed environment for token lookups.
#[derive(Default)]
pub struct MapEnv(HashMap<String, String>);

impl MapEnv {
    pub fn new<const N: usize>(vars: [(&str, &str); N]) -> Self {
        Self(
            vars.into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

pub fn search_tool() -> ToolDescriptor {
    ToolDescriptor::from_value(&serde_json::json!({
        "name": "web_search",
        "description": "Search the web",
        "inputSchema": {
            "type": "object",
            "title": "Web search",
            "properties": {
                "query": {"type": "string", "description": "Search terms"},
                "count": {"type": "integer", "default": 10, "minimum": 1, "maximum": 20}
            },
            "required": ["query"]
        }
    }))
    .unwrap()
}
