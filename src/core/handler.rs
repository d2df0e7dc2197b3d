//! Message dispatch: parse, check, execute, format.

use crate::commands::{self, find_topic, Command, CommandKind, InputForm};
use crate::commands::{OPTION_TOKEN, OPTION_TOKEN_ENV_VAR};
use crate::core::session::{SessionError, SessionManager};
use crate::mcp::schema::normalize;
use crate::mcp::validate::{generate_example, validate_with_mode, ValidationMode};
use crate::render::{self, replies, OutputMode, ToolOutcome};
use serde_json::Map;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerOptions {
    pub validation: ValidationMode,
    pub output: OutputMode,
}

/// Turns one chat message into one reply. Shareable across tasks; all
/// connection state lives in the [`SessionManager`].
pub struct ChatHandler {
    sessions: Arc<SessionManager>,
    options: HandlerOptions,
}

impl ChatHandler {
    pub fn new(sessions: Arc<SessionManager>, options: HandlerOptions) -> Self {
        Self { sessions, options }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Always produces reply text; every failure is rendered, never returned.
    pub async fn process_message(&self, text: &str) -> String {
        let command = commands::parse(text);
        debug!(kind = %command.kind, form = ?command.form, "Parsed chat message");
        match command.kind {
            CommandKind::Connect => self.handle_connect(&command).await,
            CommandKind::Disconnect => self.handle_disconnect().await,
            CommandKind::List => self.handle_list().await,
            CommandKind::Call => self.handle_call(&command).await,
            CommandKind::Schema => self.handle_schema(&command).await,
            CommandKind::Status => replies::status(&self.sessions.status().await),
            CommandKind::Help => handle_help(&command),
            CommandKind::Unknown => handle_unknown(&command),
        }
    }

    async fn handle_connect(&self, command: &Command) -> String {
        let Some(url) = command.arg(0) else {
            return replies::missing_argument(usage("connect"), "A server URL");
        };
        match self
            .sessions
            .connect(
                url,
                command.text_option(OPTION_TOKEN),
                command.text_option(OPTION_TOKEN_ENV_VAR),
            )
            .await
        {
            Ok(summary) => replies::connect_success(&summary),
            Err(err) => replies::connect_failure(&err.to_string()),
        }
    }

    async fn handle_disconnect(&self) -> String {
        match self.sessions.disconnect().await {
            Ok(url) => replies::disconnect_success(&url),
            Err(SessionError::NotConnected) => replies::not_connected(),
            Err(err) => replies::disconnect_failure(&err.to_string()),
        }
    }

    async fn handle_list(&self) -> String {
        match self.sessions.list_tools().await {
            Ok(tools) => replies::tool_list(&tools),
            Err(err) => session_error(&err),
        }
    }

    async fn handle_schema(&self, command: &Command) -> String {
        if !self.sessions.is_connected().await {
            return replies::not_connected();
        }
        let Some(name) = command.arg(0) else {
            return replies::missing_argument(usage("schema"), "A tool name");
        };
        let tool = match self.sessions.tool(name).await {
            Ok(tool) => tool,
            Err(err) => return session_error(&err),
        };
        match normalize(&tool) {
            Ok(schema) => replies::schema(&tool.name, &schema, &generate_example(&schema)),
            Err(err) => replies::schema_unavailable(&err),
        }
    }

    async fn handle_call(&self, command: &Command) -> String {
        if !self.sessions.is_connected().await {
            return replies::not_connected();
        }
        let Some(name) = command.arg(0) else {
            return replies::missing_argument(usage("call"), "A tool name");
        };
        let arguments = command.call_arguments().cloned().unwrap_or_else(Map::new);

        let tool = match self.sessions.tool(name).await {
            Ok(tool) => tool,
            Err(err) => return session_error(&err),
        };

        let arguments = match normalize(&tool) {
            Ok(schema) => {
                match validate_with_mode(&schema, &arguments, self.options.validation) {
                    Ok(completed) => completed,
                    Err(err) => {
                        return replies::validation_error(
                            &tool.name,
                            &err,
                            &schema,
                            &generate_example(&schema),
                        );
                    }
                }
            }
            Err(err) => {
                warn!(tool = %tool.name, reason = %err.reason, "Calling tool without argument validation");
                arguments
            }
        };

        let outcome = match self.sessions.call_tool(&tool.name, arguments).await {
            Ok(result) => ToolOutcome::from_call_result(result),
            Err(SessionError::NotConnected) => return replies::not_connected(),
            Err(err) => ToolOutcome::Failure(err.to_string()),
        };
        let formatted = render::format(&outcome);
        replies::tool_call(&tool.name, &formatted, self.options.output)
    }
}

fn usage(name: &str) -> &'static str {
    commands::find_command(name)
        .map(|spec| spec.usage)
        .unwrap_or_default()
}

fn session_error(err: &SessionError) -> String {
    match err {
        SessionError::NotConnected => replies::not_connected(),
        other => replies::error(&other.to_string()),
    }
}

fn handle_help(command: &Command) -> String {
    match command.arg(0) {
        None => replies::help_overview(),
        Some(topic) => match find_topic(topic) {
            Some(spec) => replies::help_topic(spec),
            None => replies::unknown_topic(topic),
        },
    }
}

fn handle_unknown(command: &Command) -> String {
    match command.form {
        InputForm::Conversational => replies::guidance(),
        _ => replies::unknown_command(&command.raw, command.syntax_error.as_deref()),
    }
}
