//! Chat input parsing.
//!
//! Input starting with [`COMMAND_PREFIX`] is read against the structured
//! command registry; anything else is tried against the natural-language
//! pattern table. Parsing is pure: it never touches the network or session
//! state.

mod args;
mod natural;
mod registry;

pub use registry::{all_commands, find_command, find_topic, ArgStyle, CommandSpec};

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const COMMAND_PREFIX: char = '!';

pub const OPTION_TOKEN: &str = "token";
pub const OPTION_TOKEN_ENV_VAR: &str = "token_env_var";
pub const OPTION_ARGUMENTS: &str = "arguments";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Connect,
    Disconnect,
    List,
    Call,
    Schema,
    Status,
    Help,
    Unknown,
}

impl CommandKind {
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Connect => "connect",
            CommandKind::Disconnect => "disconnect",
            CommandKind::List => "list",
            CommandKind::Call => "call",
            CommandKind::Schema => "schema",
            CommandKind::Status => "status",
            CommandKind::Help => "help",
            CommandKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which grammar recognised the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputForm {
    Structured,
    Natural,
    /// Neither grammar applied; the text is ordinary conversation.
    Conversational,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Text(String),
    Json(Map<String, Value>),
}

impl OptionValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(text) => Some(text),
            OptionValue::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Map<String, Value>> {
        match self {
            OptionValue::Json(map) => Some(map),
            OptionValue::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub args: Vec<String>,
    pub options: BTreeMap<String, OptionValue>,
    pub raw: String,
    pub form: InputForm,
    /// Why a recognised keyword was still rejected, for diagnostics.
    pub syntax_error: Option<String>,
}

impl Command {
    fn new(kind: CommandKind, raw: &str, form: InputForm) -> Self {
        Self {
            kind,
            args: Vec::new(),
            options: BTreeMap::new(),
            raw: raw.to_string(),
            form,
            syntax_error: None,
        }
    }

    fn unknown(raw: &str, form: InputForm) -> Self {
        Self::new(CommandKind::Unknown, raw, form)
    }

    fn syntax_error(raw: &str, form: InputForm, message: String) -> Self {
        let mut command = Self::unknown(raw, form);
        command.syntax_error = Some(message);
        command
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn text_option(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(OptionValue::as_text)
    }

    pub fn call_arguments(&self) -> Option<&Map<String, Value>> {
        self.options.get(OPTION_ARGUMENTS).and_then(OptionValue::as_json)
    }
}

pub fn is_structured(input: &str) -> bool {
    input.trim_start().starts_with(COMMAND_PREFIX)
}

pub fn parse(input: &str) -> Command {
    let trimmed = input.trim();
    if let Some(body) = trimmed.strip_prefix(COMMAND_PREFIX) {
        parse_structured(trimmed, body)
    } else {
        parse_natural(trimmed)
    }
}

fn parse_structured(raw: &str, body: &str) -> Command {
    let form = InputForm::Structured;
    let (keyword, remainder) = match body.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (body, ""),
    };

    let Some(spec) = registry::find_command(keyword) else {
        return Command::unknown(raw, form);
    };

    let mut command = Command::new(spec.kind, raw, form);
    match spec.style {
        ArgStyle::Tokens => {
            let tokens = match args::tokenize(remainder) {
                Ok(tokens) => tokens,
                Err(err) => return Command::syntax_error(raw, form, err),
            };
            let split = args::split_options(tokens, spec.options);
            command.args = split.positional;
            for (key, value) in split.options {
                command
                    .options
                    .insert(key.to_string(), OptionValue::Text(value));
            }
        }
        ArgStyle::ToolCall => {
            let (tool, blob) = match remainder.split_once(char::is_whitespace) {
                Some((tool, blob)) => (tool, blob),
                None => (remainder, ""),
            };
            if tool.is_empty() {
                return command;
            }
            match args::parse_call_arguments(blob) {
                Ok(arguments) => {
                    command.args.push(tool.to_string());
                    command
                        .options
                        .insert(OPTION_ARGUMENTS.to_string(), OptionValue::Json(arguments));
                }
                Err(err) => return Command::syntax_error(raw, form, err),
            }
        }
    }
    command
}

fn parse_natural(raw: &str) -> Command {
    let Some(found) = natural::match_natural(raw) else {
        return Command::unknown(raw, InputForm::Conversational);
    };

    let form = InputForm::Natural;
    let mut command = Command::new(found.pattern.kind, raw, form);
    for (capture, group) in found.pattern.captures.iter().zip(found.groups) {
        let Some(value) = group else {
            continue;
        };
        match capture {
            natural::Capture::Positional => command.args.push(value),
            natural::Capture::Option(key) => {
                command
                    .options
                    .insert(key.to_string(), OptionValue::Text(value));
            }
            natural::Capture::CallArguments => match args::parse_call_arguments(&value) {
                Ok(arguments) => {
                    command
                        .options
                        .insert(OPTION_ARGUMENTS.to_string(), OptionValue::Json(arguments));
                }
                // "call me later" is chat, not a tool call.
                Err(_) if !args::looks_like_arguments(&value) => {
                    return Command::unknown(raw, InputForm::Conversational);
                }
                Err(err) => return Command::syntax_error(raw, form, err),
            },
        }
    }

    if command.kind == CommandKind::Call && command.call_arguments().is_none() {
        command
            .options
            .insert(OPTION_ARGUMENTS.to_string(), OptionValue::Json(Map::new()));
    }
    command
}

#[cfg(test)]
mod tests;
