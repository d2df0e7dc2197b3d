use super::args::OptionSpec;
use super::CommandKind;

/// How the text after a structured keyword is turned into arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgStyle {
    /// Shell-style tokens, with the listed long options pulled out.
    Tokens,
    /// First token is the tool name; the untouched remainder is the argument blob.
    ToolCall,
}

pub struct CommandSpec {
    pub name: &'static str,
    pub kind: CommandKind,
    pub usage: &'static str,
    pub help: &'static str,
    pub details: &'static [&'static str],
    pub style: ArgStyle,
    pub(crate) options: &'static [OptionSpec],
}

pub fn all_commands() -> &'static [CommandSpec] {
    COMMANDS
}

/// Keywords are matched case-sensitively.
pub fn find_command(name: &str) -> Option<&'static CommandSpec> {
    all_commands().iter().find(|command| command.name == name)
}

pub fn find_topic(topic: &str) -> Option<&'static CommandSpec> {
    let topic = topic.trim_start_matches('!');
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(topic))
}

const CONNECT_OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        flag: "token",
        key: super::OPTION_TOKEN,
    },
    OptionSpec {
        flag: "token-env-var",
        key: super::OPTION_TOKEN_ENV_VAR,
    },
];

const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "connect",
        kind: CommandKind::Connect,
        usage: "!connect <url> [--token TOKEN] [--token-env-var NAME]",
        help: "Connect to an MCP tool server.",
        details: &[
            "Any existing connection is closed first.",
            "`--token` sends a bearer token; `--token-env-var` reads it from an environment variable.",
            "Natural language: `connect to <url> with token <token>` or `connect to <url> with token env <NAME>`.",
            "Example: `!connect https://mcp.example.com/mcp --token-env-var MCP_TOKEN`",
        ],
        style: ArgStyle::Tokens,
        options: CONNECT_OPTIONS,
    },
    CommandSpec {
        name: "disconnect",
        kind: CommandKind::Disconnect,
        usage: "!disconnect",
        help: "Close the current connection.",
        details: &["Natural language: `disconnect`."],
        style: ArgStyle::Tokens,
        options: &[],
    },
    CommandSpec {
        name: "list",
        kind: CommandKind::List,
        usage: "!list",
        help: "List the tools offered by the connected server.",
        details: &["Natural language: `list tools`."],
        style: ArgStyle::Tokens,
        options: &[],
    },
    CommandSpec {
        name: "call",
        kind: CommandKind::Call,
        usage: "!call <tool_name> <json_args>",
        help: "Call a tool with JSON or key=value arguments.",
        details: &[
            "Arguments are checked against the tool's schema: missing required parameters are reported and optional ones are filled with their defaults.",
            "Shorthand: `!call web_search query=\"AI news\" count=5`.",
            "Natural language: `call <tool_name> <args>`.",
            "Example: `!call web_search {\"query\": \"AI news\"}`",
        ],
        style: ArgStyle::ToolCall,
        options: &[],
    },
    CommandSpec {
        name: "schema",
        kind: CommandKind::Schema,
        usage: "!schema <tool_name>",
        help: "Show a tool's parameters, constraints, and an example call.",
        details: &[
            "Natural language: `schema <tool_name>`.",
            "Example: `!schema web_search`",
        ],
        style: ArgStyle::Tokens,
        options: &[],
    },
    CommandSpec {
        name: "status",
        kind: CommandKind::Status,
        usage: "!status",
        help: "Show the connection status.",
        details: &["Natural language: `status`."],
        style: ArgStyle::Tokens,
        options: &[],
    },
    CommandSpec {
        name: "help",
        kind: CommandKind::Help,
        usage: "!help [command]",
        help: "Show all commands or details for one command.",
        details: &["Natural language: `help` or `help <command>`."],
        style: ArgStyle::Tokens,
        options: &[],
    },
];
