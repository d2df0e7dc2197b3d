use super::*;
use serde_json::json;

fn text_options(command: &Command) -> Vec<(&str, &str)> {
    command
        .options
        .iter()
        .filter_map(|(key, value)| value.as_text().map(|text| (key.as_str(), text)))
        .collect()
}

#[test]
fn registry_lists_commands() {
    let commands = all_commands();
    for name in ["connect", "disconnect", "list", "call", "schema", "status", "help"] {
        assert!(commands.iter().any(|cmd| cmd.name == name), "missing {name}");
    }
    assert!(find_command("help").is_some());
    assert!(find_command("HELP").is_none());
    assert!(find_topic("!Connect").is_some());
}

#[test]
fn structured_connect_collects_url_and_token_options() {
    let command = parse("!connect https://Mcp.Example.com/sse --token s3cret --token-env-var API_KEY");
    assert_eq!(command.kind, CommandKind::Connect);
    assert_eq!(command.form, InputForm::Structured);
    assert_eq!(command.args, vec!["https://Mcp.Example.com/sse"]);
    assert_eq!(
        text_options(&command),
        vec![("token", "s3cret"), ("token_env_var", "API_KEY")]
    );
}

#[test]
fn structured_and_natural_connect_agree() {
    let structured = parse("!connect https://mcp.example.com/mcp --token abc");
    let natural = parse("Connect to https://mcp.example.com/mcp with token abc");
    assert_eq!(structured.kind, CommandKind::Connect);
    assert_eq!(natural.kind, CommandKind::Connect);
    assert_eq!(structured.args, natural.args);
    assert_eq!(structured.options, natural.options);

    let structured = parse("!connect https://mcp.example.com/mcp --token-env-var MCP_TOKEN");
    let natural = parse("connect to https://mcp.example.com/mcp with token env MCP_TOKEN");
    assert_eq!(structured.args, natural.args);
    assert_eq!(structured.options, natural.options);
}

#[test]
fn structured_round_trip_recovers_arguments() {
    let cases = [
        "!connect https://a.test/mcp --token 'two words'",
        "!schema web_search",
        "!help call",
        "!status",
    ];
    for input in cases {
        let first = parse(input);
        let mut rebuilt = format!("!{}", first.kind.name());
        for arg in &first.args {
            rebuilt.push_str(&format!(" '{}'", arg));
        }
        for (key, value) in &first.options {
            let flag = key.replace('_', "-");
            rebuilt.push_str(&format!(" --{} '{}'", flag, value.as_text().unwrap()));
        }
        let second = parse(&rebuilt);
        assert_eq!(first.kind, second.kind, "input: {input}");
        assert_eq!(first.args, second.args, "input: {input}");
        assert_eq!(first.options, second.options, "input: {input}");
    }
}

#[test]
fn structured_call_keeps_json_quoting() {
    let command = parse(r#"!call web_search {"query": "AI news", "count": 3}"#);
    assert_eq!(command.kind, CommandKind::Call);
    assert_eq!(command.args, vec!["web_search"]);
    assert_eq!(
        Value::Object(command.call_arguments().unwrap().clone()),
        json!({"query": "AI news", "count": 3})
    );

    let round_trip = parse(&format!(
        "!call web_search {}",
        serde_json::to_string(command.call_arguments().unwrap()).unwrap()
    ));
    assert_eq!(round_trip.options, command.options);
}

#[test]
fn structured_call_accepts_shorthand_and_empty_arguments() {
    let command = parse(r#"!call web_search query="AI news" count=5"#);
    assert_eq!(
        Value::Object(command.call_arguments().unwrap().clone()),
        json!({"query": "AI news", "count": 5})
    );

    let bare = parse("!call list_sites");
    assert_eq!(bare.kind, CommandKind::Call);
    assert!(bare.call_arguments().unwrap().is_empty());

    let nameless = parse("!call");
    assert_eq!(nameless.kind, CommandKind::Call);
    assert!(nameless.args.is_empty());
}

#[test]
fn malformed_call_arguments_are_unknown_with_reason() {
    let command = parse(r#"!call web_search {"query": "#);
    assert_eq!(command.kind, CommandKind::Unknown);
    assert_eq!(command.form, InputForm::Structured);
    assert!(command
        .syntax_error
        .as_deref()
        .unwrap()
        .starts_with("Invalid JSON arguments"));
}

#[test]
fn keywords_are_case_sensitive() {
    let command = parse("!Connect https://a.test");
    assert_eq!(command.kind, CommandKind::Unknown);
    assert_eq!(command.form, InputForm::Structured);
    assert!(command.syntax_error.is_none());
    assert_eq!(parse("!bogus").kind, CommandKind::Unknown);
    assert_eq!(parse("!").kind, CommandKind::Unknown);
}

#[test]
fn unclosed_quote_is_a_syntax_error() {
    let command = parse("!connect 'https://a.test");
    assert_eq!(command.kind, CommandKind::Unknown);
    assert_eq!(
        command.syntax_error.as_deref(),
        Some("Unclosed quote (') in command arguments.")
    );
}

#[test]
fn table_driven_natural_language() {
    struct Case<'a> {
        input: &'a str,
        kind: CommandKind,
        args: Vec<&'a str>,
    }

    let cases = vec![
        Case {
            input: "disconnect",
            kind: CommandKind::Disconnect,
            args: vec![],
        },
        Case {
            input: "  List Tools  ",
            kind: CommandKind::List,
            args: vec![],
        },
        Case {
            input: "STATUS",
            kind: CommandKind::Status,
            args: vec![],
        },
        Case {
            input: "help",
            kind: CommandKind::Help,
            args: vec![],
        },
        Case {
            input: "help Schema",
            kind: CommandKind::Help,
            args: vec!["Schema"],
        },
        Case {
            input: "schema Brave_Web_Search",
            kind: CommandKind::Schema,
            args: vec!["Brave_Web_Search"],
        },
        Case {
            input: "call Web_Search query=News",
            kind: CommandKind::Call,
            args: vec!["Web_Search"],
        },
        Case {
            input: "connect to HTTPS://Host.test/Path",
            kind: CommandKind::Connect,
            args: vec!["HTTPS://Host.test/Path"],
        },
    ];

    for case in cases {
        let command = parse(case.input);
        assert_eq!(command.kind, case.kind, "input: {}", case.input);
        assert_eq!(command.form, InputForm::Natural, "input: {}", case.input);
        assert_eq!(command.args, case.args, "input: {}", case.input);
    }
}

#[test]
fn natural_call_preserves_argument_case() {
    let command = parse(r#"call web_search {"query": "Rust Async"}"#);
    assert_eq!(
        Value::Object(command.call_arguments().unwrap().clone()),
        json!({"query": "Rust Async"})
    );
}

#[test]
fn conversational_text_is_unknown() {
    for input in [
        "hello there",
        "can you list tools for me?",
        "connect",
        "",
        "call me later",
    ] {
        let command = parse(input);
        assert_eq!(command.kind, CommandKind::Unknown, "input: {input}");
        assert_eq!(command.form, InputForm::Conversational, "input: {input}");
        assert!(command.args.is_empty());
    }
}

#[test]
fn natural_call_with_broken_arguments_reports_the_problem() {
    let command = parse(r#"call web_search {"query": "#);
    assert_eq!(command.kind, CommandKind::Unknown);
    assert_eq!(command.form, InputForm::Natural);
    assert!(command
        .syntax_error
        .as_deref()
        .unwrap_or_default()
        .starts_with("Invalid JSON arguments"));

    let command = parse("call web_search query=\"unclosed");
    assert_eq!(command.form, InputForm::Natural);
    assert!(command.syntax_error.is_some());
}

#[test]
fn parsing_is_deterministic() {
    let input = "call web_search query=\"AI news\"";
    assert_eq!(parse(input), parse(input));
}

#[test]
fn is_structured_ignores_leading_space() {
    assert!(is_structured("  !status"));
    assert!(!is_structured("status"));
}
