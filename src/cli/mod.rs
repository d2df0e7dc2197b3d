//! Command-line interface parsing and the line-oriented chat loop.
//!
//! Each input line is one chat message and gets one reply on stdout. Logs go
//! to stderr so replies can be piped.

use std::error::Error;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::config::data::DEFAULT_LOG_LEVEL;
use crate::core::config::Config;
use crate::core::handler::{ChatHandler, HandlerOptions};
use crate::core::session::{ProcessEnv, SessionError, SessionManager};
use crate::mcp::client::HttpToolTransport;
use crate::render::replies;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("VERGEN_GIT_SHA"), ")");
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("VERGEN_GIT_DESCRIBE"),
    " (",
    env!("VERGEN_GIT_SHA"),
    ")\nbuilt: ",
    env!("VERGEN_BUILD_DATE"),
    "\nrustc: ",
    env!("VERGEN_RUSTC_SEMVER"),
);

const EXIT_WORDS: [&str; 2] = ["quit", "exit"];

#[derive(Parser, Debug)]
#[command(name = "toolrelay")]
#[command(version = VERSION, long_version = LONG_VERSION)]
#[command(about = "Chat with a remote MCP tool server")]
#[command(
    long_about = "toolrelay reads chat messages from stdin, one per line, and relays them to a \
remote MCP tool server over streamable HTTP. Replies are written to stdout as markdown.\n\n\
Messages:\n\
  !connect <url> [--token TOKEN] [--token-env-var NAME]\n\
  !list, !schema <tool>, !call <tool> <json>, !status, !disconnect, !help\n\
  Natural forms such as 'connect to <url>' or 'list tools' work too.\n\n\
Type 'quit' or 'exit' (or send EOF) to disconnect and leave.\n\n\
Logging goes to stderr and follows RUST_LOG, then --log-level, then the config file."
)]
pub struct Args {
    /// Path to the configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Connect to this server before reading any messages
    #[arg(long, value_name = "URL")]
    pub connect: Option<String>,

    /// Bearer token for the initial connection
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Read the bearer token for the initial connection from this variable
    #[arg(long, value_name = "VAR")]
    pub token_env_var: Option<String>,

    /// Log filter used when RUST_LOG is unset (e.g. "info" or "toolrelay=debug")
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Process this message and exit instead of reading stdin; repeatable
    #[arg(short = 'e', long = "execute", value_name = "MESSAGE")]
    pub execute: Vec<String>,
}

impl Args {
    /// Endpoint for the startup connection, from the flag or the config.
    fn startup_url<'a>(&'a self, config: &'a Config) -> Option<&'a str> {
        self.connect
            .as_deref()
            .or(config.default_url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }

    /// An explicit `--token` suppresses the configured token variable.
    fn startup_token_env_var<'a>(&'a self, config: &'a Config) -> Option<&'a str> {
        match (&self.token_env_var, &self.token) {
            (Some(name), _) => Some(name.as_str()),
            (None, Some(_)) => None,
            (None, None) => config.default_token_env_var.as_deref(),
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    init_logging(args.log_level.as_deref().unwrap_or(config.log_level()));

    let transport = HttpToolTransport::new(config.http_timeouts())?;
    let sessions = Arc::new(SessionManager::new(
        Arc::new(transport),
        Arc::new(ProcessEnv),
        config.request_timeout(),
    ));
    let handler = ChatHandler::new(
        Arc::clone(&sessions),
        HandlerOptions {
            validation: config.validation_mode(),
            output: config.output,
        },
    );

    let mut stdout = tokio::io::stdout();

    if let Some(url) = args.startup_url(&config) {
        let reply = match sessions
            .connect(
                url,
                args.token.as_deref(),
                args.startup_token_env_var(&config),
            )
            .await
        {
            Ok(summary) => replies::connect_success(&summary),
            Err(err) => replies::connect_failure(&err.to_string()),
        };
        write_reply(&mut stdout, &reply).await?;
    }

    if args.execute.is_empty() {
        let interactive = std::io::stdin().is_terminal();
        if interactive {
            eprintln!("toolrelay {VERSION}. Type !help for commands, quit to leave.");
        }
        let input = BufReader::new(tokio::io::stdin());
        run_chat(&handler, input, &mut stdout, interactive).await?;
    } else {
        for message in &args.execute {
            let reply = handler.process_message(message).await;
            write_reply(&mut stdout, &reply).await?;
        }
    }

    shutdown(&sessions).await;
    Ok(())
}

/// `RUST_LOG` wins; otherwise `fallback`, then the built-in default.
fn init_logging(fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn is_exit(message: &str) -> bool {
    EXIT_WORDS
        .iter()
        .any(|word| message.eq_ignore_ascii_case(word))
}

/// Feeds each non-blank line to the handler until an exit word or EOF.
pub async fn run_chat<R, W>(
    handler: &ChatHandler,
    input: R,
    output: &mut W,
    prompt: bool,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    loop {
        if prompt {
            eprint!("> ");
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if is_exit(message) {
            break;
        }
        let reply = handler.process_message(message).await;
        write_reply(output, &reply).await?;
    }
    Ok(())
}

async fn write_reply<W: AsyncWrite + Unpin>(output: &mut W, reply: &str) -> std::io::Result<()> {
    output.write_all(reply.as_bytes()).await?;
    output.write_all(b"\n\n").await?;
    output.flush().await
}

async fn shutdown(sessions: &SessionManager) {
    match sessions.disconnect().await {
        Ok(url) => info!(url = %url, "Closed session on exit"),
        Err(SessionError::NotConnected) => {}
        Err(err) => warn!(error = %err, "Failed to close session on exit"),
    }
}
