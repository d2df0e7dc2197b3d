//! toolrelay is a chat front-end for remote MCP tool servers.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`commands`] turns one chat message, `!`-prefixed or natural language,
//!   into a typed command.
//! - [`core`] owns the single server session, configuration, and the chat
//!   handler that dispatches each command and always produces a reply.
//! - [`mcp`] speaks MCP streamable HTTP and normalizes and validates tool
//!   schemas.
//! - [`render`] formats tool results as markdown tables plus canonical JSON,
//!   and builds every reply the handler sends.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which reads messages from stdin.

pub mod cli;
pub mod commands;
pub mod core;
pub mod mcp;
pub mod render;
pub mod utils;
