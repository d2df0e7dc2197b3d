//! MCP plumbing: the streamable HTTP client, tool descriptors and their
//! schemas, and argument validation.

pub mod client;
pub mod schema;
pub mod transport;
pub mod validate;
