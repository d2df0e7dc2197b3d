//! Server-sent event decoding for streamable HTTP responses.

use futures_util::StreamExt;
use rust_mcp_schema::schema_utils::ServerMessage;
use tracing::debug;

/// Splits a byte stream into trimmed, non-empty lines, holding back any
/// partial trailing line until more bytes arrive.
#[derive(Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        self.drain_lines(false)
    }

    pub fn finish(&mut self) -> Vec<String> {
        self.drain_lines(true)
    }

    fn drain_lines(&mut self, flush: bool) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let newline = start + offset;
            push_line(&mut lines, &self.buffer[start..newline]);
            start = newline + 1;
        }

        if flush {
            push_line(&mut lines, &self.buffer[start..]);
            self.buffer.clear();
        } else if start > 0 {
            self.buffer.drain(..start);
        }

        lines
    }
}

fn push_line(lines: &mut Vec<String>, bytes: &[u8]) {
    if let Ok(text) = std::str::from_utf8(bytes) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }
}

pub fn is_event_stream_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|value| value.eq_ignore_ascii_case("text/event-stream"))
}

pub fn sse_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

/// Reads events until the first response or error message. Server-initiated
/// requests and notifications on the stream are skipped.
pub async fn next_sse_server_message(response: reqwest::Response) -> Result<ServerMessage, String> {
    let mut stream = response.bytes_stream();
    let mut buffer = SseLineBuffer::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| err.to_string())?;
        if let Some(message) = first_reply(buffer.push(&chunk))? {
            return Ok(message);
        }
    }

    match first_reply(buffer.finish())? {
        Some(message) => Ok(message),
        None => Err("Empty event-stream response.".to_string()),
    }
}

fn first_reply(lines: Vec<String>) -> Result<Option<ServerMessage>, String> {
    for line in lines {
        let Some(message) = decode_sse_line(&line)? else {
            continue;
        };
        if matches!(message, ServerMessage::Response(_) | ServerMessage::Error(_)) {
            return Ok(Some(message));
        }
        debug!("Ignoring server-initiated MCP message on response stream");
    }
    Ok(None)
}

fn decode_sse_line(line: &str) -> Result<Option<ServerMessage>, String> {
    match sse_data_payload(line) {
        Some(payload) if !payload.is_empty() => serde_json::from_str::<ServerMessage>(payload)
            .map(Some)
            .map_err(|err| err.to_string()),
        _ => Ok(None),
    }
}
