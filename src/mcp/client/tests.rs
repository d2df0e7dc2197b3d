use super::*;
use crate::core::session::{SessionError, SessionManager};
use crate::mcp::transport::RemoteSession;
use crate::utils::test_utils::MapEnv;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct CapturedRequest {
    request_line: String,
    method: String,
    accept: String,
    authorization: Option<String>,
    protocol_version: Option<String>,
    session_id: Option<String>,
    params: Value,
}

type CapturedRequests = Arc<Mutex<Vec<CapturedRequest>>>;

#[test]
fn streamable_http_client_post_headers_include_json_and_sse_accept() {
    let client = reqwest::Client::new();
    let request = apply_streamable_http_client_post_headers(client.post("https://example.com"))
        .build()
        .expect("request should build");

    assert_eq!(
        request
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok()),
        Some(MCP_JSON_CONTENT_TYPE)
    );
    assert_eq!(
        request
            .headers()
            .get("Accept")
            .and_then(|v| v.to_str().ok()),
        Some(MCP_JSON_AND_SSE_ACCEPT)
    );
}

#[test]
fn protocol_version_header_is_skipped_when_blank() {
    let client = reqwest::Client::new();
    let request =
        apply_streamable_http_protocol_version_header(client.post("https://example.com"), Some(" "))
            .build()
            .expect("request should build");
    assert!(request.headers().get(MCP_PROTOCOL_VERSION_HEADER).is_none());
}

#[test]
fn client_details_identify_this_crate() {
    let details = client_details();
    assert_eq!(details.client_info.name, "toolrelay");
    assert_eq!(details.protocol_version, LATEST_PROTOCOL_VERSION);
}

async fn read_http_request(
    stream: &mut TcpStream,
) -> Result<(String, Vec<(String, String)>, Vec<u8>), String> {
    let mut buffer = Vec::new();
    let mut header_end = None;
    while header_end.is_none() {
        let mut chunk = [0_u8; 1024];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        header_end = buffer
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|index| index + 4);
    }

    let header_end = header_end.expect("header end should exist");
    let header_text =
        std::str::from_utf8(&buffer[..header_end]).map_err(|err| err.to_string())?;
    let mut lines = header_text.split("\r\n").filter(|line| !line.is_empty());
    let request_line = lines
        .next()
        .ok_or_else(|| "Missing HTTP request line".to_string())?
        .to_string();

    let mut headers = Vec::new();
    let mut content_length = 0_usize;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().map_err(|err| err.to_string())?;
        }
        headers.push((name.to_string(), value));
    }

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0_u8; content_length - body.len()];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok((request_line, headers, body))
}

fn header(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.clone())
}

fn http_response(status: &str, content_type: &str, extra: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\n{extra}connection: close\r\ncontent-length: {}\r\n\r\n{body}",
        body.len()
    )
}

fn reply_for(method: &str, id: &Value, cursor: Option<&str>) -> String {
    match (method, cursor) {
        ("initialize", _) => {
            let body = json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": "2025-06-18",
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "mock", "version": "0.1.0"}
                }
            });
            http_response(
                "200 OK",
                "application/json",
                "mcp-session-id: session-1\r\n",
                &body.to_string(),
            )
        }
        ("notifications/initialized", _) => http_response("202 Accepted", "application/json", "", ""),
        ("tools/list", None) => {
            let body = json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "tools": [{
                        "name": "web_search",
                        "description": "Search the web",
                        "inputSchema": {
                            "type": "object",
                            "properties": {"query": {"type": "string"}},
                            "required": ["query"]
                        }
                    }],
                    "nextCursor": "page-2"
                }
            });
            let event = format!("event: message\ndata: {body}\n\n");
            http_response("200 OK", "Text/Event-Stream; charset=UTF-8", "", &event)
        }
        ("tools/list", Some(_)) => {
            let body = json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "tools": [{
                        "name": "echo",
                        "inputSchema": {"type": "object", "properties": {}}
                    }]
                }
            });
            http_response("200 OK", "application/json", "", &body.to_string())
        }
        ("tools/call", _) => {
            let body = json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "content": [{"type": "text", "text": "{\"hits\": 2}"}],
                    "isError": false
                }
            });
            let event = format!("data: {body}\n\n");
            http_response("200 OK", "text/event-stream", "", &event)
        }
        ("DELETE", _) => http_response("200 OK", "application/json", "", ""),
        _ => http_response("400 Bad Request", "application/json", "", ""),
    }
}

/// Answers `count` requests, one connection each. Requests for `unanswered`
/// are recorded and their connections held open without a reply.
async fn serve(
    listener: TcpListener,
    captured: CapturedRequests,
    count: usize,
    unanswered: Option<&'static str>,
) -> Result<(), String> {
    let mut parked = Vec::new();
    for _ in 0..count {
        let (mut stream, _) = listener.accept().await.map_err(|err| err.to_string())?;
        let (request_line, headers, body) = read_http_request(&mut stream).await?;

        let (method, id, params) = if request_line.starts_with("DELETE") {
            ("DELETE".to_string(), Value::Null, Value::Null)
        } else {
            let body: Value = serde_json::from_slice(&body).map_err(|err| err.to_string())?;
            (
                body["method"].as_str().unwrap_or_default().to_string(),
                body.get("id").cloned().unwrap_or(Value::Null),
                body.get("params").cloned().unwrap_or(Value::Null),
            )
        };

        let cursor = params.get("cursor").and_then(Value::as_str).map(str::to_string);
        let response = reply_for(&method, &id, cursor.as_deref());

        captured.lock().await.push(CapturedRequest {
            request_line,
            method: method.clone(),
            accept: header(&headers, "accept").unwrap_or_default(),
            authorization: header(&headers, "authorization"),
            protocol_version: header(&headers, MCP_PROTOCOL_VERSION_HEADER),
            session_id: header(&headers, MCP_SESSION_ID_HEADER),
            params,
        });

        if unanswered == Some(method.as_str()) {
            parked.push(stream);
            continue;
        }

        stream
            .write_all(response.as_bytes())
            .await
            .map_err(|err| err.to_string())?;
        stream.shutdown().await.map_err(|err| err.to_string())?;
    }
    Ok(())
}

#[tokio::test]
async fn http_session_end_to_end_handles_json_and_sse_responses() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    let captured: CapturedRequests = Arc::new(Mutex::new(Vec::new()));
    let server_task = tokio::spawn(serve(listener, Arc::clone(&captured), 6, None));

    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client should build");
    let url = format!("http://{addr}/mcp");
    let mut session = HttpSession::new(client, &url, Some("Bearer s3cret"));

    session.initialize().await.expect("initialize should succeed");
    assert_eq!(session.session_id(), Some("session-1"));

    let tools = session.list_tools().await.expect("tools should list");
    let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
    assert_eq!(names, vec!["web_search", "echo"]);

    let mut arguments = Map::new();
    arguments.insert("query".to_string(), json!("rust"));
    let result = session
        .call_tool("web_search", arguments)
        .await
        .expect("call should succeed");
    assert_eq!(result["content"][0]["text"], json!("{\"hits\": 2}"));

    session.close().await.expect("close should succeed");
    assert_eq!(session.session_id(), None);

    server_task
        .await
        .expect("mock server task should join")
        .expect("mock server should succeed");

    let captured = captured.lock().await.clone();
    let methods: Vec<&str> = captured.iter().map(|req| req.method.as_str()).collect();
    assert_eq!(
        methods,
        vec![
            "initialize",
            "notifications/initialized",
            "tools/list",
            "tools/list",
            "tools/call",
            "DELETE"
        ]
    );
    assert!(captured[0].request_line.starts_with("POST /mcp"));
    assert!(captured[5].request_line.starts_with("DELETE /mcp"));
    assert_eq!(captured[0].accept, MCP_JSON_AND_SSE_ACCEPT);
    assert_eq!(
        captured[0].protocol_version.as_deref(),
        Some(LATEST_PROTOCOL_VERSION)
    );
    assert_eq!(captured[0].session_id, None);
    for request in &captured[1..] {
        assert_eq!(request.protocol_version.as_deref(), Some("2025-06-18"));
        assert_eq!(request.session_id.as_deref(), Some("session-1"));
        assert_eq!(request.authorization.as_deref(), Some("Bearer s3cret"));
    }
    assert_eq!(captured[3].params["cursor"], json!("page-2"));
    assert_eq!(captured[4].params["name"], json!("web_search"));
    assert_eq!(captured[4].params["arguments"], json!({"query": "rust"}));
}

#[tokio::test]
async fn close_without_session_id_skips_delete() {
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client should build");
    let mut session = HttpSession::new(client, "http://127.0.0.1:9/mcp", None);
    assert!(session.close().await.is_ok());
}

#[tokio::test]
async fn connect_surfaces_unreachable_endpoint() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    drop(listener);

    let transport = HttpToolTransport::new(HttpTimeouts::default()).expect("transport builds");
    let err = match transport.connect(&format!("http://{addr}/mcp"), None).await {
        Ok(_) => panic!("connect should fail"),
        Err(err) => err,
    };
    assert!(!err.is_empty());
}

async fn mock_server(
    expected_requests: usize,
    unanswered: Option<&'static str>,
) -> (
    String,
    CapturedRequests,
    tokio::task::JoinHandle<Result<(), String>>,
) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    let captured: CapturedRequests = Arc::new(Mutex::new(Vec::new()));
    let server_task = tokio::spawn(serve(
        listener,
        Arc::clone(&captured),
        expected_requests,
        unanswered,
    ));
    (format!("http://{addr}/mcp"), captured, server_task)
}

fn sessions_with_short_timeout() -> SessionManager {
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client should build");
    SessionManager::new(
        Arc::new(HttpToolTransport::with_client(client)),
        Arc::new(MapEnv::default()),
        Duration::from_millis(300),
    )
}

#[tokio::test]
async fn timed_out_disconnect_keeps_the_session_id() {
    let (url, captured, server_task) = mock_server(7, Some("DELETE")).await;
    let sessions = sessions_with_short_timeout();
    sessions
        .connect(&url, None, None)
        .await
        .expect("connect should succeed");

    let err = sessions
        .disconnect()
        .await
        .expect_err("unanswered DELETE should time out");
    assert!(matches!(err, SessionError::Timeout { operation: "disconnect", .. }));
    assert!(sessions.is_connected().await);

    sessions
        .call_tool("echo", Map::new())
        .await
        .expect("session should still accept calls");

    let retry = sessions
        .disconnect()
        .await
        .expect_err("second DELETE is unanswered too");
    assert!(matches!(retry, SessionError::Timeout { .. }));

    server_task
        .await
        .expect("mock server task should join")
        .expect("mock server should succeed");

    let captured = captured.lock().await.clone();
    let methods: Vec<&str> = captured.iter().map(|req| req.method.as_str()).collect();
    assert_eq!(
        methods,
        vec![
            "initialize",
            "notifications/initialized",
            "tools/list",
            "tools/list",
            "DELETE",
            "tools/call",
            "DELETE"
        ]
    );
    for request in &captured[1..] {
        assert_eq!(
            request.session_id.as_deref(),
            Some("session-1"),
            "{} lost the session id",
            request.method
        );
    }
}

#[tokio::test]
async fn hanging_first_tool_list_closes_the_new_session() {
    let (url, captured, server_task) = mock_server(4, Some("tools/list")).await;
    let sessions = sessions_with_short_timeout();

    let err = sessions
        .connect(&url, None, None)
        .await
        .expect_err("unanswered tools/list should time out");
    assert!(matches!(err, SessionError::Timeout { operation: "connect", .. }));
    assert!(!sessions.is_connected().await);

    server_task
        .await
        .expect("mock server task should join")
        .expect("mock server should succeed");

    let captured = captured.lock().await.clone();
    let methods: Vec<&str> = captured.iter().map(|req| req.method.as_str()).collect();
    assert_eq!(
        methods,
        vec![
            "initialize",
            "notifications/initialized",
            "tools/list",
            "DELETE"
        ]
    );
    assert_eq!(captured[3].session_id.as_deref(), Some("session-1"));
}
