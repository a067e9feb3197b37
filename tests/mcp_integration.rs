//! Integration tests for MCP protocol handling.
//!
//! These tests drive the server's read/handle/write loop over in-memory
//! streams, covering the handshake, tool listing, tool calls, error
//! responses and lifecycle management.

use std::cell::RefCell;
use std::rc::Rc;

use omnifocus_gtd_mcp::automation::{AutomationBackend, AutomationError, AutomationResult};
use omnifocus_gtd_mcp::mcp::protocol::{parse_message, IncomingMessage, RequestId};
use omnifocus_gtd_mcp::mcp::{LineTransport, McpServer, SessionPhase};
use omnifocus_gtd_mcp::tools::ToolKind;
use serde_json::Value;

type CallLog = Rc<RefCell<Vec<(String, Vec<String>)>>>;

/// Backend that records calls and fails for `weekly_review`.
struct FakeOmniFocus {
    calls: CallLog,
}

impl AutomationBackend for FakeOmniFocus {
    async fn run(&self, script: &str, args: &[String]) -> AutomationResult<String> {
        self.calls
            .borrow_mut()
            .push((script.to_string(), args.to_vec()));

        if script == "weekly_review" {
            return Err(AutomationError::Failed {
                script: script.to_string(),
                code: Some(1),
                diagnostic: "OmniFocus got an error: Can't get document 1.".to_string(),
            });
        }
        Ok(format!("ran {script}"))
    }
}

fn fake_server() -> (McpServer<FakeOmniFocus>, CallLog) {
    let calls = CallLog::default();
    let server = McpServer::new(FakeOmniFocus {
        calls: Rc::clone(&calls),
    });
    (server, calls)
}

/// Feeds `lines` to a fresh server and returns every reply in order.
async fn exchange(lines: &[&str]) -> (Vec<Value>, McpServer<FakeOmniFocus>, CallLog) {
    let (mut server, calls) = fake_server();
    let input = lines.join("\n");
    let mut transport = LineTransport::new(input.as_bytes(), Vec::new());

    server.serve(&mut transport).await.unwrap();

    let output = String::from_utf8(transport.into_writer()).unwrap();
    let replies = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (replies, server, calls)
}

const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"capabilities":{}}}"#;

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "initialize");
        assert_eq!(req.id, RequestId::from(1));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_notification() {
    let json = r#"{
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Notification(notif) = result.unwrap() {
        assert_eq!(notif.method, "notifications/initialized");
    } else {
        panic!("Expected Notification");
    }
}

// =============================================================================
// Handshake Tests
// =============================================================================

#[tokio::test]
async fn test_initialize_returns_server_identity() {
    let (replies, server, _) = exchange(&[INITIALIZE]).await;

    assert_eq!(replies.len(), 1);
    let result = &replies[0]["result"];
    assert_eq!(replies[0]["id"], 1);
    assert_eq!(result["serverInfo"]["name"], "omnifocus-gtd");
    assert_eq!(result["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(result["protocolVersion"], "2025-06-18");
    assert!(result["capabilities"]["tools"].is_object());
    assert_eq!(server.session().phase(), SessionPhase::Initialised);
}

#[tokio::test]
async fn test_double_initialize_rejected() {
    let (replies, _, _) = exchange(&[
        INITIALIZE,
        r#"{"jsonrpc":"2.0","id":2,"method":"initialize","params":{"capabilities":{}}}"#,
    ])
    .await;

    assert!(replies[0].get("result").is_some());
    assert_eq!(replies[1]["id"], 2);
    assert_eq!(replies[1]["error"]["code"], -32603);
    assert_eq!(replies[1]["error"]["message"], "Server already initialized");
}

#[tokio::test]
async fn test_tools_list_before_initialize() {
    let (replies, _, _) =
        exchange(&[r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#]).await;

    assert_eq!(replies[0]["error"]["code"], -32603);
    assert!(replies[0]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("not initialized"));
}

#[tokio::test]
async fn test_tools_call_before_initialize_runs_nothing() {
    let (replies, _, calls) = exchange(&[
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"list_inbox","arguments":{}}}"#,
    ])
    .await;

    assert_eq!(replies[0]["error"]["code"], -32603);
    assert!(calls.borrow().is_empty());
}

#[tokio::test]
async fn test_initialized_request_before_initialize_rejected() {
    let (replies, server, _) =
        exchange(&[r#"{"jsonrpc":"2.0","id":7,"method":"initialized"}"#]).await;

    assert_eq!(replies[0]["id"], 7);
    assert_eq!(replies[0]["error"]["code"], -32603);
    assert!(replies[0]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("not initialized"));
    assert_eq!(server.session().phase(), SessionPhase::Uninitialised);
}

#[tokio::test]
async fn test_initialized_notification_has_no_reply() {
    let (replies, _, _) = exchange(&[
        INITIALIZE,
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
    ])
    .await;

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[1]["id"], 2);
    assert!(replies[1]["result"].is_object());
}

// =============================================================================
// Tool Tests
// =============================================================================

#[tokio::test]
async fn test_tools_list_shape() {
    let (replies, _, _) = exchange(&[
        INITIALIZE,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#,
    ])
    .await;

    let tools = replies[1]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), ToolKind::ALL.len());

    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names[0], "add_task");
    assert!(names.contains(&"list_inbox"));
    assert!(names.contains(&"weekly_review"));

    for tool in tools {
        assert!(tool["description"].as_str().is_some_and(|d| !d.is_empty()));
        assert_eq!(tool["inputSchema"]["type"], "object");
        assert!(tool["inputSchema"]["properties"].is_object());
    }

    let add_task = &tools[0]["inputSchema"];
    assert_eq!(add_task["required"], serde_json::json!(["name"]));
    let keys: Vec<&String> = add_task["properties"].as_object().unwrap().keys().collect();
    assert_eq!(keys[..5], ["name", "note", "project", "due_date", "flagged"]);
}

#[tokio::test]
async fn test_tools_call_success() {
    let (replies, _, calls) = exchange(&[
        INITIALIZE,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"list_inbox","arguments":{}}}"#,
    ])
    .await;

    let result = &replies[1]["result"];
    assert_eq!(replies[1]["id"], 3);
    assert_eq!(result["content"][0]["type"], "text");
    assert_eq!(result["content"][0]["text"], "ran list_inbox");
    assert!(!result["isError"].as_bool().unwrap_or(false));

    assert_eq!(calls.borrow().as_slice(), [("list_inbox".to_string(), vec![])]);
}

#[tokio::test]
async fn test_tools_call_positional_arguments() {
    let (replies, _, calls) = exchange(&[
        INITIALIZE,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"add_task","arguments":{"name":"Buy \"milk\"","flagged":true}}}"#,
    ])
    .await;

    assert!(replies[1]["result"].get("isError").is_none());

    let calls = calls.borrow();
    let (script, args) = &calls[0];
    assert_eq!(script, "add_task");
    assert_eq!(args[0], "Buy \"milk\"");
    assert_eq!(args[1..5], ["", "", "", "true"]);
}

#[tokio::test]
async fn test_tools_call_unknown_tool() {
    let (replies, _, calls) = exchange(&[
        INITIALIZE,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"delete_everything","arguments":{}}}"#,
    ])
    .await;

    let result = &replies[1]["result"];
    assert_eq!(result["isError"], true);
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Unknown tool"));
    assert!(calls.borrow().is_empty());
}

#[tokio::test]
async fn test_tools_call_missing_required_argument() {
    let (replies, _, calls) = exchange(&[
        INITIALIZE,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"complete_task","arguments":{}}}"#,
    ])
    .await;

    let result = &replies[1]["result"];
    assert_eq!(result["isError"], true);
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("task_name"));
    assert!(calls.borrow().is_empty());
}

#[tokio::test]
async fn test_tools_call_automation_failure() {
    let (replies, _, _) = exchange(&[
        INITIALIZE,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"weekly_review"}}"#,
    ])
    .await;

    let result = &replies[1]["result"];
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("AppleScript execution failed"));
    assert!(text.contains("Can't get document 1."));
}

// =============================================================================
// Error Response Tests
// =============================================================================

#[tokio::test]
async fn test_unknown_method() {
    let (replies, _, _) =
        exchange(&[r#"{"jsonrpc":"2.0","id":4,"method":"bogus","params":{}}"#]).await;

    assert_eq!(replies[0]["id"], 4);
    assert_eq!(replies[0]["error"]["code"], -32601);
}

#[tokio::test]
async fn test_malformed_json_then_recovery() {
    let (replies, _, _) = exchange(&["{\"invalid json", INITIALIZE]).await;

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["error"]["code"], -32700);
    assert_eq!(replies[0]["id"], Value::Null);
    assert_eq!(replies[1]["id"], 1);
    assert!(replies[1].get("result").is_some());
}

/// Feeds raw bytes to a fresh server and returns every reply in order.
async fn exchange_bytes(input: &[u8], max_line_bytes: usize) -> Vec<Value> {
    let (mut server, _) = fake_server();
    let mut transport = LineTransport::new(input, Vec::new()).with_max_line_bytes(max_line_bytes);

    server.serve(&mut transport).await.unwrap();

    String::from_utf8(transport.into_writer())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_invalid_utf8_line_then_recovery() {
    let mut input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"x\xff\"}\n".to_vec();
    input.extend_from_slice(INITIALIZE.as_bytes());
    input.push(b'\n');

    let replies = exchange_bytes(&input, 4096).await;

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["error"]["code"], -32700);
    assert_eq!(replies[0]["id"], Value::Null);
    assert_eq!(replies[1]["id"], 1);
    assert_eq!(replies[1]["result"]["serverInfo"]["name"], "omnifocus-gtd");
}

#[tokio::test]
async fn test_oversized_line_then_recovery() {
    let padding = "x".repeat(512);
    let oversized =
        format!(r#"{{"jsonrpc":"2.0","id":5,"method":"ping","params":{{"pad":"{padding}"}}}}"#);
    let input = format!("{oversized}\n{INITIALIZE}\n");

    let replies = exchange_bytes(input.as_bytes(), 256).await;

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["error"]["code"], -32700);
    assert_eq!(replies[1]["id"], 1);
    assert!(replies[1].get("result").is_some());
}

#[tokio::test]
async fn test_invalid_request_echoes_id() {
    let (replies, _, _) = exchange(&[r#"{"jsonrpc":"1.0","id":"abc","method":"ping"}"#]).await;

    assert_eq!(replies[0]["error"]["code"], -32600);
    assert_eq!(replies[0]["id"], "abc");
}

#[tokio::test]
async fn test_every_reply_has_result_xor_error() {
    let (replies, _, _) = exchange(&[
        r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#,
        INITIALIZE,
        r#"{"jsonrpc":"2.0","id":"b","method":"tools/list"}"#,
        r#"{"jsonrpc":"2.0","id":7.5,"method":"ping"}"#,
        r#"{"jsonrpc":"2.0","id":null,"method":"nope"}"#,
        r#"{"jsonrpc":"2.0","id":42,"method":"tools/call","params":{"name":"today_tasks"}}"#,
    ])
    .await;

    let ids: Vec<Value> = replies.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(
        ids,
        [
            Value::from("a"),
            Value::from(1),
            Value::from("b"),
            Value::from(7.5),
            Value::Null,
            Value::from(42),
        ]
    );

    for reply in &replies {
        assert_eq!(reply["jsonrpc"], "2.0");
        assert_ne!(reply.get("result").is_some(), reply.get("error").is_some());
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_shutdown_stops_processing() {
    let (replies, server, _) = exchange(&[
        INITIALIZE,
        r#"{"jsonrpc":"2.0","id":9,"method":"shutdown"}"#,
        r#"{"jsonrpc":"2.0","id":10,"method":"tools/list"}"#,
    ])
    .await;

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[1]["id"], 9);
    assert_eq!(replies[1]["result"], Value::Null);
    assert_eq!(server.session().phase(), SessionPhase::ShutDown);
}

#[tokio::test]
async fn test_blank_lines_and_eof() {
    let (replies, server, _) = exchange(&["", "   ", INITIALIZE, ""]).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(server.session().phase(), SessionPhase::Initialised);
}

#[tokio::test]
async fn test_crlf_input() {
    let (mut server, _) = fake_server();
    let input = format!("{INITIALIZE}\r\n");
    let mut transport = LineTransport::new(input.as_bytes(), Vec::new());

    server.serve(&mut transport).await.unwrap();

    let output = String::from_utf8(transport.into_writer()).unwrap();
    assert_eq!(output.matches('\n').count(), 1);
    assert!(output.ends_with('\n'));
    assert!(!output.contains('\r'));
}
