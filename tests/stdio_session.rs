//! End-to-end stdio sessions
//!
//! Drives `Server::run_with_io` with newline-delimited JSON-RPC and a real
//! process runner. `echo` and `false` stand in for xcodebuild so the tests
//! run without Xcode.

#![cfg(unix)]

use std::io::Cursor;
use std::sync::Arc;

use serde_json::{json, Value};
use xpresso::{EffectiveConfig, LogCache, ProcessRunner, Server, ToolContext};

fn server_with(overrides: Value) -> Server {
    let settings = EffectiveConfig::build(None, None, Some(overrides))
        .unwrap()
        .settings()
        .unwrap();
    let runner = Arc::new(ProcessRunner::new(settings.runner_config()));
    let logs = Arc::new(LogCache::with_capacity(settings.logs.capacity));
    Server::new(ToolContext::new(runner, logs, settings))
}

fn session(server: &Server, messages: &[Value]) -> Vec<Value> {
    let input: String = messages.iter().map(|m| format!("{}\n", m)).collect();
    let mut reader = Cursor::new(input);
    let mut output = Vec::new();
    server.run_with_io(&mut reader, &mut output).unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn call(id: i64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
}

fn text(response: &Value) -> &str {
    response["result"]["content"][0]["text"].as_str().unwrap()
}

// =============================================================================
// Handshake
// =============================================================================

#[test]
fn test_handshake_then_list() {
    let server = server_with(json!({}));
    let responses = session(
        &server,
        &[
            json!({
                "jsonrpc": "2.0", "id": 1, "method": "initialize",
                "params": { "protocolVersion": "2024-11-05", "capabilities": {} }
            }),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
        ],
    );

    // The notification gets no reply.
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");

    let names: Vec<&str> = responses[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "xpresso_build",
            "xpresso_test",
            "xpresso_run",
            "xpresso_simulators",
            "xpresso_boot_simulator",
            "xpresso_shutdown_simulator",
            "xpresso_schemes",
            "xpresso_build_settings",
            "xpresso_devices",
            "xpresso_clean",
            "xpresso_logs",
        ]
    );
}

// =============================================================================
// Tool calls through the process runner
// =============================================================================

#[test]
fn test_build_then_read_log() {
    let server = server_with(json!({ "tools": { "xcodebuild": "echo" } }));
    let responses = session(
        &server,
        &[
            call(1, "xpresso_build", json!({ "project": "App.xcodeproj", "scheme": "App" })),
            call(2, "xpresso_logs", json!({ "operation": "build" })),
            call(3, "xpresso_logs", json!({})),
        ],
    );

    assert_eq!(responses[0]["result"]["isError"], false);
    assert_eq!(
        text(&responses[0]),
        "Build succeeded.\n\n-project App.xcodeproj -scheme App build\n"
    );
    assert_eq!(
        text(&responses[1]),
        "Log for \"build\":\n\n-project App.xcodeproj -scheme App build\n"
    );
    assert!(text(&responses[2]).starts_with("Log for \"most recent\":"));
}

#[test]
fn test_failing_command_is_tool_error() {
    let server = server_with(json!({ "tools": { "xcodebuild": "false" } }));
    let responses = session(&server, &[call(1, "xpresso_test", json!({ "scheme": "App" }))]);

    assert!(responses[0].get("error").is_none());
    assert_eq!(responses[0]["result"]["isError"], true);
    assert_eq!(text(&responses[0]), "Tests failed (exit code 1).\n\n");
}

#[test]
fn test_missing_executable_is_tool_error() {
    let server = server_with(json!({ "tools": { "xcodebuild": "/nonexistent/xcodebuild" } }));
    let responses = session(
        &server,
        &[
            call(1, "xpresso_clean", json!({ "scheme": "App" })),
            call(2, "xpresso_logs", json!({ "operation": "clean" })),
        ],
    );

    assert_eq!(responses[0]["result"]["isError"], true);
    let report = text(&responses[0]);
    assert!(report.starts_with("Clean failed (exit code 1)."));
    assert!(report.contains("STDERR:\nfailed to spawn '/nonexistent/xcodebuild'"));
    assert!(text(&responses[1]).contains("failed to spawn"));
}

#[test]
fn test_logs_before_any_operation() {
    let server = server_with(json!({}));
    let responses = session(&server, &[call(1, "xpresso_logs", json!({ "operation": "build" }))]);
    assert_eq!(
        text(&responses[0]),
        "No operation logs stored yet. Run a build, test, or other command first."
    );
}

#[test]
fn test_log_capacity_from_config() {
    let server = server_with(json!({
        "tools": { "xcodebuild": "echo" },
        "logs": { "capacity": 1 }
    }));
    let responses = session(
        &server,
        &[
            call(1, "xpresso_build", json!({ "scheme": "App" })),
            call(2, "xpresso_clean", json!({ "scheme": "App" })),
            call(3, "xpresso_logs", json!({ "operation": "build" })),
        ],
    );

    assert_eq!(
        text(&responses[2]),
        "No log found for \"build\". Available logs: clean"
    );
}

#[test]
fn test_output_cap_from_config() {
    let server = server_with(json!({
        "tools": { "xcodebuild": "echo" },
        "output": { "max_chars": 8 }
    }));
    let responses = session(&server, &[call(1, "xpresso_build", json!({ "scheme": "App" }))]);

    // "-scheme App build\n" is 18 chars
    assert_eq!(
        text(&responses[0]),
        "Build succeeded.\n\n-scheme \n\n--- truncated (10 chars omitted) ---"
    );
}

// =============================================================================
// Protocol errors
// =============================================================================

#[test]
fn test_errors_do_not_end_session() {
    let server = server_with(json!({}));
    let input = "{not json\n\
                 {\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"xpresso_build\",\"arguments\":{}}}\n\
                 {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";
    let mut reader = Cursor::new(input);
    let mut output = Vec::new();
    server.run_with_io(&mut reader, &mut output).unwrap();

    let responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[1]["id"], 1);
    assert_eq!(responses[1]["error"]["code"], -32602);
    assert_eq!(responses[2]["result"], json!({}));
}
