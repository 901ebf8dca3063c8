//! CLI Output Tests
//!
//! Runs the built binary and checks the stream contract:
//! - stdout carries exactly one response object per request line
//! - log events go to stderr

use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde_json::Value;

// =============================================================================
// Helper Functions
// =============================================================================

fn run(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_aerosearch"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn json_lines(bytes: &[u8]) -> Vec<Value> {
    String::from_utf8(bytes.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// =============================================================================
// Stream Separation Tests
// =============================================================================

#[test]
fn test_batch_stdout_holds_only_responses() {
    let output = run(
        &["batch"],
        "{\"query\":\"status:ok\"}\n{\"query\":\"nope():>1\"}\n",
    );
    assert!(output.status.success());

    let responses = json_lines(&output.stdout);
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["status"], "ok");
    assert_eq!(responses[1]["status"], "error");
    assert!(responses.iter().all(|response| response.get("event").is_none()));

    let events: Vec<String> = json_lines(&output.stderr)
        .iter()
        .map(|line| line["event"].as_str().unwrap().to_string())
        .collect();
    assert!(events.contains(&"SEARCH_QUERY_REJECTED".to_string()));
    assert_eq!(events.last().map(String::as_str), Some("SEARCH_BATCH_COMPLETE"));
}

#[test]
fn test_resolve_stdout_holds_one_response() {
    let output = run(&["resolve", "--query", "span.op:db"], "");
    assert!(output.status.success());

    let responses = json_lines(&output.stdout);
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["status"], "ok");
    assert!(responses[0]["data"]["where_filter"].is_object());
}
