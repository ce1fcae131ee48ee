// CLI integration tests for offline flows and error envelopes.
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::process::Command;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_redlist");
    let mut command = Command::new(exe);
    command.env_remove("REDLIST_BASE_URL");
    command.env_remove("REDLIST_USER_AGENT");
    command.env_remove("RUST_LOG");
    command
}

fn parse_json_line(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    // Log lines may precede the error envelope on stderr.
    let line = text
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .expect("json line");
    serde_json::from_str(line).expect("valid json")
}

/// Serve `(status, body)` pairs in order, one per connection.
fn serve_pages(responses: Vec<(u16, String)>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base_url = format!("http://{}", listener.local_addr().expect("addr"));
    let handle = thread::spawn(move || {
        for (status, body) in responses {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
            let Ok(read_half) = stream.try_clone() else {
                return;
            };
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            while reader.read_line(&mut line).map(|n| n > 0).unwrap_or(false) {
                if line.trim().is_empty() {
                    break;
                }
                line.clear();
            }
            let mut stream = stream;
            let _ = write!(
                stream,
                "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.flush();
        }
    });
    (base_url, handle)
}

#[test]
fn locator_prints_paginated_url() {
    let output = cmd()
        .args(["locator", "test", "--sort", "new", "--after", "abc"])
        .output()
        .expect("locator");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(stdout.trim(), "http://www.reddit.com/r/test/new/.json?after=t3_abc");
}

#[test]
fn locator_front_page_has_no_after() {
    let output = cmd()
        .args(["--base-url", "https://example.com", "locator", "--sort", "top"])
        .output()
        .expect("locator");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(stdout.trim(), "https://example.com/top/.json");
}

#[test]
fn base_url_can_come_from_env() {
    let output = cmd()
        .env("REDLIST_BASE_URL", "http://localhost:9999")
        .args(["locator", "/r/rust"])
        .output()
        .expect("locator");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(stdout.trim(), "http://localhost:9999/r/rust/.json");
}

#[test]
fn invalid_subreddit_is_usage_error() {
    let output = cmd()
        .args(["locator", "a/b/c"])
        .output()
        .expect("locator");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
    assert!(err["error"]["hint"].is_string());
}

#[test]
fn fetch_against_closed_port_reports_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let output = cmd()
        .args([
            "--base-url",
            &format!("http://{addr}"),
            "--timeout-ms",
            "2000",
            "fetch",
            "rust",
        ])
        .output()
        .expect("fetch");
    assert_eq!(output.status.code(), Some(3));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Response");
    assert_eq!(err["error"]["cause"], "Transport");
    assert!(err["error"]["hint"].as_str().is_some_and(|h| h.contains("--base-url")));
}

#[test]
fn zero_pages_is_rejected() {
    let output = cmd()
        .args(["fetch", "--pages", "0"])
        .output()
        .expect("fetch");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
}

#[test]
fn completion_emits_script() {
    let output = cmd()
        .args(["completion", "bash"])
        .output()
        .expect("completion");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("redlist"));
}

#[test]
fn sort_is_case_insensitive() {
    let output = cmd()
        .args(["locator", "rust", "--sort", "TOP"])
        .output()
        .expect("locator");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(stdout.trim(), "http://www.reddit.com/r/rust/top/.json");
}

#[test]
fn unknown_sort_is_usage_error() {
    let output = cmd()
        .args(["locator", "--sort", "best"])
        .output()
        .expect("locator");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
}

#[test]
fn failed_later_page_still_prints_earlier_links() {
    let first = serde_json::json!({
        "kind": "Listing",
        "data": {"children": [
            {"kind": "t3", "data": {"id": "a1", "title": "one"}},
            {"kind": "t3", "data": {"id": "a2", "title": "two"}}
        ]}
    })
    .to_string();
    let (base_url, server) = serve_pages(vec![(200, first), (503, "{}".to_string())]);

    let output = cmd()
        .args([
            "--base-url",
            &base_url,
            "fetch",
            "rust",
            "--pages",
            "2",
            "--format",
            "jsonl",
        ])
        .output()
        .expect("fetch");
    let _ = server.join();

    assert_eq!(output.status.code(), Some(3));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let ids: Vec<String> = stdout
        .lines()
        .map(|line| {
            let value: Value = serde_json::from_str(line).expect("link json");
            value["id"].as_str().unwrap_or_default().to_string()
        })
        .collect();
    assert_eq!(ids, ["a1", "a2"]);
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["cause"], "Transport");
}
