// CLI integration tests for validate/upload/sources flows.
mod common;

use std::path::Path;
use std::process::Command;

use common::{StubServer, TestResult, item, items};
use serde_json::{Value, json};

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_contentpush");
    let mut command = Command::new(exe);
    command
        .env_remove("CONTENTPUSH_API_URL")
        .env_remove("CONTENTPUSH_PROJECT")
        .env_remove("CONTENTPUSH_TOKEN")
        .env("RUST_LOG", "warn");
    command
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn stderr_error(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text
        .lines()
        .find(|line| line.starts_with("{\"error\""))
        .expect("error json line");
    parse_json(line)
}

fn write_json(dir: &Path, name: &str, value: &Value) -> String {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(value).expect("encode")).expect("write");
    path.to_str().expect("utf8 path").to_string()
}

#[test]
fn validate_prints_normalized_items() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut raw = item("post1");
    raw["date"] = json!("2010-01-26 16:14");
    raw["title"] = json!("caf\u{c3}\u{a9}");
    raw["unknown"] = json!("ignored");
    let file = write_json(temp.path(), "items.json", &json!([raw]));

    let output = cmd().args(["validate", &file]).output().expect("validate");
    assert!(output.status.success());
    let items = parse_json(std::str::from_utf8(&output.stdout).expect("utf8"));
    assert_eq!(items[0]["date"], "2010-01-26T16:14:00+00:00");
    assert_eq!(items[0]["title"], "café");
    assert!(items[0].get("unknown").is_none());
}

#[test]
fn validate_reports_issues_with_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut bad = item("post1");
    bad["language"] = json!("english");
    let file = write_json(temp.path(), "items.json", &json!([item("post0"), bad]));

    let output = cmd().args(["validate", &file]).output().expect("validate");
    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
    let err = stderr_error(&output.stderr);
    assert_eq!(err["error"]["kind"], "Validation");
    assert_eq!(err["error"]["issues"][0]["loc"], json!(["items", "1", "language"]));
}

#[test]
fn validate_rejects_duplicate_guids() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write_json(
        temp.path(),
        "items.json",
        &json!([item("same"), item("same")]),
    );

    let output = cmd().args(["validate", &file]).output().expect("validate");
    assert_eq!(output.status.code(), Some(3));
    let err = stderr_error(&output.stderr);
    assert_eq!(
        err["error"]["issues"][0]["message"],
        "duplicate item guids detected: ['same']"
    );
}

#[test]
fn validate_rows_and_flatten() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut row = item("post1");
    let row_map = row.as_object_mut().expect("object");
    row_map.insert("geolocation.id".to_string(), json!("USA.NY"));
    row_map.insert("geolocation.zipcode".to_string(), json!(""));
    row_map.insert("custom.tier".to_string(), json!("gold"));
    let file = write_json(temp.path(), "rows.json", &json!([row]));

    let output = cmd()
        .args(["validate", &file, "--input", "rows", "--flatten"])
        .output()
        .expect("validate");
    assert!(output.status.success());
    let table = parse_json(std::str::from_utf8(&output.stdout).expect("utf8"));
    let columns: Vec<&str> = table["columns"]
        .as_array()
        .expect("columns")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(columns.contains(&"geolocation.id"));
    assert!(columns.contains(&"custom.tier"));
    assert!(!columns.contains(&"geolocation.zipcode"));
    assert_eq!(table["rows"][0]["custom.tier"], "gold");
}

#[test]
fn validate_jsonl_from_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("items.jsonl");
    let lines = items(3)
        .iter()
        .map(|value| serde_json::to_string(value).expect("encode"))
        .collect::<Vec<_>>()
        .join("\n\n");
    std::fs::write(&path, lines).expect("write");

    let output = cmd()
        .args(["validate", path.to_str().expect("utf8"), "--input", "jsonl"])
        .output()
        .expect("validate");
    assert!(output.status.success());
    let items = parse_json(std::str::from_utf8(&output.stdout).expect("utf8"));
    assert_eq!(items.as_array().map(Vec::len), Some(3));
}

#[test]
fn missing_input_file_is_an_io_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("nope.json");
    let output = cmd()
        .args(["validate", missing.to_str().expect("utf8")])
        .output()
        .expect("validate");
    assert_eq!(output.status.code(), Some(5));
    let err = stderr_error(&output.stderr);
    assert_eq!(err["error"]["kind"], "Io");
    assert!(err["error"]["causes"].is_array());
}

#[test]
fn upload_requires_a_project() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write_json(temp.path(), "items.json", &json!([item("post1")]));
    let output = cmd()
        .args(["--token", "tok", "upload", &file])
        .output()
        .expect("upload");
    assert_eq!(output.status.code(), Some(2));
    let err = stderr_error(&output.stderr);
    assert_eq!(err["error"]["message"], "no project configured");
}

#[test]
fn upload_posts_batches_to_the_project() -> TestResult<()> {
    let server = StubServer::start(vec![(200, json!({"n": 0})), (200, json!({"n": 1}))])?;
    let temp = tempfile::tempdir()?;
    let file = write_json(temp.path(), "items.json", &Value::Array(items(1200)));

    let output = cmd()
        .args([
            "--api-url",
            &server.base_url(),
            "--project",
            "44",
            "--token",
            "tok",
            "upload",
            &file,
            "--content-source",
            "8",
        ])
        .output()?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let response = parse_json(std::str::from_utf8(&output.stdout)?);
    assert_eq!(response, json!({"Batch 0": {"n": 0}, "Batch 1": {"n": 1}}));

    let requests = server.finish();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|req| req.path == "/projects/44/content/sources"));
    let first = requests[0].body.as_ref().ok_or("missing body")?;
    assert_eq!(first["contentSource"], 8);
    assert_eq!(first["requestUsage"], false);
    Ok(())
}

#[test]
fn sources_create_prints_platform_response() -> TestResult<()> {
    let server = StubServer::start(vec![(200, json!({"id": 12, "name": "Survey"}))])?;
    let output = cmd()
        .env("CONTENTPUSH_API_URL", server.base_url())
        .env("CONTENTPUSH_PROJECT", "44")
        .env("CONTENTPUSH_TOKEN", "tok")
        .args(["sources", "create", "--name", "Survey"])
        .output()?;
    assert!(output.status.success());
    assert_eq!(
        parse_json(std::str::from_utf8(&output.stdout)?),
        json!({"id": 12, "name": "Survey"})
    );

    let requests = server.finish();
    assert_eq!(requests[0].body, Some(json!({"name": "Survey"})));
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer tok"));
    Ok(())
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let output = cmd()
        .args(["validate", "x.json", "--bogus"])
        .output()
        .expect("validate");
    assert_eq!(output.status.code(), Some(2));
    let err = stderr_error(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
    assert!(
        err["error"]["hint"]
            .as_str()
            .unwrap_or_default()
            .contains("contentpush validate --help")
    );
}
