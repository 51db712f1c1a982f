use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_campusd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn campusd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn reopening_a_workspace_rewrites_legacy_display_times() {
    let workspace = temp_dir("campus-display-migration");

    // First session creates the schema, then exits.
    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    // Simulate a pre-migration workspace: 12-hour display strings stored
    // directly in the time columns.
    {
        let conn =
            rusqlite::Connection::open(workspace.join("campus.sqlite3")).expect("open sqlite");
        conn.execute(
            "INSERT INTO shifts(id, name, start_time, end_time) VALUES(?, ?, ?, ?)",
            ("old-shift", "Front Desk", "08:15 AM", "02:30 PM"),
        )
        .expect("insert legacy shift");
    }

    // Second session migrates on open; the list read path sees canonical
    // values with correct display renderings.
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "2", "shifts.list", json!({}));
    let shifts = listed["shifts"].as_array().expect("shifts array");
    assert_eq!(shifts.len(), 1);
    assert_eq!(shifts[0]["startTime"].as_str(), Some("08:15"));
    assert_eq!(shifts[0]["endTime"].as_str(), Some("14:30"));
    assert_eq!(shifts[0]["startDisplay"].as_str(), Some("08:15 AM"));
    assert_eq!(shifts[0]["endDisplay"].as_str(), Some("02:30 PM"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
