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
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
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
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false));
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .expect("error code")
        .to_string()
}

fn shift_times(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    shift_id: &str,
) -> (String, String, String, String) {
    let listed = request_ok(stdin, reader, id, "shifts.list", json!({}));
    let row = listed
        .get("shifts")
        .and_then(|v| v.as_array())
        .expect("shifts array")
        .iter()
        .find(|s| s.get("id").and_then(|v| v.as_str()) == Some(shift_id))
        .cloned()
        .expect("created shift in list");
    (
        row["startTime"].as_str().expect("startTime").to_string(),
        row["endTime"].as_str().expect("endTime").to_string(),
        row["startDisplay"].as_str().expect("startDisplay").to_string(),
        row["endDisplay"].as_str().expect("endDisplay").to_string(),
    )
}

#[test]
fn afternoon_shift_meridiem_flip_lands_on_two_thirty_am() {
    let workspace = temp_dir("campus-shift-meridiem");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "shifts.create",
        json!({ "name": "Afternoon", "startTime": "14:30", "endTime": "22:00" }),
    );
    let shift_id = created["shiftId"].as_str().expect("shiftId").to_string();

    // Stored 14:30 reads back as 02:30 PM.
    let (start, _, start_display, end_display) =
        shift_times(&mut stdin, &mut reader, "3", &shift_id);
    assert_eq!(start, "14:30");
    assert_eq!(start_display, "02:30 PM");
    assert_eq!(end_display, "10:00 PM");

    // One picker interaction: flip the start meridiem to AM.
    let set = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "shifts.setTimePart",
        json!({
            "shiftId": shift_id,
            "field": "start",
            "part": "meridiem",
            "value": "AM"
        }),
    );
    assert_eq!(set["time"].as_str(), Some("02:30"));
    assert_eq!(set["display"].as_str(), Some("02:30 AM"));

    let (start, end, _, _) = shift_times(&mut stdin, &mut reader, "5", &shift_id);
    assert_eq!(start, "02:30");
    assert_eq!(end, "22:00");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unset_shift_defaults_to_midnight_and_minute_selection_emits_past_it() {
    let workspace = temp_dir("campus-shift-unset");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    // No times supplied: a new shift starts from the picker default.
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "shifts.create",
        json!({ "name": "New Shift" }),
    );
    let shift_id = created["shiftId"].as_str().expect("shiftId").to_string();
    assert_eq!(created["startTime"].as_str(), Some("00:00"));

    let (start, _, start_display, _) = shift_times(&mut stdin, &mut reader, "3", &shift_id);
    assert_eq!(start, "00:00");
    assert_eq!(start_display, "12:00 AM");

    let set = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "shifts.setTimePart",
        json!({
            "shiftId": shift_id,
            "field": "start",
            "part": "minute",
            "value": "45"
        }),
    );
    assert_eq!(set["time"].as_str(), Some("00:45"));
    assert_eq!(set["display"].as_str(), Some("12:45 AM"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn malformed_times_and_selections_are_rejected_at_the_boundary() {
    let workspace = temp_dir("campus-shift-badparams");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "shifts.create",
        json!({ "name": "Bad", "startTime": "8:30" }),
    );
    assert_eq!(code, "bad_params");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "shifts.create",
        json!({ "name": "Good", "startTime": "08:30", "endTime": "16:30" }),
    );
    let shift_id = created["shiftId"].as_str().expect("shiftId").to_string();

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "shifts.setTimePart",
        json!({
            "shiftId": shift_id,
            "field": "start",
            "part": "hour",
            "value": "13"
        }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "5",
        "shifts.setTimePart",
        json!({
            "shiftId": "missing",
            "field": "start",
            "part": "hour",
            "value": "07"
        }),
    );
    assert_eq!(code, "not_found");

    // Rejected edits must not have touched the stored value.
    let (start, end, _, _) = shift_times(&mut stdin, &mut reader, "6", &shift_id);
    assert_eq!(start, "08:30");
    assert_eq!(end, "16:30");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
