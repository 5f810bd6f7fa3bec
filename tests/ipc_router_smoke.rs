use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_tuntazd");
    let mut child = Command::new(exe)
        .env_remove("TUNTAZ_SEED")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn tuntazd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
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
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["result"]["studentCount"], 20);
    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "role": "TEACHER", "username": "sayyadi" }),
    );
    let _ = request(&mut stdin, &mut reader, "3", "session.current", json!({}));
    let _ = request(&mut stdin, &mut reader, "4", "access.menu", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "5",
        "access.check",
        json!({ "section": "ujian" }),
    );
    let _ = request(&mut stdin, &mut reader, "6", "branches.list", json!({}));
    let _ = request(&mut stdin, &mut reader, "7", "students.list", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "8",
        "students.get",
        json!({ "studentId": "NIS002" }),
    );
    let _ = request(&mut stdin, &mut reader, "9", "students.hierarchy", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "10",
        "students.filterOptions",
        json!({ "program": "Tahsin" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "11",
        "students.create",
        json!({ "name": "X", "teacherId": "u_sayyadi", "grade": "Level 1", "program": "Tahsin" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "12",
        "students.update",
        json!({ "studentId": "NIS002", "patch": {} }),
    );
    let _ = request(&mut stdin, &mut reader, "13", "exams.criteria", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "14",
        "exams.roster",
        json!({ "program": "Tahsin" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "15",
        "exams.open",
        json!({ "studentId": "NIS002" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "16",
        "exams.setType",
        json!({ "type": "TAHSIN_1" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "17",
        "exams.setScore",
        json!({ "field": "Ketelitian Huruf", "score": 85 }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "18",
        "exams.setNotes",
        json!({ "notes": "Lancar" }),
    );
    let _ = request(&mut stdin, &mut reader, "19", "exams.promotion.repeat", json!({}));
    let _ = request(&mut stdin, &mut reader, "20", "exams.promotion.advance", json!({}));
    let _ = request(&mut stdin, &mut reader, "21", "exams.save", json!({}));
    let _ = request(&mut stdin, &mut reader, "22", "exams.close", json!({}));
    let _ = request(&mut stdin, &mut reader, "23", "exams.results", json!({}));
    let _ = request(&mut stdin, &mut reader, "24", "exams.recap", json!({}));
    let _ = request(&mut stdin, &mut reader, "25", "session.logout", json!({}));

    let after = request(&mut stdin, &mut reader, "26", "health", json!({}));
    assert!(after["result"]["user"].is_null());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn unknown_method_and_bad_json_are_reported() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{\"id\":\"x\",").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json reply");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse reply");
    assert_eq!(value["ok"], false);
    assert_eq!(value["error"]["code"], "bad_json");

    let payload = json!({ "id": "u1", "method": "mutabaah.list", "params": {} });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read reply");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse reply");
    assert_eq!(value["id"], "u1");
    assert_eq!(value["error"]["code"], "not_implemented");

    drop(stdin);
    let _ = child.wait();
}
