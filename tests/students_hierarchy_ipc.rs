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

fn spawn_sidecar(seed: Option<&PathBuf>) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_tuntazd");
    let mut cmd = Command::new(exe);
    cmd.env_remove("TUNTAZ_SEED");
    if let Some(path) = seed {
        cmd.arg("--seed").arg(path);
    }
    let mut child = cmd
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
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn ids(students: &serde_json::Value) -> Vec<String> {
    students
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|s| s.get("id").and_then(|v| v.as_str()).map(|s| s.to_string()))
        .collect()
}

#[test]
fn hierarchy_cascades_and_remembers_selection() {
    let (_child, mut stdin, mut reader) = spawn_sidecar(None);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.login",
        json!({ "role": "STAFF", "username": "staf" }),
    );

    let first = request_ok(&mut stdin, &mut reader, "2", "students.hierarchy", json!({}));
    assert_eq!(first["selection"]["branch"], "Tuntaz Masjid Madani");
    assert_eq!(first["selection"]["teacherId"], "u_sayyadi");
    assert_eq!(first["selection"]["track"], "Tahfidz");
    assert_eq!(first["selection"]["status"], "active");
    assert_eq!(first["teachers"][0]["name"], "Ustadz Sayyadi");
    assert_eq!(
        ids(&first["students"]),
        vec!["NIS001", "NIS003", "NIS005", "NIS007", "NIS009"]
    );

    // Switching branch keeps the track but snaps the teacher.
    let ngagel = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.hierarchy",
        json!({ "branch": "Tuntaz Ngagel", "track": "Tahsin" }),
    );
    assert_eq!(ngagel["selection"]["teacherId"], "u_choiron");
    assert_eq!(
        ids(&ngagel["students"]),
        vec!["NIS011", "NIS013", "NIS015", "NIS017", "NIS019", "NIS020"]
    );

    let again = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.hierarchy",
        json!({ "status": "inactive" }),
    );
    assert_eq!(again["selection"]["branch"], "Tuntaz Ngagel");
    assert_eq!(again["selection"]["track"], "Tahsin");
    assert!(ids(&again["students"]).is_empty());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.update",
        json!({ "studentId": "NIS013", "patch": { "status": "inactive" } }),
    );
    let inactive = request_ok(&mut stdin, &mut reader, "6", "students.hierarchy", json!({}));
    assert_eq!(ids(&inactive["students"]), vec!["NIS013"]);
}

#[test]
fn hierarchy_is_limited_to_admin_and_staff() {
    let (_child, mut stdin, mut reader) = spawn_sidecar(None);
    let before = request(&mut stdin, &mut reader, "0", "students.hierarchy", json!({}));
    assert_eq!(before["error"]["code"], "not_logged_in");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.login",
        json!({ "role": "GUARDIAN", "username": "NIS004" }),
    );
    let resp = request(&mut stdin, &mut reader, "2", "students.hierarchy", json!({}));
    assert_eq!(resp["error"]["code"], "forbidden");

    let mine = request_ok(&mut stdin, &mut reader, "3", "students.list", json!({}));
    assert_eq!(ids(&mine["students"]), vec!["NIS004"]);

    let menu = request_ok(&mut stdin, &mut reader, "4", "access.menu", json!({}));
    let sections: Vec<String> = menu["sections"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|s| s["id"].as_str().map(|v| v.to_string()))
        .collect();
    assert!(sections.contains(&"infaq".to_string()));
    assert!(!sections.contains(&"santri".to_string()));
    assert_eq!(menu["canEditExams"], false);
}

#[test]
fn branch_with_unassigned_students_has_no_teachers() {
    let dir = temp_dir("tuntaz-hierarchy-seed");
    let seed = dir.join("seed.json");
    std::fs::write(
        &seed,
        json!({
            "branches": [{ "id": "B1", "name": "Pusat", "address": "-" }],
            "users": [{ "id": "a1", "name": "Admin", "role": "ADMIN", "username": "zayd" }],
            "students": [
                { "id": "P1", "name": "Salman", "branch": "Pusat", "teacherId": "",
                  "grade": "Level 1", "program": "Tahsin", "status": "active" }
            ]
        })
        .to_string(),
    )
    .expect("write seed");

    let (_child, mut stdin, mut reader) = spawn_sidecar(Some(&seed));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.login",
        json!({ "role": "ADMIN", "username": "zayd" }),
    );
    let view = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.hierarchy",
        json!({ "track": "Tahsin" }),
    );
    assert_eq!(view["selection"]["branch"], "Pusat");
    assert!(view["selection"]["teacherId"].is_null());
    assert_eq!(view["tracksVisible"], false);
    assert!(ids(&view["students"]).is_empty());

    let options = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.filterOptions",
        json!({}),
    );
    assert_eq!(options["branches"], json!(["Pusat"]));
    assert_eq!(options["teachers"], json!([]));
    assert_eq!(options["grades"], json!(["Level 1"]));

    let blank = request(
        &mut stdin,
        &mut reader,
        "4",
        "students.update",
        json!({ "studentId": "P1", "patch": { "branch": " " } }),
    );
    assert_eq!(blank["error"]["code"], "bad_params");
}

#[test]
fn staff_registers_and_edits_santri() {
    let (_child, mut stdin, mut reader) = spawn_sidecar(None);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.login",
        json!({ "role": "STAFF", "username": "staf" }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({
            "name": "Umar Faruq",
            "teacherId": "u_choiron",
            "grade": "Level 1",
            "program": "Tahsin",
            "parentName": "Bpk. Faruq",
            "phone": "0833",
            "infaqAmount": 150000
        }),
    );
    assert_eq!(created["studentId"], "NIS021");

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.get",
        json!({ "studentId": "NIS021" }),
    );
    assert_eq!(got["student"]["branch"], "Tuntaz Masjid Madani");
    assert_eq!(got["teacherName"], "Ustadz Choiron");
    assert!(got["examResult"].is_null());

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.update",
        json!({ "studentId": "NIS021", "patch": { "program": "Tahfidz" } }),
    );
    assert_eq!(updated["student"]["grade"], "-");

    let bad = request(
        &mut stdin,
        &mut reader,
        "5",
        "students.update",
        json!({ "studentId": "NIS021", "patch": { "nickname": "x" } }),
    );
    assert_eq!(bad["error"]["code"], "bad_params");

    let options = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.filterOptions",
        json!({ "program": "Tahsin" }),
    );
    assert_eq!(options["grades"], json!(["Level 1", "Level 2", "Level 3"]));

    // Teachers cannot register santri.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "session.login",
        json!({ "role": "TEACHER", "username": "sayyadi" }),
    );
    let denied = request(
        &mut stdin,
        &mut reader,
        "8",
        "students.create",
        json!({ "name": "X", "teacherId": "u_sayyadi", "grade": "Level 1", "program": "Tahsin" }),
    );
    assert_eq!(denied["error"]["code"], "forbidden");
}
