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
    let exe = env!("CARGO_BIN_EXE_enrolld");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn enrolld");
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
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// The portal kept its records in localStorage; naive dumps carry each
/// value still JSON-encoded inside a string, which the parser must accept.
fn write_portal_export(dir: &std::path::Path) -> PathBuf {
    let students = json!([
        {
            "name": "Carla Diaz",
            "email": "carla@legacy.edu",
            "courseName": "Robotics 101",
            "enrolledDate": "6/15/2024",
        },
        { "name": "Dan Lee", "email": "dan@legacy.edu" },
        { "name": "", "email": "ghost@legacy.edu" },
        42,
    ]);
    let export = json!({
        "schoolSystemStudents": serde_json::to_string(&students).expect("encode students"),
        "schoolSystemCourses": [ { "name": "Robotics 101" }, "Mathematics 101" ],
        "systemTheme": "DARK",
    });
    let path = dir.join("portal-export.json");
    std::fs::write(
        &path,
        serde_json::to_string_pretty(&export).expect("encode export"),
    )
    .expect("write export file");
    path
}

#[test]
fn portal_export_is_adopted_into_the_workspace() {
    let workspace = temp_dir("enrolld-legacy");
    let export_path = write_portal_export(&workspace);
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.importLegacy",
        json!({ "path": export_path.to_string_lossy() }),
    );
    assert_eq!(
        imported.get("enrollmentsAdded").and_then(|v| v.as_u64()),
        Some(2)
    );
    assert_eq!(
        imported.get("studentsAdded").and_then(|v| v.as_u64()),
        Some(2)
    );
    assert_eq!(
        imported.get("subjectsEnrolled").and_then(|v| v.as_u64()),
        Some(1)
    );
    assert_eq!(
        imported.get("subjectsAdded").and_then(|v| v.as_u64()),
        Some(1)
    );
    assert_eq!(
        imported.get("skippedDuplicates").and_then(|v| v.as_u64()),
        Some(0)
    );
    assert_eq!(
        imported.get("malformedRows").and_then(|v| v.as_u64()),
        Some(2)
    );

    // Adopted rows arrive already decided, with the legacy date preserved.
    let carla = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "enrollments.get",
        json!({ "idOrEmail": "carla@legacy.edu" }),
    )
    .get("enrollment")
    .cloned()
    .expect("enrollment");
    assert_eq!(carla.get("status").and_then(|v| v.as_str()), Some("approved"));
    assert_eq!(
        carla.get("gradeLevel").and_then(|v| v.as_str()),
        Some("Robotics 101")
    );
    assert_eq!(
        carla.get("createdAt").and_then(|v| v.as_str()),
        Some("2024-06-15T00:00:00+00:00")
    );
    let notes = carla
        .get("adminNotes")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("adminNotes");
    assert_eq!(
        notes[0].get("note").and_then(|v| v.as_str()),
        Some("Adopted from portal export")
    );

    let dan = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "roster.get",
        json!({ "email": "dan@legacy.edu" }),
    )
    .get("student")
    .cloned()
    .expect("student");
    assert_eq!(
        dan.get("gradeLevel").and_then(|v| v.as_str()),
        Some("Unassigned")
    );
    assert_eq!(dan.get("status").and_then(|v| v.as_str()), Some("active"));

    let carla_student = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "roster.get",
        json!({ "email": "carla@legacy.edu" }),
    )
    .get("student")
    .cloned()
    .expect("student");
    let carla_id = carla_student
        .get("id")
        .and_then(|v| v.as_str())
        .expect("student id")
        .to_string();
    let sheet = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "grades.get",
        json!({ "studentId": carla_id }),
    );
    assert_eq!(
        sheet.get("subjects").cloned(),
        Some(json!(["Robotics 101"]))
    );

    // The legacy course joined the catalog and the theme came across.
    let settings = request_ok(&mut stdin, &mut reader, "7", "settings.get", json!({}))
        .get("settings")
        .cloned()
        .expect("settings");
    assert_eq!(settings.get("theme").and_then(|v| v.as_str()), Some("dark"));
    let subjects = settings
        .get("subjects")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("subjects");
    assert_eq!(subjects.len(), 5);
    assert!(subjects.iter().any(|s| s.as_str() == Some("Robotics 101")));

    // Importing the same file again only counts duplicates.
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "workspace.importLegacy",
        json!({ "path": export_path.to_string_lossy() }),
    );
    assert_eq!(again.get("studentsAdded").and_then(|v| v.as_u64()), Some(0));
    assert_eq!(
        again.get("skippedDuplicates").and_then(|v| v.as_u64()),
        Some(2)
    );
}

#[test]
fn unreadable_and_undecodable_exports_are_distinct_failures() {
    let workspace = temp_dir("enrolld-legacy-bad");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let missing = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.importLegacy",
        json!({ "path": workspace.join("no-such-file.json").to_string_lossy() }),
    );
    assert_eq!(
        missing
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("legacy_read_failed")
    );

    let garbled = workspace.join("garbled.json");
    std::fs::write(&garbled, "this is not json").expect("write garbled file");
    let parse_fail = request(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.importLegacy",
        json!({ "path": garbled.to_string_lossy() }),
    );
    assert_eq!(
        parse_fail
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("legacy_parse_failed")
    );

    // Neither failure left partial records behind.
    let list = request_ok(&mut stdin, &mut reader, "4", "enrollments.list", json!({}));
    assert_eq!(
        list.get("enrollments")
            .and_then(|v| v.as_array())
            .map(|v| v.len()),
        Some(0)
    );
}
