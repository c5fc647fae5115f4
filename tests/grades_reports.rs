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

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|v| v.get("code"))
        .and_then(|v| v.as_str())
}

/// Submits and approves one applicant, returning the roster student id.
fn enroll_student(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    seq: &str,
    name: &str,
    email: &str,
    grade_level: &str,
) -> String {
    let submitted = request_ok(
        stdin,
        reader,
        &format!("{seq}-submit"),
        "enrollments.submit",
        json!({
            "studentName": name,
            "studentEmail": email,
            "gradeLevel": grade_level,
            "documents": {
                "Birth Certificate": true,
                "Report Card": true,
                "Good Moral Certificate": true,
            },
        }),
    );
    let enrollment_id = submitted
        .get("enrollment")
        .and_then(|e| e.get("id"))
        .and_then(|v| v.as_str())
        .expect("enrollment id")
        .to_string();
    let approved = request_ok(
        stdin,
        reader,
        &format!("{seq}-approve"),
        "enrollments.setStatus",
        json!({ "id": enrollment_id, "status": "approved" }),
    );
    approved
        .get("student")
        .and_then(|s| s.get("id"))
        .and_then(|v| v.as_str())
        .expect("student id")
        .to_string()
}

#[test]
fn subject_enrollment_and_grading_flow() {
    let workspace = temp_dir("enrolld-grades");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let ana = enroll_student(
        &mut stdin,
        &mut reader,
        "2",
        "Ana Cruz",
        "ana@school.edu",
        "Grade 7",
    );

    // Names are matched to the catalog case-insensitively and come back in
    // the catalog's casing, sorted.
    let enrolled = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.enrollSubjects",
        json!({ "studentId": ana, "subjects": ["mathematics 101", "English 101"] }),
    );
    assert_eq!(
        enrolled.get("subjects").cloned(),
        Some(json!(["English 101", "Mathematics 101"]))
    );

    // Re-enrolling the same subject is idempotent.
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grades.enrollSubjects",
        json!({ "studentId": ana, "subjects": ["MATHEMATICS 101"] }),
    );
    assert_eq!(
        again.get("subjects").cloned(),
        Some(json!(["English 101", "Mathematics 101"]))
    );

    let off_catalog = request(
        &mut stdin,
        &mut reader,
        "5",
        "grades.enrollSubjects",
        json!({ "studentId": ana, "subjects": ["Alchemy 101"] }),
    );
    assert_eq!(error_code(&off_catalog), Some("validation_error"));

    let ghost = request(
        &mut stdin,
        &mut reader,
        "6",
        "grades.enrollSubjects",
        json!({ "studentId": "not-a-student", "subjects": ["English 101"] }),
    );
    assert_eq!(error_code(&ghost), Some("not_found"));
    assert_eq!(
        ghost
            .get("error")
            .and_then(|e| e.get("details"))
            .and_then(|d| d.get("kind"))
            .and_then(|v| v.as_str()),
        Some("student")
    );

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "grades.set",
        json!({ "studentId": ana, "subject": "Mathematics 101", "value": 91.5 }),
    );
    assert_eq!(first.get("average").and_then(|v| v.as_f64()), Some(91.5));

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "grades.set",
        json!({ "studentId": ana, "subject": "English 101", "value": 76.0 }),
    );
    assert_eq!(second.get("average").and_then(|v| v.as_f64()), Some(83.75));
    assert_eq!(
        second
            .get("grades")
            .and_then(|g| g.get("Mathematics 101"))
            .and_then(|v| v.as_f64()),
        Some(91.5)
    );

    for (id, value) in [("9", json!(100.5)), ("10", json!(-0.5))] {
        let out = request(
            &mut stdin,
            &mut reader,
            id,
            "grades.set",
            json!({ "studentId": ana, "subject": "Mathematics 101", "value": value }),
        );
        assert_eq!(error_code(&out), Some("out_of_range"));
    }

    // A subject in the catalog the student never enrolled in.
    let not_taken = request(
        &mut stdin,
        &mut reader,
        "11",
        "grades.set",
        json!({ "studentId": ana, "subject": "Physics 101", "value": 88.0 }),
    );
    assert_eq!(error_code(&not_taken), Some("not_found"));
    assert_eq!(
        not_taken
            .get("error")
            .and_then(|e| e.get("details"))
            .and_then(|d| d.get("kind"))
            .and_then(|v| v.as_str()),
        Some("subject")
    );

    let not_a_number = request(
        &mut stdin,
        &mut reader,
        "12",
        "grades.set",
        json!({ "studentId": ana, "subject": "Mathematics 101", "value": "91" }),
    );
    assert_eq!(error_code(&not_a_number), Some("validation_error"));

    let sheet = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "grades.get",
        json!({ "studentId": ana }),
    );
    assert_eq!(
        sheet.get("subjects").cloned(),
        Some(json!(["English 101", "Mathematics 101"]))
    );
    assert_eq!(sheet.get("average").and_then(|v| v.as_f64()), Some(83.75));
}

#[test]
fn report_card_and_dashboard_over_the_wire() {
    let workspace = temp_dir("enrolld-reports");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let ana = enroll_student(
        &mut stdin,
        &mut reader,
        "2",
        "Ana Cruz",
        "ana@school.edu",
        "Grade 7",
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.enrollSubjects",
        json!({
            "studentId": ana,
            "subjects": ["Mathematics 101", "Physics 101", "English 101"],
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grades.set",
        json!({ "studentId": ana, "subject": "Mathematics 101", "value": 92.0 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "grades.set",
        json!({ "studentId": ana, "subject": "Physics 101", "value": 74.0 }),
    );

    let card = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "reports.card",
        json!({ "studentId": ana }),
    );
    let report = card.get("report").cloned().expect("report");
    assert_eq!(
        report.get("studentName").and_then(|v| v.as_str()),
        Some("Ana Cruz")
    );
    assert_eq!(report.get("gradeCount").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(report.get("average").and_then(|v| v.as_f64()), Some(83.0));
    assert_eq!(report.get("gpa").and_then(|v| v.as_f64()), Some(2.0));

    let lines = report
        .get("lines")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("lines");
    assert_eq!(lines.len(), 3);
    let by_subject = |name: &str| {
        lines
            .iter()
            .find(|l| l.get("subject").and_then(|v| v.as_str()) == Some(name))
            .cloned()
            .unwrap_or_else(|| panic!("line for {name}"))
    };
    let math = by_subject("Mathematics 101");
    assert_eq!(math.get("grade").and_then(|v| v.as_f64()), Some(92.0));
    assert_eq!(math.get("equivalent").and_then(|v| v.as_str()), Some("1.50"));
    assert_eq!(math.get("remarks").and_then(|v| v.as_str()), Some("Passed"));
    let physics = by_subject("Physics 101");
    assert_eq!(
        physics.get("equivalent").and_then(|v| v.as_str()),
        Some("5.00")
    );
    assert_eq!(
        physics.get("remarks").and_then(|v| v.as_str()),
        Some("Failed")
    );
    let english = by_subject("English 101");
    assert!(english.get("grade").is_none());
    assert_eq!(
        english.get("remarks").and_then(|v| v.as_str()),
        Some("No Grade")
    );

    let nobody = request(
        &mut stdin,
        &mut reader,
        "7",
        "reports.card",
        json!({ "studentId": "not-a-student" }),
    );
    assert_eq!(error_code(&nobody), Some("not_found"));

    // One more applicant left pending, to spread the dashboard buckets.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "enrollments.submit",
        json!({
            "studentName": "Ben Reyes",
            "studentEmail": "ben@school.edu",
            "gradeLevel": "Grade 8",
            "documents": {
                "Birth Certificate": true,
                "Report Card": true,
                "Good Moral Certificate": true,
            },
        }),
    );
    let dashboard = request_ok(&mut stdin, &mut reader, "9", "reports.dashboard", json!({}));
    let model = dashboard.get("dashboard").cloned().expect("dashboard");
    assert_eq!(
        model.get("totalEnrollments").and_then(|v| v.as_u64()),
        Some(2)
    );
    assert_eq!(model.get("pendingCount").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(model.get("approvedCount").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(model.get("totalStudents").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(model.get("activeStudents").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(
        model.get("subjectsOffered").and_then(|v| v.as_u64()),
        Some(4)
    );
    assert_eq!(model.get("activeSubjects").and_then(|v| v.as_u64()), Some(3));
}

#[test]
fn roster_csv_export_writes_one_row_per_student() {
    let workspace = temp_dir("enrolld-csv");
    let out_path = workspace.join("roster.csv");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let ana = enroll_student(
        &mut stdin,
        &mut reader,
        "2",
        "Cruz, Ana",
        "ana@school.edu",
        "Grade 7",
    );
    let _ = enroll_student(
        &mut stdin,
        &mut reader,
        "3",
        "Ben Reyes",
        "ben@school.edu",
        "Grade 8",
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grades.enrollSubjects",
        json!({ "studentId": ana, "subjects": ["Mathematics 101", "English 101"] }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "grades.set",
        json!({ "studentId": ana, "subject": "Mathematics 101", "value": 90.0 }),
    );

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "reports.exportCsv",
        json!({ "outPath": out_path.to_string_lossy() }),
    );
    assert_eq!(exported.get("rowsExported").and_then(|v| v.as_u64()), Some(2));

    let contents = std::fs::read_to_string(&out_path).expect("read exported csv");
    let mut rows = contents.split("\r\n").filter(|l| !l.is_empty());
    assert_eq!(
        rows.next(),
        Some("studentId,name,email,gradeLevel,status,subjects,gradeCount,average,gpa")
    );
    assert_eq!(rows.clone().count(), 2);
    // The comma in "Cruz, Ana" forces quoting on that field.
    let ana_row = rows
        .clone()
        .find(|r| r.contains("ana@school.edu"))
        .expect("ana row");
    assert!(ana_row.contains("\"Cruz, Ana\""));
    assert!(ana_row.contains("English 101; Mathematics 101"));
    assert!(ana_row.ends_with("1,90.00,1.00"));

    let ben_row = rows.find(|r| r.contains("ben@school.edu")).expect("ben row");
    assert!(ben_row.ends_with("0,0.00,3.00"));
}
