use anyhow::Context;
use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::{AdminNote, DomainError, Enrollment, EnrollmentStatus, School};

/// One student row from the browser portal's export. The portal kept these
/// under the "schoolSystemStudents" localStorage key.
#[derive(Debug, Clone)]
pub struct LegacyStudent {
    pub name: String,
    pub email: String,
    pub course_name: Option<String>,
    pub enrolled_date: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LegacyExport {
    pub students: Vec<LegacyStudent>,
    pub course_names: Vec<String>,
    pub theme: Option<String>,
    /// Rows dropped during parsing for missing name or email.
    pub malformed: usize,
}

/// What an adoption changed, for the import summary.
#[derive(Debug, Clone, Default)]
pub struct AdoptionSummary {
    pub enrollments_added: usize,
    pub students_added: usize,
    pub subjects_enrolled: usize,
    pub subjects_added: usize,
    pub skipped_duplicates: usize,
}

/// Parses a portal export. The expected shape is one JSON object holding
/// the portal's localStorage keys; values may arrive either as real JSON
/// arrays or still string-encoded, since naive dumps keep localStorage's
/// string values as-is.
pub fn parse_legacy_export(text: &str) -> anyhow::Result<LegacyExport> {
    let doc: serde_json::Value =
        serde_json::from_str(text).context("export is not valid JSON")?;
    let Some(obj) = doc.as_object() else {
        anyhow::bail!("export must be a JSON object");
    };

    let mut export = LegacyExport::default();

    for item in take_array(obj, "schoolSystemStudents")? {
        let Some(row) = item.as_object() else {
            export.malformed += 1;
            continue;
        };
        let name = row
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or("");
        let email = row
            .get("email")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or("");
        if name.is_empty() || email.is_empty() {
            export.malformed += 1;
            continue;
        }
        export.students.push(LegacyStudent {
            name: name.to_string(),
            email: email.to_string(),
            course_name: row
                .get("courseName")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            enrolled_date: row
                .get("enrolledDate")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        });
    }

    for item in take_array(obj, "schoolSystemCourses")? {
        let name = match &item {
            serde_json::Value::Object(course) => course.get("name").and_then(|v| v.as_str()),
            serde_json::Value::String(name) => Some(name.as_str()),
            _ => None,
        };
        if let Some(name) = name.map(str::trim).filter(|s| !s.is_empty()) {
            export.course_names.push(name.to_string());
        }
    }

    export.theme = obj
        .get("systemTheme")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty());

    Ok(export)
}

fn take_array(
    obj: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> anyhow::Result<Vec<serde_json::Value>> {
    match obj.get(key) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => Ok(items.clone()),
        Some(serde_json::Value::String(text)) => {
            let inner: serde_json::Value = serde_json::from_str(text)
                .with_context(|| format!("{key} is not valid JSON"))?;
            match inner {
                serde_json::Value::Array(items) => Ok(items),
                _ => anyhow::bail!("{key} must be an array"),
            }
        }
        Some(_) => anyhow::bail!("{key} must be an array"),
    }
}

/// Folds an export into the current records. Legacy students arrive as
/// already-decided enrollments (approved, with a roster student); rows
/// whose email is already taken are skipped, not merged.
pub fn adopt_into(
    school: &mut School,
    export: &LegacyExport,
    now: &str,
) -> Result<AdoptionSummary, DomainError> {
    let mut summary = AdoptionSummary::default();

    for course in &export.course_names {
        if school.settings.ensure_subject(course) {
            summary.subjects_added += 1;
        }
    }
    for ls in &export.students {
        if let Some(course) = &ls.course_name {
            if school.settings.ensure_subject(course) {
                summary.subjects_added += 1;
            }
        }
    }

    for ls in &export.students {
        if school.book.find_by_email(&ls.email).is_some() {
            summary.skipped_duplicates += 1;
            continue;
        }
        let enrollment = legacy_enrollment(ls, now);
        let student = school.roster.materialize(&enrollment, now)?.clone();
        school.book.adopt(enrollment)?;
        summary.enrollments_added += 1;
        summary.students_added += 1;

        if let Some(course) = &ls.course_name {
            school.ledger.enroll_subjects(
                &student.id,
                std::slice::from_ref(course),
                &school.settings.subjects,
            )?;
            summary.subjects_enrolled += 1;
        }
    }

    if let Some(theme) = &export.theme {
        if crate::domain::settings::THEMES.contains(&theme.as_str()) {
            school.settings.theme = theme.clone();
        }
    }

    Ok(summary)
}

fn legacy_enrollment(ls: &LegacyStudent, now: &str) -> Enrollment {
    let created_at = ls
        .enrolled_date
        .as_deref()
        .and_then(parse_legacy_date)
        .unwrap_or_else(|| now.to_string());
    Enrollment {
        id: Uuid::new_v4().to_string(),
        student_name: ls.name.clone(),
        student_email: ls.email.clone(),
        grade_level: ls
            .course_name
            .clone()
            .unwrap_or_else(|| "Unassigned".to_string()),
        documents: std::collections::BTreeMap::new(),
        status: EnrollmentStatus::Approved,
        required_documents: None,
        documents_submitted: false,
        admin_notes: vec![AdminNote {
            note: "Adopted from portal export".to_string(),
            author: "import".to_string(),
            date: now.to_string(),
        }],
        created_at,
        updated_at: now.to_string(),
    }
}

/// The portal stamped rows with `toLocaleDateString()`; only the en-US
/// "M/D/YYYY" shape has been seen in the wild.
fn parse_legacy_date(raw: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%m/%d/%Y").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight).to_rfc3339())
}
