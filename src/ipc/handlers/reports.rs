use serde_json::{json, Value};
use std::path::PathBuf;

use crate::calc;
use crate::domain::{DomainError, School};
use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::helpers::{require_workspace, required_str};
use crate::ipc::types::{AppState, Request};
use crate::notify::Notice;

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn write_text_file(path: &str, contents: &str) -> Result<(), HandlerErr> {
    let out = PathBuf::from(path);
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).map_err(|e| HandlerErr {
            code: "export_failed",
            message: e.to_string(),
            details: Some(json!({ "path": path })),
        })?;
    }
    std::fs::write(&out, contents).map_err(|e| HandlerErr {
        code: "export_failed",
        message: e.to_string(),
        details: Some(json!({ "path": path })),
    })?;
    Ok(())
}

/// One row per roster student, with their subject list and grading summary.
fn roster_csv(school: &School) -> (String, usize) {
    let mut out = String::new();
    out.push_str("studentId,name,email,gradeLevel,status,subjects,gradeCount,average,gpa\r\n");
    let mut rows = 0usize;
    for student in school.roster.list() {
        let subjects = school.ledger.subjects_of(&student.id).join("; ");
        let grade_count = school.ledger.grades_of(&student.id).len();
        let mean = school.ledger.average(&student.id);
        let fields = [
            csv_quote(&student.id),
            csv_quote(&student.name),
            csv_quote(&student.email),
            csv_quote(&student.grade_level),
            student.status.as_str().to_string(),
            csv_quote(&subjects),
            grade_count.to_string(),
            format!("{:.2}", calc::round2(mean)),
            format!("{:.2}", calc::gpa(mean)),
        ];
        out.push_str(&fields.join(","));
        out.push_str("\r\n");
        rows += 1;
    }
    (out, rows)
}

fn handle_dashboard(state: &mut AppState, req: &Request) -> Value {
    if let Err(resp) = require_workspace(state, req) {
        return resp;
    }
    ok(&req.id, json!({ "dashboard": calc::dashboard(&state.school) }))
}

fn handle_card(state: &mut AppState, req: &Request) -> Value {
    if let Err(resp) = require_workspace(state, req) {
        return resp;
    }
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(card) = calc::report_card(&state.school, &student_id) else {
        return domain_err(&req.id, &DomainError::not_found("student", student_id));
    };
    let notice = state.notices.push(Notice::info(
        "Report generated",
        format!("report card for {}", card.student_name),
    ));
    ok(&req.id, json!({ "report": card, "notice": notice }))
}

fn handle_export_csv(state: &mut AppState, req: &Request) -> Value {
    if let Err(resp) = require_workspace(state, req) {
        return resp;
    }
    let out_path = match required_str(req, "outPath") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (contents, rows) = roster_csv(&state.school);
    if let Err(e) = write_text_file(&out_path, &contents) {
        return e.response(&req.id);
    }
    let notice = state.notices.push(Notice::success(
        "Roster exported",
        format!("{rows} row(s) written to {out_path}"),
    ));
    ok(
        &req.id,
        json!({
            "path": out_path,
            "rowsExported": rows,
            "notice": notice,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.dashboard" => Some(handle_dashboard(state, req)),
        "reports.card" => Some(handle_card(state, req)),
        "reports.exportCsv" => Some(handle_export_csv(state, req)),
        _ => None,
    }
}
