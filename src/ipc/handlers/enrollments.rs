use chrono::Utc;
use serde_json::{json, Value};

use crate::db;
use crate::domain::{DomainError, Enrollment, EnrollmentForm, EnrollmentStatus, School};
use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::helpers::{
    bool_map, no_workspace, require_workspace, required_str, save_and_note, str_field, str_list,
};
use crate::ipc::types::{AppState, Request};
use crate::notify::Notice;

fn handle_submit(state: &mut AppState, req: &Request) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let documents = match bool_map(&req.params, "documents") {
        Ok(map) => map,
        Err(reason) => return domain_err(&req.id, &DomainError::validation("documents", reason)),
    };
    let form = EnrollmentForm {
        student_name: str_field(&req.params, "studentName"),
        student_email: str_field(&req.params, "studentEmail"),
        grade_level: str_field(&req.params, "gradeLevel"),
        documents,
    };
    let now = Utc::now().to_rfc3339();
    let required = state.school.settings.required_documents.clone();
    let enrollment = match state.school.book.submit(form, &required, &now) {
        Ok(rec) => rec,
        Err(e) => return domain_err(&req.id, &e),
    };

    let notice = save_and_note(
        conn,
        |c| db::save_enrollments(c, &state.school),
        &mut state.notices,
        Notice::success(
            "Enrollment submitted",
            format!(
                "{} applied for {}",
                enrollment.student_name, enrollment.grade_level
            ),
        ),
    );
    ok(
        &req.id,
        json!({ "enrollment": enrollment, "notice": notice }),
    )
}

fn handle_get(state: &mut AppState, req: &Request) -> Value {
    if let Err(resp) = require_workspace(state, req) {
        return resp;
    }
    let key = match required_str(req, "idOrEmail") {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    // Absent is not an error here; the portal polls this while an
    // applicant types their email.
    ok(&req.id, json!({ "enrollment": state.school.book.find(&key) }))
}

fn handle_list(state: &mut AppState, req: &Request) -> Value {
    if let Err(resp) = require_workspace(state, req) {
        return resp;
    }
    let filter = match req.params.get("status") {
        None | Some(Value::Null) => None,
        Some(v) => {
            let Some(raw) = v.as_str() else {
                return err(&req.id, "bad_params", "status must be a string", None);
            };
            match EnrollmentStatus::parse(raw) {
                Some(status) => Some(status),
                None => {
                    return err(&req.id, "bad_params", format!("unknown status: {raw}"), None)
                }
            }
        }
    };
    let records: Vec<&Enrollment> = state
        .school
        .book
        .list()
        .iter()
        .filter(|e| filter.map_or(true, |f| e.status == f))
        .collect();
    ok(&req.id, json!({ "enrollments": records }))
}

fn handle_set_status(state: &mut AppState, req: &Request) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status_raw = match required_str(req, "status") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(requested) = EnrollmentStatus::parse(&status_raw) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown status: {status_raw}"),
            None,
        );
    };
    let required_docs = match str_list(&req.params, "requiredDocuments") {
        Ok(v) => v,
        Err(reason) => {
            return domain_err(
                &req.id,
                &DomainError::validation("requiredDocuments", reason),
            )
        }
    };

    let now = Utc::now().to_rfc3339();
    let School { book, roster, .. } = &mut state.school;
    let change = match book.set_status(&id, requested, required_docs, roster, &now) {
        Ok(c) => c,
        Err(e) => return domain_err(&req.id, &e),
    };

    let outcome = match change.enrollment.status {
        EnrollmentStatus::Approved => Notice::success(
            "Enrollment approved",
            format!("{} is now on the roster", change.enrollment.student_name),
        ),
        EnrollmentStatus::Rejected => {
            let message = match &change.enrollment.required_documents {
                Some(docs) => format!(
                    "{} must provide: {}",
                    change.enrollment.student_name,
                    docs.join(", ")
                ),
                None => format!(
                    "{}'s application was rejected",
                    change.enrollment.student_name
                ),
            };
            Notice::warning("Enrollment rejected", message)
        }
        other => Notice::info(
            "Enrollment updated",
            format!(
                "{} is now {}",
                change.enrollment.student_name,
                other.as_str()
            ),
        ),
    };
    let notice = save_and_note(
        conn,
        |c| {
            db::save_enrollments(c, &state.school)?;
            db::save_roster(c, &state.school)
        },
        &mut state.notices,
        outcome,
    );
    ok(
        &req.id,
        json!({
            "enrollment": change.enrollment,
            "student": change.student,
            "notice": notice,
        }),
    )
}

fn handle_resubmit_documents(state: &mut AppState, req: &Request) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let now = Utc::now().to_rfc3339();
    let enrollment = match state.school.book.resubmit_documents(&id, &now) {
        Ok(rec) => rec,
        Err(e) => return domain_err(&req.id, &e),
    };
    let notice = save_and_note(
        conn,
        |c| db::save_enrollments(c, &state.school),
        &mut state.notices,
        Notice::info(
            "Documents resubmitted",
            format!("{} is back in the review queue", enrollment.student_name),
        ),
    );
    ok(
        &req.id,
        json!({ "enrollment": enrollment, "notice": notice }),
    )
}

fn handle_update_documents(state: &mut AppState, req: &Request) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let updates = match bool_map(&req.params, "documents") {
        Ok(map) => map,
        Err(reason) => return domain_err(&req.id, &DomainError::validation("documents", reason)),
    };
    let now = Utc::now().to_rfc3339();
    let enrollment = match state.school.book.update_documents(&id, &updates, &now) {
        Ok(rec) => rec,
        Err(e) => return domain_err(&req.id, &e),
    };
    let on_file = enrollment.documents.values().filter(|v| **v).count();
    let notice = save_and_note(
        conn,
        |c| db::save_enrollments(c, &state.school),
        &mut state.notices,
        Notice::info(
            "Documents updated",
            format!(
                "{}: {} of {} document(s) on file",
                enrollment.student_name,
                on_file,
                enrollment.documents.len()
            ),
        ),
    );
    ok(
        &req.id,
        json!({ "enrollment": enrollment, "notice": notice }),
    )
}

fn handle_add_note(state: &mut AppState, req: &Request) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let note = str_field(&req.params, "note");
    let author = str_field(&req.params, "author");
    let now = Utc::now().to_rfc3339();
    let enrollment = match state.school.book.add_admin_note(&id, &note, &author, &now) {
        Ok(rec) => rec,
        Err(e) => return domain_err(&req.id, &e),
    };
    let notice = save_and_note(
        conn,
        |c| db::save_enrollments(c, &state.school),
        &mut state.notices,
        Notice::info(
            "Note added",
            format!("note added to {}'s application", enrollment.student_name),
        ),
    );
    ok(
        &req.id,
        json!({ "enrollment": enrollment, "notice": notice }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "enrollments.submit" => Some(handle_submit(state, req)),
        "enrollments.get" => Some(handle_get(state, req)),
        "enrollments.list" => Some(handle_list(state, req)),
        "enrollments.setStatus" => Some(handle_set_status(state, req)),
        "enrollments.resubmitDocuments" => Some(handle_resubmit_documents(state, req)),
        "enrollments.updateDocuments" => Some(handle_update_documents(state, req)),
        "enrollments.addNote" => Some(handle_add_note(state, req)),
        _ => None,
    }
}
