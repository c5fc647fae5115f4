use serde_json::{json, Value};

use crate::calc;
use crate::db;
use crate::domain::DomainError;
use crate::ipc::error::{domain_err, ok};
use crate::ipc::helpers::{no_workspace, require_workspace, required_str, save_and_note, str_list};
use crate::ipc::types::{AppState, Request};
use crate::notify::Notice;

fn handle_enroll_subjects(state: &mut AppState, req: &Request) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subjects = match str_list(&req.params, "subjects") {
        Ok(Some(list)) => list,
        Ok(None) => {
            return domain_err(
                &req.id,
                &DomainError::validation("subjects", "must name at least one subject"),
            )
        }
        Err(reason) => return domain_err(&req.id, &DomainError::validation("subjects", reason)),
    };
    let Some(student) = state.school.roster.find_by_id(&student_id) else {
        return domain_err(&req.id, &DomainError::not_found("student", student_id));
    };
    let student_name = student.name.clone();

    let catalog = state.school.settings.subjects.clone();
    let enrolled = match state
        .school
        .ledger
        .enroll_subjects(&student_id, &subjects, &catalog)
    {
        Ok(list) => list,
        Err(e) => return domain_err(&req.id, &e),
    };
    let notice = save_and_note(
        conn,
        |c| db::save_grades(c, &state.school),
        &mut state.notices,
        Notice::success(
            "Subjects enrolled",
            format!("{} now takes {} subject(s)", student_name, enrolled.len()),
        ),
    );
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "subjects": enrolled,
            "notice": notice,
        }),
    )
}

fn handle_set(state: &mut AppState, req: &Request) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subject = match required_str(req, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(value) = req.params.get("value").and_then(|v| v.as_f64()) else {
        return domain_err(
            &req.id,
            &DomainError::validation("value", "must be a number"),
        );
    };
    let Some(student) = state.school.roster.find_by_id(&student_id) else {
        return domain_err(&req.id, &DomainError::not_found("student", student_id));
    };
    let student_name = student.name.clone();

    if let Err(e) = state.school.ledger.set_grade(&student_id, &subject, value) {
        return domain_err(&req.id, &e);
    }
    let grades = state.school.ledger.grades_of(&student_id);
    let average = state.school.ledger.average(&student_id);
    let notice = save_and_note(
        conn,
        |c| db::save_grades(c, &state.school),
        &mut state.notices,
        Notice::success(
            "Grade recorded",
            format!("{student_name}: {subject} = {value}"),
        ),
    );
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "grades": grades,
            "average": calc::round2(average),
            "notice": notice,
        }),
    )
}

fn handle_get(state: &mut AppState, req: &Request) -> Value {
    if let Err(resp) = require_workspace(state, req) {
        return resp;
    }
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if state.school.roster.find_by_id(&student_id).is_none() {
        return domain_err(&req.id, &DomainError::not_found("student", student_id));
    }
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "subjects": state.school.ledger.subjects_of(&student_id),
            "grades": state.school.ledger.grades_of(&student_id),
            "average": calc::round2(state.school.ledger.average(&student_id)),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.enrollSubjects" => Some(handle_enroll_subjects(state, req)),
        "grades.set" => Some(handle_set(state, req)),
        "grades.get" => Some(handle_get(state, req)),
        _ => None,
    }
}
