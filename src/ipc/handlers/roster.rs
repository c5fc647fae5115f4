use serde_json::{json, Value};

use crate::db;
use crate::domain::StudentStatus;
use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::helpers::{no_workspace, require_workspace, required_str, save_and_note};
use crate::ipc::types::{AppState, Request};
use crate::notify::Notice;

fn handle_list(state: &mut AppState, req: &Request) -> Value {
    if let Err(resp) = require_workspace(state, req) {
        return resp;
    }
    ok(&req.id, json!({ "students": state.school.roster.list() }))
}

fn handle_get(state: &mut AppState, req: &Request) -> Value {
    if let Err(resp) = require_workspace(state, req) {
        return resp;
    }
    let param = |key: &str| {
        req.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    if let Some(id) = param("id") {
        return ok(&req.id, json!({ "student": state.school.roster.find_by_id(&id) }));
    }
    if let Some(email) = param("email") {
        return ok(
            &req.id,
            json!({ "student": state.school.roster.find_by_email(&email) }),
        );
    }
    err(&req.id, "bad_params", "missing id or email", None)
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
    let Some(status) = StudentStatus::parse(&status_raw) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown status: {status_raw}"),
            None,
        );
    };
    let student = match state.school.roster.set_status(&id, status) {
        Ok(s) => s,
        Err(e) => return domain_err(&req.id, &e),
    };
    let notice = save_and_note(
        conn,
        |c| db::save_roster(c, &state.school),
        &mut state.notices,
        Notice::info(
            "Student status updated",
            format!("{} is now {}", student.name, status.as_str()),
        ),
    );
    ok(&req.id, json!({ "student": student, "notice": notice }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.list" => Some(handle_list(state, req)),
        "roster.get" => Some(handle_get(state, req)),
        "roster.setStatus" => Some(handle_set_status(state, req)),
        _ => None,
    }
}
