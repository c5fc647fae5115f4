use serde_json::{json, Value};

use crate::db;
use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::helpers::{no_workspace, require_workspace, save_and_note};
use crate::ipc::types::{AppState, Request};
use crate::notify::Notice;

fn handle_get(state: &mut AppState, req: &Request) -> Value {
    if let Err(resp) = require_workspace(state, req) {
        return resp;
    }
    ok(&req.id, json!({ "settings": state.school.settings }))
}

fn handle_update(state: &mut AppState, req: &Request) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing patch object", None);
    };
    if let Err(e) = state.school.settings.apply_patch(patch) {
        return domain_err(&req.id, &e);
    }
    let changed: Vec<&str> = patch.keys().map(String::as_str).collect();
    let notice = save_and_note(
        conn,
        |c| db::save_settings(c, &state.school),
        &mut state.notices,
        Notice::success("Settings saved", format!("updated {}", changed.join(", "))),
    );
    ok(
        &req.id,
        json!({ "settings": state.school.settings, "notice": notice }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_get(state, req)),
        "settings.update" => Some(handle_update(state, req)),
        _ => None,
    }
}
