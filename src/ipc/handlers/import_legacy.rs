use chrono::Utc;
use serde_json::json;

use crate::db;
use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::helpers::{no_workspace, required_str, save_and_note};
use crate::ipc::types::{AppState, Request};
use crate::legacy;
use crate::notify::Notice;

fn handle_import_legacy(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let path = match required_str(req, "path") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let text = match std::fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) => {
            return err(
                &req.id,
                "legacy_read_failed",
                e.to_string(),
                Some(json!({ "path": path })),
            )
        }
    };
    let export = match legacy::parse_legacy_export(&text) {
        Ok(x) => x,
        Err(e) => {
            return err(
                &req.id,
                "legacy_parse_failed",
                format!("{e:#}"),
                Some(json!({ "path": path })),
            )
        }
    };

    let now = Utc::now().to_rfc3339();
    let summary = match legacy::adopt_into(&mut state.school, &export, &now) {
        Ok(s) => s,
        Err(e) => return domain_err(&req.id, &e),
    };
    let notice = save_and_note(
        conn,
        |c| db::save_school(c, &state.school),
        &mut state.notices,
        Notice::success(
            "Import complete",
            format!(
                "adopted {} student(s), skipped {} duplicate(s)",
                summary.students_added, summary.skipped_duplicates
            ),
        ),
    );
    ok(
        &req.id,
        json!({
            "enrollmentsAdded": summary.enrollments_added,
            "studentsAdded": summary.students_added,
            "subjectsEnrolled": summary.subjects_enrolled,
            "subjectsAdded": summary.subjects_added,
            "skippedDuplicates": summary.skipped_duplicates,
            "malformedRows": export.malformed,
            "notice": notice,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "workspace.importLegacy" => Some(handle_import_legacy(state, req)),
        _ => None,
    }
}
