use serde_json::json;
use std::path::PathBuf;

use crate::backup;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::notify::Notice;

fn handle_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing outPath", None),
    };
    let workspace_path = req
        .params
        .get("workspacePath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone());
    let Some(workspace_path) = workspace_path else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    // Flush the latest snapshots so the bundle carries what the session
    // sees, then settle the WAL before copying the file.
    if let Some(conn) = state.db.as_ref() {
        let _ = db::save_school(conn, &state.school);
        let _ = conn.execute_batch("PRAGMA wal_checkpoint(FULL)");
    }

    let out = PathBuf::from(&out_path);
    let export = match backup::export_workspace_bundle(&workspace_path, &out) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": out_path })),
            )
        }
    };

    let notice = state.notices.push(Notice::success(
        "Backup complete",
        format!("workspace exported to {out_path}"),
    ));
    ok(
        &req.id,
        json!({
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count,
            "dbSha256": export.db_sha256,
            "notice": notice,
        }),
    )
}

fn handle_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match req.params.get("inPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing inPath", None),
    };
    let workspace_path = req
        .params
        .get("workspacePath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone());
    let Some(workspace_path) = workspace_path else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    // Drop open handle before replacing the file underneath it.
    state.db = None;

    let import = match backup::import_workspace_bundle(&src, &workspace_path) {
        Ok(v) => v,
        Err(e) => {
            state.notices.push(Notice::error(
                "Restore failed",
                format!("bundle was not applied: {e:#}"),
            ));
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": src.to_string_lossy() })),
            );
        }
    };

    let conn = match db::open_db(&workspace_path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", e.to_string(), None),
    };
    let school = match db::load_school(&conn) {
        Ok(school) => school,
        Err(e) => {
            state.notices.push(Notice::error(
                "Restore failed",
                format!("restored workspace does not decode: {e:#}"),
            ));
            return err(&req.id, "snapshot_load_failed", format!("{e:?}"), None);
        }
    };

    state.workspace = Some(workspace_path.clone());
    state.db = Some(conn);
    state.school = school;
    let notice = state.notices.push(Notice::success(
        "Backup restored",
        format!(
            "{} enrollment(s), {} student(s) on the roster",
            state.school.book.len(),
            state.school.roster.len()
        ),
    ));
    ok(
        &req.id,
        json!({
            "workspacePath": workspace_path.to_string_lossy(),
            "bundleFormatDetected": import.bundle_format_detected,
            "enrollments": state.school.book.len(),
            "students": state.school.roster.len(),
            "notice": notice,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportBundle" => Some(handle_export_bundle(state, req)),
        "backup.importBundle" => Some(handle_import_bundle(state, req)),
        _ => None,
    }
}
