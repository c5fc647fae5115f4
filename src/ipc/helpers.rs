use std::collections::BTreeMap;

use rusqlite::Connection;
use serde_json::Value;

use super::error::err;
use super::types::{AppState, Request};
use crate::notify::{Notice, NoticeLog};

/// Structural string param (record ids, paths). Missing or blank is a
/// routing error, not a data validation one.
pub fn required_str(req: &Request, key: &str) -> Result<String, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {key}"), None))
}

/// Free-form data field: absent or non-string becomes empty, and the rule
/// layer reports it against the field name.
pub fn str_field(params: &Value, key: &str) -> String {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Document-map param ({name: bool, ...}). Absent means empty.
pub fn bool_map(params: &Value, key: &str) -> Result<BTreeMap<String, bool>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(obj)) => {
            let mut out = BTreeMap::new();
            for (k, v) in obj {
                let Some(flag) = v.as_bool() else {
                    return Err(format!("{key}.{k} must be a boolean"));
                };
                out.insert(k.clone(), flag);
            }
            Ok(out)
        }
        Some(_) => Err(format!("{key} must be an object of booleans")),
    }
}

/// String-list param. Absent and null both mean "not given".
pub fn str_list(params: &Value, key: &str) -> Result<Option<Vec<String>>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let Some(s) = item.as_str() else {
                    return Err(format!("{key} entries must be strings"));
                };
                out.push(s.to_string());
            }
            Ok(Some(out))
        }
        Some(_) => Err(format!("{key} must be an array of strings")),
    }
}

pub fn no_workspace(req: &Request) -> Value {
    err(&req.id, "no_workspace", "select a workspace first", None)
}

pub fn require_workspace(state: &AppState, req: &Request) -> Result<(), Value> {
    if state.db.is_some() {
        Ok(())
    } else {
        Err(no_workspace(req))
    }
}

/// Records the outcome notice, then snapshots. The mutation already
/// happened, so a failed write downgrades to a warning notice instead of
/// failing the request; the returned notice is the one to echo back.
pub fn save_and_note(
    conn: &Connection,
    save: impl FnOnce(&Connection) -> anyhow::Result<()>,
    notices: &mut NoticeLog,
    outcome: Notice,
) -> Notice {
    let stored = notices.push(outcome);
    match save(conn) {
        Ok(()) => stored,
        Err(e) => notices.push(Notice::warning(
            "Save failed",
            format!("changes were kept in memory but not written to disk: {e:#}"),
        )),
    }
}
