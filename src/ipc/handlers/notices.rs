use serde_json::{json, Value};

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

/// Session feed only; works before a workspace is selected so shells can
/// show early warnings.
fn handle_list(state: &mut AppState, req: &Request) -> Value {
    let limit = match req.params.get("limit") {
        None | Some(Value::Null) => 50,
        Some(v) => match v.as_u64() {
            Some(n) if n > 0 => n as usize,
            _ => {
                return err(
                    &req.id,
                    "bad_params",
                    "limit must be a positive integer",
                    None,
                )
            }
        },
    };
    ok(
        &req.id,
        json!({
            "notices": state.notices.recent(limit),
            "total": state.notices.len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "notices.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
