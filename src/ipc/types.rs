use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::domain::School;
use crate::notify::NoticeLog;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Per-process state. Once a workspace is selected the in-memory records
/// are the source of truth; the connection only receives snapshots.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub school: School,
    pub notices: NoticeLog,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            workspace: None,
            db: None,
            school: School::default(),
            notices: NoticeLog::default(),
        }
    }
}
