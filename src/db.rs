use anyhow::Context;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::domain::School;

pub const DB_FILE: &str = "enrolld.sqlite3";

/// Snapshot keys, one JSON document per record collection. The names are
/// part of the on-disk format; renaming one orphans existing workspaces.
pub const SNAP_ENROLLMENTS: &str = "enrollment data";
pub const SNAP_STUDENTS: &str = "student data";
pub const SNAP_GRADES: &str = "grade data";
pub const SNAP_SETTINGS: &str = "settings data";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots(
            key TEXT PRIMARY KEY,
            doc TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

pub fn snapshot_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT doc FROM snapshots WHERE key = ?", [key], |row| {
            row.get(0)
        })
        .optional()?;
    match raw {
        Some(text) => {
            let doc: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("snapshot {key:?} is not valid JSON"))?;
            Ok(Some(doc))
        }
        None => Ok(None),
    }
}

pub fn snapshot_set_json(
    conn: &Connection,
    key: &str,
    doc: &serde_json::Value,
) -> anyhow::Result<()> {
    let text = serde_json::to_string(doc)?;
    conn.execute(
        "INSERT INTO snapshots(key, doc, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET doc = excluded.doc, updated_at = excluded.updated_at",
        (key, &text, Utc::now().to_rfc3339()),
    )?;
    Ok(())
}

/// Rebuilds the in-memory records from the workspace snapshots. Missing
/// snapshots fall back to defaults (fresh workspace); present-but-broken
/// ones are an error so a corrupt workspace is refused, not half-loaded.
pub fn load_school(conn: &Connection) -> anyhow::Result<School> {
    let mut school = School::default();
    if let Some(doc) = snapshot_get_json(conn, SNAP_ENROLLMENTS)? {
        school.book = serde_json::from_value(doc)
            .with_context(|| format!("snapshot {SNAP_ENROLLMENTS:?} does not match the enrollment model"))?;
    }
    if let Some(doc) = snapshot_get_json(conn, SNAP_STUDENTS)? {
        school.roster = serde_json::from_value(doc)
            .with_context(|| format!("snapshot {SNAP_STUDENTS:?} does not match the roster model"))?;
    }
    if let Some(doc) = snapshot_get_json(conn, SNAP_GRADES)? {
        school.ledger = serde_json::from_value(doc)
            .with_context(|| format!("snapshot {SNAP_GRADES:?} does not match the ledger model"))?;
    }
    if let Some(doc) = snapshot_get_json(conn, SNAP_SETTINGS)? {
        school.settings = serde_json::from_value(doc)
            .with_context(|| format!("snapshot {SNAP_SETTINGS:?} does not match the settings model"))?;
    }
    Ok(school)
}

pub fn save_enrollments(conn: &Connection, school: &School) -> anyhow::Result<()> {
    snapshot_set_json(conn, SNAP_ENROLLMENTS, &serde_json::to_value(&school.book)?)
}

pub fn save_roster(conn: &Connection, school: &School) -> anyhow::Result<()> {
    snapshot_set_json(conn, SNAP_STUDENTS, &serde_json::to_value(&school.roster)?)
}

pub fn save_grades(conn: &Connection, school: &School) -> anyhow::Result<()> {
    snapshot_set_json(conn, SNAP_GRADES, &serde_json::to_value(&school.ledger)?)
}

pub fn save_settings(conn: &Connection, school: &School) -> anyhow::Result<()> {
    snapshot_set_json(conn, SNAP_SETTINGS, &serde_json::to_value(&school.settings)?)
}

pub fn save_school(conn: &Connection, school: &School) -> anyhow::Result<()> {
    save_enrollments(conn, school)?;
    save_roster(conn, school)?;
    save_grades(conn, school)?;
    save_settings(conn, school)?;
    Ok(())
}
