use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::DomainError;

pub const THEMES: [&str; 3] = ["light", "dark", "system"];

/// Workspace configuration. Defaults match a fresh portal install; every
/// field is replaceable through a settings patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Documents every new application must list, in display order.
    pub required_documents: Vec<String>,
    /// Subjects offered for enrollment, in display order.
    pub subjects: Vec<String>,
    pub theme: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            required_documents: vec![
                "Birth Certificate".to_string(),
                "Report Card".to_string(),
                "Good Moral Certificate".to_string(),
            ],
            subjects: vec![
                "Mathematics 101".to_string(),
                "Computer Science 101".to_string(),
                "Physics 101".to_string(),
                "English 101".to_string(),
            ],
            theme: "light".to_string(),
        }
    }
}

impl Settings {
    /// Applies a partial update. Fields absent from the patch keep their
    /// value; an invalid field leaves the whole settings object untouched.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), DomainError> {
        let mut next = self.clone();
        for (key, value) in patch {
            match key.as_str() {
                "requiredDocuments" => {
                    next.required_documents = parse_name_list(value, "requiredDocuments")?;
                }
                "subjects" => {
                    next.subjects = parse_name_list(value, "subjects")?;
                }
                "theme" => {
                    let Some(raw) = value.as_str() else {
                        return Err(DomainError::validation("theme", "must be a string"));
                    };
                    let theme = raw.trim().to_ascii_lowercase();
                    if !THEMES.contains(&theme.as_str()) {
                        return Err(DomainError::validation(
                            "theme",
                            format!("must be one of light, dark, system; got {raw}"),
                        ));
                    }
                    next.theme = theme;
                }
                other => {
                    return Err(DomainError::validation(
                        "settings",
                        format!("unknown field: {other}"),
                    ));
                }
            }
        }
        *self = next;
        Ok(())
    }

    /// Adds a subject unless an ASCII-case-insensitive match already exists.
    pub fn ensure_subject(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty()
            || self
                .subjects
                .iter()
                .any(|s| s.eq_ignore_ascii_case(name))
        {
            return false;
        }
        self.subjects.push(name.to_string());
        true
    }
}

fn parse_name_list(value: &Value, field: &'static str) -> Result<Vec<String>, DomainError> {
    let Some(items) = value.as_array() else {
        return Err(DomainError::validation(field, "must be an array of names"));
    };
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let Some(raw) = item.as_str() else {
            return Err(DomainError::validation(field, "entries must be strings"));
        };
        let name = raw.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation(field, "entries must not be empty"));
        }
        if out.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            return Err(DomainError::validation(
                field,
                format!("duplicate entry: {name}"),
            ));
        }
        out.push(name);
    }
    Ok(out)
}
