use chrono::Utc;
use serde::Serialize;

/// Session history cap. Old entries fall off the front; nothing here is
/// ever persisted.
const HISTORY_MAX: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

/// One toast-style notification, stamped when constructed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
    pub at: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Notice {
            kind,
            title: title.into(),
            message: message.into(),
            at: Utc::now().to_rfc3339(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notice::new(NoticeKind::Info, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notice::new(NoticeKind::Success, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notice::new(NoticeKind::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notice::new(NoticeKind::Error, title, message)
    }
}

/// In-memory notification feed for the current session, oldest first.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Vec<Notice>,
}

impl NoticeLog {
    /// Appends and returns the stored notice so handlers can echo it in
    /// the same response.
    pub fn push(&mut self, notice: Notice) -> Notice {
        self.notices.push(notice.clone());
        if self.notices.len() > HISTORY_MAX {
            let overflow = self.notices.len() - HISTORY_MAX;
            self.notices.drain(..overflow);
        }
        notice
    }

    /// The most recent `limit` notices, still oldest first.
    pub fn recent(&self, limit: usize) -> &[Notice] {
        let start = self.notices.len().saturating_sub(limit);
        &self.notices[start..]
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}
