use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;
use super::roster::{Roster, Student};

/// Lifecycle of one application. `Enrolled` is a valid stored status that
/// imported records may carry, but no operation produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Pending,
    Approved,
    Rejected,
    Enrolled,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Approved => "approved",
            EnrollmentStatus::Rejected => "rejected",
            EnrollmentStatus::Enrolled => "enrolled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(EnrollmentStatus::Pending),
            "approved" => Some(EnrollmentStatus::Approved),
            "rejected" => Some(EnrollmentStatus::Rejected),
            "enrolled" => Some(EnrollmentStatus::Enrolled),
            _ => None,
        }
    }
}

/// Reviewer-visible annotation on an application. Notes never change status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminNote {
    pub note: String,
    pub author: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub student_name: String,
    pub student_email: String,
    pub grade_level: String,
    /// Document name -> submitted flag. The key set is fixed at submission
    /// time by the configured required-documents list.
    pub documents: BTreeMap<String, bool>,
    pub status: EnrollmentStatus,
    /// Only present while rejected, when the reviewer named what is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_documents: Option<Vec<String>>,
    /// Set once the applicant has resubmitted after a rejection.
    #[serde(default)]
    pub documents_submitted: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admin_notes: Vec<AdminNote>,
    pub created_at: String,
    pub updated_at: String,
}

/// Applicant-supplied fields of a new submission, before validation.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentForm {
    pub student_name: String,
    pub student_email: String,
    pub grade_level: String,
    pub documents: BTreeMap<String, bool>,
}

/// What a status change produced: the updated application, plus the roster
/// student when the change was an approval.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub enrollment: Enrollment,
    pub student: Option<Student>,
}

/// Emails compare trimmed and ASCII-lowercased; stored text keeps the
/// applicant's casing.
pub fn canonical_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Same acceptance rule as the portal form: no whitespace, exactly one '@'
/// with non-empty sides, and a '.' inside the domain with at least one
/// character on each side.
pub fn is_well_formed_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut halves = email.splitn(2, '@');
    let (Some(local), Some(domain)) = (halves.next(), halves.next()) else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

fn normalize_required_docs(list: Vec<String>) -> Result<Vec<String>, DomainError> {
    let mut out: Vec<String> = Vec::with_capacity(list.len());
    for raw in list {
        let name = raw.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation(
                "requiredDocuments",
                "document names must not be empty",
            ));
        }
        if out.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            return Err(DomainError::validation(
                "requiredDocuments",
                format!("duplicate document: {name}"),
            ));
        }
        out.push(name);
    }
    if out.is_empty() {
        return Err(DomainError::validation(
            "requiredDocuments",
            "must name at least one document",
        ));
    }
    Ok(out)
}

fn set_status_op(requested: EnrollmentStatus) -> &'static str {
    match requested {
        EnrollmentStatus::Pending => "setStatus(pending)",
        EnrollmentStatus::Approved => "setStatus(approved)",
        EnrollmentStatus::Rejected => "setStatus(rejected)",
        EnrollmentStatus::Enrolled => "setStatus(enrolled)",
    }
}

/// All applications, pending and decided, in submission order.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentBook {
    records: Vec<Enrollment>,
}

impl EnrollmentBook {
    /// Validates and records a new application as `pending`.
    ///
    /// The submitted document map must carry exactly the configured required
    /// document names as keys, each mapped to whether the applicant has
    /// handed that document in.
    pub fn submit(
        &mut self,
        form: EnrollmentForm,
        required_documents: &[String],
        now: &str,
    ) -> Result<Enrollment, DomainError> {
        let student_name = form.student_name.trim().to_string();
        if student_name.is_empty() {
            return Err(DomainError::validation("studentName", "must not be empty"));
        }
        let student_email = form.student_email.trim().to_string();
        if student_email.is_empty() {
            return Err(DomainError::validation("studentEmail", "must not be empty"));
        }
        if !is_well_formed_email(&student_email) {
            return Err(DomainError::validation(
                "studentEmail",
                "must be a well-formed email address",
            ));
        }
        let grade_level = form.grade_level.trim().to_string();
        if grade_level.is_empty() {
            return Err(DomainError::validation("gradeLevel", "must not be empty"));
        }
        for name in required_documents {
            if !form.documents.contains_key(name) {
                return Err(DomainError::validation(
                    "documents",
                    format!("missing required document: {name}"),
                ));
            }
        }
        for name in form.documents.keys() {
            if !required_documents.iter().any(|r| r == name) {
                return Err(DomainError::validation(
                    "documents",
                    format!("unknown document: {name}"),
                ));
            }
        }
        if self.find_by_email(&student_email).is_some() {
            return Err(DomainError::DuplicateEmail {
                email: student_email,
            });
        }

        let record = Enrollment {
            id: Uuid::new_v4().to_string(),
            student_name,
            student_email,
            grade_level,
            documents: form.documents,
            status: EnrollmentStatus::Pending,
            required_documents: None,
            documents_submitted: false,
            admin_notes: Vec::new(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        };
        self.records.push(record.clone());
        Ok(record)
    }

    /// Reviewer decision. Approving a pending application materializes a
    /// roster student first and flips the status only once that succeeds;
    /// approving an approved one reports the student that already exists.
    /// Re-rejection, and any request targeting `pending` or `enrolled`,
    /// is refused.
    pub fn set_status(
        &mut self,
        id: &str,
        requested: EnrollmentStatus,
        required_documents: Option<Vec<String>>,
        roster: &mut Roster,
        now: &str,
    ) -> Result<StatusChange, DomainError> {
        if required_documents.is_some() && requested != EnrollmentStatus::Rejected {
            return Err(DomainError::validation(
                "requiredDocuments",
                "only valid when rejecting an enrollment",
            ));
        }
        let required_documents = match required_documents {
            Some(list) => Some(normalize_required_docs(list)?),
            None => None,
        };
        let Some(idx) = self.index_of_id(id) else {
            return Err(DomainError::not_found("enrollment", id));
        };

        let current = self.records[idx].status;
        match (current, requested) {
            (EnrollmentStatus::Pending, EnrollmentStatus::Approved) => {
                let student = roster.materialize(&self.records[idx], now)?.clone();
                let rec = &mut self.records[idx];
                rec.status = EnrollmentStatus::Approved;
                rec.updated_at = now.to_string();
                Ok(StatusChange {
                    enrollment: rec.clone(),
                    student: Some(student),
                })
            }
            (EnrollmentStatus::Approved, EnrollmentStatus::Approved) => {
                Err(DomainError::AlreadyMaterialized {
                    enrollment_id: id.to_string(),
                })
            }
            (EnrollmentStatus::Pending, EnrollmentStatus::Rejected) => {
                let rec = &mut self.records[idx];
                rec.status = EnrollmentStatus::Rejected;
                rec.required_documents = required_documents;
                rec.updated_at = now.to_string();
                Ok(StatusChange {
                    enrollment: rec.clone(),
                    student: None,
                })
            }
            (from, _) => Err(DomainError::InvalidTransition {
                status: from.as_str(),
                operation: set_status_op(requested),
            }),
        }
    }

    /// Puts a rejected application back in the review queue. The reviewer's
    /// missing-documents list is cleared and the resubmission flag set.
    pub fn resubmit_documents(&mut self, id: &str, now: &str) -> Result<Enrollment, DomainError> {
        let Some(idx) = self.index_of_id(id) else {
            return Err(DomainError::not_found("enrollment", id));
        };
        let rec = &mut self.records[idx];
        if rec.status != EnrollmentStatus::Rejected {
            return Err(DomainError::InvalidTransition {
                status: rec.status.as_str(),
                operation: "resubmitDocuments",
            });
        }
        rec.status = EnrollmentStatus::Pending;
        rec.required_documents = None;
        rec.documents_submitted = true;
        rec.updated_at = now.to_string();
        Ok(rec.clone())
    }

    /// Flips submitted flags on documents the application already carries.
    /// The key set never changes here; decided applications are immutable.
    pub fn update_documents(
        &mut self,
        id: &str,
        updates: &BTreeMap<String, bool>,
        now: &str,
    ) -> Result<Enrollment, DomainError> {
        if updates.is_empty() {
            return Err(DomainError::validation(
                "documents",
                "must name at least one document",
            ));
        }
        let Some(idx) = self.index_of_id(id) else {
            return Err(DomainError::not_found("enrollment", id));
        };
        let rec = &mut self.records[idx];
        match rec.status {
            EnrollmentStatus::Pending | EnrollmentStatus::Rejected => {}
            decided => {
                return Err(DomainError::InvalidTransition {
                    status: decided.as_str(),
                    operation: "updateDocuments",
                })
            }
        }
        for name in updates.keys() {
            if !rec.documents.contains_key(name) {
                return Err(DomainError::validation(
                    "documents",
                    format!("unknown document: {name}"),
                ));
            }
        }
        for (name, submitted) in updates {
            rec.documents.insert(name.clone(), *submitted);
        }
        rec.updated_at = now.to_string();
        Ok(rec.clone())
    }

    pub fn add_admin_note(
        &mut self,
        id: &str,
        note: &str,
        author: &str,
        now: &str,
    ) -> Result<Enrollment, DomainError> {
        let note = note.trim();
        if note.is_empty() {
            return Err(DomainError::validation("note", "must not be empty"));
        }
        let author = author.trim();
        if author.is_empty() {
            return Err(DomainError::validation("author", "must not be empty"));
        }
        let Some(idx) = self.index_of_id(id) else {
            return Err(DomainError::not_found("enrollment", id));
        };
        let rec = &mut self.records[idx];
        rec.admin_notes.push(AdminNote {
            note: note.to_string(),
            author: author.to_string(),
            date: now.to_string(),
        });
        rec.updated_at = now.to_string();
        Ok(rec.clone())
    }

    /// Installs a record built outside the submission flow (legacy adoption).
    /// Only the email-uniqueness invariant is enforced.
    pub fn adopt(&mut self, record: Enrollment) -> Result<(), DomainError> {
        if self.find_by_email(&record.student_email).is_some() {
            return Err(DomainError::DuplicateEmail {
                email: record.student_email,
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Lookup by record id first, then by email.
    pub fn find(&self, id_or_email: &str) -> Option<&Enrollment> {
        let key = id_or_email.trim();
        self.find_by_id(key).or_else(|| self.find_by_email(key))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Enrollment> {
        self.records.iter().find(|e| e.id == id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<&Enrollment> {
        let key = canonical_email(email);
        self.records
            .iter()
            .find(|e| canonical_email(&e.student_email) == key)
    }

    pub fn list(&self) -> &[Enrollment] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn index_of_id(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|e| e.id == id)
    }
}
