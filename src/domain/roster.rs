use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enrollment::{canonical_email, Enrollment};
use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(StudentStatus::Active),
            "inactive" => Some(StudentStatus::Inactive),
            _ => None,
        }
    }
}

/// A roster entry. Identity fields are copied from the approved application
/// at materialization time and are not edited afterwards; only `status`
/// moves, between `active` and `inactive`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    /// Back-reference to the application this student came from. At most one
    /// student per enrollment, ever.
    pub enrollment_id: String,
    pub name: String,
    pub email: String,
    pub grade_level: String,
    pub status: StudentStatus,
    pub enrolled_at: String,
}

/// Students produced by approved enrollments, in approval order.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    students: Vec<Student>,
}

impl Roster {
    /// Creates the student record for an approved application. Refuses to
    /// mint a second student for the same enrollment.
    pub fn materialize(
        &mut self,
        enrollment: &Enrollment,
        now: &str,
    ) -> Result<&Student, DomainError> {
        if self
            .students
            .iter()
            .any(|s| s.enrollment_id == enrollment.id)
        {
            return Err(DomainError::AlreadyMaterialized {
                enrollment_id: enrollment.id.clone(),
            });
        }
        self.students.push(Student {
            id: Uuid::new_v4().to_string(),
            enrollment_id: enrollment.id.clone(),
            name: enrollment.student_name.clone(),
            email: enrollment.student_email.clone(),
            grade_level: enrollment.grade_level.clone(),
            status: StudentStatus::Active,
            enrolled_at: now.to_string(),
        });
        let idx = self.students.len() - 1;
        Ok(&self.students[idx])
    }

    pub fn set_status(
        &mut self,
        id: &str,
        status: StudentStatus,
    ) -> Result<Student, DomainError> {
        let Some(student) = self.students.iter_mut().find(|s| s.id == id) else {
            return Err(DomainError::not_found("student", id));
        };
        student.status = status;
        Ok(student.clone())
    }

    /// Installs a student built outside the approval flow (legacy adoption).
    pub fn adopt(&mut self, student: Student) -> Result<(), DomainError> {
        if self
            .students
            .iter()
            .any(|s| s.enrollment_id == student.enrollment_id)
        {
            return Err(DomainError::AlreadyMaterialized {
                enrollment_id: student.enrollment_id,
            });
        }
        self.students.push(student);
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<&Student> {
        let key = canonical_email(email);
        self.students
            .iter()
            .find(|s| canonical_email(&s.email) == key)
    }

    pub fn find_by_enrollment(&self, enrollment_id: &str) -> Option<&Student> {
        self.students
            .iter()
            .find(|s| s.enrollment_id == enrollment_id)
    }

    pub fn list(&self) -> &[Student] {
        &self.students
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}
