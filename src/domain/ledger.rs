use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// One student's slice of the ledger: what they take, and what they scored.
/// A subject can be enrolled with no grade yet; a grade only ever exists for
/// an enrolled subject.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StudentGrades {
    #[serde(default)]
    pub subjects: BTreeSet<String>,
    #[serde(default)]
    pub grades: BTreeMap<String, f64>,
}

/// Subject enrollment and numeric grades, keyed by roster student id.
/// Grades live on the 0..=100 scale; scale conversion is a display concern.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeLedger {
    entries: BTreeMap<String, StudentGrades>,
}

impl GradeLedger {
    /// Adds subjects for a student, idempotently. Every name must match the
    /// offered catalog (case-insensitively); the catalog's casing is stored.
    /// Returns the student's full subject list after the change.
    pub fn enroll_subjects(
        &mut self,
        student_id: &str,
        subjects: &[String],
        catalog: &[String],
    ) -> Result<Vec<String>, DomainError> {
        if subjects.is_empty() {
            return Err(DomainError::validation(
                "subjects",
                "must name at least one subject",
            ));
        }
        let mut cleaned = Vec::with_capacity(subjects.len());
        for raw in subjects {
            let name = raw.trim();
            if name.is_empty() {
                return Err(DomainError::validation(
                    "subjects",
                    "subject names must not be empty",
                ));
            }
            let Some(canonical) = catalog.iter().find(|c| c.eq_ignore_ascii_case(name)) else {
                return Err(DomainError::validation(
                    "subjects",
                    format!("unknown subject: {name}"),
                ));
            };
            cleaned.push(canonical.clone());
        }
        let entry = self.entries.entry(student_id.to_string()).or_default();
        for subject in cleaned {
            entry.subjects.insert(subject);
        }
        Ok(entry.subjects.iter().cloned().collect())
    }

    /// Records (or overwrites) a grade for a subject the student is enrolled
    /// in. Values outside 0..=100, NaN included, are refused.
    pub fn set_grade(
        &mut self,
        student_id: &str,
        subject: &str,
        value: f64,
    ) -> Result<(), DomainError> {
        if !(0.0..=100.0).contains(&value) {
            return Err(DomainError::OutOfRange { value });
        }
        let subject = subject.trim();
        let Some(entry) = self.entries.get_mut(student_id) else {
            return Err(DomainError::not_found("subject", subject));
        };
        let Some(canonical) = entry
            .subjects
            .iter()
            .find(|s| s.eq_ignore_ascii_case(subject))
            .cloned()
        else {
            return Err(DomainError::not_found("subject", subject));
        };
        entry.grades.insert(canonical, value);
        Ok(())
    }

    pub fn subjects_of(&self, student_id: &str) -> Vec<String> {
        self.entries
            .get(student_id)
            .map(|e| e.subjects.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn grades_of(&self, student_id: &str) -> BTreeMap<String, f64> {
        self.entries
            .get(student_id)
            .map(|e| e.grades.clone())
            .unwrap_or_default()
    }

    /// Arithmetic mean of recorded grades. Subjects without a grade do not
    /// count; a student with no grades averages 0.
    pub fn average(&self, student_id: &str) -> f64 {
        let Some(entry) = self.entries.get(student_id) else {
            return 0.0;
        };
        if entry.grades.is_empty() {
            return 0.0;
        }
        let sum: f64 = entry.grades.values().sum();
        sum / entry.grades.len() as f64
    }

    /// Subject -> number of students enrolled in it, derived on demand.
    pub fn subject_enrollment_counts(&self) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for entry in self.entries.values() {
            for subject in &entry.subjects {
                *counts.entry(subject.clone()).or_default() += 1;
            }
        }
        counts
    }

    pub fn entries(&self) -> &BTreeMap<String, StudentGrades> {
        &self.entries
    }
}
