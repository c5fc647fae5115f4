//! Grading arithmetic and derived view models. Everything here is pure:
//! records in, numbers out, no clock and no I/O.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::{EnrollmentStatus, School, StudentStatus};

/// GPA from a 0..=100 average, on the published 5-step scale. The
/// thresholds are school policy, locked by tests; do not tune them.
pub fn gpa(average: f64) -> f64 {
    if average >= 90.0 {
        1.00
    } else if average >= 85.0 {
        1.5
    } else if average >= 80.0 {
        2.0
    } else if average >= 75.0 {
        2.5
    } else {
        3.0
    }
}

/// Per-subject equivalent on the 1.00..5.00 scale. Finer than [`gpa`]:
/// ten steps, with everything below 75 collapsing to 5.00.
pub fn equivalent(grade: f64) -> f64 {
    if grade >= 97.0 {
        1.00
    } else if grade >= 94.0 {
        1.25
    } else if grade >= 91.0 {
        1.50
    } else if grade >= 88.0 {
        1.75
    } else if grade >= 85.0 {
        2.00
    } else if grade >= 82.0 {
        2.25
    } else if grade >= 79.0 {
        2.50
    } else if grade >= 76.0 {
        2.75
    } else if grade >= 75.0 {
        3.00
    } else {
        5.00
    }
}

pub fn passed(grade: f64) -> bool {
    grade >= 75.0
}

/// Equivalents render with two decimals everywhere ("1.50", never "1.5").
pub fn format_equivalent(grade: f64) -> String {
    format!("{:.2}", equivalent(grade))
}

/// Half-up rounding to two decimals, for display values only. Raw grades
/// stay unrounded in the ledger.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Counter block for the admin landing page. All numbers are derived from
/// the records on every call; nothing is cached or stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardModel {
    pub total_enrollments: usize,
    pub pending_count: usize,
    pub approved_count: usize,
    pub rejected_count: usize,
    pub enrolled_count: usize,
    pub total_students: usize,
    pub active_students: usize,
    pub subjects_offered: usize,
    /// Subjects with at least one enrolled student.
    pub active_subjects: usize,
}

pub fn dashboard(school: &School) -> DashboardModel {
    let mut pending_count = 0;
    let mut approved_count = 0;
    let mut rejected_count = 0;
    let mut enrolled_count = 0;
    for e in school.book.list() {
        match e.status {
            EnrollmentStatus::Pending => pending_count += 1,
            EnrollmentStatus::Approved => approved_count += 1,
            EnrollmentStatus::Rejected => rejected_count += 1,
            EnrollmentStatus::Enrolled => enrolled_count += 1,
        }
    }
    let taken: BTreeSet<&String> = school
        .ledger
        .entries()
        .values()
        .flat_map(|e| e.subjects.iter())
        .collect();
    DashboardModel {
        total_enrollments: school.book.len(),
        pending_count,
        approved_count,
        rejected_count,
        enrolled_count,
        total_students: school.roster.len(),
        active_students: school
            .roster
            .list()
            .iter()
            .filter(|s| s.status == StudentStatus::Active)
            .count(),
        subjects_offered: school.settings.subjects.len(),
        active_subjects: taken.len(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equivalent: Option<String>,
    pub remarks: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCard {
    pub student_id: String,
    pub student_name: String,
    pub grade_level: String,
    pub status: StudentStatus,
    pub lines: Vec<ReportLine>,
    /// How many subjects actually have a grade; the average is over these.
    pub grade_count: usize,
    pub average: f64,
    pub gpa: f64,
}

/// Builds the per-student report card, or None when the student id is not
/// on the roster. Ungraded subjects appear as "No Grade" lines and stay
/// out of the average.
pub fn report_card(school: &School, student_id: &str) -> Option<ReportCard> {
    let student = school.roster.find_by_id(student_id)?;
    let grades = school.ledger.grades_of(student_id);
    let mut lines = Vec::new();
    for subject in school.ledger.subjects_of(student_id) {
        let line = match grades.get(&subject).copied() {
            Some(grade) => ReportLine {
                subject,
                grade: Some(grade),
                equivalent: Some(format_equivalent(grade)),
                remarks: if passed(grade) { "Passed" } else { "Failed" },
            },
            None => ReportLine {
                subject,
                grade: None,
                equivalent: None,
                remarks: "No Grade",
            },
        };
        lines.push(line);
    }
    let mean = school.ledger.average(student_id);
    Some(ReportCard {
        student_id: student.id.clone(),
        student_name: student.name.clone(),
        grade_level: student.grade_level.clone(),
        status: student.status,
        lines,
        grade_count: grades.len(),
        average: round2(mean),
        gpa: gpa(mean),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EnrollmentForm, StudentStatus};
    use std::collections::BTreeMap;

    #[test]
    fn gpa_steps_lock() {
        let table = [
            (100.0, 1.00),
            (90.0, 1.00),
            (89.999, 1.5),
            (85.0, 1.5),
            (84.9, 2.0),
            (80.0, 2.0),
            (79.9, 2.5),
            (75.0, 2.5),
            (74.9, 3.0),
            (0.0, 3.0),
        ];
        for (avg, want) in table {
            assert_eq!(gpa(avg), want, "gpa({avg})");
        }
    }

    #[test]
    fn equivalent_steps_lock() {
        let table = [
            (100.0, 1.00),
            (97.0, 1.00),
            (96.9, 1.25),
            (94.0, 1.25),
            (93.0, 1.50),
            (91.0, 1.50),
            (90.0, 1.75),
            (88.0, 1.75),
            (87.0, 2.00),
            (85.0, 2.00),
            (84.0, 2.25),
            (82.0, 2.25),
            (81.0, 2.50),
            (79.0, 2.50),
            (78.0, 2.75),
            (76.0, 2.75),
            (75.5, 3.00),
            (75.0, 3.00),
            (74.999, 5.00),
            (0.0, 5.00),
        ];
        for (grade, want) in table {
            assert_eq!(equivalent(grade), want, "equivalent({grade})");
        }
    }

    #[test]
    fn equivalents_render_with_two_decimals() {
        assert_eq!(format_equivalent(90.0), "1.75");
        assert_eq!(format_equivalent(91.0), "1.50");
        assert_eq!(format_equivalent(70.0), "5.00");
        assert_eq!(format_equivalent(97.0), "1.00");
    }

    #[test]
    fn pass_mark_is_exactly_75() {
        assert!(passed(75.0));
        assert!(passed(100.0));
        assert!(!passed(74.999));
        assert!(!passed(0.0));
    }

    #[test]
    fn round2_is_half_up_on_two_decimals() {
        assert_eq!(round2(83.333333), 83.33);
        assert_eq!(round2(66.666666), 66.67);
        assert_eq!(round2(80.0), 80.0);
    }

    fn submit_and_approve(school: &mut School, name: &str, email: &str, now: &str) -> String {
        let mut documents = BTreeMap::new();
        for doc in &school.settings.required_documents {
            documents.insert(doc.clone(), true);
        }
        let required = school.settings.required_documents.clone();
        let rec = school
            .book
            .submit(
                EnrollmentForm {
                    student_name: name.to_string(),
                    student_email: email.to_string(),
                    grade_level: "Grade 7".to_string(),
                    documents,
                },
                &required,
                now,
            )
            .unwrap();
        let change = school
            .book
            .set_status(
                &rec.id,
                crate::domain::EnrollmentStatus::Approved,
                None,
                &mut school.roster,
                now,
            )
            .unwrap();
        change.student.unwrap().id
    }

    fn school_with_one_graded_student() -> (School, String) {
        let mut school = School::default();
        let now = "2026-08-25T08:00:00+00:00";
        let sid = submit_and_approve(&mut school, "Ana Cruz", "ana@school.edu", now);
        let catalog = school.settings.subjects.clone();
        school
            .ledger
            .enroll_subjects(
                &sid,
                &[
                    "Mathematics 101".to_string(),
                    "Physics 101".to_string(),
                    "English 101".to_string(),
                ],
                &catalog,
            )
            .unwrap();
        school
            .ledger
            .set_grade(&sid, "Mathematics 101", 90.0)
            .unwrap();
        school.ledger.set_grade(&sid, "Physics 101", 80.0).unwrap();
        (school, sid)
    }

    #[test]
    fn report_card_averages_only_graded_subjects() {
        let (school, sid) = school_with_one_graded_student();
        let card = report_card(&school, &sid).unwrap();
        assert_eq!(card.student_name, "Ana Cruz");
        assert_eq!(card.status, StudentStatus::Active);
        assert_eq!(card.lines.len(), 3);
        assert_eq!(card.grade_count, 2);
        assert_eq!(card.average, 85.0);
        assert_eq!(card.gpa, 1.5);

        let english = card
            .lines
            .iter()
            .find(|l| l.subject == "English 101")
            .unwrap();
        assert_eq!(english.remarks, "No Grade");
        assert!(english.grade.is_none());

        let math = card
            .lines
            .iter()
            .find(|l| l.subject == "Mathematics 101")
            .unwrap();
        assert_eq!(math.grade, Some(90.0));
        assert_eq!(math.equivalent.as_deref(), Some("1.75"));
        assert_eq!(math.remarks, "Passed");
    }

    #[test]
    fn report_card_for_ungraded_student_shows_zero_average() {
        let (mut school, first) = school_with_one_graded_student();
        let now = "2026-08-25T08:00:00+00:00";
        let ben = submit_and_approve(&mut school, "Ben Reyes", "ben@school.edu", now);
        let catalog = school.settings.subjects.clone();
        school
            .ledger
            .enroll_subjects(&ben, &["English 101".to_string()], &catalog)
            .unwrap();

        let card = report_card(&school, &ben).unwrap();
        assert_eq!(card.grade_count, 0);
        assert_eq!(card.average, 0.0);
        assert_eq!(card.gpa, 3.0);
        assert_ne!(first, ben);

        assert!(report_card(&school, "missing").is_none());
    }

    #[test]
    fn dashboard_counts_every_bucket() {
        let (mut school, sid) = school_with_one_graded_student();
        let now = "2026-08-25T08:00:00+00:00";
        let mut documents = BTreeMap::new();
        for doc in &school.settings.required_documents {
            documents.insert(doc.clone(), true);
        }
        let required = school.settings.required_documents.clone();
        school
            .book
            .submit(
                EnrollmentForm {
                    student_name: "Ben Reyes".to_string(),
                    student_email: "ben@school.edu".to_string(),
                    grade_level: "Grade 8".to_string(),
                    documents,
                },
                &required,
                now,
            )
            .unwrap();
        school
            .roster
            .set_status(&sid, StudentStatus::Inactive)
            .unwrap();

        let model = dashboard(&school);
        assert_eq!(model.total_enrollments, 2);
        assert_eq!(model.pending_count, 1);
        assert_eq!(model.approved_count, 1);
        assert_eq!(model.rejected_count, 0);
        assert_eq!(model.enrolled_count, 0);
        assert_eq!(model.total_students, 1);
        assert_eq!(model.active_students, 0);
        assert_eq!(model.subjects_offered, 4);
        assert_eq!(model.active_subjects, 3);
    }
}
