//! The school's records, kept in memory and snapshotted to the workspace
//! database on every change. Rules live here; the ipc layer only parses
//! params and shapes responses.

pub mod enrollment;
pub mod error;
pub mod ledger;
pub mod roster;
pub mod settings;

pub use enrollment::{
    AdminNote, Enrollment, EnrollmentBook, EnrollmentForm, EnrollmentStatus, StatusChange,
};
pub use error::DomainError;
pub use ledger::{GradeLedger, StudentGrades};
pub use roster::{Roster, Student, StudentStatus};
pub use settings::Settings;

/// Everything one workspace tracks. Owned by the process state and passed
/// by reference into handlers; never a global.
#[derive(Debug, Default, Clone)]
pub struct School {
    pub book: EnrollmentBook,
    pub roster: Roster,
    pub ledger: GradeLedger,
    pub settings: Settings,
}
