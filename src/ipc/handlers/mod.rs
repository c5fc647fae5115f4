pub mod backup_exchange;
pub mod core;
pub mod enrollments;
pub mod grades;
pub mod import_legacy;
pub mod notices;
pub mod reports;
pub mod roster;
pub mod settings;
