use serde_json::{json, Value};

/// Rule violations raised by the enrollment book, roster and grade ledger.
///
/// These are caller mistakes, not I/O faults: the record set is left exactly
/// as it was and the caller can correct the request and retry. Each kind maps
/// onto one stable wire code so shells can branch without string matching.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// A submitted field is missing, blank or malformed.
    Validation { field: &'static str, reason: String },
    /// Another enrollment already claims this email (compared case-insensitively).
    DuplicateEmail { email: String },
    /// No record with the given key.
    NotFound { what: &'static str, key: String },
    /// The record's current status does not permit the requested operation.
    InvalidTransition {
        status: &'static str,
        operation: &'static str,
    },
    /// A grade value outside the 0..=100 scale.
    OutOfRange { value: f64 },
    /// The enrollment already produced a roster student; approving again
    /// would mint a second one.
    AlreadyMaterialized { enrollment_id: String },
}

impl DomainError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        DomainError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(what: &'static str, key: impl Into<String>) -> Self {
        DomainError::NotFound {
            what,
            key: key.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation { .. } => "validation_error",
            DomainError::DuplicateEmail { .. } => "duplicate_email",
            DomainError::NotFound { .. } => "not_found",
            DomainError::InvalidTransition { .. } => "invalid_transition",
            DomainError::OutOfRange { .. } => "out_of_range",
            DomainError::AlreadyMaterialized { .. } => "already_materialized",
        }
    }

    pub fn message(&self) -> String {
        match self {
            DomainError::Validation { field, reason } => format!("{field}: {reason}"),
            DomainError::DuplicateEmail { email } => {
                format!("an enrollment already exists for {email}")
            }
            DomainError::NotFound { what, key } => format!("{what} not found: {key}"),
            DomainError::InvalidTransition { status, operation } => {
                format!("{operation} is not allowed while status is {status}")
            }
            DomainError::OutOfRange { value } => {
                format!("grade must be between 0 and 100, got {value}")
            }
            DomainError::AlreadyMaterialized { enrollment_id } => {
                format!("enrollment {enrollment_id} already has a student on the roster")
            }
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            DomainError::Validation { field, .. } => Some(json!({ "field": field })),
            DomainError::DuplicateEmail { email } => Some(json!({ "email": email })),
            DomainError::NotFound { what, key } => Some(json!({ "kind": what, "key": key })),
            DomainError::InvalidTransition { status, .. } => Some(json!({ "status": status })),
            DomainError::OutOfRange { value } => Some(json!({ "value": value })),
            DomainError::AlreadyMaterialized { enrollment_id } => {
                Some(json!({ "enrollmentId": enrollment_id }))
            }
        }
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for DomainError {}
