//! Validation and invariant failures shared by every slice's domain model.

/// Raised when a value object or entity method rejects its input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("invalid email format")]
    InvalidEmail,
    #[error("password must be at least 8 characters")]
    PasswordTooShort,
    #[error("password hashing failed: {0}")]
    PasswordHashing(String),
    #[error("username must be between 1 and 50 characters")]
    InvalidUsername,
    #[error("age must be between 0 and 150")]
    InvalidAge,
    #[error("post content must be between 10 and 300 characters")]
    InvalidPostContent,
    #[error("company name is required")]
    InvalidCompanyName,
    #[error("selection stage name is required")]
    InvalidStageName,
    #[error("reminder message is required")]
    InvalidReminderMessage,
    #[error("invalid {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
    #[error("forbidden")]
    Forbidden,
    #[error("cannot curse your own post")]
    CannotCurseSelf,
    #[error("invalid status transition: {current} -> {next}")]
    InvalidTransition {
        current: &'static str,
        next: &'static str,
    },
    #[error("ritual has already ended")]
    RitualAlreadyEnded,
    #[error("ritual is not active")]
    RitualNotActive,
}

impl DomainError {
    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Offset/limit window shared by every listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Page {
    /// Missing or non-positive limits fall back to 20, oversized ones are capped at 100.
    pub fn new(offset: Option<i64>, limit: Option<i64>) -> Self {
        let limit = match limit {
            Some(limit) if limit > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_PAGE_SIZE,
        };
        Self {
            offset: offset.unwrap_or(0).max(0),
            limit,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
