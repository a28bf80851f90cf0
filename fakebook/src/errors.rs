use std::{borrow::Cow, fmt};

use thiserror::Error;

use crate::models::Relationship;

/// Constraint-violation code reported by Postgres-compatible backends.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Errors raised by a [`DataStore`](crate::store::DataStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A write would create a second row for a unique key.
    #[error("unique constraint violation on '{constraint}' (existing row {existing_id:?})")]
    UniqueViolation {
        constraint: String,
        existing_id: Option<String>,
    },

    /// The row changed between read and write.
    #[error("row '{row_id}' was modified concurrently")]
    Conflict { row_id: String },

    /// `maybe_single` matched more than one row.
    #[error("expected at most one row in '{table}', found {found}")]
    MultipleRows { table: String, found: usize },

    /// Invalid input supplied to a query or mutation.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Error reported by a remote backend, carrying its native code.
    #[error("remote error {code}: {message}")]
    Remote { code: String, message: String },

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

impl StoreError {
    /// True when the store refused a write because of a uniqueness constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::UniqueViolation { .. } => true,
            StoreError::Remote { code, message } => {
                code == UNIQUE_VIOLATION_CODE || message.to_ascii_lowercase().contains("duplicate")
            }
            _ => false,
        }
    }

    pub(crate) fn serialization(err: serde_json::Error) -> Self {
        StoreError::Other {
            message: format!("failed to (de)serialize row: {err}").into(),
        }
    }
}

/// Collection of validation issues encountered while preparing a mutation.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Ok when no issues were collected.
    pub fn into_result(self) -> ValidationResult<()> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Detailed validation failure for a single field or logical path.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account already exists for '{email}'")]
    EmailTaken { email: String },

    #[error("not signed in")]
    NoSession,

    #[error("password hashing failed: {message}")]
    Hashing { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a friend request was refused as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateReason {
    /// A pending request already covers the pair.
    Pending,
    /// The users are already friends.
    Accepted,
    /// A concurrent write won the store's uniqueness constraint.
    DbDuplicate,
}

impl DuplicateReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            DuplicateReason::Pending => "pending",
            DuplicateReason::Accepted => "accepted",
            DuplicateReason::DbDuplicate => "db_duplicate",
        }
    }
}

impl fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type returned by the social services.
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("cannot send a friend request to yourself")]
    SelfRequest,

    #[error("a relationship already exists for this pair ({reason})")]
    DuplicateRelationship {
        reason: DuplicateReason,
        existing: Option<Box<Relationship>>,
    },

    #[error("not authorized: {message}")]
    NotAuthorized { message: Cow<'static, str> },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("validation failed")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Remote(#[from] StoreError),
}

impl SocialError {
    pub(crate) fn not_authorized(message: impl Into<Cow<'static, str>>) -> Self {
        SocialError::NotAuthorized {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        SocialError::NotFound { entity, id: id.into() }
    }

    pub(crate) fn duplicate(reason: DuplicateReason, existing: Option<Relationship>) -> Self {
        SocialError::DuplicateRelationship {
            reason,
            existing: existing.map(Box::new),
        }
    }

    /// Duplicate reason, when this is a duplicate-relationship error.
    pub fn duplicate_reason(&self) -> Option<DuplicateReason> {
        match self {
            SocialError::DuplicateRelationship { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

pub type SocialResult<T> = Result<T, SocialError>;
