//! Error type definitions for the user profile service
//!
//! This module defines all error types used throughout the crate. The
//! profile layer collapses storage failures into the small taxonomy callers
//! actually branch on: not found, storage unavailable, consistency violation.

use thiserror::Error;

/// Top-level application error type
///
/// Used by the binary and the composition root. Library operations return
/// the narrower [`ProfileError`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Profile assembly errors
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Filesystem errors outside the icon store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Errors raised by sqlx (connection, query, decode)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Constraint violations (unique, foreign key, etc.)
    #[error("Constraint violation: {constraint} - {message}")]
    ConstraintViolation { constraint: String, message: String },

    /// Record not found
    #[error("Record not found: {table} with {field} = {value}")]
    RecordNotFound {
        table: String,
        field: String,
        value: String,
    },

    /// Migration failures
    #[error("Migration failed: {version} - {message}")]
    MigrationFailed { version: String, message: String },
}

/// Icon blob store errors
#[derive(Error, Debug)]
pub enum IconStoreError {
    /// No record stored under the given key
    #[error("icon not found: {0}")]
    NotFound(String),

    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The user name cannot be used as a storage key
    #[error("invalid icon key: {0}")]
    InvalidName(String),
}

/// Errors surfaced by the profile aggregator, cache and service
#[derive(Error, Debug)]
pub enum ProfileError {
    /// A user, theme or icon record is absent
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// The store or the blob backend could not be reached
    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },

    /// Stored data breaks an invariant that registration guarantees
    #[error("Consistency violation: {message}")]
    ConsistencyViolation { message: String },

    /// Rejected input
    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl RepositoryError {
    /// Create a record not found error
    pub fn record_not_found<T: Into<String>, F: Into<String>, V: Into<String>>(
        table: T,
        field: F,
        value: V,
    ) -> Self {
        Self::RecordNotFound {
            table: table.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a constraint violation error
    pub fn constraint_violation<C: Into<String>, M: Into<String>>(
        constraint: C,
        message: M,
    ) -> Self {
        Self::ConstraintViolation {
            constraint: constraint.into(),
            message: message.into(),
        }
    }
}

impl ProfileError {
    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a storage unavailable error
    pub fn storage_unavailable<S: Into<String>>(message: S) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Create a consistency violation error
    pub fn consistency_violation<S: Into<String>>(message: S) -> Self {
        Self::ConsistencyViolation {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<RepositoryError> for ProfileError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::RecordNotFound {
                table,
                field,
                value,
            } => Self::NotFound {
                resource: table,
                id: format!("{field}={value}"),
            },
            RepositoryError::ConstraintViolation {
                constraint,
                message,
            } => Self::Validation {
                message: format!("{constraint}: {message}"),
            },
            other => Self::StorageUnavailable {
                message: other.to_string(),
            },
        }
    }
}

impl From<IconStoreError> for ProfileError {
    fn from(err: IconStoreError) -> Self {
        match err {
            IconStoreError::NotFound(key) => Self::not_found("icon", key),
            IconStoreError::InvalidName(name) => Self::consistency_violation(format!(
                "stored user name is not a valid icon key: {name}"
            )),
            IconStoreError::Io(e) => Self::storage_unavailable(format!("icon store: {e}")),
        }
    }
}
