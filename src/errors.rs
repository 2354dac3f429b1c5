//! Unified error type for the platform.
//!
//! Every fallible operation in `core`, `config`, `storage` and `web` returns
//! [`Result`]. Database errors are classified on the way in so that callers can
//! tell constraint violations apart from connectivity problems.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Application error enumeration
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Input failed field or domain validation
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable description of the failed rule
        message: String,
    },

    /// A record looked up by id or key does not exist
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity name, e.g. `"User"`
        entity: &'static str,
        /// The id or key used for the lookup
        key: String,
    },

    /// Another user already registered with this email
    #[error("A user with email '{email}' already exists")]
    DuplicateEmail {
        /// The conflicting email address
        email: String,
    },

    /// A unique or foreign-key constraint rejected the write
    #[error("Constraint violation: {message}")]
    Constraint {
        /// Driver-provided detail
        message: String,
    },

    /// The country is still referenced by protected records
    #[error("Country {country_id} is still referenced by {references} record(s)")]
    CountryInUse {
        /// Country primary key
        country_id: i64,
        /// Number of protecting references found
        references: u64,
    },

    /// A KYC status change that the review workflow does not allow
    #[error("Cannot move KYC application from '{from}' to '{to}'")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// The acting user lacks the staff permission for this action
    #[error("Permission denied: {reason}")]
    PermissionDenied {
        /// Why the action was refused
        reason: String,
    },

    /// A listing was asked to sort by a column it does not expose
    #[error("Cannot sort by '{column}'")]
    InvalidSort {
        /// The rejected column name
        column: String,
    },

    /// Any other database failure
    #[error("Database error: {message}")]
    Database {
        /// Driver-provided detail
        message: String,
    },

    /// Filesystem failure (document storage, config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(
                SqlErr::UniqueConstraintViolation(message)
                | SqlErr::ForeignKeyConstraintViolation(message),
            ) => Self::Constraint { message },
            _ => Self::Database {
                message: err.to_string(),
            },
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation {
            message: errors.to_string(),
        }
    }
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] keyed by anything printable.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Shorthand for a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
