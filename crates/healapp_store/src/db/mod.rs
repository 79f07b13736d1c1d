//! SQLite storage bootstrap, schema migrations and store error classification.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the health-service store.
//! - Apply schema migrations in deterministic order.
//! - Classify driver failures into the store error taxonomy.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Accessors must not read/write application data before migrations succeed.
//! - Driver errors are classified, never swallowed or retried here.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_db_with_config, register_functions};

pub type DbResult<T> = Result<T, DbError>;

/// Which integrity rule a rejected write broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    PrimaryKey,
    ForeignKey,
    Check,
    NotNull,
    Other,
}

/// Store-level failure, classified from the underlying `rusqlite::Error`.
#[derive(Debug)]
pub enum DbError {
    /// A uniqueness, referential or check rule rejected a write.
    ConstraintViolation {
        kind: ConstraintKind,
        message: String,
    },
    /// The database could not be reached: busy, locked, unopenable or damaged.
    StoreUnavailable(rusqlite::Error),
    /// Programmer error: bad binding, unknown column or invalid SQL.
    MalformedQuery(rusqlite::Error),
    /// The file was migrated by a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Anything the classification above does not cover.
    Sqlite(rusqlite::Error),
}

impl DbError {
    /// Returns the constraint kind when this is a constraint violation.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            Self::ConstraintViolation { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConstraintViolation { kind, message } => {
                write!(f, "constraint violation ({kind:?}): {message}")
            }
            Self::StoreUnavailable(err) => write!(f, "store unavailable: {err}"),
            Self::MalformedQuery(err) => write!(f, "malformed query: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreUnavailable(err) | Self::MalformedQuery(err) | Self::Sqlite(err) => {
                Some(err)
            }
            Self::ConstraintViolation { .. } | Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message) => match failure.code {
                ErrorCode::ConstraintViolation => Self::ConstraintViolation {
                    kind: constraint_kind(failure.extended_code),
                    message: message.clone().unwrap_or_else(|| failure.to_string()),
                },
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt => Self::StoreUnavailable(err),
                ErrorCode::Unknown => Self::MalformedQuery(err),
                _ => Self::Sqlite(err),
            },
            rusqlite::Error::SqlInputError { .. }
            | rusqlite::Error::InvalidParameterCount(..)
            | rusqlite::Error::InvalidParameterName(_)
            | rusqlite::Error::InvalidColumnName(_)
            | rusqlite::Error::InvalidColumnIndex(_)
            | rusqlite::Error::MultipleStatement => Self::MalformedQuery(err),
            _ => Self::Sqlite(err),
        }
    }
}

fn constraint_kind(extended_code: std::os::raw::c_int) -> ConstraintKind {
    match extended_code {
        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => ConstraintKind::Unique,
        rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => ConstraintKind::PrimaryKey,
        rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
        rusqlite::ffi::SQLITE_CONSTRAINT_CHECK => ConstraintKind::Check,
        rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintKind::NotNull,
        _ => ConstraintKind::Other,
    }
}
