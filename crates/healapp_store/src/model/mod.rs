//! Persisted records of the health-service application.
//!
//! # Responsibility
//! - Define one record type per table, with its field enum and row mapping.
//! - Define stored discriminators (statuses, types) and polymorphic references.
//! - Validate records before they are written.
//!
//! # Invariants
//! - Ids are store-assigned; `id` on a record passed to `create` is ignored.
//! - Discriminators are stored as their SCREAMING_SNAKE_CASE names.
//! - Reads reject unknown discriminators and non-0/1 flags as invalid data.

pub mod account;
pub mod content;
pub mod cycle;
pub mod engagement;
pub mod notification;
pub mod rating;
pub mod sti;

use crate::repo::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Row;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A closed set of values stored as text.
pub trait DbEnum: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn as_db_str(self) -> &'static str;

    fn from_db_str(value: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.as_db_str() == value)
    }
}

/// Declares a stored discriminator enum with its text mapping.
macro_rules! db_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $db:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $db)] $variant),+
        }

        impl $crate::model::DbEnum for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn as_db_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $db),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::model::DbEnum::as_db_str(*self))
            }
        }

        impl rusqlite::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(
                    $crate::model::DbEnum::as_db_str(*self),
                ))
            }
        }

        impl $crate::query::IntoValue for $name {
            fn into_value(self) -> rusqlite::types::Value {
                rusqlite::types::Value::Text($crate::model::DbEnum::as_db_str(self).to_string())
            }
        }
    };
}

pub(crate) use db_enum;

db_enum! {
    /// Self-declared gender on a user profile.
    Gender {
        Male => "MALE",
        Female => "FEMALE",
        Other => "OTHER",
    }
}

/// Write-time rejection of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text is empty or whitespace.
    Empty(&'static str),
    TooLong {
        field: &'static str,
        max_chars: usize,
    },
    InvalidFormat {
        field: &'static str,
        expected: &'static str,
    },
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    /// `end` precedes `start`.
    InvertedRange {
        start: &'static str,
        end: &'static str,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(field) => write!(f, "`{field}` must not be empty"),
            Self::TooLong { field, max_chars } => {
                write!(f, "`{field}` must not exceed {max_chars} characters")
            }
            Self::InvalidFormat { field, expected } => {
                write!(f, "`{field}` has an invalid format; expected {expected}")
            }
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "`{field}` = {value} is outside {min}..={max}"),
            Self::InvertedRange { start, end } => {
                write!(f, "`{end}` must not be earlier than `{start}`")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

pub(crate) fn limit_chars(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(text) if text.chars().count() > max_chars => {
            Err(ValidationError::TooLong { field, max_chars })
        }
        _ => Ok(()),
    }
}

pub(crate) fn require_range(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

pub(crate) fn require_match(
    field: &'static str,
    value: &str,
    pattern: &Lazy<Regex>,
    expected: &'static str,
) -> Result<(), ValidationError> {
    if !pattern.is_match(value) {
        return Err(ValidationError::InvalidFormat { field, expected });
    }
    Ok(())
}

pub(crate) fn require_ordered<T: PartialOrd>(
    start_field: &'static str,
    start: &T,
    end_field: &'static str,
    end: &T,
) -> Result<(), ValidationError> {
    if end < start {
        return Err(ValidationError::InvertedRange {
            start: start_field,
            end: end_field,
        });
    }
    Ok(())
}

/// Reads a required discriminator column.
pub(crate) fn read_enum<T: DbEnum>(row: &Row<'_>, table: &str, column: &str) -> RepoResult<T> {
    let value: String = row.get(column)?;
    parse_enum(&value, table, column)
}

/// Reads a nullable discriminator column.
pub(crate) fn read_opt_enum<T: DbEnum>(
    row: &Row<'_>,
    table: &str,
    column: &str,
) -> RepoResult<Option<T>> {
    match row.get::<_, Option<String>>(column)? {
        Some(value) => parse_enum(&value, table, column).map(Some),
        None => Ok(None),
    }
}

/// Reads a 0/1 flag column.
pub(crate) fn read_flag(row: &Row<'_>, table: &str, column: &str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {table}.{column}"
        ))),
    }
}

fn parse_enum<T: DbEnum>(value: &str, table: &str, column: &str) -> RepoResult<T> {
    T::from_db_str(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid value `{value}` in {table}.{column}"))
    })
}
