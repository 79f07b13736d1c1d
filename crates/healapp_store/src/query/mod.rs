//! Query intents and their execution.
//!
//! # Responsibility
//! - Express lookups as data: [`Filter`], [`Sort`] and [`PageRequest`].
//! - Map stored rows into models through [`Entity`].
//! - Execute intents with [`Executor`] under the configured [`crate::config::QueryLimits`].
//!
//! # Invariants
//! - Table, column and field-expression text is compile-time constant.
//! - Every caller-supplied value travels as a bound parameter.

mod exec;
mod filter;
mod page;
mod value;

pub use exec::Executor;
pub use filter::{Field, Filter};
pub use page::{Direction, Page, PageRequest, Sort};
pub use value::IntoValue;

use crate::repo::RepoResult;
use rusqlite::Row;

/// A model persisted as one row of one table.
pub trait Entity: Sized {
    type Field: Field;

    /// Human-readable name used in `NotFound` errors.
    const NAME: &'static str;
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str;
    /// Columns selected for [`Entity::from_row`], in schema order.
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

/// Declares an entity's field enum and its [`Field`] expressions.
macro_rules! entity_fields {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $expr:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $crate::query::Field for $name {
            fn expr(self) -> &'static str {
                match self {
                    $(Self::$variant => $expr),+
                }
            }
        }
    };
}

pub(crate) use entity_fields;
