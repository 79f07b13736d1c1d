//! Explicit predicate builder.
//!
//! # Responsibility
//! - Describe a `WHERE` clause as data: field, operator and bound values.
//! - Render that description into SQL text plus positional bindings.
//!
//! # Invariants
//! - Operands are always bound, never spliced into SQL text.
//! - Only `&'static str` fragments (field expressions, [`Filter::Sql`]) reach the SQL text.
//! - Keyword matching is case-insensitive and treats `%`, `_` and `\` literally.

use super::value::IntoValue;
use rusqlite::types::Value;
use std::fmt::Debug;

/// A queryable attribute of one entity.
///
/// `expr` is a column name or a correlated scalar subquery that navigates a
/// relationship, e.g. a post's category name.
pub trait Field: Copy + Debug {
    fn expr(self) -> &'static str;
}

/// Predicate over the fields `F` of one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter<F> {
    /// Matches every row.
    All,
    Eq(F, Value),
    Ne(F, Value),
    Lt(F, Value),
    Le(F, Value),
    Gt(F, Value),
    Ge(F, Value),
    /// Inclusive on both ends.
    Between(F, Value, Value),
    In(F, Vec<Value>),
    IsNull(F),
    IsNotNull(F),
    /// Case-insensitive substring match.
    Contains(F, String),
    /// Case-insensitive equality.
    EqIgnoreCase(F, String),
    /// Text length strictly greater than the bound.
    LongerThan(F, i64),
    And(Vec<Filter<F>>),
    Or(Vec<Filter<F>>),
    Not(Box<Filter<F>>),
    /// Static SQL fragment with `?` placeholders for its bindings.
    Sql(&'static str, Vec<Value>),
}

impl<F: Field> Filter<F> {
    pub fn eq(field: F, value: impl IntoValue) -> Self {
        Self::Eq(field, value.into_value())
    }

    pub fn ne(field: F, value: impl IntoValue) -> Self {
        Self::Ne(field, value.into_value())
    }

    pub fn lt(field: F, value: impl IntoValue) -> Self {
        Self::Lt(field, value.into_value())
    }

    pub fn le(field: F, value: impl IntoValue) -> Self {
        Self::Le(field, value.into_value())
    }

    pub fn gt(field: F, value: impl IntoValue) -> Self {
        Self::Gt(field, value.into_value())
    }

    pub fn ge(field: F, value: impl IntoValue) -> Self {
        Self::Ge(field, value.into_value())
    }

    pub fn between(field: F, low: impl IntoValue, high: impl IntoValue) -> Self {
        Self::Between(field, low.into_value(), high.into_value())
    }

    pub fn is_in<V: IntoValue>(field: F, values: impl IntoIterator<Item = V>) -> Self {
        Self::In(field, values.into_iter().map(IntoValue::into_value).collect())
    }

    pub fn is_null(field: F) -> Self {
        Self::IsNull(field)
    }

    pub fn is_not_null(field: F) -> Self {
        Self::IsNotNull(field)
    }

    pub fn contains(field: F, keyword: impl Into<String>) -> Self {
        Self::Contains(field, keyword.into())
    }

    pub fn eq_ignore_case(field: F, value: impl Into<String>) -> Self {
        Self::EqIgnoreCase(field, value.into())
    }

    pub fn longer_than(field: F, chars: i64) -> Self {
        Self::LongerThan(field, chars)
    }

    /// Keyword found in any of `fields`.
    pub fn any_contains(fields: &[F], keyword: &str) -> Self {
        Self::Or(
            fields
                .iter()
                .map(|field| Self::Contains(*field, keyword.to_string()))
                .collect(),
        )
    }

    /// Null or empty text.
    pub fn is_blank(field: F) -> Self {
        Self::Or(vec![Self::IsNull(field), Self::eq(field, "")])
    }

    pub fn sql(fragment: &'static str, bindings: Vec<Value>) -> Self {
        Self::Sql(fragment, bindings)
    }

    /// Conjunction, flattening nested `And` and dropping `All`.
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::All, rhs) => rhs,
            (lhs, Self::All) => lhs,
            (Self::And(mut lhs), Self::And(rhs)) => {
                lhs.extend(rhs);
                Self::And(lhs)
            }
            (Self::And(mut lhs), rhs) => {
                lhs.push(rhs);
                Self::And(lhs)
            }
            (lhs, rhs) => Self::And(vec![lhs, rhs]),
        }
    }

    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::Or(mut lhs), Self::Or(rhs)) => {
                lhs.extend(rhs);
                Self::Or(lhs)
            }
            (Self::Or(mut lhs), rhs) => {
                lhs.push(rhs);
                Self::Or(lhs)
            }
            (lhs, rhs) => Self::Or(vec![lhs, rhs]),
        }
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Appends this predicate to `sql` and its operands to `bindings`.
    pub fn render(&self, sql: &mut String, bindings: &mut Vec<Value>) {
        match self {
            Self::All => sql.push_str("1 = 1"),
            Self::Eq(field, value) => compare(sql, bindings, *field, "=", value),
            Self::Ne(field, value) => compare(sql, bindings, *field, "<>", value),
            Self::Lt(field, value) => compare(sql, bindings, *field, "<", value),
            Self::Le(field, value) => compare(sql, bindings, *field, "<=", value),
            Self::Gt(field, value) => compare(sql, bindings, *field, ">", value),
            Self::Ge(field, value) => compare(sql, bindings, *field, ">=", value),
            Self::Between(field, low, high) => {
                sql.push_str(field.expr());
                sql.push_str(" BETWEEN ? AND ?");
                bindings.push(low.clone());
                bindings.push(high.clone());
            }
            Self::In(_, values) if values.is_empty() => sql.push_str("1 = 0"),
            Self::In(field, values) => {
                sql.push_str(field.expr());
                sql.push_str(" IN (");
                for index in 0..values.len() {
                    if index > 0 {
                        sql.push_str(", ");
                    }
                    sql.push('?');
                }
                sql.push(')');
                bindings.extend(values.iter().cloned());
            }
            Self::IsNull(field) => {
                sql.push_str(field.expr());
                sql.push_str(" IS NULL");
            }
            Self::IsNotNull(field) => {
                sql.push_str(field.expr());
                sql.push_str(" IS NOT NULL");
            }
            Self::Contains(field, keyword) => {
                sql.push_str("fold_case(");
                sql.push_str(field.expr());
                sql.push_str(") LIKE ? ESCAPE '\\'");
                bindings.push(Value::Text(like_pattern(keyword)));
            }
            Self::EqIgnoreCase(field, value) => {
                sql.push_str("fold_case(");
                sql.push_str(field.expr());
                sql.push_str(") = ?");
                bindings.push(Value::Text(value.to_lowercase()));
            }
            Self::LongerThan(field, chars) => {
                sql.push_str("LENGTH(");
                sql.push_str(field.expr());
                sql.push_str(") > ?");
                bindings.push(Value::Integer(*chars));
            }
            Self::And(parts) if parts.is_empty() => sql.push_str("1 = 1"),
            Self::And(parts) => join(sql, bindings, parts, " AND "),
            Self::Or(parts) if parts.is_empty() => sql.push_str("1 = 0"),
            Self::Or(parts) => join(sql, bindings, parts, " OR "),
            Self::Not(inner) => {
                sql.push_str("NOT (");
                inner.render(sql, bindings);
                sql.push(')');
            }
            Self::Sql(fragment, values) => {
                sql.push('(');
                sql.push_str(fragment);
                sql.push(')');
                bindings.extend(values.iter().cloned());
            }
        }
    }
}

fn compare<F: Field>(
    sql: &mut String,
    bindings: &mut Vec<Value>,
    field: F,
    op: &str,
    value: &Value,
) {
    sql.push_str(field.expr());
    sql.push(' ');
    sql.push_str(op);
    sql.push_str(" ?");
    bindings.push(value.clone());
}

fn join<F: Field>(sql: &mut String, bindings: &mut Vec<Value>, parts: &[Filter<F>], sep: &str) {
    sql.push('(');
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            sql.push_str(sep);
        }
        part.render(sql, bindings);
    }
    sql.push(')');
}

/// Folds the keyword like the `fold_case` SQL function folds the column.
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
