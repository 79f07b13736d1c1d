//! Conversion of filter operands into SQLite values.
//!
//! Dates and times use the same text layouts rusqlite's `chrono` support
//! writes, so values bound here compare correctly against stored columns.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Value;

const DATE_FORMAT: &str = "%F";
const DATETIME_FORMAT: &str = "%F %T%.f";
const TIME_FORMAT: &str = "%T%.f";

/// A value that can be bound as a filter operand.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for u32 {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Real(self)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Value {
        Value::Text(self.clone())
    }
}

impl IntoValue for NaiveDate {
    fn into_value(self) -> Value {
        Value::Text(self.format(DATE_FORMAT).to_string())
    }
}

impl IntoValue for NaiveDateTime {
    fn into_value(self) -> Value {
        Value::Text(self.format(DATETIME_FORMAT).to_string())
    }
}

impl IntoValue for NaiveTime {
    fn into_value(self) -> Value {
        Value::Text(self.format(TIME_FORMAT).to_string())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(value) => value.into_value(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IntoValue;
    use chrono::{NaiveDate, NaiveTime};
    use rusqlite::types::Value;

    #[test]
    fn booleans_bind_as_integer_flags() {
        assert_eq!(true.into_value(), Value::Integer(1));
        assert_eq!(false.into_value(), Value::Integer(0));
    }

    #[test]
    fn temporal_values_use_sortable_text() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(day.into_value(), Value::Text("2024-03-09".to_string()));

        let at = day.and_hms_opt(7, 5, 0).unwrap();
        assert_eq!(at.into_value(), Value::Text("2024-03-09 07:05:00".to_string()));

        let time = NaiveTime::from_hms_opt(21, 30, 0).unwrap();
        assert_eq!(time.into_value(), Value::Text("21:30:00".to_string()));
    }

    #[test]
    fn none_binds_null() {
        assert_eq!(None::<i64>.into_value(), Value::Null);
        assert_eq!(Some("x").into_value(), Value::Text("x".to_string()));
    }
}
